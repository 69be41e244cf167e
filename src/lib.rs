//! SCodes Core - Barcode Image Generation
//!
//! # Pipeline
//! 1. Validate the request, resolve format and ecc level
//! 2. Encode text into an output-resolution matrix
//! 3. Rasterize with foreground/background colors
//! 4. Composite a center image (QR codes only)
//! 5. Write the image file
//!
//! Each step can end the request. Nothing is retried.

pub mod symbology;
pub mod ecc;
pub mod encoder;
pub mod raster;
pub mod overlay;
pub mod output;
pub mod config;
pub mod validation;
pub mod hashing;
pub mod pipeline;
pub mod generator;

pub use symbology::{Symbology, SymbologyFilter, FormatError};
pub use ecc::{resolve_ecc_level, MAX_QR_ECC_LEVEL};
pub use encoder::{EncodeError, Geometry, MatrixEncoder, StandardEncoder, SymbolMatrix};
pub use raster::{rasterize, Color};
pub use overlay::{OverlayError, Placement, Rect};
pub use output::{OutputArtifact, WriteError};
pub use config::{ConfigError, GenerationRequest, GeneratorSettings};
pub use validation::{ValidationResult, ValidationViolation, ViolationSeverity};
pub use pipeline::{GenerationPipeline, GenerationReport, PipelineError, Stage};
pub use generator::Generator;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");
