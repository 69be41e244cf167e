//! Generation Pipeline - Single Entry Point
//!
//! validate -> encode -> rasterize -> (composite) -> write, synchronously.
//! Every stage can end the request; nothing is retried.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use thiserror::Error;

use crate::config::GenerationRequest;
use crate::ecc::{clamp_to_range, resolve_ecc_level};
use crate::encoder::{EncodeError, MatrixEncoder, StandardEncoder, SymbolMatrix};
use crate::hashing::compute_request_hash;
use crate::output::{write_image, OutputArtifact, WriteError};
use crate::overlay::{self, Placement};
use crate::raster::rasterize;
use crate::symbology::{FormatError, Symbology};
use crate::validation::{ValidationResult, ValidationViolation, Validator};
use crate::ENGINE_VERSION;

/// Request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Idle,
    Validating,
    Encoding,
    Rasterizing,
    Compositing,
    Writing,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Encoding => "encoding",
            Self::Rasterizing => "rasterizing",
            Self::Compositing => "compositing",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Encoding error: {0}")]
    Encoding(#[from] EncodeError),

    #[error("Write error: {0}")]
    Write(#[from] WriteError),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl PipelineError {
    /// Stage the request was in when it failed.
    pub fn stage(&self) -> Stage {
        match self {
            Self::Configuration(_) => Stage::Validating,
            Self::Encoding(_) | Self::Unexpected(_) => Stage::Encoding,
            Self::Write(_) => Stage::Writing,
        }
    }
}

impl From<FormatError> for PipelineError {
    fn from(error: FormatError) -> Self {
        Self::Configuration(error.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationReport {
    pub artifact: OutputArtifact,
    pub format: Symbology,
    pub size: [u32; 2],
    pub ecc_level: Option<u8>,
    pub overlay: Option<Placement>,
    pub warnings: Vec<ValidationViolation>,
    pub request_hash: String,
    pub engine_version: String,
    pub created_at: DateTime<Utc>,
}

/// The generation pipeline - single entry point for producing images
pub struct GenerationPipeline<E = StandardEncoder> {
    encoder: E,
    validator: Validator,
}

impl GenerationPipeline<StandardEncoder> {
    pub fn standard() -> Self {
        Self::new(StandardEncoder::new())
    }
}

impl<E: MatrixEncoder> GenerationPipeline<E> {
    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            validator: Validator::new(),
        }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    /// Validate a request without generating anything.
    pub fn validate_request(&self, request: &GenerationRequest) -> ValidationResult {
        self.validator.validate(request)
    }

    /// The ecc level handed to the encoder for this request.
    pub fn effective_ecc_level(&self, request: &GenerationRequest) -> Option<u8> {
        let format = request.settings.format;
        let level = resolve_ecc_level(format, request.settings.ecc_level, request.has_overlay());
        clamp_to_range(format, level, self.encoder.ecc_range(format))
    }

    /// Run one request to completion.
    pub fn generate(&self, request: &GenerationRequest) -> Result<GenerationReport, PipelineError> {
        let result = self.run(request);
        match &result {
            Ok(report) => log::debug!("{} -> {}", Stage::Done, report.artifact.path.display()),
            Err(e) => log::debug!("{} in {}: {}", Stage::Failed, e.stage(), e),
        }
        result
    }

    fn run(&self, request: &GenerationRequest) -> Result<GenerationReport, PipelineError> {
        let settings = &request.settings;

        log::debug!("{}: {} request", Stage::Validating, settings.format);
        let validation = self.validate_request(request);
        for warning in validation.warnings() {
            log::warn!("{}: {}", warning.rule, warning.message);
        }
        if !validation.valid {
            return Err(PipelineError::Configuration(validation.error_summary()));
        }
        if request.text.is_empty() {
            return Err(EncodeError::EmptyText.into());
        }
        let request_hash = compute_request_hash(&request.with_lossy_paths(), ENGINE_VERSION)
            .map_err(|e| PipelineError::Configuration(e.to_string()))?;

        let ecc_level = self.effective_ecc_level(request);

        log::debug!("{}: ecc level {:?}", Stage::Encoding, ecc_level);
        let matrix = self.encode(request, ecc_level)?;

        log::debug!("{}: {}x{}", Stage::Rasterizing, settings.image_width, settings.image_height);
        let mut image = rasterize(
            &matrix,
            settings.image_width,
            settings.image_height,
            settings.foreground_color,
            settings.background_color,
        );
        drop(matrix);

        let mut placement = None;
        if let Some(path) = request.center_image().filter(|_| request.has_overlay()) {
            log::debug!("{}: {}", Stage::Compositing, path.display());
            match overlay::composite(&mut image, path, settings.center_image_ratio) {
                Ok(p) => placement = Some(p),
                Err(e) => log::warn!("{}", e),
            }
        }

        log::debug!("{}: {}", Stage::Writing, settings.file_path.display());
        let artifact = write_image(
            image,
            &settings.file_path,
            &settings.file_name,
            &settings.file_extension,
        )?;

        Ok(GenerationReport {
            artifact,
            format: settings.format,
            size: [settings.image_width, settings.image_height],
            ecc_level,
            overlay: placement,
            warnings: validation.warnings().cloned().collect(),
            request_hash,
            engine_version: ENGINE_VERSION.to_string(),
            created_at: Utc::now(),
        })
    }

    /// Encoder failures are terminal; a panicking backend is reported as
    /// `Unexpected` instead of unwinding into the caller.
    fn encode(&self, request: &GenerationRequest, ecc_level: Option<u8>) -> Result<SymbolMatrix, PipelineError> {
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.encoder.encode(
                &request.text,
                request.settings.format,
                request.geometry(),
                ecc_level,
            )
        }));

        match outcome {
            Ok(result) => Ok(result?),
            Err(payload) => {
                let detail = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "Unsupported exception thrown".to_string());
                Err(PipelineError::Unexpected(detail))
            }
        }
    }
}

impl Default for GenerationPipeline<StandardEncoder> {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GeneratorSettings;
    use std::cell::Cell;
    use std::ops::RangeInclusive;

    use crate::encoder::Geometry;

    /// Records calls and returns a checkerboard.
    struct RecordingEncoder {
        calls: Cell<u32>,
        last_ecc: Cell<Option<u8>>,
    }

    impl RecordingEncoder {
        fn new() -> Self {
            Self { calls: Cell::new(0), last_ecc: Cell::new(None) }
        }
    }

    impl MatrixEncoder for RecordingEncoder {
        fn encode(
            &self,
            _text: &str,
            _symbology: Symbology,
            geometry: Geometry,
            ecc_level: Option<u8>,
        ) -> Result<SymbolMatrix, EncodeError> {
            self.calls.set(self.calls.get() + 1);
            self.last_ecc.set(ecc_level);
            let mut m = SymbolMatrix::new(geometry.width, geometry.height);
            for y in 0..geometry.height {
                for x in 0..geometry.width {
                    m.set(x, y, (x + y) % 2 == 0);
                }
            }
            Ok(m)
        }

        fn ecc_range(&self, symbology: Symbology) -> Option<RangeInclusive<u8>> {
            (symbology == Symbology::QrCode).then_some(0..=8)
        }
    }

    struct PanickingEncoder;

    impl MatrixEncoder for PanickingEncoder {
        fn encode(&self, _: &str, _: Symbology, _: Geometry, _: Option<u8>) -> Result<SymbolMatrix, EncodeError> {
            panic!("backend exploded")
        }

        fn ecc_range(&self, _: Symbology) -> Option<RangeInclusive<u8>> {
            None
        }
    }

    fn settings_in(dir: &std::path::Path) -> GeneratorSettings {
        GeneratorSettings {
            image_width: 40,
            image_height: 30,
            image_margin: 2,
            file_path: dir.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_text_never_reaches_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(RecordingEncoder::new());
        for format in Symbology::ALL {
            let request = GeneratorSettings { format, ..settings_in(dir.path()) }.request("");
            let err = pipeline.generate(&request).unwrap_err();
            assert!(matches!(err, PipelineError::Encoding(EncodeError::EmptyText)));
        }
        assert_eq!(pipeline.encoder().calls.get(), 0);
    }

    #[test]
    fn test_invalid_request_never_reaches_encoder() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(RecordingEncoder::new());
        let request = GeneratorSettings {
            center_image_ratio: 0,
            ..settings_in(dir.path())
        }
        .request("hello");
        let err = pipeline.generate(&request).unwrap_err();
        assert_eq!(err.stage(), Stage::Validating);
        assert_eq!(pipeline.encoder().calls.get(), 0);
    }

    #[test]
    fn test_overlay_request_uses_max_ecc() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(RecordingEncoder::new());
        let request = GeneratorSettings {
            format: Symbology::QrCode,
            ecc_level: Some(2),
            center_image: Some(dir.path().join("missing-logo.png")),
            ..settings_in(dir.path())
        }
        .request("hello");

        let report = pipeline.generate(&request).unwrap();
        assert_eq!(pipeline.encoder().last_ecc.get(), Some(8));
        assert_eq!(report.ecc_level, Some(8));
        // Missing logo is a soft failure.
        assert!(report.overlay.is_none());
        // The stored settings are not rewritten.
        assert_eq!(request.settings.ecc_level, Some(2));
    }

    #[test]
    fn test_ecc_dropped_for_linear_codes() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(RecordingEncoder::new());
        let request = GeneratorSettings {
            ecc_level: Some(4),
            ..settings_in(dir.path())
        }
        .request("hello");
        pipeline.generate(&request).unwrap();
        assert_eq!(pipeline.encoder().last_ecc.get(), None);
    }

    #[test]
    fn test_out_of_range_ecc_is_clamped() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(RecordingEncoder::new());
        let request = GeneratorSettings {
            format: Symbology::QrCode,
            ecc_level: Some(42),
            ..settings_in(dir.path())
        }
        .request("hello");
        assert_eq!(pipeline.effective_ecc_level(&request), Some(8));
    }

    #[test]
    fn test_report_describes_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(RecordingEncoder::new());
        let request = settings_in(dir.path()).request("hello");

        let report = pipeline.generate(&request).unwrap();
        assert_eq!(report.artifact.path, dir.path().join("scode.png"));
        assert_eq!(report.size, [40, 30]);
        assert_eq!(report.format, Symbology::Code128);
        assert_eq!(report.engine_version, ENGINE_VERSION);
        assert!(report.warnings.is_empty());

        let again = pipeline.generate(&request).unwrap();
        assert_eq!(report.request_hash, again.request_hash);
        assert_eq!(report.artifact.sha256, again.artifact.sha256);
    }

    #[test]
    fn test_panicking_encoder_is_unexpected_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(PanickingEncoder);
        let err = pipeline.generate(&settings_in(dir.path()).request("hello")).unwrap_err();
        match err {
            PipelineError::Unexpected(detail) => assert!(detail.contains("backend exploded")),
            other => panic!("unexpected error: {other}"),
        }
        assert!(!dir.path().join("scode.png").exists());
    }

    #[test]
    fn test_write_failure_reports_writing_stage() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = GenerationPipeline::new(RecordingEncoder::new());
        let request = GeneratorSettings {
            file_path: dir.path().join("missing"),
            ..settings_in(dir.path())
        }
        .request("hello");
        let err = pipeline.generate(&request).unwrap_err();
        assert!(matches!(err, PipelineError::Write(_)));
        assert_eq!(err.stage(), Stage::Writing);
    }
}
