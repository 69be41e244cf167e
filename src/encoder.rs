//! Matrix Encoding Boundary
//!
//! The symbol encoders themselves are third-party crates. This module only
//! adapts them to one contract: text in, output-resolution matrix out.

use std::ops::RangeInclusive;

use barcoders::sym::codabar::Codabar;
use barcoders::sym::code128::Code128;
use barcoders::sym::code39::Code39;
use barcoders::sym::code93::Code93;
use barcoders::sym::ean13::EAN13;
use barcoders::sym::ean8::EAN8;
use qrcode::{Color, EcLevel, QrCode, Version};
use thiserror::Error;

use crate::symbology::Symbology;

/// Code128 input prefix selecting character set B (printable ASCII).
const CODE128_CHARSET_B: char = '\u{0181}';

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Input text is empty")]
    EmptyText,

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("{0} generation is not supported by this encoder")]
    UnsupportedSymbology(Symbology),

    #[error("{symbology} needs at least {required_width}x{required_height} pixels, image is {width}x{height}")]
    TooSmall {
        symbology: Symbology,
        required_width: u32,
        required_height: u32,
        width: u32,
        height: u32,
    },

    #[error("{symbology} rejected the input: {reason}")]
    Rejected { symbology: Symbology, reason: String },
}

/// Output size in pixels plus the quiet zone in modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    pub width: u32,
    pub height: u32,
    pub margin: u32,
}

impl Geometry {
    pub fn check(&self) -> Result<(), EncodeError> {
        if self.width == 0 || self.height == 0 {
            return Err(EncodeError::InvalidGeometry(format!(
                "image size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.margin.saturating_mul(2) >= self.width.min(self.height) {
            return Err(EncodeError::InvalidGeometry(format!(
                "margin {} leaves no room in a {}x{} image",
                self.margin, self.width, self.height
            )));
        }
        Ok(())
    }
}

/// Dark/light cells at output resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolMatrix {
    width: u32,
    height: u32,
    cells: Vec<bool>,
}

impl SymbolMatrix {
    /// An all-light matrix.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cells: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Cells outside the matrix read as light.
    pub fn get(&self, x: u32, y: u32) -> bool {
        x < self.width && y < self.height && self.cells[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, dark: bool) {
        if x < self.width && y < self.height {
            let i = self.index(x, y);
            self.cells[i] = dark;
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

/// Produces symbol matrices. Implementations own character-set, capacity
/// and geometry checks.
pub trait MatrixEncoder {
    fn encode(
        &self,
        text: &str,
        symbology: Symbology,
        geometry: Geometry,
        ecc_level: Option<u8>,
    ) -> Result<SymbolMatrix, EncodeError>;

    /// Accepted ecc levels, or `None` when the symbology has no error correction.
    fn ecc_range(&self, symbology: Symbology) -> Option<RangeInclusive<u8>>;
}

/// QR and Micro QR via `qrcode`, linear symbologies via `barcoders`.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardEncoder;

impl StandardEncoder {
    pub fn new() -> Self {
        Self
    }

    pub fn supports(&self, symbology: Symbology) -> bool {
        matches!(
            symbology,
            Symbology::QrCode
                | Symbology::MicroQrCode
                | Symbology::Code128
                | Symbology::Code39
                | Symbology::Code93
                | Symbology::Codabar
                | Symbology::Ean8
                | Symbology::Ean13
                | Symbology::UpcA
        )
    }
}

impl MatrixEncoder for StandardEncoder {
    fn encode(
        &self,
        text: &str,
        symbology: Symbology,
        geometry: Geometry,
        ecc_level: Option<u8>,
    ) -> Result<SymbolMatrix, EncodeError> {
        if text.is_empty() {
            return Err(EncodeError::EmptyText);
        }
        geometry.check()?;

        let modules = match symbology {
            Symbology::QrCode => qr_modules(text, ecc_level)?,
            Symbology::MicroQrCode => micro_qr_modules(text, ecc_level)?,
            _ if self.supports(symbology) => linear_modules(text, symbology)?,
            _ => return Err(EncodeError::UnsupportedSymbology(symbology)),
        };

        fit_to_output(&modules, symbology, geometry)
    }

    fn ecc_range(&self, symbology: Symbology) -> Option<RangeInclusive<u8>> {
        match symbology {
            Symbology::QrCode => Some(0..=8),
            // Micro QR has no H tier.
            Symbology::MicroQrCode => Some(0..=6),
            _ => None,
        }
    }
}

/// Raw module pattern before scaling. Linear codes have `height == 1`.
struct ModuleGrid {
    width: u32,
    height: u32,
    dark: Vec<bool>,
}

impl ModuleGrid {
    fn from_qr(code: &QrCode) -> Self {
        let size = code.width();
        let mut dark = Vec::with_capacity(size * size);
        for y in 0..size {
            for x in 0..size {
                dark.push(code[(x, y)] == Color::Dark);
            }
        }
        Self {
            width: size as u32,
            height: size as u32,
            dark,
        }
    }

    fn from_bars(bars: &[u8]) -> Self {
        Self {
            width: bars.len() as u32,
            height: 1,
            dark: bars.iter().map(|&b| b == 1).collect(),
        }
    }

    fn is_linear(&self) -> bool {
        self.height == 1
    }

    fn get(&self, x: u32, y: u32) -> bool {
        self.dark[y as usize * self.width as usize + x as usize]
    }
}

/// 0-8 scale to QR tiers: 0-2 L, 3-4 M, 5-6 Q, 7-8 H. Unset is L.
fn qr_ec_level(level: Option<u8>) -> EcLevel {
    match level.map(|l| l.saturating_sub(1) / 2) {
        None | Some(0) => EcLevel::L,
        Some(1) => EcLevel::M,
        Some(2) => EcLevel::Q,
        Some(_) => EcLevel::H,
    }
}

fn qr_modules(text: &str, ecc_level: Option<u8>) -> Result<ModuleGrid, EncodeError> {
    let code = QrCode::with_error_correction_level(text, qr_ec_level(ecc_level)).map_err(|e| {
        EncodeError::Rejected {
            symbology: Symbology::QrCode,
            reason: e.to_string(),
        }
    })?;
    Ok(ModuleGrid::from_qr(&code))
}

/// Smallest Micro QR version that holds the text.
fn micro_qr_modules(text: &str, ecc_level: Option<u8>) -> Result<ModuleGrid, EncodeError> {
    let level = qr_ec_level(ecc_level);
    let mut last_error = None;
    for version in 1..=4 {
        match QrCode::with_version(text, Version::Micro(version), level) {
            Ok(code) => return Ok(ModuleGrid::from_qr(&code)),
            Err(e) => last_error = Some(e.to_string()),
        }
    }
    Err(EncodeError::Rejected {
        symbology: Symbology::MicroQrCode,
        reason: last_error.unwrap_or_else(|| "data too long".to_string()),
    })
}

fn linear_modules(text: &str, symbology: Symbology) -> Result<ModuleGrid, EncodeError> {
    let rejected = |e: barcoders::error::Error| EncodeError::Rejected {
        symbology,
        reason: e.to_string(),
    };

    let bars = match symbology {
        Symbology::Code128 => {
            let data = format!("{}{}", CODE128_CHARSET_B, text);
            Code128::new(&data).map_err(rejected)?.encode()
        }
        Symbology::Code39 => Code39::new(text).map_err(rejected)?.encode(),
        Symbology::Code93 => Code93::new(text).map_err(rejected)?.encode(),
        Symbology::Codabar => Codabar::new(text).map_err(rejected)?.encode(),
        Symbology::Ean8 => EAN8::new(text).map_err(rejected)?.encode(),
        Symbology::Ean13 => EAN13::new(text).map_err(rejected)?.encode(),
        // UPC-A is EAN-13 with a leading zero.
        Symbology::UpcA => {
            let data = format!("0{}", text);
            EAN13::new(&data).map_err(rejected)?.encode()
        }
        other => return Err(EncodeError::UnsupportedSymbology(other)),
    };

    if bars.is_empty() {
        return Err(EncodeError::Rejected {
            symbology,
            reason: "encoder produced no bars".to_string(),
        });
    }
    Ok(ModuleGrid::from_bars(&bars))
}

/// Scale the grid by the largest integer factor at which symbol plus quiet
/// zone fits, and center it. Linear bars span the full height.
fn fit_to_output(
    modules: &ModuleGrid,
    symbology: Symbology,
    geometry: Geometry,
) -> Result<SymbolMatrix, EncodeError> {
    let quiet = geometry.margin.saturating_mul(2);
    let required_width = modules.width.saturating_add(quiet);
    let required_height = if modules.is_linear() {
        quiet + 1
    } else {
        modules.height.saturating_add(quiet)
    };

    let scale = if modules.is_linear() {
        geometry.width / required_width
    } else {
        (geometry.width / required_width).min(geometry.height / required_height)
    };

    if scale == 0 || geometry.height < required_height {
        return Err(EncodeError::TooSmall {
            symbology,
            required_width,
            required_height,
            width: geometry.width,
            height: geometry.height,
        });
    }

    let symbol_width = modules.width * scale;
    let left = (geometry.width - symbol_width) / 2;
    let mut matrix = SymbolMatrix::new(geometry.width, geometry.height);

    if modules.is_linear() {
        for mx in 0..modules.width {
            if !modules.get(mx, 0) {
                continue;
            }
            for x in left + mx * scale..left + (mx + 1) * scale {
                for y in 0..geometry.height {
                    matrix.set(x, y, true);
                }
            }
        }
    } else {
        let top = (geometry.height - modules.height * scale) / 2;
        for my in 0..modules.height {
            for mx in 0..modules.width {
                if !modules.get(mx, my) {
                    continue;
                }
                for y in top + my * scale..top + (my + 1) * scale {
                    for x in left + mx * scale..left + (mx + 1) * scale {
                        matrix.set(x, y, true);
                    }
                }
            }
        }
    }

    Ok(matrix)
}
