//! Symbology Selection - Concrete Formats vs. Filters
//!
//! Generation only ever accepts a concrete `Symbology`.
//! Group selectors live in `SymbologyFilter` and must be resolved first.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("You need to set a specific format")]
    Unset,

    #[error("Multiple formats can't be used to generate a barcode: {0}")]
    Group(String),
}

/// A single, concrete symbology that can be generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Symbology {
    Aztec,
    Codabar,
    Code39,
    Code93,
    Code128,
    DataBar,
    DataBarExpanded,
    DataMatrix,
    Ean8,
    Ean13,
    Itf,
    MaxiCode,
    Pdf417,
    QrCode,
    MicroQrCode,
    UpcA,
    UpcE,
}

impl Symbology {
    pub const ALL: [Symbology; 17] = [
        Self::Aztec,
        Self::Codabar,
        Self::Code39,
        Self::Code93,
        Self::Code128,
        Self::DataBar,
        Self::DataBarExpanded,
        Self::DataMatrix,
        Self::Ean8,
        Self::Ean13,
        Self::Itf,
        Self::MaxiCode,
        Self::Pdf417,
        Self::QrCode,
        Self::MicroQrCode,
        Self::UpcA,
        Self::UpcE,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Aztec => "Aztec",
            Self::Codabar => "Codabar",
            Self::Code39 => "Code39",
            Self::Code93 => "Code93",
            Self::Code128 => "Code128",
            Self::DataBar => "DataBar",
            Self::DataBarExpanded => "DataBarExpanded",
            Self::DataMatrix => "DataMatrix",
            Self::Ean8 => "EAN-8",
            Self::Ean13 => "EAN-13",
            Self::Itf => "ITF",
            Self::MaxiCode => "MaxiCode",
            Self::Pdf417 => "PDF417",
            Self::QrCode => "QRCode",
            Self::MicroQrCode => "MicroQRCode",
            Self::UpcA => "UPC-A",
            Self::UpcE => "UPC-E",
        }
    }

    pub fn is_one_d(self) -> bool {
        matches!(
            self,
            Self::Codabar
                | Self::Code39
                | Self::Code93
                | Self::Code128
                | Self::DataBar
                | Self::DataBarExpanded
                | Self::Ean8
                | Self::Ean13
                | Self::Itf
                | Self::UpcA
                | Self::UpcE
        )
    }

    pub fn is_two_d(self) -> bool {
        !self.is_one_d()
    }

    /// Center images are only drawn on full-size QR codes.
    pub fn supports_center_image(self) -> bool {
        self == Self::QrCode
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl TryFrom<String> for Symbology {
    type Error = FormatError;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        resolve(parse(&name))
    }
}

impl From<Symbology> for String {
    fn from(symbology: Symbology) -> Self {
        symbology.name().to_string()
    }
}

/// Format selector for scanning and filtering contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbologyFilter {
    None,
    Any,
    OneDCodes,
    TwoDCodes,
    Only(Symbology),
}

impl SymbologyFilter {
    pub fn matches(self, symbology: Symbology) -> bool {
        match self {
            Self::None => false,
            Self::Any => true,
            Self::OneDCodes => symbology.is_one_d(),
            Self::TwoDCodes => symbology.is_two_d(),
            Self::Only(s) => s == symbology,
        }
    }
}

impl From<Symbology> for SymbologyFilter {
    fn from(symbology: Symbology) -> Self {
        Self::Only(symbology)
    }
}

impl fmt::Display for SymbologyFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Any => f.write_str("Any"),
            Self::OneDCodes => f.write_str("OneDCodes"),
            Self::TwoDCodes => f.write_str("TwoDCodes"),
            Self::Only(s) => s.fmt(f),
        }
    }
}

/// Case-insensitive name lookup. Separators (`-`, `_`, spaces) are ignored.
///
/// Unknown names map to `SymbologyFilter::None` so the caller sees the
/// rejection from [`resolve`] instead of a parse error.
pub fn parse(name: &str) -> SymbologyFilter {
    let key: String = name
        .chars()
        .filter(|c| !matches!(c, '-' | '_') && !c.is_whitespace())
        .flat_map(char::to_lowercase)
        .collect();

    match key.as_str() {
        "any" => SymbologyFilter::Any,
        "onedcodes" | "1dcodes" => SymbologyFilter::OneDCodes,
        "twodcodes" | "2dcodes" => SymbologyFilter::TwoDCodes,
        "qr" | "qrcode" => SymbologyFilter::Only(Symbology::QrCode),
        "microqr" | "microqrcode" => SymbologyFilter::Only(Symbology::MicroQrCode),
        "ean8" => SymbologyFilter::Only(Symbology::Ean8),
        "ean13" => SymbologyFilter::Only(Symbology::Ean13),
        "upca" => SymbologyFilter::Only(Symbology::UpcA),
        "upce" => SymbologyFilter::Only(Symbology::UpcE),
        other => Symbology::ALL
            .iter()
            .copied()
            .find(|s| s.name().to_lowercase() == other)
            .map_or(SymbologyFilter::None, SymbologyFilter::Only),
    }
}

/// Narrow a filter to the one symbology generation needs.
pub fn resolve(requested: SymbologyFilter) -> Result<Symbology, FormatError> {
    match requested {
        SymbologyFilter::Only(symbology) => Ok(symbology),
        SymbologyFilter::None => {
            log::warn!("You need to set a specific format");
            Err(FormatError::Unset)
        }
        group => {
            log::warn!("Multiple formats can't be used to generate a barcode ({})", group);
            Err(FormatError::Group(group.to_string()))
        }
    }
}
