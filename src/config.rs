//! Generator Settings and Requests
//!
//! Settings are plain values with defaults; a request is settings plus the
//! text to encode, taken by value for a single pipeline run.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::encoder::Geometry;
use crate::raster::Color;
use crate::symbology::Symbology;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneratorSettings {
    pub format: Symbology,
    /// Output width in pixels.
    pub image_width: u32,
    /// Output height in pixels.
    pub image_height: u32,
    /// Quiet zone around the symbol, in modules.
    pub image_margin: u32,
    /// 0-8, `None` lets the encoder pick.
    pub ecc_level: Option<u8>,
    pub foreground_color: Color,
    pub background_color: Color,
    pub center_image: Option<PathBuf>,
    /// How many times smaller than the symbol the center panel is.
    pub center_image_ratio: u32,
    pub file_path: PathBuf,
    pub file_name: String,
    pub file_extension: String,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            format: Symbology::Code128,
            image_width: 500,
            image_height: 500,
            image_margin: 10,
            ecc_level: None,
            foreground_color: Color::BLACK,
            background_color: Color::WHITE,
            center_image: None,
            center_image_ratio: 5,
            file_path: std::env::temp_dir(),
            file_name: "scode".to_string(),
            file_extension: "png".to_string(),
        }
    }
}

impl GeneratorSettings {
    /// Load settings from a JSON file. Missing keys keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request(&self, text: impl Into<String>) -> GenerationRequest {
        GenerationRequest {
            text: text.into(),
            settings: self.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub text: String,
    #[serde(flatten)]
    pub settings: GeneratorSettings,
}

impl GenerationRequest {
    pub fn geometry(&self) -> Geometry {
        Geometry {
            width: self.settings.image_width,
            height: self.settings.image_height,
            margin: self.settings.image_margin,
        }
    }

    /// The center image path, if one is set and non-empty.
    pub fn center_image(&self) -> Option<&Path> {
        self.settings
            .center_image
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    /// True when the compositor will run: a QR code with a center image.
    pub fn has_overlay(&self) -> bool {
        self.settings.format.supports_center_image() && self.center_image().is_some()
    }

    /// Copy with every path converted lossily to UTF-8, so it always
    /// serializes. Non-UTF-8 bytes become U+FFFD.
    pub fn with_lossy_paths(&self) -> GenerationRequest {
        let lossy = |p: &Path| PathBuf::from(p.to_string_lossy().into_owned());
        let mut copy = self.clone();
        copy.settings.file_path = lossy(&self.settings.file_path);
        copy.settings.center_image = self.settings.center_image.as_deref().map(lossy);
        copy
    }
}
