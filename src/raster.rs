//! Rasterization - Matrix to Pixels
//!
//! The matrix already has output resolution, so this is a per-pixel color
//! lookup. No scaling, no anti-aliasing.

use image::{ImageBuffer, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::encoder::SymbolMatrix;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid color '{0}': expected a name, #rgb, #rrggbb or #aarrggbb")]
pub struct ColorParseError(pub String);

/// RGBA color, written as `#rrggbb`, `#aarrggbb` (alpha first) or a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub Rgba<u8>);

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self(Rgba([r, g, b, 255]))
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(Rgba([r, g, b, a]))
    }

    pub fn to_rgba(self) -> Rgba<u8> {
        self.0
    }
}

impl FromStr for Color {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let invalid = || ColorParseError(s.to_string());

        let Some(hex) = trimmed.strip_prefix('#') else {
            return match trimmed.to_lowercase().as_str() {
                "black" => Ok(Self::BLACK),
                "white" => Ok(Self::WHITE),
                "red" => Ok(Self::rgb(255, 0, 0)),
                "green" => Ok(Self::rgb(0, 128, 0)),
                "blue" => Ok(Self::rgb(0, 0, 255)),
                "gray" | "grey" => Ok(Self::rgb(128, 128, 128)),
                "transparent" => Ok(Self::rgba(0, 0, 0, 0)),
                _ => Err(invalid()),
            };
        };

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());

        match hex.len() {
            3 => {
                let nibble = |i: usize| {
                    u8::from_str_radix(&hex[i..i + 1], 16)
                        .map(|v| v * 17)
                        .map_err(|_| invalid())
                };
                Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
            }
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            8 => Ok(Self::rgba(byte(2)?, byte(4)?, byte(6)?, byte(0)?)),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0 .0;
        if a == 255 {
            write!(f, "#{:02x}{:02x}{:02x}", r, g, b)
        } else {
            write!(f, "#{:02x}{:02x}{:02x}{:02x}", a, r, g, b)
        }
    }
}

impl TryFrom<String> for Color {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Paint `matrix` into a `width` x `height` image: dark cells get
/// `foreground`, everything else `background`.
pub fn rasterize(
    matrix: &SymbolMatrix,
    width: u32,
    height: u32,
    foreground: Color,
    background: Color,
) -> RgbaImage {
    ImageBuffer::from_fn(width, height, |x, y| {
        if matrix.get(x, y) {
            foreground.to_rgba()
        } else {
            background.to_rgba()
        }
    })
}
