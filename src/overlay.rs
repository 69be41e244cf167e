//! Center Image Compositing
//!
//! Draws a branding image in the middle of a QR code: an opaque panel first,
//! then the image scaled to 80% of the panel, both inside the same square.

use image::imageops::{self, FilterType};
use image::{GenericImageView, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Panel drawn behind the center image, independent of the symbol colors.
pub const PANEL_COLOR: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Share of the panel the scaled image may occupy, in percent.
pub const IMAGE_FILL_PERCENT: u32 = 80;

#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("Center image {path} could not be loaded: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Center image {0} is empty")]
    Empty(PathBuf),

    #[error("Center image {path} does not fit a {width}x{height} panel")]
    TooSmall { path: PathBuf, width: u32, height: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Where the panel and the scaled image ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub panel: Rect,
    pub image: Rect,
}

/// A square `ratio` times smaller than the image, centered on it.
pub fn center_square(width: u32, height: u32, ratio: u32) -> Rect {
    let ratio = ratio.max(1);
    let size_w = width / ratio;
    let size_h = height / ratio;
    Rect {
        x: (width - size_w) / 2,
        y: (height - size_h) / 2,
        width: size_w,
        height: size_h,
    }
}

/// Largest size with the source aspect ratio that fits inside `bounds`.
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (sw, sh) = (u64::from(source.0), u64::from(source.1));
    let (bw, bh) = (u64::from(bounds.0), u64::from(bounds.1));
    if sw == 0 || sh == 0 {
        return (0, 0);
    }

    let width_for_full_height = bh * sw / sh;
    if width_for_full_height <= bw {
        (width_for_full_height as u32, bh as u32)
    } else {
        (bw as u32, (bw * sh / sw) as u32)
    }
}

/// Composite the image at `path` into the center of `target`.
///
/// On error `target` is left untouched.
pub fn composite(target: &mut RgbaImage, path: &Path, ratio: u32) -> Result<Placement, OverlayError> {
    let (width, height) = target.dimensions();
    let panel = center_square(width, height, ratio);

    let loaded = image::open(path).map_err(|source| OverlayError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    let (source_w, source_h) = loaded.dimensions();
    if source_w == 0 || source_h == 0 {
        return Err(OverlayError::Empty(path.to_path_buf()));
    }

    let bounds = (
        panel.width * IMAGE_FILL_PERCENT / 100,
        panel.height * IMAGE_FILL_PERCENT / 100,
    );
    let (scaled_w, scaled_h) = fit_within((source_w, source_h), bounds);
    if scaled_w == 0 || scaled_h == 0 {
        return Err(OverlayError::TooSmall {
            path: path.to_path_buf(),
            width: panel.width,
            height: panel.height,
        });
    }

    fill_rect(target, panel, PANEL_COLOR);

    let scaled = imageops::resize(&loaded.to_rgba8(), scaled_w, scaled_h, FilterType::Triangle);
    let image = Rect {
        x: panel.x + (panel.width - scaled_w) / 2,
        y: panel.y + (panel.height - scaled_h) / 2,
        width: scaled_w,
        height: scaled_h,
    };
    imageops::overlay(target, &scaled, i64::from(image.x), i64::from(image.y));

    log::debug!(
        "Drew {}x{} center image at ({}, {}) on a {}x{} panel",
        image.width,
        image.height,
        image.x,
        image.y,
        panel.width,
        panel.height
    );

    Ok(Placement { panel, image })
}

fn fill_rect(target: &mut RgbaImage, rect: Rect, color: Rgba<u8>) {
    for y in rect.y..rect.y + rect.height {
        for x in rect.x..rect.x + rect.width {
            target.put_pixel(x, y, color);
        }
    }
}
