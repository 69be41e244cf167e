//! Output - Writing and Exporting Generated Images

use image::{DynamicImage, ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};
use tempfile::Builder;
use thiserror::Error;

use crate::hashing::sha256_hex;

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Unsupported image extension: {0}")]
    UnsupportedExtension(String),

    #[error("Failed to encode image: {0}")]
    Encode(#[from] image::ImageError),

    #[error("Could not write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The last successfully written image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputArtifact {
    pub path: PathBuf,
    pub bytes: u64,
    pub sha256: String,
}

/// `directory/base_name`, plus `.extension` when the extension is non-empty.
pub fn output_path(directory: &Path, base_name: &str, extension: &str) -> PathBuf {
    if extension.is_empty() {
        directory.join(base_name)
    } else {
        directory.join(format!("{}.{}", base_name, extension))
    }
}

/// Image format for an extension. No extension means PNG.
pub fn image_format(extension: &str) -> Result<ImageFormat, WriteError> {
    if extension.is_empty() {
        return Ok(ImageFormat::Png);
    }
    ImageFormat::from_extension(extension)
        .ok_or_else(|| WriteError::UnsupportedExtension(extension.to_string()))
}

/// Encode `image` and write it, replacing any existing file.
///
/// Encoding happens in memory first. The bytes are then staged in a
/// temporary file next to the target and renamed over it, so a failed run
/// never leaves a truncated image behind.
pub fn write_image(
    image: RgbaImage,
    directory: &Path,
    base_name: &str,
    extension: &str,
) -> Result<OutputArtifact, WriteError> {
    let format = image_format(extension)?;
    let path = output_path(directory, base_name, extension);

    let encoded = encode(image, format)?;

    let io_error = |source: std::io::Error| WriteError::Io { path: path.clone(), source };
    let mut staged = Builder::new()
        .prefix(".scode-")
        .tempfile_in(directory)
        .map_err(|source| {
            log::warn!("Could not stage {} for writing", path.display());
            io_error(source)
        })?;
    staged.write_all(&encoded).map_err(io_error)?;
    staged.persist(&path).map_err(|e| io_error(e.error))?;

    log::info!("Wrote {} ({} bytes)", path.display(), encoded.len());

    Ok(OutputArtifact {
        path,
        bytes: encoded.len() as u64,
        sha256: sha256_hex(&encoded),
    })
}

fn encode(image: RgbaImage, format: ImageFormat) -> Result<Vec<u8>, WriteError> {
    let image = DynamicImage::ImageRgba8(image);
    // JPEG has no alpha channel.
    let image = match format {
        ImageFormat::Jpeg => DynamicImage::ImageRgb8(image.to_rgb8()),
        _ => image,
    };

    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format)?;
    Ok(buffer.into_inner())
}

/// Copy the last written file into `documents_dir`, keeping its name.
///
/// Returns `false` when nothing has been written yet or the copy fails.
pub fn export_artifact(last: Option<&OutputArtifact>, documents_dir: &Path) -> bool {
    let Some(artifact) = last else {
        log::warn!("Nothing to export, generate an image first");
        return false;
    };
    let Some(file_name) = artifact.path.file_name() else {
        log::warn!("Output path {} has no file name", artifact.path.display());
        return false;
    };

    let destination = documents_dir.join(file_name);
    match fs::copy(&artifact.path, &destination) {
        Ok(_) => {
            log::info!("Exported {} to {}", artifact.path.display(), destination.display());
            true
        }
        Err(e) => {
            log::warn!("Could not export to {}: {}", destination.display(), e);
            false
        }
    }
}
