use crate::ai::mime::detect_image_mime;
use crate::models::ImageData;
use crate::{Error, Result};
use image::ImageFormat;
use std::path::Path;

/// Turns a user-selected image file into an inline payload.
///
/// The bytes are sniffed and fully decoded before being accepted, so a
/// truncated or mislabelled file is rejected here instead of by the service.
pub struct ImageInput;

impl ImageInput {
    pub fn load_path(path: &Path) -> Result<ImageData> {
        let bytes = std::fs::read(path)?;
        tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
        Self::load_bytes(&bytes)
    }

    pub fn load_bytes(bytes: &[u8]) -> Result<ImageData> {
        if bytes.is_empty() {
            return Err(Error::UnsupportedImage("file is empty".to_string()));
        }

        let mime = detect_image_mime(bytes).ok_or_else(|| {
            Error::UnsupportedImage("expected a PNG, JPEG, WEBP or GIF image".to_string())
        })?;

        let format = ImageFormat::from_mime_type(mime)
            .ok_or_else(|| Error::Invariant(format!("No decoder for {}", mime)))?;
        let decoded = image::load_from_memory_with_format(bytes, format)?;
        tracing::info!(
            "Accepted {} image ({}x{})",
            mime,
            decoded.width(),
            decoded.height()
        );

        Ok(ImageData::from_bytes(mime, bytes))
    }
}
