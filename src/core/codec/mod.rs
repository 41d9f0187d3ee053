//! # Codec Module
//!
//! Converts encoded image bytes into a canonical RGBA pixel grid and back
//! out to TIFF. The comparator only ever sees `CanonicalImage`s.

use crate::error::CodecError;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::path::Path;

/// A decoded image: RGBA pixels plus the format it was stored in
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalImage {
    pub pixels: RgbaImage,
    /// Storage format of the source bytes, when it could be determined
    pub format: Option<ImageFormat>,
}

impl CanonicalImage {
    pub fn new(pixels: RgbaImage, format: Option<ImageFormat>) -> Self {
        Self { pixels, format }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn is_square(&self) -> bool {
        self.width() == self.height()
    }
}

/// Image decode/encode collaborator
pub trait ImageCodec: Send + Sync {
    /// Decode arbitrary image bytes
    fn decode(&self, bytes: &[u8]) -> Result<CanonicalImage, CodecError>;

    /// Encode pixels as a TIFF byte stream
    fn encode_tiff(&self, image: &CanonicalImage) -> Result<Vec<u8>, CodecError>;
}

/// Codec backed by the `image` crate
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCodec;

impl ImageCodec for StandardCodec {
    fn decode(&self, bytes: &[u8]) -> Result<CanonicalImage, CodecError> {
        let format = image::guess_format(bytes).ok();
        let decoded = match format {
            Some(format) => image::load_from_memory_with_format(bytes, format),
            None => image::load_from_memory(bytes),
        }
        .map_err(|e| CodecError::Decode(e.to_string()))?;

        Ok(CanonicalImage::new(decoded.to_rgba8(), format))
    }

    fn encode_tiff(&self, image: &CanonicalImage) -> Result<Vec<u8>, CodecError> {
        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image.pixels.clone())
            .write_to(&mut buffer, ImageFormat::Tiff)
            .map_err(|e| CodecError::Encode(e.to_string()))?;
        Ok(buffer.into_inner())
    }
}

/// Whether the extension of `path` names a format the codec can read
pub fn is_image_path(path: &Path) -> bool {
    ImageFormat::from_path(path)
        .map(|format| format.reading_enabled())
        .unwrap_or(false)
}
