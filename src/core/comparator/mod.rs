//! # Comparator Module
//!
//! Decides whether two entries hold the same content.
//!
//! ## Methods
//! - **Byte-exact** - streamed in 1 KiB chunks, any file type
//! - **Rotated pixels** - decoded images compared at quarter-turn rotations,
//!   so a photo saved sideways still counts as the same photo
//!
//! ## Example
//! ```rust,ignore
//! use tree_duplicator::core::comparator::ContentComparator;
//!
//! let comparator = ContentComparator::default();
//! let result = comparator.compare(&fs, source, existing)?;
//! if result.identical { /* skip the copy */ }
//! ```

mod bytes;
mod pixels;

pub use bytes::{bytes_equal, files_equal, CHUNK_SIZE};
pub use pixels::{images_equal, matching_rotation, Rotation};

use crate::core::codec::{is_image_path, CanonicalImage, ImageCodec, StandardCodec};
use crate::core::fs::FileSystem;
use crate::error::CompareError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// How an identity decision was reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMethod {
    /// Byte-for-byte equality
    ByteExact,
    /// Decoded pixel equality under rotation
    RotatedPixels,
    /// One side is an image and the other is not
    TypeMismatch,
}

/// Outcome of comparing two entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub identical: bool,
    pub method: ComparisonMethod,
}

impl ComparisonResult {
    pub fn new(identical: bool, method: ComparisonMethod) -> Self {
        Self { identical, method }
    }
}

/// Picks a comparison method for a pair of files and runs it
#[derive(Clone)]
pub struct ContentComparator {
    codec: Arc<dyn ImageCodec>,
    compare_images: bool,
    compare_format: bool,
}

impl ContentComparator {
    pub fn new(codec: Arc<dyn ImageCodec>) -> Self {
        Self {
            codec,
            compare_images: true,
            compare_format: false,
        }
    }

    /// Compare images by decoded pixels instead of bytes
    pub fn with_image_comparison(mut self, enabled: bool) -> Self {
        self.compare_images = enabled;
        self
    }

    /// Treat images stored in different formats as different
    pub fn with_format_check(mut self, enabled: bool) -> Self {
        self.compare_format = enabled;
        self
    }

    /// Compare `source` against the `existing` entry it would replace.
    pub fn compare(
        &self,
        fs: &dyn FileSystem,
        source: &Path,
        existing: &Path,
    ) -> Result<ComparisonResult, CompareError> {
        if self.compare_images {
            match (is_image_path(source), is_image_path(existing)) {
                (true, true) => {
                    if let Some(identical) = self.compare_decoded(fs, source, existing)? {
                        return Ok(ComparisonResult::new(
                            identical,
                            ComparisonMethod::RotatedPixels,
                        ));
                    }
                }
                (true, false) | (false, true) => {
                    return Ok(ComparisonResult::new(false, ComparisonMethod::TypeMismatch));
                }
                (false, false) => {}
            }
        }

        let identical = files_equal(fs, source, existing)?;
        Ok(ComparisonResult::new(identical, ComparisonMethod::ByteExact))
    }

    /// `None` when either side fails to decode, so the caller falls back to
    /// comparing bytes.
    fn compare_decoded(
        &self,
        fs: &dyn FileSystem,
        source: &Path,
        existing: &Path,
    ) -> Result<Option<bool>, CompareError> {
        let (Some(a), Some(b)) = (self.load(fs, source)?, self.load(fs, existing)?) else {
            return Ok(None);
        };
        Ok(Some(images_equal(&a, &b, self.compare_format)))
    }

    fn load(&self, fs: &dyn FileSystem, path: &Path) -> Result<Option<CanonicalImage>, CompareError> {
        let bytes = match fs.read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(CompareError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        match self.codec.decode(&bytes) {
            Ok(image) => Ok(Some(image)),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "image decode failed, comparing bytes");
                Ok(None)
            }
        }
    }
}

impl Default for ContentComparator {
    fn default() -> Self {
        Self::new(Arc::new(StandardCodec))
    }
}

impl std::fmt::Debug for ContentComparator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentComparator")
            .field("compare_images", &self.compare_images)
            .field("compare_format", &self.compare_format)
            .finish()
    }
}
