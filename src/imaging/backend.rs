//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support: inspect, composite, resize, compress and compress_to_target.
//! Every operation takes an encoded buffer and returns a new one; backends
//! hold no state between calls.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend), built on the `image`
//! crate. Tests use a recording mock so orchestration logic can be checked
//! without encoding pixels.

use super::params::{CompositeParams, Quality, ResizeParams};
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("Corrupt image: {0}")]
    CorruptImage(String),
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Encoding failed: {0}")]
    EncodeFailed(String),
}

/// Header-level facts about an encoded image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageInfo {
    pub width: u32,
    pub height: u32,
    /// Container format, e.g. `"PNG"`.
    pub format: String,
    /// Pixel mode, e.g. `"RGB"`, `"RGBA"`, `"L"`.
    pub mode: String,
    pub size_bytes: usize,
}

/// An encoded image together with its pixel size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Result of a lossy re-encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compressed {
    pub data: Vec<u8>,
    pub size_bytes: usize,
    pub quality: Quality,
    /// Byte budget the search aimed for, if any.
    pub target_bytes: Option<usize>,
}

impl Compressed {
    /// `Some(true)` when a size target was requested and met, `Some(false)`
    /// when the search had to fall back to quality 1, `None` for direct encodes.
    pub fn met_target(&self) -> Option<bool> {
        self.target_bytes.map(|target| self.size_bytes <= target)
    }
}

/// Trait for image processing backends.
///
/// Implementations must be pure over their inputs so that one backend can be
/// shared across threads.
pub trait ImageBackend: Sync {
    /// Read dimensions, format and pixel mode without decoding pixel data.
    fn inspect(&self, data: &[u8]) -> Result<ImageInfo, BackendError>;

    /// Scale the image over a blurred cover-scaled copy of itself, onto a
    /// canvas of exactly `params.width` x `params.height`. Lossless output.
    fn composite(&self, data: &[u8], params: &CompositeParams) -> Result<Encoded, BackendError>;

    /// Resize according to `params.mode`. Lossless output.
    fn resize(&self, data: &[u8], params: &ResizeParams) -> Result<Encoded, BackendError>;

    /// Re-encode lossily at `quality`, flattening any transparency first.
    fn compress(&self, data: &[u8], quality: Quality) -> Result<Compressed, BackendError>;

    /// Find the best quality whose output fits `target_bytes`.
    fn compress_to_target(
        &self,
        data: &[u8],
        target_bytes: usize,
    ) -> Result<Compressed, BackendError>;
}
