//! High-level image operations.
//!
//! These functions combine parameter validation with backend execution.
//! They take configuration records, build parameters, and call the backend.

use super::backend::{BackendError, Compressed, Encoded, ImageBackend, ImageInfo};
use super::params::{Background, BlurRadius, CompositeParams, Quality, ResizeMode, ResizeParams};

/// Result type for image operations.
pub type Result<T> = std::result::Result<T, BackendError>;

/// Quality used when re-encoding purely to drop embedded metadata.
pub const STRIP_QUALITY: Quality = Quality(95);

/// Read width, height, format, pixel mode and byte size.
pub fn inspect(backend: &impl ImageBackend, data: &[u8]) -> Result<ImageInfo> {
    backend.inspect(data)
}

/// Letterbox defaults applied when a caller only supplies a target size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeConfig {
    pub blur_radius: BlurRadius,
    pub background: Background,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            blur_radius: BlurRadius::default(),
            background: Background::WHITE,
        }
    }
}

impl CompositeConfig {
    /// Build full parameters for a canvas of `width` x `height`.
    pub fn params(&self, width: u32, height: u32) -> CompositeParams {
        CompositeParams {
            width,
            height,
            blur_radius: self.blur_radius,
            background: self.background,
        }
    }
}

/// Blurred-letterbox composite onto an exact `width` x `height` canvas.
pub fn composite(
    backend: &impl ImageBackend,
    data: &[u8],
    width: u32,
    height: u32,
    config: &CompositeConfig,
) -> Result<Encoded> {
    backend.composite(data, &config.params(width, height))
}

/// Resize with one of the [`ResizeMode`]s.
pub fn resize(backend: &impl ImageBackend, data: &[u8], mode: ResizeMode) -> Result<Encoded> {
    backend.resize(data, &ResizeParams { mode })
}

/// Lossy re-encode at an explicit quality.
pub fn compress(backend: &impl ImageBackend, data: &[u8], quality: Quality) -> Result<Compressed> {
    backend.compress(data, quality)
}

/// Lossy re-encode at the best quality that fits `target_bytes`.
///
/// Never fails because the target is unreachable: the result then carries
/// quality 1 and [`Compressed::met_target`] reports `Some(false)`.
pub fn compress_to_target(
    backend: &impl ImageBackend,
    data: &[u8],
    target_bytes: usize,
) -> Result<Compressed> {
    let result = backend.compress_to_target(data, target_bytes)?;
    if result.met_target() == Some(false) {
        log::debug!(
            "target {target_bytes} bytes unreachable, best effort is {} bytes at {}",
            result.size_bytes,
            result.quality
        );
    }
    Ok(result)
}

/// Re-encode as a high-quality JPEG, dropping EXIF and other ancillary data.
pub fn strip_metadata(backend: &impl ImageBackend, data: &[u8]) -> Result<Compressed> {
    backend.compress(data, STRIP_QUALITY)
}
