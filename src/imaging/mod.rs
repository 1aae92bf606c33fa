//! Image processing — pure Rust, entirely in memory.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Inspect** | `image::ImageReader::into_decoder` |
//! | **Composite** | Lanczos3 contain + cover layers, Gaussian blur, `overlay` |
//! | **Resize** | `resize_exact` with Lanczos3 → PNG |
//! | **Compress** | alpha flattening + `JpegEncoder`, quality binary search |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for dimension math and the quality search (unit testable)
//! - **Parameters**: Data structures describing image operations
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Operations**: High-level functions combining parameters + backend

pub mod backend;
mod calculations;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Compressed, Encoded, ImageBackend, ImageInfo};
pub use calculations::{
    calculate_fill_dimensions, calculate_fit_dimensions, calculate_resize_dimensions,
    search_quality,
};
pub use operations::{
    CompositeConfig, composite, compress, compress_to_target, inspect, resize, strip_metadata,
};
pub use params::{
    Background, BlurRadius, CompositeParams, DEFAULT_MAX_OUTPUT_SIDE, Quality, ResizeMode,
    ResizeParams, check_output_size,
};
pub use rust_backend::RustBackend;
