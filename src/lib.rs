//! # Scale Hub
//!
//! An image transformation engine for social and web publishing: validate an
//! upload, fit it onto an exact canvas over a blurred copy of itself, resize
//! it, compress it to a byte budget, or render a whole pack of named sizes in
//! one call.
//!
//! # Architecture: Bytes In, Bytes Out
//!
//! Every entry point takes an encoded buffer plus plain parameters and returns
//! a new encoded buffer (or a typed error):
//!
//! ```text
//! upload bytes ──validate──▶ Validated
//!              ──composite─▶ PNG   (exact canvas, blurred letterbox)
//!              ──resize────▶ PNG   (five resize modes)
//!              ──compress──▶ JPEG  (fixed quality, or best quality under a budget)
//!              ──run_pack──▶ [ProcessingResult]  (one per output spec, in order)
//! ```
//!
//! The library never touches the filesystem or the network. Reading uploads
//! and persisting results is the caller's job; the `scale-hub` binary is one
//! such caller.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validation`] | Upload checks: size, extension, magic bytes, decodability, dimensions, embedded script |
//! | [`imaging`] | Pure-Rust image operations: inspect, composite, resize, compress, quality search |
//! | [`pack`] | JSON pack schema and the runner that renders every output of a pack |
//! | [`naming`] | Output filename conventions, filename sanitizing, human-readable sizes |
//! | [`config`] | `config.toml` loading, validation, merging, size presets |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Lossless Until Asked
//!
//! Composite and resize always encode PNG. Lossy size reduction happens only in
//! the compressor, so chaining a resize into a compress never pays for two
//! generations of JPEG artifacts.
//!
//! ## Soft-Degrade Compression
//!
//! [`imaging::compress_to_target`] binary-searches quality 1–100 (at most seven
//! encodes). When even quality 1 is over budget it returns that encode rather
//! than failing; [`imaging::Compressed::met_target`] tells the two outcomes apart.
//!
//! ## Magic Bytes Must Match the Extension
//!
//! A `.jpg` that starts with a PNG signature is rejected. Extensions with no
//! signature check (`bmp`) cannot pass validation even when allow-listed.
//!
//! ## Backend Trait
//!
//! All pixel work goes through [`imaging::ImageBackend`]. The production
//! [`imaging::RustBackend`] uses the `image` crate with Lanczos3 resampling;
//! unit tests swap in a recording mock so the pack runner and operations can be
//! checked without encoding images.
//!
//! ## No Shared State
//!
//! Backends hold only configuration. Every call is synchronous and pure over
//! its inputs, so one backend can serve any number of threads; the CLI uses
//! rayon to pack several inputs at once.

pub mod config;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pack;
pub mod validation;

#[cfg(test)]
pub(crate) mod test_helpers;
