//! Shared test utilities for the scale-hub test suite.
//!
//! Fixtures are encoded in memory with the `image` crate, so no binary files
//! live in the repository. Gradients keep encoders honest: flat colours
//! compress to almost nothing and would make size-targeted tests meaningless.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let jpeg = gradient_jpeg(800, 600);
//! let out = RustBackend::new().resize(&jpeg, &params).unwrap();
//! assert_eq!(decoded_dimensions(&out.data), (400, 300));
//! ```

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

// =========================================================================
// Fixture encoders
// =========================================================================

/// RGB gradient with some high-frequency texture.
pub fn gradient_rgb(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            ((x ^ y) % 256) as u8,
        ])
    })
}

pub fn encode(img: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, format).unwrap();
    buf.into_inner()
}

/// A baseline JPEG at quality 90.
pub fn gradient_jpeg(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, 90);
    gradient_rgb(width, height)
        .write_with_encoder(encoder)
        .unwrap();
    buf
}

pub fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(gradient_rgb(width, height)),
        ImageFormat::Png,
    )
}

pub fn gradient_gif(width: u32, height: u32) -> Vec<u8> {
    let rgba = DynamicImage::ImageRgb8(gradient_rgb(width, height)).to_rgba8();
    encode(&DynamicImage::ImageRgba8(rgba), ImageFormat::Gif)
}

/// Lossless WebP.
pub fn gradient_webp(width: u32, height: u32) -> Vec<u8> {
    encode(
        &DynamicImage::ImageRgb8(gradient_rgb(width, height)),
        ImageFormat::WebP,
    )
}

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in bytes {
        crc ^= byte as u32;
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xEDB8_8320
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

fn png_chunk(out: &mut Vec<u8>, kind: &[u8; 4], body: &[u8]) {
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    let start = out.len();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    let crc = crc32(&out[start..]);
    out.extend_from_slice(&crc.to_be_bytes());
}

/// A PNG with a well-formed RGBA header of any size and a garbage body.
///
/// Lets tests claim huge dimensions without allocating the pixels.
pub fn png_header_only(width: u32, height: u32) -> Vec<u8> {
    let mut out = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut ihdr = Vec::with_capacity(13);
    ihdr.extend_from_slice(&width.to_be_bytes());
    ihdr.extend_from_slice(&height.to_be_bytes());
    // 8-bit RGBA, deflate, adaptive filtering, no interlace
    ihdr.extend_from_slice(&[8, 6, 0, 0, 0]);
    png_chunk(&mut out, b"IHDR", &ihdr);
    png_chunk(&mut out, b"IDAT", &[0x78, 0x9C, 0xFF, 0xFF, 0xFF, 0xFF]);
    png_chunk(&mut out, b"IEND", &[]);
    out
}

/// Fully transparent except for an opaque red square in the top-left quarter.
pub fn transparent_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        if x < width / 2 && y < height / 2 {
            Rgba([255, 0, 0, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    });
    encode(&DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

// =========================================================================
// Assertions
// =========================================================================

pub fn load(data: &[u8]) -> DynamicImage {
    image::load_from_memory(data).unwrap()
}

pub fn decoded_dimensions(data: &[u8]) -> (u32, u32) {
    let img = load(data);
    (img.width(), img.height())
}

pub fn guessed_format(data: &[u8]) -> ImageFormat {
    image::guess_format(data).unwrap()
}
