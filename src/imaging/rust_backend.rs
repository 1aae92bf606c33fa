//! Pure Rust image processing backend, built on the `image` crate.
//!
//! Everything is statically linked into the binary and runs in memory.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP, BMP) | `image::ImageReader` with guessed format |
//! | Inspect | `ImageReader::into_decoder` (header only, no pixel decode) |
//! | Resize | `DynamicImage::resize_exact` with `Lanczos3` filter |
//! | Letterbox background blur | `image::imageops::blur` (Gaussian) |
//! | Layer compositing | `image::imageops::overlay` |
//! | Lossless output | PNG via `DynamicImage::write_to` |
//! | Lossy output | `image::codecs::jpeg::JpegEncoder` |

use super::backend::{BackendError, Compressed, Encoded, ImageBackend, ImageInfo};
use super::calculations::{
    calculate_cover_layer, calculate_fit_dimensions, calculate_resize_dimensions, center_offset,
    search_quality,
};
use super::params::{
    Background, CompositeParams, DEFAULT_MAX_OUTPUT_SIDE, Quality, ResizeParams,
    check_output_size,
};
use image::codecs::jpeg::JpegEncoder;
use image::imageops::{self, FilterType};
use image::{
    ColorType, DynamicImage, ImageDecoder, ImageFormat, ImageReader, Rgb, RgbImage, Rgba,
    RgbaImage,
};
use std::io::Cursor;

/// Pure Rust backend using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Clone, Copy)]
pub struct RustBackend {
    /// Colour transparent pixels are composited onto before lossy encoding.
    pub flatten_onto: Background,
    /// Largest width or height a composite or resize may produce.
    pub max_output_side: u32,
}

impl Default for RustBackend {
    fn default() -> Self {
        Self {
            flatten_onto: Background::default(),
            max_output_side: DEFAULT_MAX_OUTPUT_SIDE,
        }
    }
}

impl RustBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_background(flatten_onto: Background) -> Self {
        Self {
            flatten_onto,
            ..Self::default()
        }
    }

    pub fn with_max_output_side(self, max_output_side: u32) -> Self {
        Self {
            max_output_side,
            ..self
        }
    }
}

/// Upper-case container name, e.g. `"JPEG"`.
pub fn format_name(format: ImageFormat) -> String {
    match format {
        ImageFormat::Jpeg => "JPEG".to_string(),
        ImageFormat::Png => "PNG".to_string(),
        ImageFormat::Gif => "GIF".to_string(),
        ImageFormat::WebP => "WEBP".to_string(),
        ImageFormat::Bmp => "BMP".to_string(),
        other => format!("{other:?}").to_uppercase(),
    }
}

/// Pixel mode name in the conventional short form (`L`, `LA`, `RGB`, `RGBA`).
pub fn mode_name(color: ColorType) -> &'static str {
    match color {
        ColorType::L8 | ColorType::L16 => "L",
        ColorType::La8 | ColorType::La16 => "LA",
        ColorType::Rgb8 | ColorType::Rgb16 | ColorType::Rgb32F => "RGB",
        ColorType::Rgba8 | ColorType::Rgba16 | ColorType::Rgba32F => "RGBA",
        _ => "UNKNOWN",
    }
}

fn reader(data: &[u8]) -> Result<ImageReader<Cursor<&[u8]>>, BackendError> {
    if data.is_empty() {
        return Err(BackendError::CorruptImage("empty buffer".into()));
    }
    ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| BackendError::CorruptImage(format!("Failed to sniff format: {e}")))
}

/// Fully decode an encoded buffer. Zero-sized images are rejected.
pub(crate) fn decode(data: &[u8]) -> Result<DynamicImage, BackendError> {
    let img = reader(data)?
        .decode()
        .map_err(|e| BackendError::CorruptImage(format!("Failed to decode: {e}")))?;
    if img.width() == 0 || img.height() == 0 {
        return Err(BackendError::CorruptImage(format!(
            "image has zero size ({}x{})",
            img.width(),
            img.height()
        )));
    }
    Ok(img)
}

/// Encode losslessly as PNG.
fn encode_png(img: &DynamicImage) -> Result<Vec<u8>, BackendError> {
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, ImageFormat::Png)
        .map_err(|e| BackendError::EncodeFailed(format!("PNG encode failed: {e}")))?;
    Ok(buf.into_inner())
}

fn encode_jpeg(img: &RgbImage, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let mut buf = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality.value());
    img.write_with_encoder(encoder)
        .map_err(|e| BackendError::EncodeFailed(format!("JPEG encode failed: {e}")))?;
    Ok(buf)
}

/// Composite any transparency onto an opaque background.
fn flatten(img: &DynamicImage, background: Background) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    let [br, bg, bb] = background.0;
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let Rgba([r, g, b, a]) = *rgba.get_pixel(x, y);
        let blend = |c: u8, under: u8| {
            ((c as u32 * a as u32 + under as u32 * (255 - a as u32) + 127) / 255) as u8
        };
        Rgb([blend(r, br), blend(g, bg), blend(b, bb)])
    })
}

impl RustBackend {
    fn decode_flattened(&self, data: &[u8]) -> Result<RgbImage, BackendError> {
        Ok(flatten(&decode(data)?, self.flatten_onto))
    }
}

impl ImageBackend for RustBackend {
    fn inspect(&self, data: &[u8]) -> Result<ImageInfo, BackendError> {
        let reader = reader(data)?;
        let format = reader
            .format()
            .ok_or_else(|| BackendError::CorruptImage("unrecognized image format".into()))?;
        let decoder = reader
            .into_decoder()
            .map_err(|e| BackendError::CorruptImage(format!("Failed to read header: {e}")))?;
        let (width, height) = decoder.dimensions();
        if width == 0 || height == 0 {
            return Err(BackendError::CorruptImage(format!(
                "image has zero size ({width}x{height})"
            )));
        }
        Ok(ImageInfo {
            width,
            height,
            format: format_name(format),
            mode: mode_name(decoder.color_type()).to_string(),
            size_bytes: data.len(),
        })
    }

    fn composite(&self, data: &[u8], params: &CompositeParams) -> Result<Encoded, BackendError> {
        params.check(self.max_output_side)?;
        let img = decode(data)?;
        let source = (img.width(), img.height());
        let canvas_size = (params.width, params.height);

        // Sharp layer: contain-scaled, never cropped
        let (fit_w, fit_h) = calculate_fit_dimensions(source, canvas_size);
        let sharp = img.resize_exact(fit_w, fit_h, FilterType::Lanczos3).to_rgba8();

        // Background layer: cover-scaled, blurred, overflow cropped by centering.
        // Sigma is capped at the canvas size; anything wider looks the same.
        let longest = params.width.max(params.height);
        let sigma = if params.blur_radius.is_none() {
            0.0
        } else {
            params.blur_radius.value().min(longest as f32)
        };
        let margin = ((sigma * 3.0).ceil() as u32).min(longest);
        let layer = calculate_cover_layer(source, canvas_size, margin);
        let (cx, cy, cw, ch) = layer.crop;
        let scaled = img
            .crop_imm(cx, cy, cw, ch)
            .resize_exact(layer.size.0, layer.size.1, FilterType::Lanczos3)
            .to_rgba8();
        let blurred = if sigma > 0.0 {
            imageops::blur(&scaled, sigma)
        } else {
            scaled
        };

        let [r, g, b] = params.background.0;
        let mut canvas = RgbaImage::from_pixel(params.width, params.height, Rgba([r, g, b, 255]));

        let (bg_x, bg_y) = center_offset(canvas_size, layer.size);
        imageops::overlay(&mut canvas, &blurred, bg_x, bg_y);
        let (fg_x, fg_y) = center_offset(canvas_size, (fit_w, fit_h));
        imageops::overlay(&mut canvas, &sharp, fg_x, fg_y);

        let flattened = DynamicImage::ImageRgb8(DynamicImage::ImageRgba8(canvas).to_rgb8());
        Ok(Encoded {
            data: encode_png(&flattened)?,
            width: params.width,
            height: params.height,
        })
    }

    fn resize(&self, data: &[u8], params: &ResizeParams) -> Result<Encoded, BackendError> {
        params.mode.check()?;
        let img = decode(data)?;
        let (width, height) = calculate_resize_dimensions((img.width(), img.height()), &params.mode);
        check_output_size(width, height, self.max_output_side)?;

        let resized = if (width, height) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(width, height, FilterType::Lanczos3)
        };

        Ok(Encoded {
            data: encode_png(&resized)?,
            width,
            height,
        })
    }

    fn compress(&self, data: &[u8], quality: Quality) -> Result<Compressed, BackendError> {
        let rgb = self.decode_flattened(data)?;
        let encoded = encode_jpeg(&rgb, quality)?;
        Ok(Compressed {
            size_bytes: encoded.len(),
            data: encoded,
            quality,
            target_bytes: None,
        })
    }

    fn compress_to_target(
        &self,
        data: &[u8],
        target_bytes: usize,
    ) -> Result<Compressed, BackendError> {
        let rgb = self.decode_flattened(data)?;
        let (encoded, quality) = search_quality(target_bytes, |q| encode_jpeg(&rgb, q))?;
        Ok(Compressed {
            size_bytes: encoded.len(),
            data: encoded,
            quality,
            target_bytes: Some(target_bytes),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::params::{BlurRadius, ResizeMode};
    use crate::test_helpers::*;

    fn small_blur(width: u32, height: u32) -> CompositeParams {
        CompositeParams {
            blur_radius: BlurRadius::new(2.0),
            ..CompositeParams::new(width, height)
        }
    }

    // =========================================================================
    // inspect
    // =========================================================================

    #[test]
    fn inspect_synthetic_jpeg() {
        let data = gradient_jpeg(200, 150);
        let info = RustBackend::new().inspect(&data).unwrap();
        assert_eq!((info.width, info.height), (200, 150));
        assert_eq!(info.format, "JPEG");
        assert_eq!(info.mode, "RGB");
        assert_eq!(info.size_bytes, data.len());
    }

    #[test]
    fn inspect_reports_alpha_mode() {
        let info = RustBackend::new().inspect(&transparent_png(10, 10)).unwrap();
        assert_eq!(info.format, "PNG");
        assert_eq!(info.mode, "RGBA");
    }

    #[test]
    fn inspect_garbage_is_corrupt() {
        let err = RustBackend::new().inspect(b"not an image at all").unwrap_err();
        assert!(matches!(err, BackendError::CorruptImage(_)));
    }

    #[test]
    fn inspect_empty_is_corrupt() {
        let err = RustBackend::new().inspect(&[]).unwrap_err();
        assert!(matches!(err, BackendError::CorruptImage(_)));
    }

    #[test]
    fn decode_truncated_png_is_corrupt() {
        let mut data = gradient_png(64, 64);
        data.truncate(data.len() / 2);
        assert!(matches!(decode(&data), Err(BackendError::CorruptImage(_))));
    }

    // =========================================================================
    // composite
    // =========================================================================

    #[test]
    fn composite_produces_exact_canvas() {
        let backend = RustBackend::new();
        let data = gradient_jpeg(80, 60);
        for (w, h) in [(108, 108), (54, 96), (150, 50), (1, 1), (7, 300)] {
            let out = backend.composite(&data, &small_blur(w, h)).unwrap();
            assert_eq!((out.width, out.height), (w, h));
            assert_eq!(decoded_dimensions(&out.data), (w, h));
        }
    }

    #[test]
    fn composite_output_is_lossless_png() {
        let out = RustBackend::new()
            .composite(&gradient_jpeg(80, 60), &small_blur(100, 100))
            .unwrap();
        assert_eq!(guessed_format(&out.data), ImageFormat::Png);
    }

    #[test]
    fn composite_centers_sharp_layer_over_background() {
        // Solid blue source → both layers blue; a 2:1 source on a square canvas
        // leaves 25% bars above and below filled by the blurred copy, not white.
        let blue = DynamicImage::ImageRgb8(RgbImage::from_pixel(200, 100, Rgb([0, 0, 255])));
        let data = encode(&blue, ImageFormat::Png);

        let out = RustBackend::new()
            .composite(&data, &small_blur(100, 100))
            .unwrap();
        let canvas = load(&out.data).to_rgb8();
        let top_bar = canvas.get_pixel(50, 5);
        let centre = canvas.get_pixel(50, 50);
        assert!(centre[2] > 250 && centre[0] < 5, "centre was {centre:?}");
        assert!(top_bar[2] > 200 && top_bar[0] < 40, "bar was {top_bar:?}");
    }

    #[test]
    fn composite_without_blur_still_fills_canvas() {
        let params = CompositeParams {
            blur_radius: BlurRadius::new(0.0),
            ..CompositeParams::new(64, 64)
        };
        let out = RustBackend::new()
            .composite(&gradient_png(32, 16), &params)
            .unwrap();
        assert_eq!(decoded_dimensions(&out.data), (64, 64));
    }

    #[test]
    fn composite_rejects_zero_canvas() {
        let err = RustBackend::new()
            .composite(&gradient_png(10, 10), &CompositeParams::new(0, 10))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameters(_)));
    }

    #[test]
    fn composite_oversized_canvas_is_invalid() {
        let err = RustBackend::new()
            .composite(&gradient_png(10, 10), &small_blur(100_000, 100_000))
            .unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameters(_)));
    }

    #[test]
    fn composite_huge_blur_keeps_layer_near_canvas() {
        let params = CompositeParams {
            blur_radius: BlurRadius::new(1e9),
            ..CompositeParams::new(16, 16)
        };
        let out = RustBackend::new()
            .composite(&gradient_png(1, 400), &params)
            .unwrap();
        assert_eq!(decoded_dimensions(&out.data), (16, 16));
    }

    #[test]
    fn composite_extreme_aspect_ratio() {
        let out = RustBackend::new()
            .composite(&gradient_png(400, 2), &small_blur(120, 120))
            .unwrap();
        assert_eq!(decoded_dimensions(&out.data), (120, 120));
    }

    // =========================================================================
    // resize
    // =========================================================================

    fn resize(data: &[u8], mode: ResizeMode) -> Result<Encoded, BackendError> {
        RustBackend::new().resize(data, &ResizeParams { mode })
    }

    #[test]
    fn resize_percentage() {
        let out = resize(&gradient_jpeg(100, 80), ResizeMode::Percentage(50.0)).unwrap();
        assert_eq!((out.width, out.height), (50, 40));
        assert_eq!(decoded_dimensions(&out.data), (50, 40));
        assert_eq!(guessed_format(&out.data), ImageFormat::Png);
    }

    #[test]
    fn resize_exact_stretches() {
        let out = resize(
            &gradient_png(100, 50),
            ResizeMode::Exact {
                width: 40,
                height: 40,
            },
        )
        .unwrap();
        assert_eq!(decoded_dimensions(&out.data), (40, 40));
    }

    #[test]
    fn resize_bounding_box_leaves_small_images_alone() {
        let out = resize(
            &gradient_png(60, 40),
            ResizeMode::BoundingBox {
                max_width: Some(100),
                max_height: Some(100),
            },
        )
        .unwrap();
        assert_eq!(decoded_dimensions(&out.data), (60, 40));
    }

    #[test]
    fn resize_keeps_alpha_channel() {
        let out = resize(&transparent_png(40, 40), ResizeMode::ExactWidth(20)).unwrap();
        assert!(load(&out.data).color().has_alpha());
    }

    #[test]
    fn resize_percentage_overflow_is_invalid() {
        let err = resize(&gradient_png(10, 10), ResizeMode::Percentage(1e12)).unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameters(_)));
    }

    #[test]
    fn resize_thin_strip_to_exact_width_is_invalid() {
        let err = resize(&gradient_png(1, 4000), ResizeMode::ExactWidth(4000)).unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameters(_)));
    }

    #[test]
    fn resize_respects_configured_output_bound() {
        let backend = RustBackend::new().with_max_output_side(64);
        let params = |mode| ResizeParams { mode };
        assert!(
            backend
                .resize(&gradient_png(32, 32), &params(ResizeMode::Percentage(200.0)))
                .is_ok()
        );
        assert!(matches!(
            backend.resize(&gradient_png(32, 32), &params(ResizeMode::Percentage(201.0))),
            Err(BackendError::InvalidParameters(_))
        ));
    }

    #[test]
    fn resize_invalid_mode_is_rejected_before_decoding() {
        let err = resize(b"garbage", ResizeMode::ExactHeight(0)).unwrap_err();
        assert!(matches!(err, BackendError::InvalidParameters(_)));
    }

    // =========================================================================
    // compress
    // =========================================================================

    #[test]
    fn compress_outputs_jpeg_at_requested_quality() {
        let out = RustBackend::new()
            .compress(&gradient_png(64, 64), Quality::new(70))
            .unwrap();
        assert_eq!(guessed_format(&out.data), ImageFormat::Jpeg);
        assert_eq!(out.quality.value(), 70);
        assert_eq!(out.size_bytes, out.data.len());
        assert_eq!(out.met_target(), None);
    }

    #[test]
    fn compress_flattens_transparency_onto_background() {
        let backend = RustBackend::with_background(Background([0, 255, 0]));
        let out = backend
            .compress(&transparent_png(32, 32), Quality::new(100))
            .unwrap();
        let img = load(&out.data).to_rgb8();
        // Transparent corner becomes the green background
        let corner = img.get_pixel(30, 30);
        assert!(corner[1] > 200 && corner[0] < 50, "corner was {corner:?}");
        assert!(!load(&out.data).color().has_alpha());
    }

    #[test]
    fn flatten_blends_partial_alpha() {
        let half = DynamicImage::ImageRgba8(RgbaImage::from_pixel(1, 1, Rgba([0, 0, 0, 128])));
        let rgb = flatten(&half, Background::WHITE);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([127, 127, 127]));
    }

    #[test]
    fn compress_to_target_stays_under_reachable_target() {
        let backend = RustBackend::new();
        let data = gradient_png(160, 120);
        let high = backend.compress(&data, Quality::new(95)).unwrap();
        let target = high.size_bytes / 2;

        let out = backend.compress_to_target(&data, target).unwrap();
        assert!(out.size_bytes <= target);
        assert_eq!(out.met_target(), Some(true));
        assert!(out.quality.value() < 95);
    }

    #[test]
    fn compress_to_target_unreachable_returns_quality_one() {
        let out = RustBackend::new()
            .compress_to_target(&gradient_png(160, 120), 10)
            .unwrap();
        assert_eq!(out.quality, Quality::MIN);
        assert!(out.size_bytes > 10);
        assert_eq!(out.met_target(), Some(false));
    }

    #[test]
    fn compress_to_zero_target_degrades_to_quality_one() {
        let out = RustBackend::new()
            .compress_to_target(&gradient_png(8, 8), 0)
            .unwrap();
        assert_eq!(out.quality, Quality::MIN);
        assert!(out.size_bytes > 0);
        assert_eq!(out.target_bytes, Some(0));
        assert_eq!(out.met_target(), Some(false));
        assert_eq!(guessed_format(&out.data), ImageFormat::Jpeg);
    }

    #[test]
    fn format_and_mode_names() {
        assert_eq!(format_name(ImageFormat::WebP), "WEBP");
        assert_eq!(format_name(ImageFormat::Tiff), "TIFF");
        assert_eq!(mode_name(ColorType::La8), "LA");
        assert_eq!(mode_name(ColorType::Rgb16), "RGB");
    }
}
