//! Upload validation.
//!
//! Gates every other operation. An upload is checked in a fixed order and the
//! first failing check decides the rejection:
//!
//! 1. **Size**: byte length against the configured maximum
//! 2. **Extension**: last `.`-suffix of the filename against the allow-list
//! 3. **Signature**: leading magic bytes must be a known image format *and*
//!    match the format the extension claims (a PNG named `.jpg` is rejected)
//! 4. **Dimensions**: both sides within `[1, max_dimension]`, read from the
//!    header so an oversized image is rejected before any pixel is decoded
//! 5. **Decode**: the whole buffer must decode, not just its header
//! 6. **Content**: no embedded script/code-injection patterns
//!
//! Validation is a pure function of its inputs.

use crate::imaging::rust_backend::decode;
use crate::imaging::{BackendError, ImageBackend, RustBackend};
use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Default upload limit: 10 MiB.
pub const DEFAULT_MAX_SIZE: usize = 10 * 1024 * 1024;

/// Default bound on either side of an uploaded image.
pub const DEFAULT_MAX_DIMENSION: u32 = 4000;

pub const DEFAULT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "bmp"];

/// Byte patterns that mark embedded script or server-side code.
/// Matched case-insensitively.
pub const DEFAULT_UNSAFE_PATTERNS: &[&str] = &[
    "<script",
    "javascript:",
    "vbscript:",
    "data:text/html",
    "<?php",
    "eval(",
    "exec(",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("File size {size} bytes exceeds the maximum of {max} bytes")]
    SizeLimitExceeded { size: usize, max: usize },
    #[error("File type '{extension}' not allowed. Allowed: {}", .allowed.join(", "))]
    UnsupportedExtension {
        extension: String,
        allowed: Vec<String>,
    },
    #[error("File content is not a recognized {extension} image")]
    UnrecognizedFormat { extension: String },
    #[error("Invalid image file: {0}")]
    CorruptImage(String),
    #[error("Image dimensions {width}x{height} out of range (max {max}x{max})")]
    DimensionOutOfRange { width: u32, height: u32, max: u32 },
    #[error("Dangerous content detected in file ({pattern})")]
    UnsafeContent { pattern: String },
}

/// Image container families recognised by their leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signature {
    Jpeg,
    Png,
    Gif,
    WebP,
}

impl Signature {
    /// Identify the format from magic bytes.
    pub fn detect(data: &[u8]) -> Option<Self> {
        const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Signature::Jpeg)
        } else if data.starts_with(PNG) {
            Some(Signature::Png)
        } else if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
            Some(Signature::Gif)
        } else if data.starts_with(b"RIFF") {
            Some(Signature::WebP)
        } else {
            None
        }
    }

    /// The format a (lower-case) file extension claims to be.
    pub fn for_extension(extension: &str) -> Option<Self> {
        match extension {
            "jpg" | "jpeg" => Some(Signature::Jpeg),
            "png" => Some(Signature::Png),
            "gif" => Some(Signature::Gif),
            "webp" => Some(Signature::WebP),
            _ => None,
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Signature::Jpeg => "JPEG",
            Signature::Png => "PNG",
            Signature::Gif => "GIF",
            Signature::WebP => "WEBP",
        };
        f.write_str(name)
    }
}

/// A buffer that passed every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Validated {
    pub format: Signature,
    pub width: u32,
    pub height: u32,
}

/// Limits applied to uploads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_size: usize,
    /// Compared case-insensitively.
    pub allowed_extensions: Vec<String>,
    pub max_dimension: u32,
    pub unsafe_patterns: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            unsafe_patterns: DEFAULT_UNSAFE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Lower-cased text after the last `.` of the file name, or `""`.
pub fn file_extension(filename: &str) -> String {
    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// First pattern found in `data`, ignoring ASCII case.
fn find_unsafe_pattern<'a>(data: &[u8], patterns: &'a [String]) -> Option<&'a str> {
    patterns
        .iter()
        .filter(|p| !p.is_empty())
        .find(|p| {
            data.windows(p.len())
                .any(|window| window.eq_ignore_ascii_case(p.as_bytes()))
        })
        .map(String::as_str)
}

impl UploadPolicy {
    pub fn validate(&self, data: &[u8], filename: &str) -> Result<Validated, ValidationError> {
        if data.len() > self.max_size {
            return Err(ValidationError::SizeLimitExceeded {
                size: data.len(),
                max: self.max_size,
            });
        }

        let extension = file_extension(filename);
        if !self
            .allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(&extension))
        {
            return Err(ValidationError::UnsupportedExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        if data.is_empty() {
            return Err(ValidationError::CorruptImage("empty file".into()));
        }
        let format = match (Signature::detect(data), Signature::for_extension(&extension)) {
            (Some(found), Some(claimed)) if found == claimed => found,
            _ => return Err(ValidationError::UnrecognizedFormat { extension }),
        };

        let corrupt = |e: BackendError| match e {
            BackendError::CorruptImage(msg) => ValidationError::CorruptImage(msg),
            other => ValidationError::CorruptImage(other.to_string()),
        };

        let header = RustBackend::new().inspect(data).map_err(corrupt)?;
        let (width, height) = (header.width, header.height);
        let in_range = |side: u32| (1..=self.max_dimension).contains(&side);
        if !in_range(width) || !in_range(height) {
            return Err(ValidationError::DimensionOutOfRange {
                width,
                height,
                max: self.max_dimension,
            });
        }

        decode(data).map_err(corrupt)?;

        if let Some(pattern) = find_unsafe_pattern(data, &self.unsafe_patterns) {
            return Err(ValidationError::UnsafeContent {
                pattern: pattern.to_string(),
            });
        }

        Ok(Validated {
            format,
            width,
            height,
        })
    }
}

/// Validate an upload against a size limit and an extension allow-list,
/// with default dimension bounds and content patterns.
pub fn validate<S: AsRef<str>>(
    data: &[u8],
    filename: &str,
    max_size: usize,
    allowed_extensions: &[S],
) -> Result<Validated, ValidationError> {
    let policy = UploadPolicy {
        max_size,
        allowed_extensions: allowed_extensions
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect(),
        ..UploadPolicy::default()
    };
    policy.validate(data, filename)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;

    const ALL: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

    #[test]
    fn valid_jpeg_passes() {
        let data = gradient_jpeg(120, 80);
        let ok = validate(&data, "holiday.JPG", DEFAULT_MAX_SIZE, ALL).unwrap();
        assert_eq!(ok.format, Signature::Jpeg);
        assert_eq!((ok.width, ok.height), (120, 80));
    }

    #[test]
    fn valid_gif_passes() {
        let ok = validate(&gradient_gif(20, 10), "anim.gif", DEFAULT_MAX_SIZE, ALL).unwrap();
        assert_eq!(ok.format, Signature::Gif);
    }

    #[test]
    fn size_is_checked_first() {
        let err = validate(&[0u8; 11], "x.exe", 10, ALL).unwrap_err();
        assert_eq!(err, ValidationError::SizeLimitExceeded { size: 11, max: 10 });
    }

    #[test]
    fn extension_not_in_allow_list() {
        let err = validate(&gradient_png(4, 4), "shell.php", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::UnsupportedExtension { ref extension, .. } if extension == "php"
        ));
    }

    #[test]
    fn extension_compare_ignores_case_on_both_sides() {
        let data = gradient_png(4, 4);
        assert!(validate(&data, "a.PNG", DEFAULT_MAX_SIZE, &["png"]).is_ok());
        assert!(validate(&data, "a.png", DEFAULT_MAX_SIZE, &["PNG"]).is_ok());
    }

    #[test]
    fn missing_extension_is_unsupported() {
        let err = validate(&gradient_png(4, 4), "README", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedExtension { .. }));
    }

    #[test]
    fn png_bytes_with_jpg_extension_are_rejected() {
        let err = validate(&gradient_png(8, 8), "photo.jpg", DEFAULT_MAX_SIZE, &["jpg"]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnrecognizedFormat {
                extension: "jpg".into()
            }
        );
    }

    #[test]
    fn unknown_signature_is_rejected() {
        let err = validate(b"BM\x00\x00fake bitmap", "a.bmp", DEFAULT_MAX_SIZE, &["bmp"]).unwrap_err();
        assert!(matches!(err, ValidationError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn empty_buffer_is_corrupt() {
        let err = validate(&[], "a.png", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert!(matches!(err, ValidationError::CorruptImage(_)));
    }

    #[test]
    fn empty_buffer_passes_size_check_even_at_zero_limit() {
        let err = validate(&[], "a.png", 0, ALL).unwrap_err();
        assert!(matches!(err, ValidationError::CorruptImage(_)));
    }

    #[test]
    fn right_magic_but_broken_body_is_corrupt() {
        let mut data = gradient_jpeg(64, 64);
        data.truncate(40);
        let err = validate(&data, "a.jpg", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert!(matches!(err, ValidationError::CorruptImage(_)));
    }

    #[test]
    fn riff_that_is_not_webp_fails_decoding() {
        let err = validate(b"RIFF\x04\x00\x00\x00WAVE", "a.webp", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert!(matches!(err, ValidationError::CorruptImage(_)));
    }

    #[test]
    fn oversized_dimensions_are_rejected() {
        let err = validate(&gradient_png(4001, 1), "wide.png", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DimensionOutOfRange {
                width: 4001,
                height: 1,
                max: 4000
            }
        );
    }

    #[test]
    fn oversized_header_is_rejected_without_decoding() {
        // 20000x20000 RGBA would need 1.6 GB to decode; the body is not even valid.
        let data = png_header_only(20_000, 20_000);
        let err = validate(&data, "huge.png", DEFAULT_MAX_SIZE, &["png"]).unwrap_err();
        assert_eq!(
            err,
            ValidationError::DimensionOutOfRange {
                width: 20_000,
                height: 20_000,
                max: 4000
            }
        );
    }

    #[test]
    fn in_range_header_with_broken_body_is_corrupt() {
        let data = png_header_only(64, 64);
        let err = validate(&data, "a.png", DEFAULT_MAX_SIZE, &["png"]).unwrap_err();
        assert!(matches!(err, ValidationError::CorruptImage(_)));
    }

    #[test]
    fn valid_webp_passes() {
        let ok = validate(&gradient_webp(30, 20), "x.webp", DEFAULT_MAX_SIZE, ALL).unwrap();
        assert_eq!(ok.format, Signature::WebP);
        assert_eq!((ok.width, ok.height), (30, 20));
    }

    #[test]
    fn webp_bytes_with_png_extension_are_rejected() {
        let err = validate(&gradient_webp(8, 8), "x.png", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert!(matches!(err, ValidationError::UnrecognizedFormat { .. }));
    }

    #[test]
    fn signature_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Signature::WebP).unwrap(), "\"WEBP\"");
    }

    #[test]
    fn dimension_bound_is_inclusive() {
        assert!(validate(&gradient_png(4000, 1), "edge.png", DEFAULT_MAX_SIZE, ALL).is_ok());
    }

    #[test]
    fn custom_dimension_bound() {
        let policy = UploadPolicy {
            max_dimension: 16,
            ..UploadPolicy::default()
        };
        assert!(matches!(
            policy.validate(&gradient_png(17, 4), "a.png"),
            Err(ValidationError::DimensionOutOfRange { max: 16, .. })
        ));
    }

    #[test]
    fn embedded_script_is_unsafe() {
        let mut data = gradient_png(8, 8);
        data.extend_from_slice(b"<SCRIPT>alert(1)</script>");
        let err = validate(&data, "a.png", DEFAULT_MAX_SIZE, ALL).unwrap_err();
        assert_eq!(
            err,
            ValidationError::UnsafeContent {
                pattern: "<script".into()
            }
        );
    }

    #[test]
    fn embedded_php_is_unsafe() {
        let mut data = gradient_png(8, 8);
        data.extend_from_slice(b"<?php system($_GET['c']); ?>");
        assert!(matches!(
            validate(&data, "a.png", DEFAULT_MAX_SIZE, ALL),
            Err(ValidationError::UnsafeContent { .. })
        ));
    }

    #[test]
    fn file_extension_takes_last_suffix() {
        assert_eq!(file_extension("a.tar.GZ"), "gz");
        assert_eq!(file_extension("noext"), "");
        assert_eq!(file_extension("dir.d/photo"), "");
        assert_eq!(file_extension("C:\\pics\\x.Jpeg"), "jpeg");
    }

    #[test]
    fn signature_detection() {
        assert_eq!(Signature::detect(&[0xFF, 0xD8, 0xFF, 0xE0]), Some(Signature::Jpeg));
        assert_eq!(Signature::detect(b"GIF87a...."), Some(Signature::Gif));
        assert_eq!(Signature::detect(b"RIFF....WEBP"), Some(Signature::WebP));
        assert_eq!(Signature::detect(b"BM"), None);
        assert_eq!(Signature::detect(&[]), None);
    }

    #[test]
    fn error_messages_are_user_facing() {
        let err = ValidationError::UnsupportedExtension {
            extension: "exe".into(),
            allowed: vec!["jpg".into(), "png".into()],
        };
        assert_eq!(err.to_string(), "File type 'exe' not allowed. Allowed: jpg, png");
    }
}
