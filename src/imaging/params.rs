//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! and the [`backend`](super::backend) that does the pixel work. Keeping them
//! separate lets a mock backend stand in for the real one in tests.
//!
//! ## Types
//!
//! - [`Quality`] — Lossy encoding quality (1–100, default 85). Clamped on construction.
//! - [`Background`] — Opaque RGB fill used for letterbox canvases and alpha flattening.
//! - [`BlurRadius`] — Gaussian blur radius for the letterbox background layer.
//! - [`ResizeMode`] — The five ways a resize target can be expressed.
//! - [`CompositeParams`] / [`ResizeParams`] — Everything one transform needs.

use super::backend::BackendError;
use std::fmt;

/// Default bound on either side of any image a backend produces.
pub const DEFAULT_MAX_OUTPUT_SIDE: u32 = 8000;

/// Reject an output size with a zero side or a side above `max_side`.
pub fn check_output_size(width: u32, height: u32, max_side: u32) -> Result<(), BackendError> {
    if width == 0 || height == 0 || width > max_side || height > max_side {
        return Err(BackendError::InvalidParameters(format!(
            "output size {width}x{height} must be between 1x1 and {max_side}x{max_side}"
        )));
    }
    Ok(())
}

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quality(pub u8);

impl Quality {
    pub const MIN: Quality = Quality(1);
    pub const MAX: Quality = Quality(100);

    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100) as u8)
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "q{}", self.0)
    }
}

/// Opaque RGB colour painted under everything that may be transparent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Background(pub [u8; 3]);

impl Background {
    pub const WHITE: Background = Background([255, 255, 255]);

    /// Parse `#rrggbb` or `#rgb` (the leading `#` is optional).
    pub fn from_hex(value: &str) -> Option<Self> {
        let hex = value.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            6 => Some(Self([
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            ])),
            3 => {
                let mut rgb = [0u8; 3];
                for (i, c) in hex.chars().enumerate() {
                    let v = c.to_digit(16)? as u8;
                    rgb[i] = v * 17;
                }
                Some(Self(rgb))
            }
            _ => None,
        }
    }

    pub fn to_hex(self) -> String {
        let [r, g, b] = self.0;
        format!("#{r:02x}{g:02x}{b:02x}")
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::WHITE
    }
}

/// Blur radius for the letterbox background layer.
///
/// Used as the Gaussian sigma. Zero disables blurring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlurRadius(pub f32);

impl BlurRadius {
    pub fn new(value: f32) -> Self {
        if value.is_normal() && value > 0.0 {
            Self(value)
        } else {
            Self(0.0)
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Zero, negative and non-normal radii disable blurring.
    pub fn is_none(self) -> bool {
        !(self.0.is_normal() && self.0 > 0.0)
    }
}

impl Default for BlurRadius {
    fn default() -> Self {
        Self(30.0)
    }
}

/// How the caller expresses the resize target. Modes are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResizeMode {
    /// Uniform scale, e.g. `50.0` halves both sides.
    Percentage(f64),
    /// Exact output size. Stretches when the aspect ratio differs.
    Exact { width: u32, height: u32 },
    /// Fixed width, height follows the source aspect ratio.
    ExactWidth(u32),
    /// Fixed height, width follows the source aspect ratio.
    ExactHeight(u32),
    /// Fit inside the given bounds without ever upscaling.
    /// At least one bound must be present.
    BoundingBox {
        max_width: Option<u32>,
        max_height: Option<u32>,
    },
}

impl ResizeMode {
    /// Reject parameter combinations that cannot produce an image.
    pub fn check(&self) -> Result<(), BackendError> {
        let invalid = |msg: &str| Err(BackendError::InvalidParameters(msg.to_string()));
        match *self {
            ResizeMode::Percentage(p) if !p.is_finite() || p <= 0.0 => {
                invalid("percentage must be a positive number")
            }
            ResizeMode::Exact { width, height } if width == 0 || height == 0 => {
                invalid("width and height must be greater than zero")
            }
            ResizeMode::ExactWidth(0) => invalid("width must be greater than zero"),
            ResizeMode::ExactHeight(0) => invalid("height must be greater than zero"),
            ResizeMode::BoundingBox {
                max_width: None,
                max_height: None,
            } => invalid("bounding box needs a maximum width or height"),
            ResizeMode::BoundingBox {
                max_width: Some(0), ..
            }
            | ResizeMode::BoundingBox {
                max_height: Some(0),
                ..
            } => invalid("bounding box bounds must be greater than zero"),
            _ => Ok(()),
        }
    }
}

/// Parameters for a blurred-letterbox composite.
#[derive(Debug, Clone, PartialEq)]
pub struct CompositeParams {
    /// Exact canvas dimensions.
    pub width: u32,
    pub height: u32,
    pub blur_radius: BlurRadius,
    pub background: Background,
}

impl CompositeParams {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            blur_radius: BlurRadius::default(),
            background: Background::default(),
        }
    }

    /// Reject a canvas with a zero side or a side above `max_side`.
    pub fn check(&self, max_side: u32) -> Result<(), BackendError> {
        check_output_size(self.width, self.height, max_side)
    }
}

/// Parameters for a resize.
#[derive(Debug, Clone, PartialEq)]
pub struct ResizeParams {
    pub mode: ResizeMode,
}
