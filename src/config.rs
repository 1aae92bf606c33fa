//! Hub configuration module.
//!
//! Handles loading, validating, and merging `config.toml`. Stock defaults are
//! the base layer; a user file overrides only the keys it names.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [upload]
//! max_file_size = 10485760           # Bytes (10 MB)
//! allowed_extensions = ["jpg", "jpeg", "png", "webp", "gif", "bmp"]
//! max_dimension = 4000               # Max width and height in pixels
//! unsafe_patterns = ["<script", "javascript:", "vbscript:", "data:text/html",
//!                    "<?php", "eval(", "exec("]
//!
//! [compositor]
//! blur_radius = 30                   # Gaussian sigma of the letterbox background
//! background = "#ffffff"             # Canvas colour behind the layers
//!
//! [compressor]
//! quality = 85                       # Default JPEG quality (1-100)
//! background = "#ffffff"             # Colour transparent pixels are flattened onto
//!
//! [processing]
//! max_processes = 4                  # Max parallel workers (omit for auto = CPU cores)
//! max_output_dimension = 8000        # Largest side a blur or resize may produce
//!
//! [[presets]]
//! name = "Square"
//! width = 1080
//! height = 1080
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse — override just the values you want:
//!
//! ```toml
//! [compressor]
//! quality = 70
//! ```
//!
//! Tables merge key by key. Arrays replace the stock value wholesale, so a
//! file that declares any `[[presets]]` declares the complete preset list.
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{
    Background, BlurRadius, CompositeConfig, DEFAULT_MAX_OUTPUT_SIDE, Quality, RustBackend,
};
use crate::pack::PackSettings;
use crate::validation::{
    DEFAULT_EXTENSIONS, DEFAULT_MAX_DIMENSION, DEFAULT_MAX_SIZE, DEFAULT_UNSAFE_PATTERNS,
    UploadPolicy,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `config.toml`.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HubConfig {
    /// Upload limits enforced by the validator.
    pub upload: UploadConfig,
    /// Blur-letterbox defaults.
    pub compositor: CompositorConfig,
    /// Lossy encoding defaults.
    pub compressor: CompressorConfig,
    /// Parallel processing settings.
    pub processing: ProcessingConfig,
    /// Named target sizes usable in place of explicit dimensions.
    pub presets: Vec<SizePreset>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            upload: UploadConfig::default(),
            compositor: CompositorConfig::default(),
            compressor: CompressorConfig::default(),
            processing: ProcessingConfig::default(),
            presets: default_presets(),
        }
    }
}

impl HubConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=100).contains(&self.compressor.quality) {
            return Err(ConfigError::Validation(
                "compressor.quality must be 1-100".into(),
            ));
        }
        for (key, value) in [
            ("compositor.background", &self.compositor.background),
            ("compressor.background", &self.compressor.background),
        ] {
            if Background::from_hex(value).is_none() {
                return Err(ConfigError::Validation(format!(
                    "{key} must be a #rrggbb or #rgb colour, got '{value}'"
                )));
            }
        }
        if !self.compositor.blur_radius.is_finite() || self.compositor.blur_radius < 0.0 {
            return Err(ConfigError::Validation(
                "compositor.blur_radius must be a non-negative number".into(),
            ));
        }
        if self.upload.max_dimension == 0 {
            return Err(ConfigError::Validation(
                "upload.max_dimension must be non-zero".into(),
            ));
        }
        if self.processing.max_output_dimension == 0 {
            return Err(ConfigError::Validation(
                "processing.max_output_dimension must be non-zero".into(),
            ));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "upload.allowed_extensions must not be empty".into(),
            ));
        }
        let mut seen = HashSet::new();
        for preset in &self.presets {
            if preset.width == 0 || preset.height == 0 {
                return Err(ConfigError::Validation(format!(
                    "preset '{}' must have non-zero width and height",
                    preset.name
                )));
            }
            if !seen.insert(preset.name.to_lowercase()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate preset name '{}'",
                    preset.name
                )));
            }
        }
        Ok(())
    }

    /// Look up a preset by name, ignoring case.
    pub fn find_preset(&self, name: &str) -> Option<&SizePreset> {
        let name = name.trim();
        self.presets
            .iter()
            .find(|preset| preset.name.eq_ignore_ascii_case(name))
    }

    /// Backend with the compressor's flatten colour and the output size bound.
    pub fn backend(&self) -> RustBackend {
        self.compressor
            .backend()
            .with_max_output_side(self.processing.max_output_dimension)
    }

    /// Defaults for pack runs.
    pub fn pack_settings(&self) -> PackSettings {
        PackSettings {
            composite: self.compositor.composite_config(),
            quality: self.compressor.quality(),
        }
    }
}

/// Upload limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadConfig {
    /// Largest accepted upload in bytes.
    pub max_file_size: usize,
    /// Accepted file extensions, compared case-insensitively.
    pub allowed_extensions: Vec<String>,
    /// Largest accepted width or height in pixels.
    pub max_dimension: u32,
    /// Byte patterns that mark an upload as unsafe, matched case-insensitively.
    pub unsafe_patterns: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: DEFAULT_MAX_SIZE,
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|s| s.to_string()).collect(),
            max_dimension: DEFAULT_MAX_DIMENSION,
            unsafe_patterns: DEFAULT_UNSAFE_PATTERNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl UploadConfig {
    pub fn policy(&self) -> UploadPolicy {
        UploadPolicy {
            max_size: self.max_file_size,
            allowed_extensions: self.allowed_extensions.clone(),
            max_dimension: self.max_dimension,
            unsafe_patterns: self.unsafe_patterns.clone(),
        }
    }
}

/// Blur-letterbox settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompositorConfig {
    /// Gaussian sigma for the background layer. `0` disables blurring.
    pub blur_radius: f32,
    /// Canvas colour, `#rrggbb` or `#rgb`.
    pub background: String,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            blur_radius: 30.0,
            background: "#ffffff".to_string(),
        }
    }
}

impl CompositorConfig {
    pub fn composite_config(&self) -> CompositeConfig {
        CompositeConfig {
            blur_radius: BlurRadius::new(self.blur_radius),
            background: Background::from_hex(&self.background).unwrap_or_default(),
        }
    }
}

/// Lossy encoding settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompressorConfig {
    /// JPEG quality used when no size target is given (1 = worst, 100 = best).
    pub quality: u32,
    /// Colour transparent pixels are flattened onto, `#rrggbb` or `#rgb`.
    pub background: String,
}

impl Default for CompressorConfig {
    fn default() -> Self {
        Self {
            quality: 85,
            background: "#ffffff".to_string(),
        }
    }
}

impl CompressorConfig {
    pub fn quality(&self) -> Quality {
        Quality::new(self.quality)
    }

    /// Backend that flattens onto the configured background.
    pub fn backend(&self) -> RustBackend {
        RustBackend::with_background(Background::from_hex(&self.background).unwrap_or_default())
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent or null, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Largest width or height a blur canvas or resize result may have.
    pub max_output_dimension: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            max_output_dimension: DEFAULT_MAX_OUTPUT_SIDE,
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// A named output size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SizePreset {
    pub name: String,
    pub width: u32,
    pub height: u32,
}

impl SizePreset {
    pub fn new(name: &str, width: u32, height: u32) -> Self {
        Self {
            name: name.to_string(),
            width,
            height,
        }
    }
}

/// Social and web sizes shipped by default.
pub fn default_presets() -> Vec<SizePreset> {
    [
        ("Square", 1080, 1080),
        ("Portrait", 1080, 1350),
        ("Story", 1080, 1920),
        ("FB Post", 1200, 630),
        ("FB Cover", 820, 312),
        ("Twitter Header", 1500, 500),
        ("YouTube Thumb", 1280, 720),
        ("Tixr Header", 284, 168),
        ("Tixr Vertical", 1080, 1350),
        ("HD Landscape", 1920, 1080),
        ("Profile Pic", 400, 400),
        ("Linktree", 1080, 1080),
    ]
    .into_iter()
    .map(|(name, width, height)| SizePreset::new(name, width, height))
    .collect()
}

/// Returns the stock default config as a `toml::Value::Table`.
///
/// This is the canonical representation of all default values, used as the
/// base layer for merging user overrides on top.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(HubConfig::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load a config file as a raw TOML value.
///
/// Returns `Ok(None)` if the file does not exist.
/// Returns `Err` if the file exists but contains invalid TOML.
pub fn load_raw_config(path: &Path) -> Result<Option<toml::Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)?;
    let value: toml::Value = toml::from_str(&content)?;
    Ok(Some(value))
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<HubConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: HubConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from the file at `path`, falling back to stock defaults when
/// it does not exist.
///
/// Merges user values on top of stock defaults, rejects unknown keys,
/// and validates the result.
pub fn load_config(path: &Path) -> Result<HubConfig, ConfigError> {
    let base = stock_defaults_value();
    let overlay = load_raw_config(path)?;
    resolve_config(base, overlay)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Scale Hub Configuration
# =======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Each key only needs to be present if you want to override it.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Upload validation
# ---------------------------------------------------------------------------
[upload]
# Largest accepted upload in bytes (10 MB).
max_file_size = 10485760

# Accepted file extensions (case-insensitive).
allowed_extensions = ["jpg", "jpeg", "png", "webp", "gif", "bmp"]

# Largest accepted width or height in pixels.
max_dimension = 4000

# Byte patterns that mark an upload as unsafe (case-insensitive).
unsafe_patterns = [
    "<script",
    "javascript:",
    "vbscript:",
    "data:text/html",
    "<?php",
    "eval(",
    "exec(",
]

# ---------------------------------------------------------------------------
# Blur letterbox
# ---------------------------------------------------------------------------
[compositor]
# Gaussian blur sigma for the background layer. 0 disables blurring.
blur_radius = 30

# Canvas colour behind both layers.
background = "#ffffff"

# ---------------------------------------------------------------------------
# Compression
# ---------------------------------------------------------------------------
[compressor]
# JPEG quality used when no size target is given (1 = worst, 100 = best).
quality = 85

# Colour transparent pixels are flattened onto before JPEG encoding.
background = "#ffffff"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers when packing several files.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Largest width or height a blur canvas or resize result may have.
# Larger requests fail as invalid parameters instead of exhausting memory.
max_output_dimension = 8000

# ---------------------------------------------------------------------------
# Size presets
# ---------------------------------------------------------------------------
# Usable anywhere a target size is expected (`--preset "Story"`).
# Declaring any [[presets]] replaces this whole list.
[[presets]]
name = "Square"
width = 1080
height = 1080

[[presets]]
name = "Portrait"
width = 1080
height = 1350

[[presets]]
name = "Story"
width = 1080
height = 1920

[[presets]]
name = "FB Post"
width = 1200
height = 630

[[presets]]
name = "FB Cover"
width = 820
height = 312

[[presets]]
name = "Twitter Header"
width = 1500
height = 500

[[presets]]
name = "YouTube Thumb"
width = 1280
height = 720

[[presets]]
name = "Tixr Header"
width = 284
height = 168

[[presets]]
name = "Tixr Vertical"
width = 1080
height = 1350

[[presets]]
name = "HD Landscape"
width = 1920
height = 1080

[[presets]]
name = "Profile Pic"
width = 400
height = 400

[[presets]]
name = "Linktree"
width = 1080
height = 1080
"##
}
