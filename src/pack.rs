//! Pack runs: one input image, many named outputs.
//!
//! A pack is described by JSON:
//!
//! ```json
//! {"outputs": [
//!   {"name": "square", "width": 1080, "height": 1080, "method": "blur"},
//!   {"name": "thumb", "width": 400, "height": 400, "method": "resize",
//!    "compress": true, "compress_target": 50000}
//! ]}
//! ```
//!
//! The whole document is checked when the [`PackConfig`] is built, so a bad
//! entry is reported before any pixels are touched. Specs with a method this
//! crate does not know are kept and skipped at run time.
//!
//! [`run_pack`] renders each spec in order (blur-letterbox composite or an
//! exact resize), optionally pipes it through the compressor, and returns the
//! fully materialized results in the same order.

use crate::imaging::{
    BackendError, CompositeConfig, ImageBackend, Quality, ResizeMode, composite, compress,
    compress_to_target, resize,
};
use crate::naming::PackNamer;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PackError {
    #[error("Invalid pack JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Output #{index}: {reason}")]
    InvalidSpec { index: usize, reason: String },
    #[error("Image processing failed: {0}")]
    Imaging(#[from] BackendError),
}

/// How a spec turns the input into its target size.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Method {
    /// Letterbox over a blurred copy of the image.
    Blur,
    /// Stretch to the exact size.
    Resize,
    /// Anything else; skipped when the pack runs.
    Unsupported(String),
}

impl Method {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "blur" => Method::Blur,
            "resize" => Method::Resize,
            _ => Method::Unsupported(s.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Method::Blur => "blur",
            Method::Resize => "resize",
            Method::Unsupported(other) => other,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One named output of a pack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub method: Method,
    pub compress: bool,
    /// Byte budget for the quality search. Without it, compression uses the
    /// default quality.
    pub compress_target: Option<usize>,
}

impl OutputSpec {
    pub fn blur(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::with_method(name, width, height, Method::Blur)
    }

    pub fn resize(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self::with_method(name, width, height, Method::Resize)
    }

    pub fn with_method(name: impl Into<String>, width: u32, height: u32, method: Method) -> Self {
        Self {
            name: name.into(),
            width,
            height,
            method,
            compress: false,
            compress_target: None,
        }
    }

    /// Compress the rendered output, optionally towards a byte budget.
    pub fn compressed(mut self, target: Option<usize>) -> Self {
        self.compress = true;
        self.compress_target = target;
        self
    }

    fn check(&self) -> Result<(), String> {
        if self.name.trim().is_empty() {
            return Err("name must not be empty".into());
        }
        if self.width == 0 || self.height == 0 {
            return Err(format!(
                "size must be at least 1x1, got {}x{}",
                self.width, self.height
            ));
        }
        if self.compress_target == Some(0) {
            return Err("compress_target must be greater than 0".into());
        }
        Ok(())
    }
}

/// Wire form of one output. Defaults mirror what older pack files omit.
#[derive(Debug, Deserialize, Serialize)]
struct RawOutputSpec {
    #[serde(default = "default_name")]
    name: String,
    width: u32,
    height: u32,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default)]
    compress: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    compress_target: Option<usize>,
}

fn default_name() -> String {
    "output".to_string()
}

fn default_method() -> String {
    "blur".to_string()
}

#[derive(Debug, Default, Deserialize, Serialize)]
struct RawPack {
    #[serde(default)]
    outputs: Vec<RawOutputSpec>,
}

impl From<RawOutputSpec> for OutputSpec {
    fn from(raw: RawOutputSpec) -> Self {
        Self {
            name: raw.name,
            width: raw.width,
            height: raw.height,
            method: Method::parse(&raw.method),
            compress: raw.compress,
            compress_target: raw.compress_target,
        }
    }
}

impl From<&OutputSpec> for RawOutputSpec {
    fn from(spec: &OutputSpec) -> Self {
        Self {
            name: spec.name.clone(),
            width: spec.width,
            height: spec.height,
            method: spec.method.as_str().to_string(),
            compress: spec.compress,
            compress_target: spec.compress_target,
        }
    }
}

/// An ordered, validated list of output specs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackConfig {
    outputs: Vec<OutputSpec>,
}

impl PackConfig {
    /// Check every spec; the first bad one is reported with its index.
    pub fn new(outputs: Vec<OutputSpec>) -> Result<Self, PackError> {
        for (index, spec) in outputs.iter().enumerate() {
            spec.check()
                .map_err(|reason| PackError::InvalidSpec { index, reason })?;
        }
        Ok(Self { outputs })
    }

    pub fn from_json(json: &str) -> Result<Self, PackError> {
        let raw: RawPack = serde_json::from_str(json)?;
        Self::new(raw.outputs.into_iter().map(OutputSpec::from).collect())
    }

    pub fn to_json(&self) -> Result<String, PackError> {
        let raw = RawPack {
            outputs: self.outputs.iter().map(RawOutputSpec::from).collect(),
        };
        Ok(serde_json::to_string_pretty(&raw)?)
    }

    pub fn outputs(&self) -> &[OutputSpec] {
        &self.outputs
    }

    pub fn is_empty(&self) -> bool {
        self.outputs.is_empty()
    }
}

/// Defaults applied to every spec of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PackSettings {
    pub composite: CompositeConfig,
    /// Used when a spec asks for compression without a byte budget.
    pub quality: Quality,
}

/// One rendered output of a pack run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingResult {
    pub data: Vec<u8>,
    /// Spec name the output was rendered for.
    pub name: String,
    /// Collision-free filename for this run.
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: usize,
    /// JPEG quality, when compression ran.
    pub quality: Option<Quality>,
    /// Byte budget the compressor aimed for, if any.
    pub target_bytes: Option<usize>,
}

impl ProcessingResult {
    /// `Some(false)` when the budget could not be met even at quality 1.
    pub fn met_target(&self) -> Option<bool> {
        self.target_bytes.map(|target| self.size_bytes <= target)
    }
}

/// Render every spec of `config` from one input image.
///
/// Results follow spec order. Specs with an unsupported method are skipped;
/// any imaging failure aborts the run.
pub fn run_pack(
    backend: &impl ImageBackend,
    data: &[u8],
    config: &PackConfig,
    settings: &PackSettings,
    generated_at: NaiveDateTime,
) -> Result<Vec<ProcessingResult>, PackError> {
    let mut namer = PackNamer::new(generated_at);
    let mut results = Vec::with_capacity(config.outputs.len());

    for spec in &config.outputs {
        let rendered = match &spec.method {
            Method::Blur => composite(backend, data, spec.width, spec.height, &settings.composite)?,
            Method::Resize => resize(
                backend,
                data,
                ResizeMode::Exact {
                    width: spec.width,
                    height: spec.height,
                },
            )?,
            Method::Unsupported(method) => {
                log::debug!("skipping output '{}': unsupported method '{method}'", spec.name);
                continue;
            }
        };
        log::debug!(
            "rendered '{}' via {} at {}x{}",
            spec.name,
            spec.method,
            rendered.width,
            rendered.height
        );

        let (bytes, quality, target_bytes, extension) = if spec.compress {
            let compressed = match spec.compress_target {
                Some(target) => compress_to_target(backend, &rendered.data, target)?,
                None => compress(backend, &rendered.data, settings.quality)?,
            };
            (
                compressed.data,
                Some(compressed.quality),
                compressed.target_bytes,
                "jpg",
            )
        } else {
            (rendered.data, None, None, "png")
        };

        results.push(ProcessingResult {
            size_bytes: bytes.len(),
            data: bytes,
            name: spec.name.clone(),
            filename: namer.next(&spec.name, extension),
            width: rendered.width,
            height: rendered.height,
            quality,
            target_bytes,
        });
    }

    Ok(results)
}

/// [`run_pack`] stamped with the local wall-clock time.
pub fn run_pack_now(
    backend: &impl ImageBackend,
    data: &[u8],
    config: &PackConfig,
    settings: &PackSettings,
) -> Result<Vec<ProcessingResult>, PackError> {
    run_pack(
        backend,
        data,
        config,
        settings,
        chrono::Local::now().naive_local(),
    )
}
