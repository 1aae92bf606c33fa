//! Centralized output naming.
//!
//! Every tool derives its output filename from the uploaded filename's stem
//! and the transform that ran, unless the caller supplies a custom name:
//!
//! - `beach.jpg` blurred to 1080x1350 → `beach-blur-1080x1350.png`
//! - `beach.jpg` resized to 540x675 → `beach-resized-540x675.png`
//! - `beach.jpg` compressed to 213 KB → `beach-compressed-213kb.jpg`
//! - pack spec `story` → `story_20250101_120000.png`
//!
//! Lossless outputs are PNG, lossy outputs are JPEG.

use chrono::NaiveDateTime;
use std::collections::HashMap;

/// Timestamp layout embedded in pack output names.
pub const PACK_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Which transform produced an output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tool {
    Blur { width: u32, height: u32 },
    Resize { width: u32, height: u32 },
    Compress { size_bytes: usize },
    Strip,
}

impl Tool {
    pub fn extension(self) -> &'static str {
        match self {
            Tool::Blur { .. } | Tool::Resize { .. } => "png",
            Tool::Compress { .. } | Tool::Strip => "jpg",
        }
    }

    fn suffix(self) -> String {
        match self {
            Tool::Blur { width, height } => format!("blur-{width}x{height}"),
            Tool::Resize { width, height } => format!("resized-{width}x{height}"),
            Tool::Compress { size_bytes } => format!("compressed-{}kb", size_bytes / 1024),
            Tool::Strip => "clean".to_string(),
        }
    }
}

/// Filename without its final extension.
///
/// - `"beach.jpg"` → `"beach"`
/// - `"archive.tar.gz"` → `"archive.tar"`
/// - `".hidden"` → `".hidden"`
pub fn file_stem(filename: &str) -> &str {
    match filename.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => filename,
    }
}

/// Output filename for a standalone tool run.
///
/// A non-blank `custom` name wins over the derived one; either way the result
/// is sanitized and carries the tool's extension.
pub fn output_filename(original: &str, tool: Tool, custom: Option<&str>) -> String {
    let base = match custom.map(str::trim).filter(|c| !c.is_empty()) {
        Some(custom) => custom.to_string(),
        None => format!("{}-{}", file_stem(&sanitize_filename(original)), tool.suffix()),
    };
    sanitize_filename(&format!("{base}.{}", tool.extension()))
}

/// Generates collision-free names for one pack run.
///
/// All names share the run's timestamp; a spec name seen before in the same
/// run gets a numeric suffix (`story_…`, `story-2_…`).
#[derive(Debug)]
pub struct PackNamer {
    stamp: String,
    seen: HashMap<String, usize>,
}

impl PackNamer {
    pub fn new(generated_at: NaiveDateTime) -> Self {
        Self {
            stamp: generated_at.format(PACK_TIMESTAMP_FORMAT).to_string(),
            seen: HashMap::new(),
        }
    }

    pub fn next(&mut self, spec_name: &str, extension: &str) -> String {
        let count = self.seen.entry(spec_name.to_string()).or_insert(0);
        *count += 1;
        let name = if *count == 1 {
            spec_name.to_string()
        } else {
            format!("{spec_name}-{count}")
        };
        sanitize_filename(&format!("{name}_{}.{extension}", self.stamp))
    }
}

/// Maximum filename length in bytes.
const MAX_FILENAME_BYTES: usize = 255;

/// Make an untrusted filename safe to store.
///
/// Strips directory components, replaces `<>:"/\|?*` with `_`, removes
/// control characters and caps the length at 255 bytes while keeping the
/// extension. Empty results and `.`/`..` become `unnamed_file`.
pub fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let mut clean: String = base
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '<' | '>' | ':' | '"' | '|' | '?' | '*' => '_',
            other => other,
        })
        .collect();

    if clean.len() > MAX_FILENAME_BYTES {
        let (stem, ext) = match clean.rsplit_once('.') {
            Some((stem, ext)) if ext.len() < MAX_FILENAME_BYTES - 1 => {
                (stem.to_string(), format!(".{ext}"))
            }
            _ => (clean.clone(), String::new()),
        };
        let mut cut = MAX_FILENAME_BYTES - ext.len();
        while !stem.is_char_boundary(cut) {
            cut -= 1;
        }
        clean = format!("{}{ext}", &stem[..cut]);
    }

    if clean.is_empty() || clean == "." || clean == ".." {
        return "unnamed_file".to_string();
    }
    clean
}

/// Human-readable byte count: `512 B`, `2.3 KB`, `4.0 MB`, `1.2 GB`.
pub fn format_file_size(size_bytes: u64) -> String {
    const KB: f64 = 1024.0;
    let size = size_bytes as f64;
    if size < KB {
        format!("{size_bytes} B")
    } else if size < KB * KB {
        format!("{:.1} KB", size / KB)
    } else if size < KB * KB * KB {
        format!("{:.1} MB", size / (KB * KB))
    } else {
        format!("{:.1} GB", size / (KB * KB * KB))
    }
}
