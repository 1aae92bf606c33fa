//! CLI output formatting for every command.
//!
//! Output leads with the input file, then shows what was produced as
//! indented context lines:
//!
//! ```text
//! beach.jpg
//!     1920x1280 JPEG RGB, 2.3 MB
//!
//! beach.jpg → beach-blur-1080x1350.png
//!     1080x1350, 1.8 MB
//!
//! beach.jpg → beach-compressed-487kb.jpg
//!     q71, 487.9 KB (target 500.0 KB: met), saved 1.8 MB (-79.3%)
//!
//! beach.jpg (3 outputs)
//!     001 square → square_20250101_120000.png
//!         1080x1080, 1.1 MB
//!     002 story → story_20250101_120000.jpg
//!         1080x1920, q85, 402.3 KB
//! ```
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure: no I/O, no side effects. `validate` and `inspect` also
//! have JSON forms for scripting.

use crate::config::SizePreset;
use crate::imaging::{Compressed, Encoded, ImageInfo};
use crate::naming::format_file_size;
use crate::pack::ProcessingResult;
use crate::validation::{Validated, ValidationError};
use serde_json::{Value, json};

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn size(bytes: usize) -> String {
    format_file_size(bytes as u64)
}

fn print_lines(lines: Vec<String>) {
    for line in lines {
        println!("{}", line);
    }
}

/// `"q85, 402.3 KB"`, plus the target verdict when a byte budget was set.
fn compressed_detail(
    quality: impl std::fmt::Display,
    size_bytes: usize,
    target: Option<(usize, bool)>,
) -> String {
    match target {
        Some((target, met)) => format!(
            "{}, {} (target {}: {})",
            quality,
            size(size_bytes),
            size(target),
            if met { "met" } else { "best effort" }
        ),
        None => format!("{}, {}", quality, size(size_bytes)),
    }
}

/// `"saved 1.8 MB (-79.3%)"`, or `"grew ..."` when the output is larger.
fn size_change(before: usize, after: usize) -> String {
    let percent = if before == 0 {
        0.0
    } else {
        (after as f64 - before as f64) / before as f64 * 100.0
    };
    if after <= before {
        format!("saved {} ({:+.1}%)", size(before - after), percent)
    } else {
        format!("grew {} ({:+.1}%)", size(after - before), percent)
    }
}

// ============================================================================
// validate / inspect
// ============================================================================

/// Format the outcome of validating one upload.
pub fn format_validation(
    filename: &str,
    outcome: &Result<Validated, ValidationError>,
) -> Vec<String> {
    let detail = match outcome {
        Ok(valid) => format!("valid {} {}x{}", valid.format, valid.width, valid.height),
        Err(err) => format!("rejected: {}", err),
    };
    vec![filename.to_string(), format!("{}{}", indent(1), detail)]
}

pub fn print_validation(filename: &str, outcome: &Result<Validated, ValidationError>) {
    print_lines(format_validation(filename, outcome));
}

/// JSON record of one validation: the validated facts, or the rejection.
pub fn validation_json(filename: &str, outcome: &Result<Validated, ValidationError>) -> Value {
    match outcome {
        Ok(valid) => json!({ "file": filename, "valid": true, "image": valid }),
        Err(err) => json!({ "file": filename, "valid": false, "error": err.to_string() }),
    }
}

/// Format image metadata.
pub fn format_inspect(filename: &str, info: &ImageInfo) -> Vec<String> {
    vec![
        filename.to_string(),
        format!(
            "{}{}x{} {} {}, {}",
            indent(1),
            info.width,
            info.height,
            info.format,
            info.mode,
            size(info.size_bytes)
        ),
    ]
}

pub fn print_inspect(filename: &str, info: &ImageInfo) {
    print_lines(format_inspect(filename, info));
}

pub fn inspect_json(filename: &str, info: &ImageInfo) -> Value {
    json!({ "file": filename, "image": info })
}

/// Print JSON records as one pretty-printed array.
pub fn print_json(records: Vec<Value>) {
    println!("{:#}", Value::Array(records));
}

// ============================================================================
// Single-output tools
// ============================================================================

/// Format a lossless tool result (blur, resize).
pub fn format_encoded(source: &str, output: &str, encoded: &Encoded) -> Vec<String> {
    vec![
        format!("{} \u{2192} {}", source, output),
        format!(
            "{}{}x{}, {}",
            indent(1),
            encoded.width,
            encoded.height,
            size(encoded.data.len())
        ),
    ]
}

pub fn print_encoded(source: &str, output: &str, encoded: &Encoded) {
    print_lines(format_encoded(source, output, encoded));
}

/// Format a lossy tool result (compress, strip) against the input size.
pub fn format_compressed(
    source: &str,
    output: &str,
    input_bytes: usize,
    compressed: &Compressed,
) -> Vec<String> {
    let target = compressed.target_bytes.zip(compressed.met_target());
    vec![
        format!("{} \u{2192} {}", source, output),
        format!(
            "{}{}, {}",
            indent(1),
            compressed_detail(compressed.quality, compressed.size_bytes, target),
            size_change(input_bytes, compressed.size_bytes)
        ),
    ]
}

pub fn print_compressed(source: &str, output: &str, input_bytes: usize, compressed: &Compressed) {
    print_lines(format_compressed(source, output, input_bytes, compressed));
}

// ============================================================================
// pack
// ============================================================================

/// Format the results of one pack run.
pub fn format_pack_results(source: &str, results: &[ProcessingResult]) -> Vec<String> {
    let noun = if results.len() == 1 { "output" } else { "outputs" };
    let mut lines = vec![format!("{} ({} {})", source, results.len(), noun)];

    for (i, result) in results.iter().enumerate() {
        lines.push(format!(
            "{}{} {} \u{2192} {}",
            indent(1),
            format_index(i + 1),
            result.name,
            result.filename
        ));
        let detail = match result.quality {
            Some(quality) => compressed_detail(
                quality,
                result.size_bytes,
                result.target_bytes.zip(result.met_target()),
            ),
            None => size(result.size_bytes),
        };
        lines.push(format!(
            "{}{}x{}, {}",
            indent(2),
            result.width,
            result.height,
            detail
        ));
    }
    lines
}

pub fn print_pack_results(source: &str, results: &[ProcessingResult]) {
    print_lines(format_pack_results(source, results));
}

// ============================================================================
// presets
// ============================================================================

/// Format the preset table, names padded to a common width.
pub fn format_presets(presets: &[SizePreset]) -> Vec<String> {
    let width = presets.iter().map(|p| p.name.len()).max().unwrap_or(0);
    presets
        .iter()
        .map(|p| format!("{:<width$}  {}x{}", p.name, p.width, p.height))
        .collect()
}

pub fn print_presets(presets: &[SizePreset]) {
    print_lines(format_presets(presets));
}
