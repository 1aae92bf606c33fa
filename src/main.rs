use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use rayon::prelude::*;
use scale_hub::config::{self, HubConfig};
use scale_hub::imaging::{self, BlurRadius, Quality, ResizeMode};
use scale_hub::naming::{Tool, file_stem, output_filename, sanitize_filename};
use scale_hub::output;
use scale_hub::pack::{self, PackConfig, ProcessingResult};
use std::path::{Path, PathBuf};

type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

#[derive(Parser)]
#[command(name = "scale-hub")]
#[command(about = "Resize, letterbox and compress images for social and web")]
#[command(long_about = "\
Resize, letterbox and compress images for social and web

Every input is validated before it is processed: size limit, extension
allow-list, magic bytes matching the extension, decodability, dimension
bounds and a scan for embedded script.

Tools:
  blur      Fit the image onto an exact canvas over a blurred copy of itself
  resize    Percentage, exact, single-side or bounding-box resize
  compress  JPEG at a fixed quality, or the best quality under a byte budget
  strip     Re-encode at high quality to drop EXIF and other metadata
  pack      Render a JSON list of named outputs from each input

Outputs are written to --output, named after the input:
  beach.jpg → beach-blur-1080x1350.png, beach-compressed-213kb.jpg

Run 'scale-hub gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output directory
    #[arg(long, default_value = ".", global = true)]
    output: PathBuf,

    #[command(flatten)]
    verbose: Verbosity<WarnLevel>,

    #[command(subcommand)]
    command: Command,
}

/// Target canvas given either as explicit sides or as a preset name.
#[derive(Args, Clone)]
struct TargetArgs {
    /// Target width in pixels
    #[arg(long, requires = "height", conflicts_with = "preset")]
    width: Option<u32>,

    /// Target height in pixels
    #[arg(long, requires = "width", conflicts_with = "preset")]
    height: Option<u32>,

    /// Named size, e.g. "Story" (see `scale-hub presets`)
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Args, Clone)]
struct ResizeArgs {
    /// Uniform scale in percent
    #[arg(long, conflicts_with_all = ["width", "height", "max_width", "max_height", "preset"])]
    percent: Option<f64>,

    /// Output width; with --height the image is stretched to both
    #[arg(long, conflicts_with_all = ["max_width", "max_height", "preset"])]
    width: Option<u32>,

    /// Output height; with --width the image is stretched to both
    #[arg(long, conflicts_with_all = ["max_width", "max_height", "preset"])]
    height: Option<u32>,

    /// Shrink to fit this width, never enlarging
    #[arg(long, conflicts_with = "preset")]
    max_width: Option<u32>,

    /// Shrink to fit this height, never enlarging
    #[arg(long, conflicts_with = "preset")]
    max_height: Option<u32>,

    /// Exact size from a named preset
    #[arg(long)]
    preset: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Check uploads against the configured policy
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print a JSON array instead of text
        #[arg(long)]
        json: bool,
    },
    /// Show dimensions, format and pixel mode
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Print a JSON array instead of text
        #[arg(long)]
        json: bool,
    },
    /// Letterbox onto an exact canvas over a blurred copy of the image
    Blur {
        file: PathBuf,
        #[command(flatten)]
        target: TargetArgs,
        /// Blur sigma (overrides config)
        #[arg(long)]
        blur: Option<f32>,
        /// Output name without extension
        #[arg(long)]
        name: Option<String>,
    },
    /// Resize by percentage, exact size, one side or bounding box
    Resize {
        file: PathBuf,
        #[command(flatten)]
        mode: ResizeArgs,
        /// Output name without extension
        #[arg(long)]
        name: Option<String>,
    },
    /// Re-encode as JPEG at a quality or under a size budget
    Compress {
        file: PathBuf,
        /// JPEG quality 1-100 (overrides config)
        #[arg(
            long,
            conflicts_with = "target_kb",
            value_parser = clap::value_parser!(u32).range(1..=100)
        )]
        quality: Option<u32>,
        /// Largest acceptable output in kilobytes
        #[arg(long)]
        target_kb: Option<usize>,
        /// Output name without extension
        #[arg(long)]
        name: Option<String>,
    },
    /// Drop EXIF and other embedded metadata
    Strip {
        file: PathBuf,
        /// Output name without extension
        #[arg(long)]
        name: Option<String>,
    },
    /// Render every output of a JSON pack from each input
    Pack {
        /// Pack description: {"outputs": [{"name", "width", "height", "method", ...}]}
        pack: PathBuf,
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List the configured size presets
    Presets,
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    env_logger::Builder::new()
        .filter_level(cli.verbose.log_level_filter())
        .format_timestamp(None)
        .init();

    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Validate { files, json } => {
            let policy = config.upload.policy();
            let mut rejected = 0;
            let mut records = Vec::new();
            for file in &files {
                let data = std::fs::read(file)?;
                let name = display_name(file);
                let outcome = policy.validate(&data, &name);
                if outcome.is_err() {
                    rejected += 1;
                }
                if json {
                    records.push(output::validation_json(&name, &outcome));
                } else {
                    output::print_validation(&name, &outcome);
                }
            }
            if json {
                output::print_json(records);
            }
            if rejected > 0 {
                return Err(format!("{rejected} of {} files rejected", files.len()).into());
            }
        }
        Command::Inspect { files, json } => {
            let backend = config.backend();
            let mut records = Vec::new();
            for file in &files {
                let data = std::fs::read(file)?;
                let info = imaging::inspect(&backend, &data)
                    .map_err(|e| format!("{}: {e}", display_name(file)))?;
                if json {
                    records.push(output::inspect_json(&display_name(file), &info));
                } else {
                    output::print_inspect(&display_name(file), &info);
                }
            }
            if json {
                output::print_json(records);
            }
        }
        Command::Blur {
            file,
            target,
            blur,
            name,
        } => {
            let data = read_upload(&config, &file)?;
            let (width, height) = resolve_target(&config, &target)?;
            let mut settings = config.compositor.composite_config();
            if let Some(sigma) = blur {
                settings.blur_radius = BlurRadius::new(sigma);
            }
            let encoded = imaging::composite(
                &config.backend(),
                &data,
                width,
                height,
                &settings,
            )?;
            let out = output_filename(
                &display_name(&file),
                Tool::Blur { width, height },
                name.as_deref(),
            );
            write_output(&cli.output, &out, &encoded.data)?;
            output::print_encoded(&display_name(&file), &out, &encoded);
        }
        Command::Resize { file, mode, name } => {
            let data = read_upload(&config, &file)?;
            let mode = resolve_resize_mode(&config, &mode)?;
            let encoded = imaging::resize(&config.backend(), &data, mode)?;
            let out = output_filename(
                &display_name(&file),
                Tool::Resize {
                    width: encoded.width,
                    height: encoded.height,
                },
                name.as_deref(),
            );
            write_output(&cli.output, &out, &encoded.data)?;
            output::print_encoded(&display_name(&file), &out, &encoded);
        }
        Command::Compress {
            file,
            quality,
            target_kb,
            name,
        } => {
            let data = read_upload(&config, &file)?;
            let backend = config.backend();
            let compressed = match target_kb {
                Some(kb) => imaging::compress_to_target(&backend, &data, target_bytes(kb)?)?,
                None => {
                    let quality = quality
                        .map(Quality::new)
                        .unwrap_or_else(|| config.compressor.quality());
                    imaging::compress(&backend, &data, quality)?
                }
            };
            let out = output_filename(
                &display_name(&file),
                Tool::Compress {
                    size_bytes: compressed.size_bytes,
                },
                name.as_deref(),
            );
            write_output(&cli.output, &out, &compressed.data)?;
            output::print_compressed(&display_name(&file), &out, data.len(), &compressed);
        }
        Command::Strip { file, name } => {
            let data = read_upload(&config, &file)?;
            let clean = imaging::strip_metadata(&config.backend(), &data)?;
            let out = output_filename(&display_name(&file), Tool::Strip, name.as_deref());
            write_output(&cli.output, &out, &clean.data)?;
            output::print_compressed(&display_name(&file), &out, data.len(), &clean);
        }
        Command::Pack { pack, files } => {
            let pack_config = PackConfig::from_json(&std::fs::read_to_string(&pack)?)?;
            init_thread_pool(&config.processing);
            let runs = run_packs(&config, &pack_config, &files)?;

            // One subdirectory per input keeps names unique across inputs.
            let nested = files.len() > 1;
            for (file, results) in files.iter().zip(&runs) {
                let dir = if nested {
                    cli.output.join(sanitize_filename(file_stem(&display_name(file))))
                } else {
                    cli.output.clone()
                };
                for result in results {
                    write_output(&dir, &result.filename, &result.data)?;
                }
                output::print_pack_results(&display_name(file), results);
            }
        }
        Command::Presets => {
            output::print_presets(&config.presets);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load `--config`, or `./config.toml` when it exists, or stock defaults.
fn load_config(path: Option<&Path>) -> CliResult<HubConfig> {
    match path {
        Some(path) if !path.exists() => {
            Err(format!("config file not found: {}", path.display()).into())
        }
        Some(path) => Ok(config::load_config(path)?),
        None => Ok(config::load_config(Path::new("config.toml"))?),
    }
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores — user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}

/// Run the pack on every input in parallel; results keep input order.
fn run_packs(
    config: &HubConfig,
    pack_config: &PackConfig,
    files: &[PathBuf],
) -> CliResult<Vec<Vec<ProcessingResult>>> {
    let backend = config.backend();
    let settings = config.pack_settings();
    let generated_at = chrono::Local::now().naive_local();

    files
        .par_iter()
        .map(|file| -> CliResult<Vec<ProcessingResult>> {
            let data = read_upload(config, file)?;
            log::info!("packing {}", file.display());
            Ok(pack::run_pack(
                &backend,
                &data,
                pack_config,
                &settings,
                generated_at,
            )?)
        })
        .collect()
}

/// Read a file and run it through the upload policy.
fn read_upload(config: &HubConfig, path: &Path) -> CliResult<Vec<u8>> {
    let data = std::fs::read(path)?;
    let name = display_name(path);
    config
        .upload
        .policy()
        .validate(&data, &name)
        .map_err(|e| format!("{name}: {e}"))?;
    Ok(data)
}

fn write_output(dir: &Path, filename: &str, data: &[u8]) -> CliResult<()> {
    std::fs::create_dir_all(dir)?;
    let path = dir.join(filename);
    std::fs::write(&path, data)?;
    log::debug!("wrote {} ({} bytes)", path.display(), data.len());
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Convert `--target-kb` to bytes.
fn target_bytes(kb: usize) -> CliResult<usize> {
    kb.checked_mul(1024)
        .ok_or_else(|| format!("--target-kb {kb} is too large").into())
}

fn find_preset(config: &HubConfig, name: &str) -> CliResult<(u32, u32)> {
    config
        .find_preset(name)
        .map(|p| (p.width, p.height))
        .ok_or_else(|| format!("unknown preset '{name}' (see `scale-hub presets`)").into())
}

fn resolve_target(config: &HubConfig, target: &TargetArgs) -> CliResult<(u32, u32)> {
    match (&target.preset, target.width, target.height) {
        (Some(name), _, _) => find_preset(config, name),
        (None, Some(width), Some(height)) => Ok((width, height)),
        _ => Err("give --width and --height, or --preset".into()),
    }
}

fn resolve_resize_mode(config: &HubConfig, args: &ResizeArgs) -> CliResult<ResizeMode> {
    if let Some(name) = &args.preset {
        let (width, height) = find_preset(config, name)?;
        return Ok(ResizeMode::Exact { width, height });
    }
    let mode = match (args.percent, args.width, args.height) {
        (Some(percent), _, _) => ResizeMode::Percentage(percent),
        (None, Some(width), Some(height)) => ResizeMode::Exact { width, height },
        (None, Some(width), None) => ResizeMode::ExactWidth(width),
        (None, None, Some(height)) => ResizeMode::ExactHeight(height),
        (None, None, None) if args.max_width.is_some() || args.max_height.is_some() => {
            ResizeMode::BoundingBox {
                max_width: args.max_width,
                max_height: args.max_height,
            }
        }
        _ => {
            return Err(
                "give one of --percent, --width/--height, --max-width/--max-height or --preset"
                    .into(),
            );
        }
    };
    Ok(mode)
}
