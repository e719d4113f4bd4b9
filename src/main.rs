use clap::{Args, Parser, Subcommand};
use simple_convert::batch::{BatchRunner, BatchSummary};
use simple_convert::config::{self, AppConfig};
use simple_convert::formats::OutputFormat;
use simple_convert::imaging::{Factor, Operation, Quality, ResizeSpec, RustBackend};
use simple_convert::preset::{Adjustments, Preset, PresetStore};
use simple_convert::types::{CollisionPolicy, ImageJob, RunState, legacy_jobs};
use simple_convert::{output, scan};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "simple-convert")]
#[command(about = "Batch image converter")]
#[command(long_about = "\
Batch image converter

Give it files or folders and a chain of operations. Every image is decoded,
run through the operations left to right and written in the target format.
A file that fails is reported and the batch carries on.

Operations (--op, repeatable, applied in order):
  grayscale                 luminance, alpha kept          → \"<name> - Grayscale\"
  invert                    invert colours, alpha kept     → \"<name> - Inverted\"
  brightness=1.2            also contrast=, saturation=, sharpness= (1.0 = unchanged)
  resize=800x600            fit inside the box, never upscale
  resize=800x | resize=x600 scale by one edge
  resize=!800x600           exact size
  convert[=jpeg]            flatten to the target format's colour model now
  strip-metadata            drop the source's EXIF from the output
  strip-gps                 drop only GPS tags from the source's EXIF

EXIF rotation is always applied to the pixels. JPEG and WebP outputs keep
the source's remaining EXIF unless it is stripped.

Examples:
  simple-convert convert photos/ --op grayscale --op invert
  simple-convert convert a.png b.jpg --op resize=1920x1080 --format webp -o out/
  simple-convert convert photos/ --preset \"Email Friendly\"
  simple-convert legacy photos/ --grayscale --invert

Run 'simple-convert gen-config' to generate a documented simple-convert.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: simple-convert.toml in the working directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run an operation chain over files and folders
    Convert(ConvertArgs),
    /// Grayscale and/or invert every image in a folder, writing beside the originals
    Legacy {
        folder: PathBuf,
        #[arg(long)]
        grayscale: bool,
        #[arg(long)]
        invert: bool,
        /// Output format (default: from config)
        #[arg(long)]
        format: Option<OutputFormat>,
    },
    /// Show size, format, dimensions and orientation of images
    Info {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// List writable output formats
    Formats,
    /// Manage conversion presets
    Presets {
        #[command(subcommand)]
        command: PresetCommand,
    },
    /// Print a stock simple-convert.toml with all options documented
    GenConfig,
}

#[derive(Args)]
struct ConvertArgs {
    /// Image files and folders
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Operation to apply; repeat for a chain
    #[arg(long = "op", value_name = "OP")]
    ops: Vec<String>,

    /// Output format
    #[arg(short, long)]
    format: Option<OutputFormat>,

    /// Quality for lossy formats (1-100)
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,

    /// Output directory (default: beside each source)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Start from a saved preset; --op values run after the preset's operations
    #[arg(long)]
    preset: Option<String>,

    /// Filename template, e.g. "{name}_{date}{ext}"
    #[arg(long)]
    naming: Option<String>,

    /// overwrite, auto-increment or skip
    #[arg(long)]
    on_collision: Option<CollisionPolicy>,

    /// Descend into subfolders
    #[arg(short, long)]
    recursive: bool,

    /// Read p (pause), r (resume), s (stop) from stdin while running
    #[arg(long)]
    interactive: bool,
}

#[derive(Subcommand)]
enum PresetCommand {
    /// List presets
    List,
    /// Show one preset
    Show { name: String },
    /// Create or replace a preset
    Save(SavePresetArgs),
    /// Delete a preset
    Delete { name: String },
    /// Write a preset to a JSON file
    Export { name: String, path: PathBuf },
    /// Add a preset from a JSON file
    Import {
        path: PathBuf,
        /// Store under this name instead of the file name
        #[arg(long)]
        name: Option<String>,
    },
}

#[derive(Args)]
struct SavePresetArgs {
    name: String,
    #[arg(long)]
    format: Option<OutputFormat>,
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    quality: Option<u32>,
    /// Resize box, e.g. 1920x1080 or !800x600
    #[arg(long)]
    resize: Option<ResizeSpec>,
    #[arg(long)]
    brightness: Option<f32>,
    #[arg(long)]
    contrast: Option<f32>,
    #[arg(long)]
    saturation: Option<f32>,
    #[arg(long)]
    sharpness: Option<f32>,
    #[arg(long)]
    strip_metadata: bool,
    #[arg(long)]
    strip_gps: bool,
    #[arg(long, default_value = "")]
    description: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    let cli = Cli::parse();

    let cwd = std::env::current_dir()?;
    let load = || config::load_config(cli.config.as_deref(), &cwd);

    match cli.command {
        Command::Convert(args) => {
            let summary = convert(&load()?, args)?;
            exit_on_failures(&summary);
        }
        Command::Legacy {
            folder,
            grayscale,
            invert,
            format,
        } => {
            let config = load()?;
            let sources = scan::collect_sources(&[folder], false)?;
            let mut settings = config.output_settings(None);
            if let Some(format) = format {
                settings.format = format;
            }
            let jobs = legacy_jobs(&sources, grayscale, invert, &settings)?;
            let summary = run_batch(&config, jobs, false)?;
            exit_on_failures(&summary);
        }
        Command::Info { files } => {
            let backend = RustBackend::new();
            for file in &files {
                let info = simple_convert::info::inspect(&backend, file)?;
                output::print_info(&info);
            }
        }
        Command::Formats => output::print_formats(),
        Command::Presets { command } => presets(&load()?, command)?,
        Command::GenConfig => print!("{}", config::stock_config_toml()),
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "simple_convert=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact(),
        )
        .init();
}

fn open_presets(config: &AppConfig) -> Result<PresetStore, Box<dyn std::error::Error>> {
    let dir = config
        .preset_dir()
        .ok_or("no config directory on this platform; set [presets] directory")?;
    let store = PresetStore::open(dir)?;
    let written = store.ensure_defaults()?;
    if written > 0 {
        info!(count = written, dir = %store.dir().display(), "created default presets");
    }
    Ok(store)
}

fn convert(config: &AppConfig, args: ConvertArgs) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let sources = scan::collect_sources(&args.inputs, args.recursive)?;

    let mut settings = config.output_settings(args.output_dir);
    let mut operations = Vec::new();
    if let Some(name) = &args.preset {
        let preset = open_presets(config)?.load(name)?;
        settings.format = preset.format;
        settings.quality = preset.quality;
        operations = preset.operations();
    }
    if let Some(format) = args.format {
        settings.format = format;
    }
    if let Some(quality) = args.quality {
        settings.quality = Quality::new(quality);
    }
    if let Some(naming) = args.naming {
        simple_convert::naming::validate_template(&naming)?;
        settings.naming = naming;
    }
    if let Some(policy) = args.on_collision {
        settings.on_collision = policy;
    }

    let mut defaults = config.operation_defaults();
    defaults.format = settings.format;
    for op in &args.ops {
        operations.push(Operation::parse(op, &defaults)?);
    }

    if sources.is_empty() {
        warn!("no images found");
    }
    let jobs = sources
        .into_iter()
        .map(|source| ImageJob::new(source, operations.clone(), &settings))
        .collect();
    run_batch(config, jobs, args.interactive)
}

/// Run jobs on the worker thread, printing events as they arrive.
fn run_batch(
    config: &AppConfig,
    jobs: Vec<ImageJob>,
    interactive: bool,
) -> Result<BatchSummary, Box<dyn std::error::Error>> {
    let runner = BatchRunner::new(Arc::new(RustBackend::new()))
        .with_event_capacity(config.batch.event_capacity);
    let (handle, events) = runner.spawn(jobs)?;

    if interactive {
        let control = handle.control().clone();
        eprintln!("Controls: p = pause, r = resume, s = stop (then Enter)");
        // Not joined: it may sit in a blocking read after the batch ends.
        std::thread::Builder::new()
            .name("stdin-control".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let Ok(line) = line else { break };
                    let accepted = match line.trim() {
                        "p" => control.pause(),
                        "r" => control.resume(),
                        "s" => control.stop(),
                        _ => continue,
                    };
                    if !accepted {
                        eprintln!("Ignored: batch is {}", control.state());
                    } else if control.state() == RunState::Stopping {
                        eprintln!("Stopping after the current image");
                    }
                    if control.state().is_finished() {
                        break;
                    }
                }
            })?;
    }

    for event in events {
        output::print_batch_event(&event);
    }
    Ok(handle.join()?)
}

fn exit_on_failures(summary: &BatchSummary) {
    if summary.failed > 0 || summary.state == RunState::Stopped {
        std::process::exit(1);
    }
}

fn presets(config: &AppConfig, command: PresetCommand) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_presets(config)?;
    match command {
        PresetCommand::List => {
            let mut presets = Vec::new();
            for name in store.list()? {
                match store.load(&name) {
                    Ok(preset) => presets.push((name, preset)),
                    Err(e) => warn!(preset = %name, error = %e, "unreadable preset"),
                }
            }
            output::print_lines(&output::format_preset_list(&presets));
        }
        PresetCommand::Show { name } => {
            let preset = store.load(&name)?;
            output::print_lines(&output::format_preset(&name, &preset));
        }
        PresetCommand::Save(args) => {
            let preset = preset_from_args(config, &args);
            let path = store.save(&args.name, preset)?;
            println!("Saved preset '{}' to {}", args.name, path.display());
        }
        PresetCommand::Delete { name } => {
            store.delete(&name)?;
            println!("Deleted preset '{name}'");
        }
        PresetCommand::Export { name, path } => {
            store.export(&name, &path)?;
            println!("Exported '{name}' to {}", path.display());
        }
        PresetCommand::Import { path, name } => {
            let name = store.import(&path, name.as_deref())?;
            println!("Imported preset '{name}'");
        }
    }
    Ok(())
}

fn preset_from_args(config: &AppConfig, args: &SavePresetArgs) -> Preset {
    let factor = |value: Option<f32>| value.map(Factor::new).unwrap_or_default();
    Preset {
        format: args.format.unwrap_or(config.output.format),
        quality: Quality::new(args.quality.unwrap_or(config.output.quality)),
        resize: args.resize,
        adjustments: Adjustments {
            brightness: factor(args.brightness),
            contrast: factor(args.contrast),
            saturation: factor(args.saturation),
            sharpness: factor(args.sharpness),
        },
        strip_metadata: args.strip_metadata,
        strip_gps: args.strip_gps,
        description: args.description.clone(),
        created: None,
    }
}
