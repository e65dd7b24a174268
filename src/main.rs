use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use clipforge::{
    config::Config,
    directive,
    editor::{EditResult, Editor},
    imaging::ImageParams,
    output::NamingMode,
};

#[derive(Parser)]
#[command(
    name = "clipforge",
    version,
    about = "Edit videos and images with plain-text instructions",
    long_about = "Clipforge turns instructions like \"trim 0 to 5, grayscale, speed up 2\" into an ordered set of edits and applies them to a video using ffmpeg."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Configuration file (optional)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Directory for output files
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Use fixed output names (cut1.mp4, edited_video.mp4, ...) instead of unique ones
    #[arg(long, global = true)]
    legacy_names: bool,

    /// Worker threads for frame processing
    #[arg(short, long, global = true)]
    threads: Option<usize>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Apply plain-text edit instructions to a video
    Edit {
        /// Input video
        input: PathBuf,

        /// Instructions, e.g. "trim 0 to 5, grayscale, speed up 2"
        text: String,
    },

    /// Cut three segments (START:END in seconds) out of a video
    Cut {
        /// Input video
        input: PathBuf,

        /// Three ranges such as 0:5 10:15 20:25
        #[arg(num_args = 3, required = true, value_parser = parse_range)]
        ranges: Vec<(f64, f64)>,
    },

    /// Concatenate videos in order
    Merge {
        /// Input videos
        #[arg(num_args = 1.., required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Resize a video to 480p, 720p, 1080p, 1440p or 4K
    Resolution {
        /// Input video
        input: PathBuf,

        /// Target quality label
        quality: String,
    },

    /// Adjust an image and write it as a JPEG
    Image(ImageArgs),

    /// Print the operations found in an instruction without touching media
    Ops {
        /// Instructions to parse
        text: String,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the effective configuration to a TOML file
    InitConfig {
        /// Destination file
        #[arg(default_value = "clipforge.toml")]
        path: PathBuf,
    },
}

#[derive(Args)]
struct ImageArgs {
    /// Input image
    input: PathBuf,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    brightness: i32,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    contrast: i32,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    hue: i32,

    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    saturation: i32,

    /// Mirror horizontally
    #[arg(long)]
    flip: bool,

    #[arg(long)]
    grayscale: bool,

    /// Counter-clockwise rotation in degrees (0-180)
    #[arg(long, default_value_t = 0.0)]
    rotate: f64,

    /// Gaussian blur radius (0-10)
    #[arg(long, default_value_t = 0)]
    blur: u32,

    #[arg(long)]
    sharpen: bool,

    /// Crop to the centered square
    #[arg(long)]
    crop: bool,
}

impl From<&ImageArgs> for ImageParams {
    fn from(args: &ImageArgs) -> Self {
        Self {
            brightness: args.brightness,
            contrast: args.contrast,
            hue: args.hue,
            saturation: args.saturation,
            flip: args.flip,
            grayscale: args.grayscale,
            rotate_degrees: args.rotate,
            blur_radius: args.blur,
            sharpen: args.sharpen,
            crop: args.crop,
        }
    }
}

fn parse_range(s: &str) -> std::result::Result<(f64, f64), String> {
    let (start, end) = s
        .split_once(':')
        .ok_or_else(|| format!("expected START:END, got '{}'", s))?;
    let start = start.trim().parse::<f64>().map_err(|e| format!("bad start '{}': {}", start, e))?;
    let end = end.trim().parse::<f64>().map_err(|e| format!("bad end '{}': {}", end, e))?;
    Ok((start, end))
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level.to_string().to_lowercase()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting clipforge v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    let result = match cli.command {
        Command::Ops { text, json } => return print_ops(&text, json),
        Command::InitConfig { path } => {
            config
                .save_to_file(&path)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("Wrote {}", path.display());
            return Ok(ExitCode::SUCCESS);
        }
        Command::Edit { input, text } => Editor::with_ffmpeg(config)?.edit_video(Some(input.as_path()), &text),
        Command::Cut { input, ranges } => {
            let ranges: [(f64, f64); 3] = ranges
                .as_slice()
                .try_into()
                .context("cut takes exactly three ranges")?;
            Editor::with_ffmpeg(config)?.cut_video(Some(input.as_path()), ranges)
        }
        Command::Merge { inputs } => {
            let inputs: Vec<_> = inputs.iter().map(|p| Some(p.as_path())).collect();
            Editor::with_ffmpeg(config)?.merge_videos(&inputs)
        }
        Command::Resolution { input, quality } => {
            Editor::with_ffmpeg(config)?.change_resolution(Some(input.as_path()), &quality)
        }
        Command::Image(args) => {
            let params = ImageParams::from(&args);
            Editor::with_ffmpeg(config)?.edit_image(Some(args.input.as_path()), &params)
        }
    };

    Ok(report(&result))
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Config::from_file(path)?
        }
        None => Config::default(),
    };

    if let Some(dir) = &cli.output_dir {
        config.output.dir = dir.clone();
    }
    if cli.legacy_names {
        config.output.naming = NamingMode::Legacy;
    }
    if let Some(threads) = cli.threads {
        config.processing.threads = threads;
    }

    config.validate()?;
    Ok(config)
}

fn print_ops(text: &str, json: bool) -> Result<ExitCode> {
    let ops = directive::extract(text);
    if json {
        println!("{}", serde_json::to_string_pretty(&ops)?);
    } else if ops.is_empty() {
        println!("No operations recognized");
    } else {
        for (i, op) in ops.iter().enumerate() {
            println!("{}. {}", i + 1, op);
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn report(result: &EditResult) -> ExitCode {
    if result.is_success() {
        println!("{}", result.message);
        for output in &result.outputs {
            println!("  {}", output.display());
        }
        ExitCode::SUCCESS
    } else {
        eprintln!("{}", result.message);
        ExitCode::FAILURE
    }
}
