use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};

use filigree::{
    Canvas, Config, ScalePolicy, TextStyle, TileConfig, WatermarkAsset, WatermarkSource,
    asset::{RenderedAsset, render_text_asset, render_text_asset_to},
    batch::run_batch,
    build,
    config::{
        DEFAULT_COLOR, DEFAULT_DENSITY, DEFAULT_FONT_SIZE, DEFAULT_OPACITY, DEFAULT_PERCENT,
        DEFAULT_ROTATION_DEGREES, FACTOR_TILED, FACTOR_UNTILED,
    },
    exec_ffmpeg::{FfmpegExecutor, is_ffmpeg_on_path},
    probe::{DimensionProbe as _, FfprobeProbe, is_ffprobe_on_path},
    serialize::to_filter_complex,
};

#[derive(Parser, Debug)]
#[command(name = "filigree", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Watermark every png/jpg/jpeg in a folder (requires `ffmpeg` and `ffprobe` on PATH).
    Run(RunArgs),
    /// Print the filter graph synthesized for a given canvas size.
    Graph(GraphArgs),
    /// Render the watermark text asset to a PNG and exit.
    Asset(AssetArgs),
}

#[derive(Parser, Debug)]
struct RunArgs {
    /// Folder with source images.
    #[arg(long = "in")]
    input: PathBuf,

    /// Output folder (defaults to <input>/watermarked).
    #[arg(long)]
    out: Option<PathBuf>,

    /// Watermark text to render.
    #[arg(long, conflicts_with = "watermark")]
    text: Option<String>,

    /// Pre-rendered watermark PNG with transparency (instead of --text).
    #[arg(long)]
    watermark: Option<PathBuf>,

    /// Font family for --text.
    #[arg(long, default_value = "sans-serif")]
    font: String,

    /// Font size in pixels (12..=200), --text mode only.
    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    font_size: u32,

    /// Watermark opacity (0..=1).
    #[arg(long, default_value_t = DEFAULT_OPACITY)]
    opacity: f64,

    /// Rotation angle in degrees (-180..=180), --text mode only.
    #[arg(long, default_value_t = DEFAULT_ROTATION_DEGREES)]
    angle: f64,

    /// Text color as #RRGGBB, --text mode only.
    #[arg(long, default_value = DEFAULT_COLOR)]
    color: String,

    /// Disable tiling (single centered placement).
    #[arg(long, default_value_t = false)]
    no_tile: bool,

    /// Tile grid density (1..=10), --text mode only.
    #[arg(long, default_value_t = DEFAULT_DENSITY)]
    density: u32,

    /// Watermark width as a percent of canvas width, --watermark mode only.
    #[arg(long, default_value_t = DEFAULT_PERCENT)]
    percent: f64,
}

#[derive(Parser, Debug)]
struct GraphArgs {
    /// Canvas width in pixels.
    #[arg(long)]
    width: u32,

    /// Canvas height in pixels.
    #[arg(long)]
    height: u32,

    /// Watermark asset width in pixels.
    #[arg(long)]
    wm_width: u32,

    /// Watermark asset height in pixels.
    #[arg(long)]
    wm_height: u32,

    #[arg(long, default_value_t = DEFAULT_OPACITY)]
    opacity: f64,

    #[arg(long, default_value_t = DEFAULT_DENSITY)]
    density: u32,

    /// Disable tiling (single centered placement).
    #[arg(long, default_value_t = false)]
    no_tile: bool,

    /// Use the fixed 2x2 grid policy with percent-of-width scaling.
    #[arg(long, default_value_t = false)]
    fixed_grid: bool,

    #[arg(long, default_value_t = DEFAULT_PERCENT)]
    percent: f64,

    /// Print the graph as JSON instead of ffmpeg filter syntax.
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(Parser, Debug)]
struct AssetArgs {
    /// Watermark text to render.
    #[arg(long)]
    text: String,

    #[arg(long, default_value = "sans-serif")]
    font: String,

    #[arg(long, default_value_t = DEFAULT_FONT_SIZE)]
    font_size: u32,

    #[arg(long, default_value = DEFAULT_COLOR)]
    color: String,

    #[arg(long, default_value_t = DEFAULT_ROTATION_DEGREES)]
    angle: f64,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Run(args) => cmd_run(args),
        Command::Graph(args) => cmd_graph(args),
        Command::Asset(args) => cmd_asset(args),
    }
}

fn init_logging() {
    use tracing_subscriber::{EnvFilter, fmt};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();
}

fn run_config(args: &RunArgs) -> anyhow::Result<Config> {
    let tile = !args.no_tile;
    let (source, scale, tiling) = match (&args.text, &args.watermark) {
        (Some(text), None) => (
            WatermarkSource::Text(TextStyle {
                text: text.clone(),
                font_family: args.font.clone(),
                font_size: args.font_size,
                color: args.color.clone(),
                rotation_degrees: args.angle,
            }),
            ScalePolicy::ProportionOfCanvas {
                factor_tiled: FACTOR_TILED,
                factor_untiled: FACTOR_UNTILED,
            },
            if tile {
                TileConfig::Spread {
                    density: args.density,
                }
            } else {
                TileConfig::None
            },
        ),
        (None, Some(path)) => (
            WatermarkSource::ImageFile { path: path.clone() },
            ScalePolicy::PercentOfCanvasWidth {
                percent: args.percent,
            },
            if tile {
                TileConfig::FixedGrid
            } else {
                TileConfig::None
            },
        ),
        _ => bail!("exactly one of --text or --watermark is required"),
    };

    Ok(Config {
        source,
        opacity: args.opacity,
        scale,
        tiling,
        input_dir: args.input.clone(),
        output_dir: args.out.clone(),
    })
}

fn cmd_run(args: RunArgs) -> anyhow::Result<()> {
    let cfg = run_config(&args)?;
    cfg.validate()?;

    if !is_ffmpeg_on_path() {
        bail!("ffmpeg is required but was not found on PATH");
    }
    if !is_ffprobe_on_path() {
        bail!("ffprobe is required but was not found on PATH");
    }

    let probe = FfprobeProbe;
    let executor = FfmpegExecutor;

    let (_asset_guard, asset, asset_path): (Option<RenderedAsset>, WatermarkAsset, PathBuf) =
        match &cfg.source {
            WatermarkSource::Text(style) => {
                let rendered = render_text_asset(style)?;
                let asset = WatermarkAsset {
                    width: rendered.width,
                    height: rendered.height,
                    opacity: cfg.opacity,
                };
                let path = rendered.path().to_path_buf();
                (Some(rendered), asset, path)
            }
            WatermarkSource::ImageFile { path } => {
                let (width, height) = probe.probe(path)?;
                let asset = WatermarkAsset {
                    width,
                    height,
                    opacity: cfg.opacity,
                };
                (None, asset, path.clone())
            }
        };

    let output_dir = cfg.output_dir();
    let summary = run_batch(
        &cfg.input_dir,
        &output_dir,
        asset,
        &asset_path,
        &cfg.scale,
        &cfg.tiling,
        &probe,
        &executor,
    )?;

    if summary.fully_successful() {
        eprintln!(
            "watermarked {} images into {}",
            summary.succeeded,
            output_dir.display()
        );
        Ok(())
    } else {
        bail!(
            "{} of {} files failed (see log), output in {}",
            summary.total - summary.succeeded,
            summary.total,
            output_dir.display()
        );
    }
}

fn cmd_graph(args: GraphArgs) -> anyhow::Result<()> {
    let canvas = Canvas::new(args.width, args.height)?;
    let asset = WatermarkAsset {
        width: args.wm_width,
        height: args.wm_height,
        opacity: args.opacity,
    };
    let tile = !args.no_tile;
    let (scale, tiling) = if args.fixed_grid {
        (
            ScalePolicy::PercentOfCanvasWidth {
                percent: args.percent,
            },
            if tile {
                TileConfig::FixedGrid
            } else {
                TileConfig::None
            },
        )
    } else {
        (
            ScalePolicy::ProportionOfCanvas {
                factor_tiled: FACTOR_TILED,
                factor_untiled: FACTOR_UNTILED,
            },
            if tile {
                TileConfig::Spread {
                    density: args.density,
                }
            } else {
                TileConfig::None
            },
        )
    };

    let graph = build(canvas, asset, &scale, &tiling)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&graph)?);
    } else {
        println!("{}", to_filter_complex(&graph)?);
    }
    Ok(())
}

fn cmd_asset(args: AssetArgs) -> anyhow::Result<()> {
    let style = TextStyle {
        text: args.text,
        font_family: args.font,
        font_size: args.font_size,
        color: args.color,
        rotation_degrees: args.angle,
    };
    let rendered = render_text_asset_to(&style, &args.out)?;
    eprintln!(
        "wrote {} ({}x{})",
        args.out.display(),
        rendered.width,
        rendered.height
    );
    Ok(())
}
