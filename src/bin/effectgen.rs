use std::path::PathBuf;

use anyhow::{Context as _, bail};
use clap::{Args, Parser, Subcommand};

use effectgen::{EffectRegistry, EffectSpec, GeneratorConfig, OutputTarget, ToolPaths};

/// Duration used when nothing else determines the output length.
const DEFAULT_DURATION_SECS: f64 = 5.0;

#[derive(Parser, Debug)]
#[command(name = "effectgen", version, about = "Procedural video effect generator")]
struct Cli {
    /// More log output (repeat for trace).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List available effects.
    List {
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Show an effect's description and options.
    Describe {
        /// Effect name.
        effect: String,
        /// Print machine-readable JSON.
        #[arg(long)]
        json: bool,
    },
    /// Generate a video (requires `ffmpeg` unless the output is `-`).
    Render(Box<RenderArgs>),
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// JSON run configuration; flags override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Effect to apply, in order. Replaces the configured chain.
    #[arg(long = "effect", value_name = "NAME")]
    effects: Vec<String>,

    /// Effect parameter, e.g. `mist.opacity=0.4`.
    #[arg(long = "param", value_name = "NAME.KEY=VALUE")]
    params: Vec<String>,

    /// Output width in pixels.
    #[arg(long)]
    width: Option<u32>,
    /// Output height in pixels.
    #[arg(long)]
    height: Option<u32>,
    /// Output frame rate.
    #[arg(long)]
    fps: Option<u32>,
    /// Output length in seconds (default: background video length, else 5).
    #[arg(long)]
    duration: Option<f64>,
    /// Fade in/out length in seconds.
    #[arg(long)]
    fade: Option<f64>,
    /// Maximum effect opacity during fades (0..=1).
    #[arg(long)]
    max_fade: Option<f64>,
    /// Seconds of effect simulation before the first frame.
    #[arg(long)]
    warmup: Option<f64>,

    /// Still image background.
    #[arg(long, conflicts_with = "background_video")]
    background_image: Option<PathBuf>,
    /// Video background.
    #[arg(long)]
    background_video: Option<PathBuf>,

    /// Constant rate factor.
    #[arg(long)]
    crf: Option<u8>,
    /// Copy the background video's audio with this codec (e.g. `aac`).
    #[arg(long)]
    audio_codec: Option<String>,
    /// Audio bitrate in kbit/s.
    #[arg(long)]
    audio_bitrate: Option<u32>,

    /// Frames buffered between stages.
    #[arg(long)]
    queue_capacity: Option<usize>,

    /// Output file, or `-` for raw rgb24 frames on stdout.
    #[arg(long, short)]
    output: Option<String>,
    /// Overwrite the output file if it already exists.
    #[arg(long)]
    overwrite: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    let registry = EffectRegistry::builtin();
    match cli.cmd {
        Command::List { json } => cmd_list(&registry, json),
        Command::Describe { effect, json } => cmd_describe(&registry, &effect, json),
        Command::Render(args) => cmd_render(&registry, *args),
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => tracing::Level::ERROR,
        (false, 0) => tracing::Level::INFO,
        (false, 1) => tracing::Level::DEBUG,
        (false, _) => tracing::Level::TRACE,
    };
    // stdout may carry raw frames.
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn cmd_list(registry: &EffectRegistry, json: bool) -> anyhow::Result<()> {
    let infos: Vec<_> = registry
        .names()
        .into_iter()
        .filter_map(|name| registry.describe(name))
        .collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&infos)?);
        return Ok(());
    }
    for info in infos {
        println!("{:<12} {}", info.name, info.description);
    }
    Ok(())
}

fn cmd_describe(registry: &EffectRegistry, effect: &str, json: bool) -> anyhow::Result<()> {
    let Some(info) = registry.describe(effect) else {
        bail!(
            "unknown effect '{effect}' (available: {})",
            registry.names().join(", ")
        );
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }
    println!("{}: {}", info.name, info.description);
    if info.options.is_empty() {
        println!("  (no options)");
    }
    for opt in &info.options {
        let range = opt
            .range
            .map(|(lo, hi)| format!(" [{lo}..{hi}]"))
            .unwrap_or_default();
        let default = if opt.default.is_empty() {
            String::new()
        } else {
            format!(" (default: {})", opt.default)
        };
        println!(
            "  {}.{:<16} {:?}{range}  {}{default}",
            info.name, opt.name, opt.kind, opt.description
        );
    }
    Ok(())
}

fn cmd_render(registry: &EffectRegistry, args: RenderArgs) -> anyhow::Result<()> {
    let cfg = build_config(args)?;
    let tools = ToolPaths::from_env();
    let report = effectgen::generate(&cfg, registry, &tools)?;

    match cfg.output_target() {
        Some(OutputTarget::File(path)) => {
            eprintln!("wrote {} frames to {}", report.frames_written, path.display())
        }
        _ => eprintln!("wrote {} frames to stdout", report.frames_written),
    }
    Ok(())
}

fn build_config(args: RenderArgs) -> anyhow::Result<GeneratorConfig> {
    let mut cfg = match &args.config {
        Some(path) => GeneratorConfig::from_path(path)?,
        None => GeneratorConfig::default(),
    };

    macro_rules! set {
        ($($field:ident),* $(,)?) => {
            $(if let Some(v) = args.$field { cfg.$field = v; })*
        };
    }
    set!(width, height, fps, fade, max_fade, warmup, crf, queue_capacity);

    if args.duration.is_some() {
        cfg.duration = args.duration;
    }
    if let Some(p) = args.background_image {
        cfg.background_image = Some(p);
        cfg.background_video = None;
    }
    if let Some(p) = args.background_video {
        cfg.background_video = Some(p);
        cfg.background_image = None;
    }
    if args.audio_codec.is_some() {
        cfg.audio_codec = args.audio_codec;
    }
    if args.audio_bitrate.is_some() {
        cfg.audio_bitrate = args.audio_bitrate;
    }
    if args.output.is_some() {
        cfg.output = args.output;
    }
    cfg.overwrite |= args.overwrite;

    if !args.effects.is_empty() {
        cfg.effects = args.effects.into_iter().map(EffectSpec::named).collect();
    }
    for raw in &args.params {
        apply_param(&mut cfg, raw)?;
    }

    if cfg.duration.is_none() && cfg.background_video.is_none() {
        cfg.duration = Some(DEFAULT_DURATION_SECS);
    }
    cfg.validate().context("invalid run configuration")?;
    Ok(cfg)
}

/// Apply `NAME.KEY=VALUE` to the first effect called `NAME`.
fn apply_param(cfg: &mut GeneratorConfig, raw: &str) -> anyhow::Result<()> {
    let (target, value) = raw
        .split_once('=')
        .with_context(|| format!("--param '{raw}' is not NAME.KEY=VALUE"))?;
    let (name, key) = target
        .split_once('.')
        .with_context(|| format!("--param '{raw}' is not NAME.KEY=VALUE"))?;
    let spec = cfg
        .effects
        .iter_mut()
        .find(|e| e.name == name)
        .with_context(|| format!("--param '{raw}': effect '{name}' is not in the chain"))?;
    let value = serde_json::from_str(value)
        .unwrap_or_else(|_| serde_json::Value::String(value.to_owned()));
    spec.params.insert(key.to_owned(), value);
    Ok(())
}
