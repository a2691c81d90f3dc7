use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use imgsdk::{BuiltinShaders, GlutinEgl, SdkEnv};
use imgsdk_codec::StandardCodec;
use imgsdk_core::{load_sdk_config_from, AssetsRoot, ImageCodec, SdkConfig};
use raw_window_handle::HasRawDisplayHandle;
use tracing_subscriber::EnvFilter;
use winit::event_loop::EventLoop;

#[derive(Parser, Debug)]
#[command(name = "imgsdk", version, about = "Render images through the imgsdk GPU pipeline")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an image off-screen and save the result.
    Render(RenderArgs),
    /// Parse an effect command and print the descriptor as JSON.
    Parse {
        /// Effect command, e.g. '{"effect":"Rotate","degree":90}'.
        json: String,
    },
    /// Re-encode an image (PNG/JPEG) without touching the GPU.
    Convert {
        input: PathBuf,
        output: PathBuf,
        /// JPEG quality, 1-100.
        #[arg(long, default_value_t = imgsdk_codec::DEFAULT_JPEG_QUALITY)]
        quality: u8,
    },
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input PNG/JPEG.
    #[arg(long)]
    input: PathBuf,

    /// Output PNG/JPEG; the extension picks the encoder.
    #[arg(long)]
    output: PathBuf,

    /// Effect command JSON. Defaults to a plain pass-through.
    #[arg(long)]
    effect: Option<String>,

    /// Directory holding the shader sources. Built-in shaders are used when omitted.
    #[arg(long)]
    assets: Option<PathBuf>,

    /// SDK config JSON.
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("imgsdk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Parse { json } => cmd_parse(&json),
        Command::Convert {
            input,
            output,
            quality,
        } => cmd_convert(input, output, quality),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let config = match &args.config {
        Some(path) => load_sdk_config_from(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => SdkConfig::default(),
    };

    let event_loop = EventLoop::new();
    let backend = GlutinEgl::new(event_loop.raw_display_handle());
    let mut env = match &args.assets {
        Some(dir) => SdkEnv::new_default_with_config(backend, AssetsRoot::new(dir), config),
        None => SdkEnv::new_default_with_config(backend, BuiltinShaders, config),
    }
    .context("initialize sdk environment")?;

    if let Some(parent) = args.output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    env.set_input_path(&args.input)?;
    env.set_output_path(&args.output)?;

    let cmd = args
        .effect
        .unwrap_or_else(|| r#"{"effect":"Normal"}"#.to_string());
    env.set_effect_command(&cmd)
        .with_context(|| format!("apply effect command for '{}'", args.input.display()))?;
    env.draw().context("draw")?;
    env.read_pixels().context("read pixels")?;
    let out = env.save_output().context("save output")?;
    env.destroy();

    eprintln!("wrote {}", out.display());
    Ok(())
}

fn cmd_parse(json: &str) -> anyhow::Result<()> {
    let descriptor = imgsdk_effect::parse_command(json)?;
    println!("{}", serde_json::to_string_pretty(&descriptor)?);
    Ok(())
}

fn cmd_convert(input: PathBuf, output: PathBuf, quality: u8) -> anyhow::Result<()> {
    let codec = StandardCodec::with_jpeg_quality(quality);
    let bitmap = codec
        .decode(&input)
        .with_context(|| format!("decode '{}'", input.display()))?;
    codec
        .encode(&output, &bitmap)
        .with_context(|| format!("encode '{}'", output.display()))?;
    eprintln!(
        "wrote {} ({}x{}, {:?})",
        output.display(),
        bitmap.width(),
        bitmap.height(),
        bitmap.format()
    );
    Ok(())
}
