use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

use driftscene::headless::{render_frames, RenderJob};
use driftscene::{SceneConfig, ViewportSize};

#[derive(Debug, Parser)]
#[command(name = "driftscene", version, about = "Drifting particle scene with a composited offscreen pass")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open a window and run the scene.
    Run {
        /// JSON scene config; defaults are used for anything omitted.
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long, default_value_t = 1280)]
        width: u32,
        #[arg(long, default_value_t = 720)]
        height: u32,
    },
    /// Render frames offscreen and write them as PNG files.
    Render {
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 60)]
        frames: u64,
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<&PathBuf>) -> anyhow::Result<SceneConfig> {
    match path {
        Some(path) => SceneConfig::from_json_file(path)
            .with_context(|| format!("loading config {}", path.display())),
        None => Ok(SceneConfig::default()),
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command.unwrap_or(Command::Run {
        config: None,
        width: 1280,
        height: 720,
    }) {
        Command::Run {
            config,
            width,
            height,
        } => {
            let config = load_config(config.as_ref())?;
            driftscene::app::run(config, width, height).context("running scene")?;
        }
        Command::Render {
            out,
            frames,
            width,
            height,
            config,
        } => {
            let config = load_config(config.as_ref())?;
            let job = RenderJob::new(out, frames, ViewportSize::clamped(width, height));
            let written = render_frames(&config, &job).context("rendering frames")?;
            println!("wrote {} frames to {}", written.len(), job.out_dir.display());
        }
    }
    Ok(())
}
