//! Offline rendering to PNG files.
//!
//! Runs the same scheduler and stage as the windowed app, but against a
//! capture target and a fixed-step clock, so frame `n` of a given config and
//! seed is always the same image.

use std::path::{Path, PathBuf};

use crate::config::SceneConfig;
use crate::error::AppError;
use crate::gpu::renderer::Renderer;
use crate::gpu::GpuContext;
use crate::scheduler::FrameScheduler;
use crate::stage::{SceneStage, SceneState};
use crate::time::FrameClock;
use crate::viewport::ViewportSize;

/// What to render and where.
#[derive(Debug, Clone)]
pub struct RenderJob {
    pub out_dir: PathBuf,
    pub frames: u64,
    pub size: ViewportSize,
    /// Simulated frames per second; sets the fixed clock step.
    pub fps: f32,
}

impl RenderJob {
    pub fn new(out_dir: impl Into<PathBuf>, frames: u64, size: ViewportSize) -> Self {
        Self {
            out_dir: out_dir.into(),
            frames,
            size,
            fps: 60.0,
        }
    }
}

/// File name of frame `index`.
pub fn frame_path(dir: &Path, index: u64) -> PathBuf {
    dir.join(format!("frame_{:05}.png", index))
}

/// Render `job.frames` frames and write them as PNGs. Returns the paths.
pub fn render_frames(config: &SceneConfig, job: &RenderJob) -> Result<Vec<PathBuf>, AppError> {
    let state = SceneState::new(config)?;
    std::fs::create_dir_all(&job.out_dir)?;

    let gpu = pollster::block_on(GpuContext::headless())?;
    let renderer = Renderer::headless(gpu, job.size, &config.compositor)?;

    let step = 1.0 / job.fps.max(1.0);
    let mut scheduler = FrameScheduler::new(
        SceneStage::new(state, renderer),
        FrameClock::fixed(step),
        job.size,
    );
    scheduler.resize_now(job.size.width(), job.size.height())?;

    let mut written = Vec::with_capacity(job.frames as usize);
    for index in 0..job.frames {
        scheduler.tick()?;
        let image = scheduler.stage().renderer().read_frame()?;
        let path = frame_path(&job.out_dir, index);
        image.save(&path)?;
        log::debug!("wrote {}", path.display());
        written.push(path);
    }

    log::info!(
        "rendered {} frames at {}x{} into {}",
        written.len(),
        job.size.width(),
        job.size.height(),
        job.out_dir.display()
    );
    Ok(written)
}
