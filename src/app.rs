//! Windowed runner.

use std::sync::Arc;

use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    window::{Window, WindowId},
};

use crate::config::SceneConfig;
use crate::error::{AppError, RenderError};
use crate::gpu::renderer::{FrameOutput, Renderer};
use crate::gpu::GpuContext;
use crate::scheduler::FrameScheduler;
use crate::stage::{SceneStage, SceneState};
use crate::time::FrameClock;
use crate::viewport::ViewportSize;

/// Open a window and run the scene until it is closed.
pub fn run(config: SceneConfig, width: u32, height: u32) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = App::new(config, ViewportSize::clamped(width, height));
    event_loop.run_app(&mut app)?;

    match app.error.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

/// What the event loop does with a frame that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameRecovery {
    /// The surface went stale; reconfigure it and draw the next frame.
    ReconfigureSurface,
    /// A resize was refused. Every size-dependent resource still matches
    /// the last applied viewport, and the next `Resized` event retries.
    KeepSize,
    SkipFrame,
    Exit,
}

impl FrameRecovery {
    fn for_error(err: &RenderError) -> Self {
        match err {
            RenderError::Surface(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                FrameRecovery::ReconfigureSurface
            }
            RenderError::Surface(wgpu::SurfaceError::OutOfMemory) => FrameRecovery::Exit,
            RenderError::Surface(_) => FrameRecovery::SkipFrame,
            RenderError::Target(_) => FrameRecovery::KeepSize,
            RenderError::Gpu(_) => FrameRecovery::Exit,
        }
    }
}

struct App {
    config: SceneConfig,
    initial_size: ViewportSize,
    window: Option<Arc<Window>>,
    scheduler: Option<FrameScheduler<SceneStage>>,
    error: Option<AppError>,
}

impl App {
    fn new(config: SceneConfig, initial_size: ViewportSize) -> Self {
        Self {
            config,
            initial_size,
            window: None,
            scheduler: None,
            error: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<(), AppError> {
        let state = SceneState::new(&self.config)?;

        let window_attrs = Window::default_attributes()
            .with_title("driftscene")
            .with_inner_size(winit::dpi::PhysicalSize::new(
                self.initial_size.width(),
                self.initial_size.height(),
            ));
        let window = Arc::new(event_loop.create_window(window_attrs)?);
        let size = ViewportSize::from(window.inner_size());

        let (gpu, surface) = pollster::block_on(GpuContext::for_window(window.clone()))?;
        let renderer = Renderer::new(
            gpu,
            FrameOutput::Surface(surface),
            size,
            &self.config.compositor,
        )?;

        let mut scheduler =
            FrameScheduler::new(SceneStage::new(state, renderer), FrameClock::new(), size);
        scheduler.resize_now(size.width(), size.height())?;

        window.request_redraw();
        self.window = Some(window);
        self.scheduler = Some(scheduler);
        Ok(())
    }

    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        log::error!("{}", err);
        self.error = Some(err);
        event_loop.exit();
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            if let Err(err) = self.start(event_loop) {
                self.fail(event_loop, err);
            }
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        let Some(scheduler) = &mut self.scheduler else {
            return;
        };

        match event {
            WindowEvent::CloseRequested => {
                scheduler.stop();
                event_loop.exit();
            }
            WindowEvent::Resized(physical_size) => {
                scheduler.request_resize(physical_size.width, physical_size.height);
            }
            WindowEvent::RedrawRequested => {
                if let Err(err) = scheduler.tick() {
                    match FrameRecovery::for_error(&err) {
                        FrameRecovery::ReconfigureSurface => {
                            scheduler.stage().renderer().recover_surface();
                        }
                        FrameRecovery::KeepSize => {
                            let size = scheduler.viewport();
                            log::warn!(
                                "resize rejected, staying at {}x{}: {}",
                                size.width(),
                                size.height(),
                                err
                            );
                        }
                        FrameRecovery::SkipFrame => log::warn!("dropped frame: {}", err),
                        FrameRecovery::Exit => {
                            self.fail(event_loop, err.into());
                            return;
                        }
                    }
                }
                if let Some(window) = &self.window {
                    window.request_redraw();
                }
            }
            other => {
                let input = scheduler.stage_mut().state_mut().input_mut();
                input.handle_event(&other);
                if input.quit_requested() {
                    scheduler.stop();
                    event_loop.exit();
                }
            }
        }
    }
}
