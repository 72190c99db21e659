//! Frame composition.
//!
//! Every frame is recorded into one command encoder, in a fixed order:
//!
//! 1. the background scene into the [`OffscreenTarget`],
//! 2. the compositor from that target into the output,
//! 3. the overlay scene straight into the output, on top,
//! 4. a readback copy when the output is a [`CaptureTarget`].
//!
//! The order is recorded in a [`PassKind`] trace that callers can inspect
//! after each frame.

use glam::{Mat4, Vec3};

use super::capture::{CaptureTarget, CAPTURE_FORMAT};
use super::compositor::CompositorPass;
use super::render_target::{OffscreenTarget, TargetOptions};
use super::scene_pass::{ScenePass, ScenePassOptions};
use super::{GpuContext, SurfaceOutput};
use crate::config::CompositorSettings;
use crate::error::{GpuError, RenderError};
use crate::scene::Scene;
use crate::viewport::{ResizeSink, ViewportSize};

/// Where finished frames go.
pub enum FrameOutput {
    Surface(SurfaceOutput),
    Capture(CaptureTarget),
}

impl FrameOutput {
    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            FrameOutput::Surface(surface) => surface.format(),
            FrameOutput::Capture(_) => CAPTURE_FORMAT,
        }
    }

    fn acquire(&self) -> Result<AcquiredFrame<'_>, wgpu::SurfaceError> {
        match self {
            FrameOutput::Surface(surface) => {
                let texture = surface.acquire()?;
                let view = texture
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(AcquiredFrame::Surface { texture, view })
            }
            FrameOutput::Capture(capture) => Ok(AcquiredFrame::Capture(capture)),
        }
    }
}

enum AcquiredFrame<'a> {
    Surface {
        texture: wgpu::SurfaceTexture,
        view: wgpu::TextureView,
    },
    Capture(&'a CaptureTarget),
}

impl AcquiredFrame<'_> {
    fn view(&self) -> &wgpu::TextureView {
        match self {
            AcquiredFrame::Surface { view, .. } => view,
            AcquiredFrame::Capture(capture) => capture.view(),
        }
    }

    fn present(self) {
        if let AcquiredFrame::Surface { texture, .. } = self {
            texture.present();
        }
    }
}

/// One render pass in a frame, in submission order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassKind {
    Offscreen,
    Composite,
    Overlay,
    Readback,
}

/// Camera state for one scene in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraFrame {
    pub view_proj: Mat4,
    pub eye: Vec3,
}

/// Owns the device and every pass.
pub struct Renderer {
    gpu: GpuContext,
    output: FrameOutput,
    target: OffscreenTarget,
    background: ScenePass,
    overlay: ScenePass,
    compositor: CompositorPass,
    size: ViewportSize,
    trace: Vec<PassKind>,
    frames: u64,
}

impl Renderer {
    pub fn new(
        gpu: GpuContext,
        output: FrameOutput,
        size: ViewportSize,
        compositor: &CompositorSettings,
    ) -> Result<Self, GpuError> {
        let device = &gpu.device;
        let target = OffscreenTarget::create(
            device,
            size.width(),
            size.height(),
            TargetOptions::default(),
        )?;

        let background = ScenePass::new(
            device,
            ScenePassOptions {
                label: "Background Pipeline",
                format: target.format(),
                depth: true,
                cull_back: false,
            },
        );
        let overlay = ScenePass::new(
            device,
            ScenePassOptions {
                label: "Overlay Pipeline",
                format: output.format(),
                depth: false,
                cull_back: true,
            },
        );
        let compositor =
            CompositorPass::new(device, &target, size.resolution(), output.format(), compositor);

        log::info!(
            "renderer ready at {}x{} (output {:?})",
            size.width(),
            size.height(),
            output.format()
        );

        Ok(Self {
            gpu,
            output,
            target,
            background,
            overlay,
            compositor,
            size,
            trace: Vec::with_capacity(4),
            frames: 0,
        })
    }

    /// A renderer that draws into a readable texture instead of a window.
    pub fn headless(
        gpu: GpuContext,
        size: ViewportSize,
        compositor: &CompositorSettings,
    ) -> Result<Self, GpuError> {
        let capture = CaptureTarget::new(&gpu.device, size);
        Self::new(gpu, FrameOutput::Capture(capture), size, compositor)
    }

    /// Draw one frame.
    pub fn draw(
        &mut self,
        background: &Scene,
        background_camera: CameraFrame,
        overlay: Option<(&Scene, CameraFrame)>,
    ) -> Result<(), RenderError> {
        let device = &self.gpu.device;
        let queue = &self.gpu.queue;

        self.background
            .prepare(
                device,
                queue,
                background,
                background_camera.view_proj,
                background_camera.eye,
            )
            .map_err(GpuError::from)?;
        if let Some((scene, camera)) = overlay {
            self.overlay
                .prepare(device, queue, scene, camera.view_proj, camera.eye)
                .map_err(GpuError::from)?;
        }
        self.compositor.prepare(queue);

        let frame = self.output.acquire()?;
        self.trace.clear();

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Frame Encoder"),
        });

        {
            let mut pass = self.target.begin_pass(&mut encoder, to_wgpu_color(background.clear_color));
            self.background.record(&mut pass);
        }
        self.trace.push(PassKind::Offscreen);

        self.compositor.render(&mut encoder, frame.view());
        self.trace.push(PassKind::Composite);

        if overlay.is_some() {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: frame.view(),
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            self.overlay.record(&mut pass);
            drop(pass);
            self.trace.push(PassKind::Overlay);
        }

        if let AcquiredFrame::Capture(capture) = &frame {
            capture.encode_copy(&mut encoder);
            self.trace.push(PassKind::Readback);
        }

        queue.submit(std::iter::once(encoder.finish()));
        frame.present();
        self.frames += 1;
        Ok(())
    }

    /// Reconfigure the surface after it was lost or became outdated.
    pub fn recover_surface(&self) {
        if let FrameOutput::Surface(surface) = &self.output {
            log::debug!("reconfiguring lost surface");
            surface.reconfigure(&self.gpu.device);
        }
    }

    /// Read back the last drawn frame. Headless renderers only.
    pub fn read_frame(&self) -> Result<image::RgbaImage, GpuError> {
        match &self.output {
            FrameOutput::Capture(capture) => capture.read_rgba(&self.gpu.device),
            FrameOutput::Surface(_) => Err(GpuError::NoCaptureTarget),
        }
    }

    /// Set the compositor's `uTime`.
    pub fn set_time(&mut self, time: f32) {
        self.compositor.set_time(time);
    }

    /// Passes recorded by the last successful [`draw`](Self::draw).
    pub fn last_trace(&self) -> &[PassKind] {
        &self.trace
    }

    #[inline]
    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn gpu(&self) -> &GpuContext {
        &self.gpu
    }

    pub fn target(&self) -> &OffscreenTarget {
        &self.target
    }

    pub fn compositor(&self) -> &CompositorPass {
        &self.compositor
    }
}

impl ResizeSink for Renderer {
    type Error = RenderError;

    /// The offscreen target is checked first. If it refuses the size, the
    /// surface, capture texture and compositor resolution are left alone,
    /// so everything keeps matching the previously applied viewport.
    fn apply_viewport(&mut self, size: ViewportSize) -> Result<(), RenderError> {
        let device = &self.gpu.device;
        if self.target.resize(device, size.width(), size.height())? {
            self.compositor.rebind_source(device, &self.target);
        }
        match &mut self.output {
            FrameOutput::Surface(surface) => surface.resize(device, size),
            FrameOutput::Capture(capture) => capture.resize(device, size),
        }
        self.compositor.set_resolution(size.resolution());
        self.size = size;
        Ok(())
    }
}

fn to_wgpu_color(rgba: [f32; 4]) -> wgpu::Color {
    wgpu::Color {
        r: rgba[0] as f64,
        g: rgba[1] as f64,
        b: rgba[2] as f64,
        a: rgba[3] as f64,
    }
}
