//! GPU device bring-up and the render passes built on top of it.
//!
//! [`GpuContext`] owns the wgpu instance, adapter, device and queue. It is
//! created either against a window ([`GpuContext::for_window`]) or without
//! one ([`GpuContext::headless`]) for offline capture and tests.

pub mod capture;
pub mod compositor;
pub mod render_target;
pub mod renderer;
pub mod scene_pass;

use std::sync::Arc;

use winit::window::Window;

use crate::error::GpuError;
use crate::viewport::ViewportSize;

/// Depth format used by every pass that has a depth attachment.
pub const DEPTH_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Depth32Float;

/// Device, queue and the objects they came from.
pub struct GpuContext {
    pub instance: wgpu::Instance,
    pub adapter: wgpu::Adapter,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
}

impl GpuContext {
    /// Create a device able to present to `window`.
    pub async fn for_window(window: Arc<Window>) -> Result<(Self, SurfaceOutput), GpuError> {
        let size = ViewportSize::from(window.inner_size());

        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });
        let surface = instance.create_surface(window)?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = request_device(&adapter).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first())
            .copied()
            .ok_or(GpuError::UnsupportedSurface)?;
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width(),
            height: size.height(),
            present_mode: wgpu::PresentMode::AutoVsync,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let context = Self {
            instance,
            adapter,
            device,
            queue,
        };
        context.log_adapter();
        Ok((context, SurfaceOutput { surface, config }))
    }

    /// Create a device with no surface attached.
    pub async fn headless() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let (device, queue) = request_device(&adapter).await?;

        let context = Self {
            instance,
            adapter,
            device,
            queue,
        };
        context.log_adapter();
        Ok(context)
    }

    /// Largest width or height a 2D texture may have on this device.
    pub fn max_texture_extent(&self) -> u32 {
        self.device.limits().max_texture_dimension_2d
    }

    fn log_adapter(&self) {
        let info = self.adapter.get_info();
        log::info!("using GPU adapter {} ({:?})", info.name, info.backend);
    }
}

async fn request_device(adapter: &wgpu::Adapter) -> Result<(wgpu::Device, wgpu::Queue), GpuError> {
    let (device, queue) = adapter
        .request_device(
            &wgpu::DeviceDescriptor {
                label: Some("Device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                memory_hints: Default::default(),
            },
            None,
        )
        .await?;
    Ok((device, queue))
}

/// A configured window surface.
pub struct SurfaceOutput {
    surface: wgpu::Surface<'static>,
    config: wgpu::SurfaceConfiguration,
}

impl SurfaceOutput {
    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.config.format
    }

    #[inline]
    pub fn size(&self) -> ViewportSize {
        ViewportSize::clamped(self.config.width, self.config.height)
    }

    /// Reconfigure for `size`. A no-op when the size is unchanged.
    pub fn resize(&mut self, device: &wgpu::Device, size: ViewportSize) {
        if self.config.width == size.width() && self.config.height == size.height() {
            return;
        }
        self.config.width = size.width();
        self.config.height = size.height();
        self.surface.configure(device, &self.config);
    }

    /// Configure again at the current size, after a lost or outdated surface.
    pub fn reconfigure(&self, device: &wgpu::Device) {
        self.surface.configure(device, &self.config);
    }

    pub fn acquire(&self) -> Result<wgpu::SurfaceTexture, wgpu::SurfaceError> {
        self.surface.get_current_texture()
    }
}
