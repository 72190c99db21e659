//! Error types for driftscene.
//!
//! Construction errors (geometry, particle pool, configuration) are raised
//! before the frame loop starts. Resource errors come out of render target
//! allocation and GPU bring-up and are handed back to whoever asked for the
//! resource. Nothing in here is meant to abort the process on its own.

use thiserror::Error;

/// Invalid parameters passed to the geometry factory.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    /// A radius was zero, negative or not finite.
    #[error("radius must be a positive finite number, got {0}")]
    InvalidRadius(f32),
    /// Tetrahedron subdivision level is too high.
    #[error("subdivision detail {detail} exceeds the maximum of {max}")]
    DetailTooHigh { detail: u32, max: u32 },
    /// Ring radii are inverted or negative.
    #[error("ring radii must satisfy 0 <= inner < outer, got inner={inner} outer={outer}")]
    InvalidRing { inner: f32, outer: f32 },
    /// Too few segments to form a closed ring.
    #[error("ring needs at least {min} segments, got {segments}")]
    TooFewSegments { segments: u32, min: u32 },
}

/// Invalid parameters passed when building the particle pool.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParticleError {
    /// Requested pool size exceeds the supported maximum.
    #[error("particle count {count} exceeds the maximum of {max}")]
    TooManyParticles { count: usize, max: usize },
    /// The vertical band is empty, inverted or not finite.
    #[error("vertical band must satisfy y_min < y_max, got [{y_min}, {y_max}]")]
    InvalidBand { y_min: f32, y_max: f32 },
    /// A spawn or speed range is inverted or not finite.
    #[error("range `{name}` is invalid: [{min}, {max}]")]
    InvalidRange { name: &'static str, min: f32, max: f32 },
    /// Vertical speeds must be non-negative, the band only wraps at the top.
    #[error("vertical speed must be non-negative, got {0}")]
    NegativeVerticalSpeed(f32),
    /// A supplied particle starts outside the vertical band.
    #[error("particle {index} starts at y={y}, outside [{y_min}, {y_max}]")]
    OutsideBand {
        index: usize,
        y: f32,
        y_min: f32,
        y_max: f32,
    },
    /// `DeltaScaled` step mode needs a positive reference rate.
    #[error("reference rate must be positive, got {0}")]
    InvalidReferenceRate(f32),
}

/// Failures allocating or resizing an offscreen render target.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderTargetError {
    /// One of the dimensions is zero.
    #[error("render target extent {width}x{height} has a zero dimension")]
    ZeroExtent { width: u32, height: u32 },
    /// The requested size exceeds what the device supports.
    #[error("render target extent {width}x{height} exceeds device limit {limit}")]
    TooLarge { width: u32, height: u32, limit: u32 },
}

/// Errors that can occur during GPU initialization and readback.
#[derive(Debug, Error)]
pub enum GpuError {
    /// Failed to create a surface for rendering.
    #[error("failed to create GPU surface: {0}")]
    SurfaceCreation(#[from] wgpu::CreateSurfaceError),
    /// No compatible GPU adapter found.
    #[error("no compatible GPU adapter found; ensure the system has WebGPU/Vulkan/Metal/DX12 support")]
    NoAdapter,
    /// The surface reports no usable texture format for this adapter.
    #[error("surface is not supported by the selected adapter")]
    UnsupportedSurface,
    /// Failed to create GPU device.
    #[error("failed to create GPU device: {0}")]
    DeviceCreation(#[from] wgpu::RequestDeviceError),
    /// Failed to map buffer for reading.
    #[error("failed to map GPU buffer: {0}")]
    BufferMapping(String),
    /// Frame readback was requested from a window-backed renderer.
    #[error("renderer has no capture target to read back from")]
    NoCaptureTarget,
    /// Render target allocation failed.
    #[error(transparent)]
    RenderTarget(#[from] RenderTargetError),
    /// Mesh construction failed while building GPU resources.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// Errors raised while drawing or resizing a frame.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The window surface could not hand out a texture.
    #[error("surface error: {0}")]
    Surface(#[from] wgpu::SurfaceError),
    /// The offscreen target rejected a resize.
    #[error(transparent)]
    Target(#[from] RenderTargetError),
    /// GPU resource creation or readback failed.
    #[error(transparent)]
    Gpu(#[from] GpuError),
}

/// Errors while loading or validating a scene configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    /// The file is not valid JSON for [`crate::config::SceneConfig`].
    #[error("failed to parse config: {0}")]
    Json(#[from] serde_json::Error),
    /// Particle settings are out of range.
    #[error("invalid particle settings: {0}")]
    Particles(#[from] ParticleError),
    /// Mesh settings are out of range.
    #[error("invalid mesh settings: {0}")]
    Geometry(#[from] GeometryError),
    /// Camera settings are out of range.
    #[error("invalid camera settings: {0}")]
    Camera(String),
}

/// Errors that can occur when running the application.
#[derive(Debug, Error)]
pub enum AppError {
    /// Failed to create event loop.
    #[error("failed to create event loop: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),
    /// Failed to create window.
    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),
    /// GPU initialization failed.
    #[error("GPU error: {0}")]
    Gpu(#[from] GpuError),
    /// A frame could not be drawn.
    #[error("render error: {0}")]
    Render(#[from] RenderError),
    /// Configuration was rejected.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    /// Writing captured frames failed.
    #[error("failed to write frame: {0}")]
    Image(#[from] image::ImageError),
    /// Filesystem error while preparing output.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
