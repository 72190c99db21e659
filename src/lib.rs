//! # driftscene
//!
//! A 3D scene drawn in two layers. A pool of instanced particles drifts
//! upward through a vertical band and is rendered into an offscreen target,
//! which a full-screen compositor pass samples onto the window with a
//! vignette and film grain. A spinning mesh is then drawn on top.
//!
//! ## Quick Start
//!
//! ```ignore
//! use driftscene::prelude::*;
//!
//! fn main() -> Result<(), AppError> {
//!     let config = SceneConfig::new()
//!         .with_particles(ParticleSettings::default().with_count(500).with_seed(7));
//!     driftscene::app::run(config, 1280, 720)
//! }
//! ```
//!
//! ## Frame Loop
//!
//! Each frame the [`FrameScheduler`] applies at most one pending resize,
//! advances the [`FrameClock`], runs the stage's update and then its draw:
//!
//! | Step | What happens |
//! |------|--------------|
//! | resize | Offscreen target, output and compositor resolution follow the viewport |
//! | update | Camera input, [`ParticleSimulator::advance`], instance refresh, overlay spin, `uTime` |
//! | draw | Offscreen pass, composite pass, overlay pass, one submit |
//!
//! ## Particles
//!
//! Each particle climbs by its own vertical speed per tick and spins about
//! X and Z. A particle that rises above the band's top is moved back to the
//! bottom. Positions stay inside `[y_min, y_max]` after every tick.
//!
//! ```ignore
//! let mut sim = ParticleSimulator::new(&ParticleSettings::default().with_count(10))?;
//! sim.advance(1.0 / 60.0);
//! ```
//!
//! ## Headless Rendering
//!
//! [`headless::render_frames`] renders to PNG files with a fixed-step clock,
//! so the same config and seed always produce the same frames.

pub mod app;
pub mod camera;
pub mod config;
pub mod error;
pub mod geometry;
pub mod gpu;
pub mod headless;
pub mod input;
pub mod instancing;
pub mod particles;
pub mod scene;
pub mod scheduler;
pub mod spawn;
pub mod stage;
pub mod time;
pub mod viewport;

pub use bytemuck;
pub use camera::{CameraController, FixedCamera, OrbitCamera, Projection};
pub use config::SceneConfig;
pub use error::{AppError, ConfigError, GeometryError, GpuError, ParticleError, RenderError, RenderTargetError};
pub use geometry::{build_base_geometry, Geometry, GeometryKind};
pub use glam::{Vec2, Vec3, Vec4};
pub use instancing::{build_instanced_attributes, InstanceAttributes, InstanceTransform};
pub use particles::{ParticleSettings, ParticleSimulator, StepMode, VerticalBand};
pub use scheduler::{FrameScheduler, FrameStage};
pub use time::FrameClock;
pub use viewport::{ViewportController, ViewportSize};

/// Convenient re-exports for common usage.
///
/// ```ignore
/// use driftscene::prelude::*;
/// ```
pub mod prelude {
    pub use crate::camera::{CameraController, FixedCamera, OrbitCamera, Projection};
    pub use crate::config::{CompositorSettings, LightSettings, OverlaySettings, SceneConfig};
    pub use crate::error::AppError;
    pub use crate::geometry::GeometryKind;
    pub use crate::headless::RenderJob;
    pub use crate::input::Input;
    pub use crate::particles::{ParticleSettings, ParticleSimulator, StepMode, VerticalBand};
    pub use crate::scene::{MeshLayer, Scene};
    pub use crate::scheduler::{FrameScheduler, FrameStage};
    pub use crate::spawn::{Span, SpawnContext};
    pub use crate::time::FrameClock;
    pub use crate::viewport::ViewportSize;
    pub use crate::{Vec2, Vec3, Vec4};
}
