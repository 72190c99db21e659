//! Scene configuration.
//!
//! Every field has a default, so a config file only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "particles": { "count": 800, "seed": 7 },
//!   "overlay": { "enabled": false },
//!   "compositor": { "vignette": 0.0 }
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::camera::Projection;
use crate::error::ConfigError;
use crate::geometry::GeometryKind;
use crate::particles::ParticleSettings;

/// Background camera: the one that renders the particle field offscreen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraSettings {
    pub projection: Projection,
    /// Orbit distance from the origin.
    pub distance: f32,
    pub yaw: f32,
    pub pitch: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            projection: Projection::perspective(50.0, 0.01, 100.0),
            distance: 30.0,
            yaw: 0.0,
            pitch: 0.0,
        }
    }
}

/// Foreground mesh drawn straight to the window after compositing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlaySettings {
    pub enabled: bool,
    pub mesh: GeometryKind,
    /// Radians added to the mesh's Y rotation every update.
    pub rot_speed: f32,
    pub color: [f32; 3],
    pub projection: Projection,
    /// Distance of the fixed overlay camera from the origin along +Z.
    pub camera_distance: f32,
}

impl Default for OverlaySettings {
    fn default() -> Self {
        Self {
            enabled: true,
            mesh: GeometryKind::Tetrahedron {
                radius: 10.0,
                detail: 0,
            },
            rot_speed: 0.05,
            color: [0.85, 0.85, 0.9],
            projection: Projection::perspective(50.0, 0.1, 100.0),
            camera_distance: 30.0,
        }
    }
}

/// Post-process parameters for the compositor pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorSettings {
    /// Multiplier from clock seconds to `uTime`.
    pub time_scale: f32,
    /// Corner darkening, 0 disables.
    pub vignette: f32,
    /// Film grain amplitude, 0 disables.
    pub grain: f32,
}

impl Default for CompositorSettings {
    fn default() -> Self {
        Self {
            time_scale: 0.5,
            vignette: 0.35,
            grain: 0.06,
        }
    }
}

/// Single point light shading the offscreen scene.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightSettings {
    pub position: [f32; 3],
    pub color: [f32; 3],
    pub intensity: f32,
    /// Distance at which the light's contribution reaches zero.
    pub range: f32,
    pub ambient: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            position: [0.0, 0.0, 50.0],
            color: [1.0, 0.0, 0.0],
            intensity: 1.0,
            range: 100.0,
            ambient: 0.12,
        }
    }
}

/// Everything needed to build a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub particles: ParticleSettings,
    pub particle_color: [f32; 3],
    pub camera: CameraSettings,
    pub overlay: OverlaySettings,
    pub compositor: CompositorSettings,
    pub light: LightSettings,
    /// Offscreen clear color (linear RGBA).
    pub clear_color: [f32; 4],
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            particles: ParticleSettings::default(),
            particle_color: [1.0, 1.0, 1.0],
            camera: CameraSettings::default(),
            overlay: OverlaySettings::default(),
            compositor: CompositorSettings::default(),
            light: LightSettings::default(),
            clear_color: [0.02, 0.02, 0.05, 1.0],
        }
    }
}

impl SceneConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON config file and validate it.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_json_str(&text)?;
        log::info!("loaded scene config from {}", path.as_ref().display());
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_particles(mut self, particles: ParticleSettings) -> Self {
        self.particles = particles;
        self
    }

    pub fn with_overlay(mut self, enabled: bool) -> Self {
        self.overlay.enabled = enabled;
        self
    }

    pub fn with_compositor(mut self, compositor: CompositorSettings) -> Self {
        self.compositor = compositor;
        self
    }

    pub fn with_clear_color(mut self, rgba: [f32; 4]) -> Self {
        self.clear_color = rgba;
        self
    }

    /// Reject values that would fail later, at GPU build time.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.particles.validate()?;
        self.particles.mesh.validate()?;
        if self.overlay.enabled {
            self.overlay.mesh.validate()?;
        }
        self.camera
            .projection
            .validate()
            .map_err(ConfigError::Camera)?;
        self.overlay
            .projection
            .validate()
            .map_err(ConfigError::Camera)?;
        if !(self.camera.distance.is_finite() && self.camera.distance > 0.0) {
            return Err(ConfigError::Camera(format!(
                "orbit distance {} must be positive",
                self.camera.distance
            )));
        }
        Ok(())
    }
}
