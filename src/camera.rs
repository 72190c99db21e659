//! Cameras and projections.
//!
//! The pipeline only needs a view matrix and a projection from whatever
//! drives the camera. [`CameraController`] is that seam; [`OrbitCamera`] is
//! the interactive implementation and [`FixedCamera`] the static one.

use glam::{Mat4, Vec3};
use serde::{Deserialize, Serialize};

use crate::input::CameraInput;

/// Produces a view transform once per frame.
pub trait CameraController {
    /// Apply this frame's input.
    fn update(&mut self, input: &CameraInput, dt: f32);
    /// World-to-view transform.
    fn view_matrix(&self) -> Mat4;
    /// Camera position in world space.
    fn eye(&self) -> Vec3;
}

/// Projection parameters. `aspect` is owned by the viewport and rewritten on
/// every resize.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Projection {
    Perspective {
        fov_y_degrees: f32,
        near: f32,
        far: f32,
        #[serde(skip, default = "default_aspect")]
        aspect: f32,
    },
    Orthographic {
        /// Half of the visible height in world units.
        half_height: f32,
        near: f32,
        far: f32,
        #[serde(skip, default = "default_aspect")]
        aspect: f32,
    },
}

fn default_aspect() -> f32 {
    1.0
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y_degrees,
            near,
            far,
            aspect: 1.0,
        }
    }

    pub fn orthographic(half_height: f32, near: f32, far: f32) -> Self {
        Projection::Orthographic {
            half_height,
            near,
            far,
            aspect: 1.0,
        }
    }

    pub fn aspect(&self) -> f32 {
        match *self {
            Projection::Perspective { aspect, .. } | Projection::Orthographic { aspect, .. } => {
                aspect
            }
        }
    }

    pub fn set_aspect(&mut self, new_aspect: f32) {
        match self {
            Projection::Perspective { aspect, .. } | Projection::Orthographic { aspect, .. } => {
                *aspect = new_aspect
            }
        }
    }

    /// Check the parameters can form a non-degenerate matrix.
    pub fn validate(&self) -> Result<(), String> {
        let (near, far) = match *self {
            Projection::Perspective {
                fov_y_degrees,
                near,
                far,
                ..
            } => {
                if !(fov_y_degrees > 0.0 && fov_y_degrees < 180.0) {
                    return Err(format!("fov {} must be in (0, 180)", fov_y_degrees));
                }
                if near <= 0.0 {
                    return Err(format!("perspective near plane {} must be positive", near));
                }
                (near, far)
            }
            Projection::Orthographic {
                half_height,
                near,
                far,
                ..
            } => {
                if half_height <= 0.0 {
                    return Err(format!("half height {} must be positive", half_height));
                }
                (near, far)
            }
        };
        if !(near.is_finite() && far.is_finite() && far > near) {
            return Err(format!("far plane {} must exceed near plane {}", far, near));
        }
        Ok(())
    }

    /// Right-handed projection matrix with wgpu's `[0, 1]` depth range.
    pub fn matrix(&self) -> Mat4 {
        match *self {
            Projection::Perspective {
                fov_y_degrees,
                near,
                far,
                aspect,
            } => Mat4::perspective_rh(fov_y_degrees.to_radians(), aspect, near, far),
            Projection::Orthographic {
                half_height,
                near,
                far,
                aspect,
            } => {
                let half_width = half_height * aspect;
                Mat4::orthographic_rh(-half_width, half_width, -half_height, half_height, near, far)
            }
        }
    }
}

/// Orbit camera driven by mouse drag and wheel input.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// Horizontal rotation angle in radians.
    pub yaw: f32,
    /// Vertical rotation angle in radians.
    pub pitch: f32,
    /// Distance from the target point.
    pub distance: f32,
    /// Point the camera orbits around.
    pub target: Vec3,
    /// Radians of rotation per dragged pixel.
    pub rotate_speed: f32,
    /// Distance change per wheel step.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    home: (f32, f32, f32),
}

impl OrbitCamera {
    const PITCH_LIMIT: f32 = 1.5;

    pub fn new(yaw: f32, pitch: f32, distance: f32) -> Self {
        let pitch = pitch.clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        Self {
            yaw,
            pitch,
            distance,
            target: Vec3::ZERO,
            rotate_speed: 0.005,
            zoom_speed: 1.5,
            min_distance: 1.0,
            max_distance: distance.max(1.0) * 4.0,
            home: (yaw, pitch, distance),
        }
    }

    /// Calculate the camera's world position.
    pub fn position(&self) -> Vec3 {
        let x = self.distance * self.pitch.cos() * self.yaw.sin();
        let y = self.distance * self.pitch.sin();
        let z = self.distance * self.pitch.cos() * self.yaw.cos();
        self.target + Vec3::new(x, y, z)
    }

    /// Return to the pose the camera was created with.
    pub fn reset(&mut self) {
        (self.yaw, self.pitch, self.distance) = self.home;
    }
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self::new(0.0, 0.0, 30.0)
    }
}

impl CameraController for OrbitCamera {
    fn update(&mut self, input: &CameraInput, _dt: f32) {
        if input.reset {
            self.reset();
            return;
        }
        self.yaw -= input.drag.x * self.rotate_speed;
        self.pitch = (self.pitch + input.drag.y * self.rotate_speed)
            .clamp(-Self::PITCH_LIMIT, Self::PITCH_LIMIT);
        self.distance = (self.distance - input.scroll * self.zoom_speed)
            .clamp(self.min_distance, self.max_distance);
    }

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position(), self.target, Vec3::Y)
    }

    fn eye(&self) -> Vec3 {
        self.position()
    }
}

/// A camera that never moves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedCamera {
    pub eye: Vec3,
    pub target: Vec3,
}

impl FixedCamera {
    pub fn looking_at_origin(eye: Vec3) -> Self {
        Self {
            eye,
            target: Vec3::ZERO,
        }
    }
}

impl CameraController for FixedCamera {
    fn update(&mut self, _input: &CameraInput, _dt: f32) {}

    fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }

    fn eye(&self) -> Vec3 {
        self.eye
    }
}
