//! The scene driven by the frame loop.
//!
//! [`SceneState`] is everything that changes per frame on the CPU: the
//! particle pool, both scenes, both cameras and the compositor clock. It
//! never touches the GPU, so it can be stepped and inspected in tests.
//! [`SceneStage`] pairs it with a [`Renderer`] and plugs into the
//! [`FrameScheduler`](crate::scheduler::FrameScheduler).

use glam::Vec3;

use crate::camera::{CameraController, FixedCamera, OrbitCamera, Projection};
use crate::config::SceneConfig;
use crate::error::{ConfigError, RenderError};
use crate::gpu::renderer::{CameraFrame, Renderer};
use crate::input::Input;
use crate::instancing::{build_instanced_attributes, InstanceTransform};
use crate::particles::ParticleSimulator;
use crate::scene::{spin_layer_y, LayerId, MeshLayer, PointLight, Scene};
use crate::scheduler::FrameStage;
use crate::time::FrameClock;
use crate::viewport::{ResizeSink, ViewportSize};

struct Overlay {
    scene: Scene,
    layer: LayerId,
    camera: FixedCamera,
    projection: Projection,
    rot_speed: f32,
}

pub struct SceneState {
    simulator: ParticleSimulator,
    background: Scene,
    particle_layer: LayerId,
    orbit: OrbitCamera,
    projection: Projection,
    overlay: Option<Overlay>,
    input: Input,
    time_scale: f32,
    composite_time: f32,
}

impl SceneState {
    /// Build the scene. The whole config is validated here, meshes
    /// included, so nothing invalid reaches the frame loop.
    pub fn new(config: &SceneConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let simulator = ParticleSimulator::new(&config.particles)?;
        let light = PointLight::from(&config.light);

        let mut background = Scene::new(config.clear_color, light);
        let mut particles = MeshLayer::new("particles", config.particles.mesh, config.particle_color);
        particles.instances = build_instanced_attributes(simulator.len(), |i| {
            InstanceTransform::from(&simulator.particles()[i])
        });
        let particle_layer = background.add_layer(particles);

        let overlay = config.overlay.enabled.then(|| {
            let mut scene = Scene::new([0.0; 4], light);
            let layer = scene.add_layer(MeshLayer::single(
                "overlay",
                config.overlay.mesh,
                config.overlay.color,
                InstanceTransform::default(),
            ));
            Overlay {
                scene,
                layer,
                camera: FixedCamera::looking_at_origin(Vec3::new(
                    0.0,
                    0.0,
                    config.overlay.camera_distance,
                )),
                projection: config.overlay.projection,
                rot_speed: config.overlay.rot_speed,
            }
        });

        log::info!(
            "scene: {} particles, overlay {}",
            simulator.len(),
            if overlay.is_some() { "on" } else { "off" }
        );

        Ok(Self {
            simulator,
            background,
            particle_layer,
            orbit: OrbitCamera::new(config.camera.yaw, config.camera.pitch, config.camera.distance),
            projection: config.camera.projection,
            overlay,
            input: Input::new(),
            time_scale: config.compositor.time_scale,
            composite_time: 0.0,
        })
    }

    /// Run one frame of CPU-side work.
    pub fn update(&mut self, clock: &FrameClock) {
        let input = self.input.take_camera_input();
        if input.reset {
            log::debug!("camera reset");
        }
        self.orbit.update(&input, clock.delta());

        self.simulator.advance(clock.delta());
        if let Some(layer) = self.background.layer_mut(self.particle_layer) {
            layer.instances.refresh_from(self.simulator.particles());
        }

        if let Some(overlay) = &mut self.overlay {
            if let Some(layer) = overlay.scene.layer_mut(overlay.layer) {
                spin_layer_y(layer, overlay.rot_speed);
            }
        }

        self.composite_time = clock.elapsed() * self.time_scale;
    }

    /// Follow a viewport change: both projections take the new aspect.
    pub fn set_viewport(&mut self, size: ViewportSize) {
        self.projection.set_aspect(size.aspect());
        if let Some(overlay) = &mut self.overlay {
            overlay.projection.set_aspect(size.aspect());
        }
    }

    pub fn background_camera(&self) -> CameraFrame {
        CameraFrame {
            view_proj: self.projection.matrix() * self.orbit.view_matrix(),
            eye: self.orbit.eye(),
        }
    }

    pub fn overlay(&self) -> Option<(&Scene, CameraFrame)> {
        self.overlay.as_ref().map(|o| {
            (
                &o.scene,
                CameraFrame {
                    view_proj: o.projection.matrix() * o.camera.view_matrix(),
                    eye: o.camera.eye(),
                },
            )
        })
    }

    pub fn background(&self) -> &Scene {
        &self.background
    }

    pub fn simulator(&self) -> &ParticleSimulator {
        &self.simulator
    }

    pub fn orbit(&self) -> &OrbitCamera {
        &self.orbit
    }

    pub fn input_mut(&mut self) -> &mut Input {
        &mut self.input
    }

    /// Value fed to the compositor's `uTime`.
    #[inline]
    pub fn composite_time(&self) -> f32 {
        self.composite_time
    }
}

/// [`SceneState`] plus the renderer that draws it.
pub struct SceneStage {
    state: SceneState,
    renderer: Renderer,
}

impl SceneStage {
    pub fn new(state: SceneState, renderer: Renderer) -> Self {
        Self { state, renderer }
    }

    pub fn state(&self) -> &SceneState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut SceneState {
        &mut self.state
    }

    pub fn renderer(&self) -> &Renderer {
        &self.renderer
    }
}

impl ResizeSink for SceneStage {
    type Error = RenderError;

    fn apply_viewport(&mut self, size: ViewportSize) -> Result<(), RenderError> {
        self.renderer.apply_viewport(size)?;
        self.state.set_viewport(size);
        Ok(())
    }
}

impl FrameStage for SceneStage {
    fn update(&mut self, clock: &FrameClock) {
        self.state.update(clock);
        self.renderer.set_time(self.state.composite_time());
    }

    fn draw(&mut self, _clock: &FrameClock) -> Result<(), RenderError> {
        self.renderer.draw(
            self.state.background(),
            self.state.background_camera(),
            self.state.overlay(),
        )
    }
}
