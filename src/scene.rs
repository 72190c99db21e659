//! Explicit scene graphs.
//!
//! A [`Scene`] is a flat list of [`MeshLayer`]s, each one shared mesh drawn
//! once per instance. Scenes are owned by whoever renders them and passed by
//! reference into draw calls; nothing registers itself anywhere implicitly.

use glam::{Quat, Vec3};

use crate::config::LightSettings;
use crate::geometry::GeometryKind;
use crate::instancing::{build_instanced_attributes, InstanceAttributes, InstanceTransform};

/// Index of a layer inside its scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LayerId(pub usize);

/// One mesh and the instances that draw it.
#[derive(Debug, Clone)]
pub struct MeshLayer {
    pub name: String,
    pub mesh: GeometryKind,
    pub color: [f32; 3],
    pub instances: InstanceAttributes,
    pub visible: bool,
}

impl MeshLayer {
    pub fn new(name: impl Into<String>, mesh: GeometryKind, color: [f32; 3]) -> Self {
        Self {
            name: name.into(),
            mesh,
            color,
            instances: InstanceAttributes::default(),
            visible: true,
        }
    }

    /// A layer holding a single instance.
    pub fn single(
        name: impl Into<String>,
        mesh: GeometryKind,
        color: [f32; 3],
        transform: InstanceTransform,
    ) -> Self {
        let mut layer = Self::new(name, mesh, color);
        layer.instances = build_instanced_attributes(1, |_| transform);
        layer
    }
}

/// Point light as seen by the scene shader.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub ambient: f32,
}

impl From<&LightSettings> for PointLight {
    fn from(s: &LightSettings) -> Self {
        Self {
            position: Vec3::from(s.position),
            color: Vec3::from(s.color),
            intensity: s.intensity,
            range: s.range,
            ambient: s.ambient,
        }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self::from(&LightSettings::default())
    }
}

/// A renderable scene.
#[derive(Debug, Clone)]
pub struct Scene {
    pub clear_color: [f32; 4],
    pub light: PointLight,
    layers: Vec<MeshLayer>,
}

impl Scene {
    pub fn new(clear_color: [f32; 4], light: PointLight) -> Self {
        Self {
            clear_color,
            light,
            layers: Vec::new(),
        }
    }

    pub fn add_layer(&mut self, layer: MeshLayer) -> LayerId {
        self.layers.push(layer);
        LayerId(self.layers.len() - 1)
    }

    pub fn layers(&self) -> &[MeshLayer] {
        &self.layers
    }

    pub fn layer(&self, id: LayerId) -> Option<&MeshLayer> {
        self.layers.get(id.0)
    }

    pub fn layer_mut(&mut self, id: LayerId) -> Option<&mut MeshLayer> {
        self.layers.get_mut(id.0)
    }

    /// Total instances across visible layers.
    pub fn instance_count(&self) -> usize {
        self.layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.instances.len())
            .sum()
    }
}

/// Spin a single-instance layer about Y by `radians`.
pub fn spin_layer_y(layer: &mut MeshLayer, radians: f32) {
    if let Some(mut t) = layer.instances.get(0) {
        t.orientation = (Quat::from_rotation_y(radians) * t.orientation).normalize();
        layer.instances.set(0, t);
    }
}
