//! Per-instance attribute channels.
//!
//! An [`InstanceAttributes`] set stores position, orientation and scale as
//! parallel arrays, index-aligned with the particle pool. The arrays are
//! sized once and rewritten in place every frame; [`InstanceAttributes::pack_into`]
//! flattens them into model matrices for the instance vertex buffer.

use bytemuck::{Pod, Zeroable};
use glam::{EulerRot, Mat4, Quat, Vec3};

use crate::particles::Particle;

/// Transform of a single instance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstanceTransform {
    pub position: Vec3,
    pub orientation: Quat,
    pub scale: Vec3,
}

impl InstanceTransform {
    /// Identity transform at `position`.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Build from Euler angles (XYZ order, radians).
    pub fn from_euler(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position,
            orientation: euler_to_quat(rotation),
            scale,
        }
    }

    /// Column-major model matrix.
    pub fn model_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.orientation, self.position)
    }
}

impl Default for InstanceTransform {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

impl From<&Particle> for InstanceTransform {
    fn from(p: &Particle) -> Self {
        Self::from_euler(p.position, p.rotation, p.scale)
    }
}

#[inline]
fn euler_to_quat(rotation: Vec3) -> Quat {
    Quat::from_euler(EulerRot::XYZ, rotation.x, rotation.y, rotation.z)
}

/// GPU layout of one instance: a model matrix split over four locations.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
}

impl InstanceRaw {
    // Locations 0 and 1 belong to the mesh vertex.
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
    ];

    /// Vertex buffer layout, stepped per instance.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

impl From<&InstanceTransform> for InstanceRaw {
    fn from(t: &InstanceTransform) -> Self {
        Self {
            model: t.model_matrix().to_cols_array_2d(),
        }
    }
}

/// Parallel per-instance channels.
///
/// Invariant: `positions`, `orientations` and `scales` always have the same
/// length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InstanceAttributes {
    positions: Vec<Vec3>,
    orientations: Vec<Quat>,
    scales: Vec<Vec3>,
}

impl InstanceAttributes {
    /// Number of instances.
    #[inline]
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn orientations(&self) -> &[Quat] {
        &self.orientations
    }

    pub fn scales(&self) -> &[Vec3] {
        &self.scales
    }

    /// Transform of instance `index`, if it exists.
    pub fn get(&self, index: usize) -> Option<InstanceTransform> {
        Some(InstanceTransform {
            position: *self.positions.get(index)?,
            orientation: self.orientations[index],
            scale: self.scales[index],
        })
    }

    /// Overwrite instance `index`. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, transform: InstanceTransform) {
        if index < self.len() {
            self.positions[index] = transform.position;
            self.orientations[index] = transform.orientation;
            self.scales[index] = transform.scale;
        }
    }

    /// Rewrite every channel from the particle pool.
    ///
    /// Channels are resized only when the pool length differs, so the
    /// steady-state refresh does not allocate.
    pub fn refresh_from(&mut self, particles: &[Particle]) {
        if particles.len() != self.len() {
            self.positions.resize(particles.len(), Vec3::ZERO);
            self.orientations.resize(particles.len(), Quat::IDENTITY);
            self.scales.resize(particles.len(), Vec3::ONE);
        }
        for (i, p) in particles.iter().enumerate() {
            self.positions[i] = p.position;
            self.orientations[i] = euler_to_quat(p.rotation);
            self.scales[i] = p.scale;
        }
    }

    /// Flatten into GPU instance records, reusing `out`'s allocation.
    pub fn pack_into(&self, out: &mut Vec<InstanceRaw>) {
        out.clear();
        out.extend(
            self.positions
                .iter()
                .zip(&self.orientations)
                .zip(&self.scales)
                .map(|((&position, &orientation), &scale)| {
                    InstanceRaw::from(&InstanceTransform {
                        position,
                        orientation,
                        scale,
                    })
                }),
        );
    }
}

/// Build an attribute set of `count` instances.
///
/// `generator` is called exactly once per index, in order. The factory adds
/// no randomness of its own: callers choose the distribution. A `count` of
/// zero yields an empty set.
pub fn build_instanced_attributes<F>(count: usize, mut generator: F) -> InstanceAttributes
where
    F: FnMut(usize) -> InstanceTransform,
{
    let mut attributes = InstanceAttributes {
        positions: Vec::with_capacity(count),
        orientations: Vec::with_capacity(count),
        scales: Vec::with_capacity(count),
    };
    for i in 0..count {
        let t = generator(i);
        attributes.positions.push(t.position);
        attributes.orientations.push(t.orientation);
        attributes.scales.push(t.scale);
    }
    attributes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::particles::ParticleSpeed;

    #[test]
    fn test_zero_count_is_empty() {
        let attrs = build_instanced_attributes(0, |_| unreachable!());
        assert!(attrs.is_empty());
        let mut raw = Vec::new();
        attrs.pack_into(&mut raw);
        assert!(raw.is_empty());
    }

    #[test]
    fn test_generator_called_once_per_index() {
        let mut seen = Vec::new();
        let attrs = build_instanced_attributes(5, |i| {
            seen.push(i);
            InstanceTransform::at(Vec3::new(i as f32, 0.0, 0.0))
        });
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
        assert_eq!(attrs.len(), 5);
        assert_eq!(attrs.orientations().len(), 5);
        assert_eq!(attrs.scales().len(), 5);
        assert_eq!(attrs.positions()[3], Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn test_refresh_keeps_channels_aligned() {
        let particles: Vec<Particle> = (0..4)
            .map(|i| Particle {
                position: Vec3::new(0.0, i as f32, 0.0),
                rotation: Vec3::new(0.1, 0.0, 0.2),
                scale: Vec3::splat(2.0),
                speed: ParticleSpeed::default(),
            })
            .collect();
        let mut attrs = InstanceAttributes::default();
        attrs.refresh_from(&particles);
        assert_eq!(attrs.len(), 4);
        assert_eq!(attrs.orientations().len(), 4);
        assert_eq!(attrs.get(2).unwrap().position.y, 2.0);
        assert_eq!(attrs.get(2).unwrap().scale, Vec3::splat(2.0));
        assert!(attrs.get(4).is_none());
    }

    #[test]
    fn test_pack_translation_column() {
        let attrs = build_instanced_attributes(1, |_| InstanceTransform {
            position: Vec3::new(1.0, 2.0, 3.0),
            orientation: Quat::IDENTITY,
            scale: Vec3::splat(0.5),
        });
        let mut raw = Vec::with_capacity(1);
        attrs.pack_into(&mut raw);
        assert_eq!(raw[0].model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw[0].model[0][0], 0.5);
    }

    #[test]
    fn test_instance_raw_is_matrix_sized() {
        assert_eq!(std::mem::size_of::<InstanceRaw>(), 64);
    }
}
