//! Base mesh construction.
//!
//! Every builder here is a pure function of its parameters: the same
//! [`GeometryKind`] always produces byte-identical vertex and index data.
//! Meshes are shared by every instance that draws them, per-instance data
//! lives in [`crate::instancing`].

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::f32::consts::TAU;

use crate::error::GeometryError;

/// Highest tetrahedron subdivision level accepted by the factory.
pub const MAX_TETRAHEDRON_DETAIL: u32 = 5;

/// Fewest segments a ring can be built from.
pub const MIN_RING_SEGMENTS: u32 = 3;

/// Clip-space corners of the compositor's full-screen triangle.
///
/// The triangle is twice the size of the viewport along each axis so the
/// visible `[-1, 1]` square is covered without a diagonal seam.
pub const FULL_SCREEN_TRIANGLE: [[f32; 2]; 3] = [[-1.0, -1.0], [3.0, -1.0], [-1.0, 3.0]];

/// A single mesh vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl Vertex {
    const ATTRIBUTES: [wgpu::VertexAttribute; 2] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32x3];

    /// Vertex buffer layout, stepped per vertex.
    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Which base mesh to build.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeometryKind {
    /// Regular tetrahedron inscribed in a sphere of `radius`.
    ///
    /// `detail` subdivides each face into `(detail + 1)^2` triangles pushed
    /// out onto the sphere, so higher values approach a faceted ball.
    Tetrahedron { radius: f32, detail: u32 },
    /// Flat annulus in the XY plane facing +Z.
    Ring {
        inner_radius: f32,
        outer_radius: f32,
        segments: u32,
    },
}

impl GeometryKind {
    /// Check parameters without building anything.
    pub fn validate(&self) -> Result<(), GeometryError> {
        match *self {
            GeometryKind::Tetrahedron { radius, detail } => {
                if !(radius.is_finite() && radius > 0.0) {
                    return Err(GeometryError::InvalidRadius(radius));
                }
                if detail > MAX_TETRAHEDRON_DETAIL {
                    return Err(GeometryError::DetailTooHigh {
                        detail,
                        max: MAX_TETRAHEDRON_DETAIL,
                    });
                }
            }
            GeometryKind::Ring {
                inner_radius,
                outer_radius,
                segments,
            } => {
                if !(inner_radius.is_finite() && outer_radius.is_finite())
                    || inner_radius < 0.0
                    || outer_radius <= inner_radius
                {
                    return Err(GeometryError::InvalidRing {
                        inner: inner_radius,
                        outer: outer_radius,
                    });
                }
                if segments < MIN_RING_SEGMENTS {
                    return Err(GeometryError::TooFewSegments {
                        segments,
                        min: MIN_RING_SEGMENTS,
                    });
                }
            }
        }
        Ok(())
    }
}

/// CPU-side mesh data.
#[derive(Debug, Clone, PartialEq)]
pub struct Geometry {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Geometry {
    /// Number of triangles described by the index buffer.
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Largest distance from the origin over all vertices.
    pub fn bounding_radius(&self) -> f32 {
        self.vertices
            .iter()
            .map(|v| Vec3::from(v.position).length())
            .fold(0.0, f32::max)
    }
}

/// Build the base mesh described by `kind`.
pub fn build_base_geometry(kind: &GeometryKind) -> Result<Geometry, GeometryError> {
    kind.validate()?;
    let geometry = match *kind {
        GeometryKind::Tetrahedron { radius, detail } => tetrahedron(radius, detail),
        GeometryKind::Ring {
            inner_radius,
            outer_radius,
            segments,
        } => ring(inner_radius, outer_radius, segments),
    };
    log::debug!(
        "built {:?}: {} vertices, {} triangles",
        kind,
        geometry.vertices.len(),
        geometry.triangle_count()
    );
    Ok(geometry)
}

fn tetrahedron(radius: f32, detail: u32) -> Geometry {
    const CORNERS: [Vec3; 4] = [
        Vec3::new(1.0, 1.0, 1.0),
        Vec3::new(-1.0, -1.0, 1.0),
        Vec3::new(-1.0, 1.0, -1.0),
        Vec3::new(1.0, -1.0, -1.0),
    ];
    const FACES: [[usize; 3]; 4] = [[2, 1, 0], [0, 3, 2], [1, 3, 0], [2, 3, 1]];

    let cols = detail as usize + 1;
    let mut vertices = Vec::with_capacity(FACES.len() * cols * cols * 3);

    for face in FACES {
        let (a, b, c) = (CORNERS[face[0]], CORNERS[face[1]], CORNERS[face[2]]);

        // Row i runs from edge a-b (i = 0) up to the apex c (i = cols).
        let grid: Vec<Vec<Vec3>> = (0..=cols)
            .map(|i| {
                let t = i as f32 / cols as f32;
                let left = a.lerp(c, t);
                let right = b.lerp(c, t);
                let rows = cols - i;
                if rows == 0 {
                    vec![left]
                } else {
                    (0..=rows)
                        .map(|j| left.lerp(right, j as f32 / rows as f32))
                        .collect()
                }
            })
            .collect();

        for i in 0..cols {
            for j in 0..(2 * (cols - i) - 1) {
                let k = j / 2;
                let tri = if j % 2 == 0 {
                    [grid[i][k + 1], grid[i + 1][k], grid[i][k]]
                } else {
                    [grid[i][k + 1], grid[i + 1][k + 1], grid[i + 1][k]]
                };
                push_flat_triangle(&mut vertices, tri.map(|p| p.normalize() * radius));
            }
        }
    }

    let indices = (0..vertices.len() as u32).collect();
    Geometry { vertices, indices }
}

/// Push a triangle with a face normal, flipping winding so it faces outward.
fn push_flat_triangle(out: &mut Vec<Vertex>, [p0, mut p1, mut p2]: [Vec3; 3]) {
    let mut normal = (p1 - p0).cross(p2 - p0).normalize_or_zero();
    let centroid = (p0 + p1 + p2) / 3.0;
    if normal.dot(centroid) < 0.0 {
        std::mem::swap(&mut p1, &mut p2);
        normal = -normal;
    }
    for p in [p0, p1, p2] {
        out.push(Vertex {
            position: p.to_array(),
            normal: normal.to_array(),
        });
    }
}

fn ring(inner: f32, outer: f32, segments: u32) -> Geometry {
    let n = segments as usize;
    let normal = Vec3::Z.to_array();
    let mut vertices = Vec::with_capacity(n * 2);

    // Even slots hold the inner edge, odd slots the outer edge.
    for i in 0..n {
        let angle = i as f32 / n as f32 * TAU;
        let (sin, cos) = angle.sin_cos();
        for r in [inner, outer] {
            vertices.push(Vertex {
                position: [r * cos, r * sin, 0.0],
                normal,
            });
        }
    }

    let mut indices = Vec::with_capacity(n * 6);
    for i in 0..n as u32 {
        let next = (i + 1) % segments;
        let (inner_a, outer_a) = (i * 2, i * 2 + 1);
        let (inner_b, outer_b) = (next * 2, next * 2 + 1);
        indices.extend_from_slice(&[inner_a, outer_a, outer_b, inner_a, outer_b, inner_b]);
    }

    Geometry { vertices, indices }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tri_normal(g: &Geometry, t: usize) -> Vec3 {
        let p = |k: usize| Vec3::from(g.vertices[g.indices[t * 3 + k] as usize].position);
        (p(1) - p(0)).cross(p(2) - p(0))
    }

    #[test]
    fn test_tetrahedron_detail_zero() {
        let g = build_base_geometry(&GeometryKind::Tetrahedron {
            radius: 10.0,
            detail: 0,
        })
        .unwrap();
        assert_eq!(g.triangle_count(), 4);
        assert_eq!(g.vertices.len(), 12);
        assert!((g.bounding_radius() - 10.0).abs() < 1e-4);
    }

    #[test]
    fn test_tetrahedron_subdivision_counts() {
        for detail in 0..=3 {
            let g = build_base_geometry(&GeometryKind::Tetrahedron {
                radius: 1.0,
                detail,
            })
            .unwrap();
            let cols = (detail + 1) as usize;
            assert_eq!(g.triangle_count(), 4 * cols * cols, "detail {}", detail);
        }
    }

    #[test]
    fn test_tetrahedron_faces_point_outward() {
        let g = build_base_geometry(&GeometryKind::Tetrahedron {
            radius: 2.0,
            detail: 2,
        })
        .unwrap();
        for t in 0..g.triangle_count() {
            let v = g.vertices[t * 3];
            assert!(Vec3::from(v.normal).dot(Vec3::from(v.position)) > 0.0);
            assert!(tri_normal(&g, t).dot(Vec3::from(v.normal)) > 0.0);
        }
    }

    #[test]
    fn test_geometry_is_deterministic() {
        let kind = GeometryKind::Tetrahedron {
            radius: 3.0,
            detail: 1,
        };
        assert_eq!(
            build_base_geometry(&kind).unwrap(),
            build_base_geometry(&kind).unwrap()
        );
    }

    #[test]
    fn test_ring_counts_and_winding() {
        let g = build_base_geometry(&GeometryKind::Ring {
            inner_radius: 0.5,
            outer_radius: 1.0,
            segments: 16,
        })
        .unwrap();
        assert_eq!(g.vertices.len(), 32);
        assert_eq!(g.triangle_count(), 32);
        for t in 0..g.triangle_count() {
            assert!(tri_normal(&g, t).z > 0.0, "triangle {} faces away", t);
        }
        assert!((g.bounding_radius() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_invalid_parameters() {
        assert_eq!(
            build_base_geometry(&GeometryKind::Tetrahedron {
                radius: 0.0,
                detail: 0
            }),
            Err(GeometryError::InvalidRadius(0.0))
        );
        assert!(matches!(
            build_base_geometry(&GeometryKind::Tetrahedron {
                radius: 1.0,
                detail: 9
            }),
            Err(GeometryError::DetailTooHigh { .. })
        ));
        assert!(matches!(
            build_base_geometry(&GeometryKind::Ring {
                inner_radius: 2.0,
                outer_radius: 1.0,
                segments: 8
            }),
            Err(GeometryError::InvalidRing { .. })
        ));
        assert!(matches!(
            build_base_geometry(&GeometryKind::Ring {
                inner_radius: 0.0,
                outer_radius: 1.0,
                segments: 2
            }),
            Err(GeometryError::TooFewSegments { .. })
        ));
    }

    #[test]
    fn test_full_screen_triangle_covers_viewport() {
        let [a, b, c] = FULL_SCREEN_TRIANGLE.map(|p| glam::Vec2::from(p));
        let inside = |p: glam::Vec2| {
            let d1 = (b - a).perp_dot(p - a);
            let d2 = (c - b).perp_dot(p - b);
            let d3 = (a - c).perp_dot(p - c);
            d1 >= 0.0 && d2 >= 0.0 && d3 >= 0.0
        };
        for corner in [[-1.0, -1.0], [1.0, -1.0], [-1.0, 1.0], [1.0, 1.0]] {
            assert!(inside(corner.into()), "corner {:?} not covered", corner);
        }
    }
}
