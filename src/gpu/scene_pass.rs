//! Instanced mesh pass.
//!
//! A [`ScenePass`] mirrors one [`Scene`] on the GPU: a vertex and index
//! buffer per layer, an instance buffer refreshed every frame with
//! `queue.write_buffer`, and a small color uniform. The same pass type
//! draws the offscreen background (with depth) and the window overlay
//! (without).

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};
use wgpu::util::DeviceExt;

use super::DEPTH_FORMAT;
use crate::error::GeometryError;
use crate::geometry::{build_base_geometry, GeometryKind, Vertex};
use crate::instancing::InstanceRaw;
use crate::scene::{PointLight, Scene};

/// WGSL source of the mesh shader.
pub const SCENE_WGSL: &str = include_str!("shaders/scene.wgsl");

/// Per-pass uniform block, `SceneUniforms` in `scene.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SceneUniforms {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    /// xyz position, w range.
    pub light_position: [f32; 4],
    /// rgb color scaled by intensity, w ambient.
    pub light_color: [f32; 4],
}

impl SceneUniforms {
    pub fn new(view_proj: Mat4, eye: Vec3, light: &PointLight) -> Self {
        let color = light.color * light.intensity;
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            light_position: light.position.extend(light.range).to_array(),
            light_color: color.extend(light.ambient).to_array(),
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct LayerUniforms {
    color: [f32; 4],
}

/// Fixed-function state of a [`ScenePass`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScenePassOptions {
    pub label: &'static str,
    pub format: wgpu::TextureFormat,
    /// Depth test and write against [`DEPTH_FORMAT`].
    pub depth: bool,
    pub cull_back: bool,
}

struct LayerGpu {
    kind: GeometryKind,
    vertex_buffer: wgpu::Buffer,
    index_buffer: wgpu::Buffer,
    index_count: u32,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
    instance_count: u32,
    color_buffer: wgpu::Buffer,
    color_bind_group: wgpu::BindGroup,
    visible: bool,
}

pub struct ScenePass {
    options: ScenePassOptions,
    pipeline: wgpu::RenderPipeline,
    camera_buffer: wgpu::Buffer,
    camera_bind_group: wgpu::BindGroup,
    layer_layout: wgpu::BindGroupLayout,
    layers: Vec<LayerGpu>,
    scratch: Vec<InstanceRaw>,
}

impl ScenePass {
    pub fn new(device: &wgpu::Device, options: ScenePassOptions) -> Self {
        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Scene Shader"),
            source: wgpu::ShaderSource::Wgsl(SCENE_WGSL.into()),
        });

        let camera_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Camera Layout"),
            entries: &[uniform_entry(
                wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
            )],
        });
        let layer_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Scene Layer Layout"),
            entries: &[uniform_entry(wgpu::ShaderStages::FRAGMENT)],
        });

        let camera_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Scene Uniforms"),
            size: std::mem::size_of::<SceneUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Scene Camera Bind Group"),
            layout: &camera_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Scene Pipeline Layout"),
            bind_group_layouts: &[&camera_layout, &layer_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some(options.label),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[Vertex::layout(), InstanceRaw::layout()],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: options.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: options.cull_back.then_some(wgpu::Face::Back),
                ..Default::default()
            },
            depth_stencil: options.depth.then(|| wgpu::DepthStencilState {
                format: DEPTH_FORMAT,
                depth_write_enabled: true,
                depth_compare: wgpu::CompareFunction::Less,
                stencil: wgpu::StencilState::default(),
                bias: wgpu::DepthBiasState::default(),
            }),
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            options,
            pipeline,
            camera_buffer,
            camera_bind_group,
            layer_layout,
            layers: Vec::new(),
            scratch: Vec::new(),
        }
    }

    #[inline]
    pub fn options(&self) -> ScenePassOptions {
        self.options
    }

    /// Instances that the next [`record`](Self::record) will draw.
    pub fn drawn_instances(&self) -> u32 {
        self.layers
            .iter()
            .filter(|l| l.visible)
            .map(|l| l.instance_count)
            .sum()
    }

    /// Upload camera, light and instance data for `scene`.
    ///
    /// Layer meshes are built on first sight and rebuilt only when a
    /// layer's mesh kind changes.
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        scene: &Scene,
        view_proj: Mat4,
        eye: Vec3,
    ) -> Result<(), GeometryError> {
        let uniforms = SceneUniforms::new(view_proj, eye, &scene.light);
        queue.write_buffer(&self.camera_buffer, 0, bytemuck::bytes_of(&uniforms));

        self.layers.truncate(scene.layers().len());
        for (i, layer) in scene.layers().iter().enumerate() {
            let stale = self.layers.get(i).is_some_and(|gpu| gpu.kind != layer.mesh);
            if i >= self.layers.len() || stale {
                let gpu = self.create_layer(device, &layer.mesh)?;
                if stale {
                    self.layers[i] = gpu;
                } else {
                    self.layers.push(gpu);
                }
            }

            layer.instances.pack_into(&mut self.scratch);
            let gpu = &mut self.layers[i];
            gpu.visible = layer.visible;

            if self.scratch.len() > gpu.instance_capacity {
                let capacity = self.scratch.len().next_power_of_two();
                gpu.instance_buffer = create_instance_buffer(device, capacity);
                gpu.instance_capacity = capacity;
            }
            if !self.scratch.is_empty() {
                queue.write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&self.scratch));
            }
            gpu.instance_count = self.scratch.len() as u32;

            let color = LayerUniforms {
                color: [layer.color[0], layer.color[1], layer.color[2], 1.0],
            };
            queue.write_buffer(&gpu.color_buffer, 0, bytemuck::bytes_of(&color));
        }
        Ok(())
    }

    /// Record draw calls into an already begun pass.
    pub fn record(&self, pass: &mut wgpu::RenderPass<'_>) {
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.camera_bind_group, &[]);
        for layer in self.layers.iter().filter(|l| l.visible && l.instance_count > 0) {
            pass.set_bind_group(1, &layer.color_bind_group, &[]);
            pass.set_vertex_buffer(0, layer.vertex_buffer.slice(..));
            pass.set_vertex_buffer(1, layer.instance_buffer.slice(..));
            pass.set_index_buffer(layer.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
            pass.draw_indexed(0..layer.index_count, 0, 0..layer.instance_count);
        }
    }

    fn create_layer(&self, device: &wgpu::Device, kind: &GeometryKind) -> Result<LayerGpu, GeometryError> {
        let geometry = build_base_geometry(kind)?;

        let vertex_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Vertex Buffer"),
            contents: bytemuck::cast_slice(&geometry.vertices),
            usage: wgpu::BufferUsages::VERTEX,
        });
        let index_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Mesh Index Buffer"),
            contents: bytemuck::cast_slice(&geometry.indices),
            usage: wgpu::BufferUsages::INDEX,
        });

        let color_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Layer Color"),
            size: std::mem::size_of::<LayerUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        let color_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("Layer Bind Group"),
            layout: &self.layer_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: color_buffer.as_entire_binding(),
            }],
        });

        Ok(LayerGpu {
            kind: *kind,
            vertex_buffer,
            index_buffer,
            index_count: geometry.indices.len() as u32,
            instance_buffer: create_instance_buffer(device, 1),
            instance_capacity: 1,
            instance_count: 0,
            color_buffer,
            color_bind_group,
            visible: true,
        })
    }
}

fn uniform_entry(visibility: wgpu::ShaderStages) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding: 0,
        visibility,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn create_instance_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Instance Buffer"),
        size: (capacity.max(1) * std::mem::size_of::<InstanceRaw>()) as u64,
        usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        mapped_at_creation: false,
    })
}
