//! Full-screen compositor pass.
//!
//! Samples the offscreen scene and writes it to the output with a vignette
//! and film grain. Draws a single triangle generated in the vertex shader,
//! so the pass has no vertex buffers.

use bytemuck::{Pod, Zeroable};

use super::render_target::OffscreenTarget;
use crate::config::CompositorSettings;

/// WGSL source of the compositor shader.
pub const COMPOSITE_WGSL: &str = include_str!("shaders/composite.wgsl");

/// Uniform block shared with `composite.wgsl`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CompositeUniforms {
    pub resolution: [f32; 2],
    pub time: f32,
    pub vignette: f32,
    pub grain: f32,
    pub _pad: [f32; 3],
}

impl CompositeUniforms {
    pub fn new(resolution: [f32; 2], settings: &CompositorSettings) -> Self {
        Self {
            resolution,
            time: 0.0,
            vignette: settings.vignette,
            grain: settings.grain,
            _pad: [0.0; 3],
        }
    }
}

/// Pipeline, sampler and bindings for the composite pass.
pub struct CompositorPass {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    sampler: wgpu::Sampler,
    uniform_buffer: wgpu::Buffer,
    uniforms: CompositeUniforms,
    dirty: bool,
    source_generation: u64,
}

impl CompositorPass {
    pub fn new(
        device: &wgpu::Device,
        source: &OffscreenTarget,
        resolution: [f32; 2],
        output_format: wgpu::TextureFormat,
        settings: &CompositorSettings,
    ) -> Self {
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("Scene Sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let uniforms = CompositeUniforms::new(resolution, settings);
        let uniform_buffer = device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Composite Uniforms"),
            size: std::mem::size_of::<CompositeUniforms>() as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("Composite Shader"),
            source: wgpu::ShaderSource::Wgsl(COMPOSITE_WGSL.into()),
        });

        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Composite Bind Group Layout"),
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Texture {
                        sample_type: wgpu::TextureSampleType::Float { filterable: true },
                        view_dimension: wgpu::TextureViewDimension::D2,
                        multisampled: false,
                    },
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 1,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
            ],
        });

        let bind_group = create_bind_group(device, &bind_group_layout, source, &sampler, &uniform_buffer);

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("Composite Pipeline Layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("Composite Pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[],
                compilation_options: Default::default(),
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format: output_format,
                    blend: None,
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: Default::default(),
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                cull_mode: None,
                ..Default::default()
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            multiview: None,
            cache: None,
        });

        Self {
            pipeline,
            bind_group_layout,
            bind_group,
            sampler,
            uniform_buffer,
            uniforms,
            dirty: true,
            source_generation: source.generation(),
        }
    }

    /// Current uniform values, as last set.
    pub fn uniforms(&self) -> &CompositeUniforms {
        &self.uniforms
    }

    pub fn set_resolution(&mut self, resolution: [f32; 2]) {
        if self.uniforms.resolution != resolution {
            self.uniforms.resolution = resolution;
            self.dirty = true;
        }
    }

    pub fn set_time(&mut self, time: f32) {
        if self.uniforms.time != time {
            self.uniforms.time = time;
            self.dirty = true;
        }
    }

    /// Point the sampler at `source` again if its textures were reallocated.
    pub fn rebind_source(&mut self, device: &wgpu::Device, source: &OffscreenTarget) -> bool {
        if source.generation() == self.source_generation {
            return false;
        }
        self.bind_group = create_bind_group(
            device,
            &self.bind_group_layout,
            source,
            &self.sampler,
            &self.uniform_buffer,
        );
        self.source_generation = source.generation();
        true
    }

    /// Upload uniforms changed since the last frame.
    pub fn prepare(&mut self, queue: &wgpu::Queue) {
        if self.dirty {
            queue.write_buffer(&self.uniform_buffer, 0, bytemuck::bytes_of(&self.uniforms));
            self.dirty = false;
        }
    }

    /// Clear `output` and draw the composited scene over it.
    pub fn render(&self, encoder: &mut wgpu::CommandEncoder, output: &wgpu::TextureView) {
        let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Composite Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: output,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
        });
        pass.set_pipeline(&self.pipeline);
        pass.set_bind_group(0, &self.bind_group, &[]);
        pass.draw(0..3, 0..1);
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    source: &OffscreenTarget,
    sampler: &wgpu::Sampler,
    uniform_buffer: &wgpu::Buffer,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("Composite Bind Group"),
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(source.view()),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: uniform_buffer.as_entire_binding(),
            },
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layout_matches_wgsl() {
        assert_eq!(std::mem::size_of::<CompositeUniforms>(), 32);
        assert_eq!(std::mem::size_of::<CompositeUniforms>() % 16, 0);
    }

    #[test]
    fn test_uniforms_from_settings() {
        let u = CompositeUniforms::new([800.0, 600.0], &CompositorSettings::default());
        assert_eq!(u.resolution, [800.0, 600.0]);
        assert_eq!(u.time, 0.0);
        assert_eq!(u.vignette, 0.35);
    }

    #[test]
    fn test_shader_names_uniforms() {
        for name in ["uScene", "uResolution", "uTime"] {
            assert!(COMPOSITE_WGSL.contains(name), "missing {name}");
        }
    }
}
