//! Offscreen render target.
//!
//! The background scene is drawn into an [`OffscreenTarget`] instead of the
//! window. Its color texture is then sampled by the compositor. A target is
//! "bound" for exactly as long as the [`wgpu::RenderPass`] returned by
//! [`OffscreenTarget::begin_pass`] lives; dropping the pass ends the bind
//! and later passes go wherever their own attachments point.

use super::DEPTH_FORMAT;
use crate::error::RenderTargetError;

/// Allocation options for an [`OffscreenTarget`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetOptions {
    /// Attach a depth buffer for 3D content.
    pub has_depth: bool,
    pub format: wgpu::TextureFormat,
}

impl Default for TargetOptions {
    fn default() -> Self {
        Self {
            has_depth: true,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
        }
    }
}

/// Color texture plus optional depth, resizable in place.
pub struct OffscreenTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    depth: Option<(wgpu::Texture, wgpu::TextureView)>,
    options: TargetOptions,
    width: u32,
    height: u32,
    generation: u64,
}

impl OffscreenTarget {
    /// Allocate a target of `width` by `height` pixels.
    pub fn create(
        device: &wgpu::Device,
        width: u32,
        height: u32,
        options: TargetOptions,
    ) -> Result<Self, RenderTargetError> {
        check_extent(device, width, height)?;
        let (texture, view) = color_texture(device, width, height, options.format);
        let depth = options
            .has_depth
            .then(|| depth_texture(device, width, height));
        log::debug!(
            "allocated offscreen target {}x{} ({:?}, depth: {})",
            width,
            height,
            options.format,
            options.has_depth
        );
        Ok(Self {
            texture,
            view,
            depth,
            options,
            width,
            height,
            generation: 0,
        })
    }

    /// Reallocate at a new size.
    ///
    /// Returns `Ok(false)` without touching the GPU when the size is
    /// unchanged. On error the existing textures are kept.
    pub fn resize(
        &mut self,
        device: &wgpu::Device,
        width: u32,
        height: u32,
    ) -> Result<bool, RenderTargetError> {
        check_extent(device, width, height)?;
        if width == self.width && height == self.height {
            return Ok(false);
        }

        let (texture, view) = color_texture(device, width, height, self.options.format);
        self.texture = texture;
        self.view = view;
        if self.options.has_depth {
            self.depth = Some(depth_texture(device, width, height));
        }
        self.width = width;
        self.height = height;
        self.generation += 1;
        log::debug!("resized offscreen target to {}x{}", width, height);
        Ok(true)
    }

    /// Begin a pass that clears and draws into this target.
    pub fn begin_pass<'e>(
        &self,
        encoder: &'e mut wgpu::CommandEncoder,
        clear: wgpu::Color,
    ) -> wgpu::RenderPass<'e> {
        encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("Offscreen Pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view: &self.view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(clear),
                    store: wgpu::StoreOp::Store,
                },
            })],
            depth_stencil_attachment: self.depth.as_ref().map(|(_, view)| {
                wgpu::RenderPassDepthStencilAttachment {
                    view,
                    depth_ops: Some(wgpu::Operations {
                        load: wgpu::LoadOp::Clear(1.0),
                        store: wgpu::StoreOp::Store,
                    }),
                    stencil_ops: None,
                }
            }),
            timestamp_writes: None,
            occlusion_query_set: None,
        })
    }

    /// View of the color texture, for sampling.
    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    #[inline]
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    #[inline]
    pub fn has_depth(&self) -> bool {
        self.depth.is_some()
    }

    #[inline]
    pub fn format(&self) -> wgpu::TextureFormat {
        self.options.format
    }

    /// Bumped every time the textures are reallocated. Anything holding a
    /// bind group over [`view`](Self::view) must rebuild it on change.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bytes of GPU memory held by the color and depth textures.
    pub fn footprint_bytes(&self) -> u64 {
        footprint_bytes(self.width, self.height, self.options)
    }
}

/// Bytes needed by a target of the given size and options.
pub fn footprint_bytes(width: u32, height: u32, options: TargetOptions) -> u64 {
    let texels = width as u64 * height as u64;
    let color = options.format.block_copy_size(None).unwrap_or(4) as u64;
    let depth = if options.has_depth {
        DEPTH_FORMAT.block_copy_size(None).unwrap_or(4) as u64
    } else {
        0
    };
    texels * (color + depth)
}

/// Reject extents the device cannot allocate.
pub fn validate_extent(width: u32, height: u32, limit: u32) -> Result<(), RenderTargetError> {
    if width == 0 || height == 0 {
        return Err(RenderTargetError::ZeroExtent { width, height });
    }
    if width > limit || height > limit {
        return Err(RenderTargetError::TooLarge {
            width,
            height,
            limit,
        });
    }
    Ok(())
}

fn check_extent(device: &wgpu::Device, width: u32, height: u32) -> Result<(), RenderTargetError> {
    validate_extent(width, height, device.limits().max_texture_dimension_2d)
}

fn extent(width: u32, height: u32) -> wgpu::Extent3d {
    wgpu::Extent3d {
        width,
        height,
        depth_or_array_layers: 1,
    }
}

fn color_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Texture"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT
            | wgpu::TextureUsages::TEXTURE_BINDING
            | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn depth_texture(device: &wgpu::Device, width: u32, height: u32) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Depth Texture"),
        size: extent(width, height),
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: DEPTH_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_validation() {
        assert!(validate_extent(800, 600, 8192).is_ok());
        assert_eq!(
            validate_extent(0, 600, 8192),
            Err(RenderTargetError::ZeroExtent {
                width: 0,
                height: 600
            })
        );
        assert!(matches!(
            validate_extent(9000, 10, 8192),
            Err(RenderTargetError::TooLarge { limit: 8192, .. })
        ));
    }

    #[test]
    fn test_footprint_counts_depth() {
        let with_depth = footprint_bytes(10, 10, TargetOptions::default());
        let without = footprint_bytes(
            10,
            10,
            TargetOptions {
                has_depth: false,
                ..Default::default()
            },
        );
        assert_eq!(without, 400);
        assert_eq!(with_depth, 800);
    }
}
