//! Readable output target for headless rendering.
//!
//! Stands in for the window surface when there is no window. Each frame is
//! copied into a staging buffer with rows padded to
//! [`wgpu::COPY_BYTES_PER_ROW_ALIGNMENT`], then unpadded on the CPU.

use crate::error::GpuError;
use crate::viewport::ViewportSize;

/// Format of captured frames. Matches what a PNG expects byte for byte.
pub const CAPTURE_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

const BYTES_PER_PIXEL: u32 = 4;

pub struct CaptureTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    staging: wgpu::Buffer,
    padded_bytes_per_row: u32,
    size: ViewportSize,
}

impl CaptureTarget {
    pub fn new(device: &wgpu::Device, size: ViewportSize) -> Self {
        let (texture, view) = capture_texture(device, size);
        let padded_bytes_per_row = padded_bytes_per_row(size.width());
        let staging = staging_buffer(device, padded_bytes_per_row, size.height());
        Self {
            texture,
            view,
            staging,
            padded_bytes_per_row,
            size,
        }
    }

    #[inline]
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    #[inline]
    pub fn size(&self) -> ViewportSize {
        self.size
    }

    pub fn resize(&mut self, device: &wgpu::Device, size: ViewportSize) {
        if size != self.size {
            *self = Self::new(device, size);
        }
    }

    /// Record the texture-to-buffer copy. Must be followed by a submit
    /// before [`read_rgba`](Self::read_rgba).
    pub fn encode_copy(&self, encoder: &mut wgpu::CommandEncoder) {
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &self.staging,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(self.padded_bytes_per_row),
                    rows_per_image: Some(self.size.height()),
                },
            },
            wgpu::Extent3d {
                width: self.size.width(),
                height: self.size.height(),
                depth_or_array_layers: 1,
            },
        );
    }

    /// Block until the last copied frame is readable and return it.
    pub fn read_rgba(&self, device: &wgpu::Device) -> Result<image::RgbaImage, GpuError> {
        let slice = self.staging.slice(..);
        let (sender, receiver) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        device.poll(wgpu::Maintain::Wait);
        receiver
            .recv()
            .map_err(|e| GpuError::BufferMapping(e.to_string()))?
            .map_err(|e| GpuError::BufferMapping(e.to_string()))?;

        let pixels = {
            let data = slice.get_mapped_range();
            unpad_rows(
                &data,
                self.padded_bytes_per_row,
                self.size.width() * BYTES_PER_PIXEL,
                self.size.height(),
            )
        };
        self.staging.unmap();

        image::RgbaImage::from_raw(self.size.width(), self.size.height(), pixels).ok_or_else(|| {
            GpuError::BufferMapping("captured frame has an unexpected length".to_string())
        })
    }
}

/// Row pitch rounded up to the copy alignment.
pub fn padded_bytes_per_row(width: u32) -> u32 {
    let unpadded = width * BYTES_PER_PIXEL;
    let align = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT;
    unpadded.div_ceil(align) * align
}

fn unpad_rows(data: &[u8], padded: u32, unpadded: u32, rows: u32) -> Vec<u8> {
    let mut pixels = Vec::with_capacity((unpadded * rows) as usize);
    for row in 0..rows {
        let start = (row * padded) as usize;
        pixels.extend_from_slice(&data[start..start + unpadded as usize]);
    }
    pixels
}

fn capture_texture(device: &wgpu::Device, size: ViewportSize) -> (wgpu::Texture, wgpu::TextureView) {
    let texture = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Capture Texture"),
        size: wgpu::Extent3d {
            width: size.width(),
            height: size.height(),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: CAPTURE_FORMAT,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    });
    let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
    (texture, view)
}

fn staging_buffer(device: &wgpu::Device, padded_bytes_per_row: u32, height: u32) -> wgpu::Buffer {
    device.create_buffer(&wgpu::BufferDescriptor {
        label: Some("Capture Staging Buffer"),
        size: padded_bytes_per_row as u64 * height as u64,
        usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
        mapped_at_creation: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_padding() {
        assert_eq!(padded_bytes_per_row(1), 256);
        assert_eq!(padded_bytes_per_row(64), 256);
        assert_eq!(padded_bytes_per_row(65), 512);
    }

    #[test]
    fn test_unpad_drops_row_tail() {
        let mut data = vec![0u8; 2 * 8];
        data[0..4].copy_from_slice(&[1, 2, 3, 4]);
        data[8..12].copy_from_slice(&[5, 6, 7, 8]);
        assert_eq!(unpad_rows(&data, 8, 4, 2), vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
