//! RGBA upload helpers. wgpu requires row pitches aligned to
//! `COPY_BYTES_PER_ROW_ALIGNMENT`, so uploads that miss the alignment get
//! re-packed into a padded staging buffer.

use std::borrow::Cow;

use anyhow::{Result, ensure};

pub struct TextureUpload<'a> {
    data: Cow<'a, [u8]>,
    bytes_per_row: u32,
}

impl TextureUpload<'_> {
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes_per_row(&self) -> u32 {
        self.bytes_per_row
    }
}

pub fn prepare_rgba_upload<'a>(width: u32, height: u32, data: &'a [u8]) -> Result<TextureUpload<'a>> {
    ensure!(width > 0 && height > 0, "texture has no dimensions");
    let row_bytes = 4usize * width as usize;
    let required = row_bytes * height as usize;
    ensure!(
        data.len() >= required,
        "texture buffer ({}) smaller than {}x{} RGBA ({})",
        data.len(),
        width,
        height,
        required
    );

    let alignment = wgpu::COPY_BYTES_PER_ROW_ALIGNMENT as usize;
    if row_bytes % alignment == 0 && data.len() == required {
        return Ok(TextureUpload {
            data: Cow::Borrowed(data),
            bytes_per_row: row_bytes as u32,
        });
    }

    let padded_row_bytes = row_bytes.div_ceil(alignment) * alignment;
    let mut buffer = vec![0u8; padded_row_bytes * height as usize];
    for row in 0..height as usize {
        let src = row * row_bytes;
        let dst = row * padded_row_bytes;
        buffer[dst..dst + row_bytes].copy_from_slice(&data[src..src + row_bytes]);
    }

    Ok(TextureUpload {
        data: Cow::Owned(buffer),
        bytes_per_row: padded_row_bytes as u32,
    })
}

/// GPU texture the decoded video frames stream into. Created once the first
/// session reports its dimensions.
pub struct VideoTexture {
    texture: wgpu::Texture,
    _view: wgpu::TextureView,
    _sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    width: u32,
    height: u32,
}

impl VideoTexture {
    pub fn new(
        device: &wgpu::Device,
        bind_group_layout: &wgpu::BindGroupLayout,
        width: u32,
        height: u32,
    ) -> Self {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("video-frame-texture"),
            size: wgpu::Extent3d {
                width: width.max(1),
                height: height.max(1),
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("video-frame-sampler"),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("video-frame-bind-group"),
            layout: bind_group_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(&view),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: wgpu::BindingResource::Sampler(&sampler),
                },
            ],
        });

        Self {
            texture,
            _view: view,
            _sampler: sampler,
            bind_group,
            width,
            height,
        }
    }

    pub fn matches(&self, width: u32, height: u32) -> bool {
        self.width == width && self.height == height
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn write_frame(&self, queue: &wgpu::Queue, frame: &[u8]) -> Result<()> {
        let upload = prepare_rgba_upload(self.width, self.height, frame)?;
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row()),
                rows_per_image: Some(self.height),
            },
            wgpu::Extent3d {
                width: self.width,
                height: self.height,
                depth_or_array_layers: 1,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_rows_borrow_the_source() {
        // 64 pixels per row is already a 256-byte pitch.
        let data = vec![7u8; 64 * 2 * 4];
        let upload = prepare_rgba_upload(64, 2, &data).expect("aligned upload");
        assert_eq!(upload.bytes_per_row(), 256);
        assert_eq!(upload.pixels().len(), data.len());
    }

    #[test]
    fn unaligned_rows_are_padded() {
        let data = vec![9u8; 3 * 2 * 4];
        let upload = prepare_rgba_upload(3, 2, &data).expect("padded upload");
        assert_eq!(upload.bytes_per_row() % wgpu::COPY_BYTES_PER_ROW_ALIGNMENT, 0);
        assert_eq!(&upload.pixels()[..12], &data[..12]);
        assert_eq!(upload.pixels()[12], 0);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let data = vec![0u8; 8];
        assert!(prepare_rgba_upload(4, 4, &data).is_err());
    }
}
