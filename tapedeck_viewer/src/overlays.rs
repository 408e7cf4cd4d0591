//! HUD panels rendered as textured quads. Text is rasterized with fontdue
//! into an RGBA buffer per panel and re-uploaded only when the contents
//! change.

use std::collections::HashMap;
use std::mem;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use bytemuck::{Pod, Zeroable, cast_slice};
use fontdue::{Font, FontSettings, Metrics};
use wgpu::util::DeviceExt;
use winit::dpi::PhysicalSize;

use crate::texture::prepare_rgba_upload;
use crate::ui_layout::ViewportRect;

const FONT_SIZE_PX: f32 = 16.0;

/// HUD font plus the per-character cell metrics derived from it.
pub struct HudFont {
    font: Font,
    layout: GlyphLayout,
    cache: Mutex<HashMap<char, GlyphBitmap>>,
}

impl HudFont {
    pub fn load(path: &Path) -> Result<Arc<Self>> {
        let data =
            std::fs::read(path).with_context(|| format!("reading HUD font {}", path.display()))?;
        let font = Font::from_bytes(data, FontSettings::default())
            .map_err(|err| anyhow!("parsing HUD font {}: {err}", path.display()))?;
        let layout = GlyphLayout::from_font(&font, FONT_SIZE_PX);
        Ok(Arc::new(Self {
            font,
            layout,
            cache: Mutex::new(HashMap::new()),
        }))
    }

    fn glyph(&self, ch: char) -> GlyphBitmap {
        self.load_or_cache(ch)
            .or_else(|| self.load_or_cache('?'))
            .unwrap_or_else(GlyphBitmap::empty)
    }

    fn load_or_cache(&self, ch: char) -> Option<GlyphBitmap> {
        if let Ok(cache) = self.cache.lock() {
            if let Some(glyph) = cache.get(&ch).cloned() {
                return Some(glyph);
            }
        }

        let glyph_index = self.font.lookup_glyph_index(ch);
        if glyph_index == 0 && ch != '?' && ch != ' ' {
            return None;
        }

        let (metrics, bitmap) = self.font.rasterize_indexed(glyph_index, FONT_SIZE_PX);
        let glyph = GlyphBitmap {
            width: metrics.width as u32,
            height: metrics.height as u32,
            xmin: metrics.xmin,
            ymin: metrics.ymin,
            alpha: Arc::from(bitmap.into_boxed_slice()),
        };
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(ch, glyph.clone());
        }
        Some(glyph)
    }
}

pub struct PanelConfig {
    pub width: u32,
    pub height: u32,
    pub padding_x: u32,
    pub padding_y: u32,
    pub label: &'static str,
}

/// One HUD panel: CPU-side RGBA pixels, a texture, and the NDC quad it maps
/// onto.
pub struct TextPanel {
    texture: wgpu::Texture,
    _view: wgpu::TextureView,
    _sampler: wgpu::Sampler,
    bind_group: wgpu::BindGroup,
    vertex_buffer: wgpu::Buffer,
    width: u32,
    height: u32,
    padding_x: u32,
    padding_y: u32,
    pixels: Vec<u8>,
    dirty: bool,
    visible: bool,
    label: &'static str,
}

impl TextPanel {
    const FG_COLOR: [u8; 4] = [255, 255, 255, 240];
    const BG_COLOR: [u8; 4] = [0, 0, 0, 96];
    const BAR_COLOR: [u8; 4] = [240, 196, 64, 240];

    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        bind_group_layout: &wgpu::BindGroupLayout,
        window_size: PhysicalSize<u32>,
        config: PanelConfig,
    ) -> Result<Self> {
        let extent = wgpu::Extent3d {
            width: config.width,
            height: config.height,
            depth_or_array_layers: 1,
        };
        let texture_label = format!("{}-texture", config.label);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(texture_label.as_str()),
            size: extent,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
        let sampler_label = format!("{}-sampler", config.label);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some(sampler_label.as_str()),
            address_mode_u: wgpu::AddressMode::ClampToEdge,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Nearest,
            min_filter: wgpu::FilterMode::Nearest,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let bind_group_label = format!("{}-bind-group", config.label);
        let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(bind_group_label.as_str()),
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

        let mut pixels = vec![0u8; (config.width * config.height * 4) as usize];
        fill_background(&mut pixels);

        let upload = prepare_rgba_upload(config.width, config.height, &pixels)?;
        queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            upload.pixels(),
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(upload.bytes_per_row()),
                rows_per_image: Some(config.height),
            },
            extent,
        );

        let initial_rect = ViewportRect {
            x: 0.0,
            y: 0.0,
            width: config.width as f32,
            height: config.height as f32,
        };
        let vertex_buffer = create_vertex_buffer(device, window_size, initial_rect, config.label);

        Ok(Self {
            texture,
            _view: view,
            _sampler: sampler,
            bind_group,
            vertex_buffer,
            width: config.width,
            height: config.height,
            padding_x: config.padding_x,
            padding_y: config.padding_y,
            pixels,
            dirty: false,
            visible: false,
            label: config.label,
        })
    }

    pub fn update_layout(
        &mut self,
        device: &wgpu::Device,
        window_size: PhysicalSize<u32>,
        rect: ViewportRect,
    ) {
        self.vertex_buffer = create_vertex_buffer(device, window_size, rect, self.label);
    }

    pub fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Rasterize `lines` into the panel, wrapping at the cell grid. An empty
    /// slice hides the panel.
    pub fn set_lines(&mut self, font: &HudFont, lines: &[String]) {
        fill_background(&mut self.pixels);

        let usable_width = self.width.saturating_sub(self.padding_x * 2);
        let usable_height = self.height.saturating_sub(self.padding_y * 2);
        let layout = &font.layout;
        let glyph_width = layout.cell_advance.max(1);
        let glyph_height = layout.line_height.max(1);
        let max_cols = (usable_width / glyph_width) as usize;
        let max_rows = (usable_height / glyph_height) as usize;

        if max_cols == 0 || max_rows == 0 {
            self.dirty = true;
            self.visible = !lines.is_empty();
            return;
        }

        let display_lines = wrap_lines(lines, max_cols, max_rows);
        for (row_idx, line) in display_lines.iter().enumerate() {
            let line_top = self.padding_y + row_idx as u32 * glyph_height;
            for (col_idx, ch) in line.chars().take(max_cols).enumerate() {
                if ch == '\r' {
                    continue;
                }
                let glyph = font.glyph(ch);
                let cell_x = self.padding_x + col_idx as u32 * glyph_width;
                self.blit_glyph(cell_x, line_top, &glyph, layout);
            }
        }

        self.dirty = true;
        self.visible = !display_lines.is_empty();
    }

    /// Paint a horizontal fill bar covering `fraction` of the usable width.
    pub fn set_bar(&mut self, fraction: f32) {
        fill_background(&mut self.pixels);

        let usable_width = self.width.saturating_sub(self.padding_x * 2);
        let usable_height = self.height.saturating_sub(self.padding_y * 2);
        let filled = (usable_width as f32 * fraction.clamp(0.0, 1.0)).round() as u32;
        for y in self.padding_y..self.padding_y + usable_height {
            for x in self.padding_x..self.padding_x + filled {
                let idx = ((y * self.width + x) * 4) as usize;
                self.pixels[idx..idx + 4].copy_from_slice(&Self::BAR_COLOR);
            }
        }

        self.dirty = true;
        self.visible = true;
    }

    fn blit_glyph(&mut self, cell_x: u32, line_top: u32, glyph: &GlyphBitmap, layout: &GlyphLayout) {
        if glyph.width == 0 || glyph.height == 0 {
            return;
        }

        let start_x = cell_x as i32 + layout.left_bearing + glyph.xmin;
        let baseline = line_top as i32 + layout.ascent;
        let start_y = baseline - (glyph.ymin + glyph.height as i32);

        for gy in 0..glyph.height {
            let dest_y = start_y + gy as i32;
            if dest_y < 0 || dest_y >= self.height as i32 {
                continue;
            }
            let source_row = gy as usize * glyph.width as usize;
            for gx in 0..glyph.width {
                let coverage = glyph.alpha[source_row + gx as usize];
                if coverage == 0 {
                    continue;
                }
                let dest_x = start_x + gx as i32;
                if dest_x < 0 || dest_x >= self.width as i32 {
                    continue;
                }
                let idx = ((dest_y as u32 * self.width + dest_x as u32) * 4) as usize;
                let alpha = ((coverage as u16 * Self::FG_COLOR[3] as u16) / u8::MAX as u16) as u8;
                self.pixels[idx..idx + 4].copy_from_slice(&[
                    Self::FG_COLOR[0],
                    Self::FG_COLOR[1],
                    Self::FG_COLOR[2],
                    alpha,
                ]);
            }
        }
    }

    pub fn upload(&mut self, queue: &wgpu::Queue) {
        if !self.dirty {
            return;
        }
        let upload = match prepare_rgba_upload(self.width, self.height, &self.pixels) {
            Ok(upload) => upload,
            Err(err) => {
                log::warn!("panel upload failed ({}x{}): {err}", self.width, self.height);
                return;
            }
        };
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
        self.dirty = false;
    }

    pub fn bind_group(&self) -> &wgpu::BindGroup {
        &self.bind_group
    }

    pub fn vertex_buffer(&self) -> &wgpu::Buffer {
        &self.vertex_buffer
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct PanelVertex {
    position: [f32; 2],
    uv: [f32; 2],
}

fn vertex_positions(rect: ViewportRect, window: PhysicalSize<u32>) -> [PanelVertex; 4] {
    let width = window.width.max(1) as f32;
    let height = window.height.max(1) as f32;

    let left = (rect.x / width) * 2.0 - 1.0;
    let right = ((rect.x + rect.width) / width) * 2.0 - 1.0;
    let top = 1.0 - (rect.y / height) * 2.0;
    let bottom = 1.0 - ((rect.y + rect.height) / height) * 2.0;

    [
        PanelVertex {
            position: [left, top],
            uv: [0.0, 0.0],
        },
        PanelVertex {
            position: [right, top],
            uv: [1.0, 0.0],
        },
        PanelVertex {
            position: [left, bottom],
            uv: [0.0, 1.0],
        },
        PanelVertex {
            position: [right, bottom],
            uv: [1.0, 1.0],
        },
    ]
}

fn create_vertex_buffer(
    device: &wgpu::Device,
    window_size: PhysicalSize<u32>,
    rect: ViewportRect,
    label: &str,
) -> wgpu::Buffer {
    let vertices = vertex_positions(rect, window_size);
    let vertex_label = format!("{label}-vertices");
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some(vertex_label.as_str()),
        contents: cast_slice(&vertices),
        usage: wgpu::BufferUsages::VERTEX,
    })
}

fn fill_background(buffer: &mut [u8]) {
    for chunk in buffer.chunks_exact_mut(4) {
        chunk.copy_from_slice(&TextPanel::BG_COLOR);
    }
}

fn wrap_lines(lines: &[String], max_cols: usize, max_rows: usize) -> Vec<String> {
    let mut result = Vec::new();
    for line in lines {
        if result.len() >= max_rows {
            break;
        }
        for segment in line.split('\n') {
            if result.len() >= max_rows {
                break;
            }
            wrap_segment(&mut result, segment, max_cols, max_rows);
        }
    }
    result
}

fn wrap_segment(out: &mut Vec<String>, segment: &str, max_cols: usize, max_rows: usize) {
    if segment.is_empty() {
        out.push(String::new());
        return;
    }

    let mut buffer = String::new();
    let mut count = 0;
    for ch in segment.chars() {
        buffer.push(ch);
        count += 1;
        if count == max_cols {
            if out.len() >= max_rows {
                return;
            }
            out.push(mem::take(&mut buffer));
            count = 0;
        }
    }
    if count > 0 && out.len() < max_rows {
        out.push(buffer);
    }
}

#[derive(Clone)]
struct GlyphBitmap {
    width: u32,
    height: u32,
    xmin: i32,
    ymin: i32,
    alpha: Arc<[u8]>,
}

impl GlyphBitmap {
    fn empty() -> Self {
        Self {
            width: 0,
            height: 0,
            xmin: 0,
            ymin: 0,
            alpha: Arc::<[u8]>::from([]),
        }
    }
}

struct GlyphLayout {
    line_height: u32,
    cell_advance: u32,
    ascent: i32,
    left_bearing: i32,
}

impl GlyphLayout {
    fn from_font(font: &Font, size: f32) -> Self {
        let mut min_xmin = 0;
        let mut max_xmax = 0;
        let mut min_ymin = 0;
        let mut max_ymax = 0;
        let mut max_advance = 0.0f32;
        let mut initialized = false;

        for ch in (32u8..=126).map(|b| b as char) {
            let glyph_index = font.lookup_glyph_index(ch);
            let metrics: Metrics = font.metrics_indexed(glyph_index, size);
            max_advance = max_advance.max(metrics.advance_width);

            if metrics.width == 0 && metrics.height == 0 {
                initialized = true;
                continue;
            }

            let xmax = metrics.xmin + metrics.width as i32;
            let ymax = metrics.ymin + metrics.height as i32;
            if !initialized {
                min_xmin = metrics.xmin;
                max_xmax = xmax;
                min_ymin = metrics.ymin;
                max_ymax = ymax;
                initialized = true;
            } else {
                min_xmin = min_xmin.min(metrics.xmin);
                max_xmax = max_xmax.max(xmax);
                min_ymin = min_ymin.min(metrics.ymin);
                max_ymax = max_ymax.max(ymax);
            }
        }

        if !initialized {
            return Self {
                line_height: 1,
                cell_advance: 1,
                ascent: 0,
                left_bearing: 0,
            };
        }

        let left_bearing = -min_xmin;
        let descent = -min_ymin;
        let ascent = max_ymax;
        let cell_width = (left_bearing + max_xmax).max(1) as u32;
        let advance = max_advance.max(cell_width as f32).ceil() as u32;

        Self {
            line_height: (ascent + descent).max(1) as u32,
            cell_advance: advance.max(1),
            ascent,
            left_bearing,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_respects_column_and_row_limits() {
        let lines = vec!["abcdef".to_string(), "gh".to_string()];
        let wrapped = wrap_lines(&lines, 3, 2);
        assert_eq!(wrapped, vec!["abc".to_string(), "def".to_string()]);
    }

    #[test]
    fn embedded_newlines_split_segments() {
        let lines = vec!["one\ntwo".to_string()];
        let wrapped = wrap_lines(&lines, 8, 4);
        assert_eq!(wrapped, vec!["one".to_string(), "two".to_string()]);
    }
}
