//! Environment reflection map. The showcase uses one equirectangular Radiance
//! HDR image for ambient reflections; it is tonemapped on the CPU so the
//! viewer can upload a plain RGBA8 texture and sample it with filtering.

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{Context, Result};
use image::codecs::hdr::HdrDecoder;

/// Decoded equirectangular map, RGBA8 after tonemapping.
#[derive(Debug, Clone)]
pub struct EnvironmentMap {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl EnvironmentMap {
    /// Mean color of the map, used as a flat ambient term.
    pub fn average_color(&self) -> [f32; 3] {
        let mut sums = [0u64; 3];
        let mut count = 0u64;
        for chunk in self.pixels.chunks_exact(4) {
            sums[0] += chunk[0] as u64;
            sums[1] += chunk[1] as u64;
            sums[2] += chunk[2] as u64;
            count += 1;
        }
        if count == 0 {
            return [0.0; 3];
        }
        [
            sums[0] as f32 / (count as f32 * 255.0),
            sums[1] as f32 / (count as f32 * 255.0),
            sums[2] as f32 / (count as f32 * 255.0),
        ]
    }
}

/// Load an equirectangular environment image. `.hdr` files go through the
/// Radiance decoder and a Reinhard tonemap; anything else is decoded as an
/// ordinary LDR image.
pub fn load_environment(path: &Path) -> Result<EnvironmentMap> {
    let is_hdr = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("hdr"))
        .unwrap_or(false);

    if is_hdr {
        let file = File::open(path)
            .with_context(|| format!("opening environment map {}", path.display()))?;
        let decoder = HdrDecoder::new(BufReader::new(file))
            .with_context(|| format!("decoding environment map {}", path.display()))?;
        let metadata = decoder.metadata();
        let texels = decoder
            .read_image_hdr()
            .with_context(|| format!("reading environment map {}", path.display()))?;

        let mut pixels = Vec::with_capacity(texels.len() * 4);
        for texel in texels {
            pixels.push(tonemap_channel(texel[0]));
            pixels.push(tonemap_channel(texel[1]));
            pixels.push(tonemap_channel(texel[2]));
            pixels.push(255);
        }
        return Ok(EnvironmentMap {
            width: metadata.width,
            height: metadata.height,
            pixels,
        });
    }

    let decoded = image::open(path)
        .with_context(|| format!("decoding environment map {}", path.display()))?
        .to_rgba8();
    Ok(EnvironmentMap {
        width: decoded.width(),
        height: decoded.height(),
        pixels: decoded.into_raw(),
    })
}

/// Reinhard tonemap plus sRGB-ish gamma, clamped into u8 range.
fn tonemap_channel(value: f32) -> u8 {
    let value = value.max(0.0);
    let mapped = value / (1.0 + value);
    let encoded = mapped.powf(1.0 / 2.2);
    (encoded * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tonemap_is_monotonic_and_bounded() {
        let samples = [0.0f32, 0.1, 0.5, 1.0, 4.0, 100.0];
        let mapped: Vec<u8> = samples.iter().map(|&v| tonemap_channel(v)).collect();
        assert_eq!(mapped[0], 0);
        assert!(mapped.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(*mapped.last().unwrap() <= 255);
    }

    #[test]
    fn average_color_of_uniform_map() {
        let map = EnvironmentMap {
            width: 2,
            height: 2,
            pixels: vec![255, 0, 127, 255].repeat(4),
        };
        let avg = map.average_color();
        assert!((avg[0] - 1.0).abs() < 1e-6);
        assert!(avg[1].abs() < 1e-6);
        assert!((avg[2] - 127.0 / 255.0).abs() < 1e-6);
    }
}
