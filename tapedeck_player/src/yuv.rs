//! Planar YUV to RGBA conversion for decoded Theora frames.

use theorafile_rs::{
    th_pixel_fmt, th_pixel_fmt_TH_PF_420, th_pixel_fmt_TH_PF_422, th_pixel_fmt_TH_PF_444,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChromaSubsampling {
    /// 4:2:0 — chroma halved on both axes.
    Half2x2,
    /// 4:2:2 — chroma halved horizontally.
    Half2x1,
    /// 4:4:4 — full-resolution chroma.
    Full,
}

/// Plane layout for one decoded frame.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FrameLayout {
    pub width: usize,
    pub height: usize,
    chroma_width: usize,
    chroma_height: usize,
    subsampling: ChromaSubsampling,
}

impl FrameLayout {
    pub fn from_pixel_format(width: usize, height: usize, format: th_pixel_fmt) -> Option<Self> {
        let subsampling = match format {
            pf if pf == th_pixel_fmt_TH_PF_420 => ChromaSubsampling::Half2x2,
            pf if pf == th_pixel_fmt_TH_PF_422 => ChromaSubsampling::Half2x1,
            pf if pf == th_pixel_fmt_TH_PF_444 => ChromaSubsampling::Full,
            _ => return None,
        };
        let (chroma_width, chroma_height) = match subsampling {
            ChromaSubsampling::Half2x2 => ((width / 2).max(1), (height / 2).max(1)),
            ChromaSubsampling::Half2x1 => ((width / 2).max(1), height),
            ChromaSubsampling::Full => (width, height),
        };
        Some(Self {
            width,
            height,
            chroma_width,
            chroma_height,
            subsampling,
        })
    }

    pub fn yuv_len(&self) -> Option<usize> {
        let luma = self.width.checked_mul(self.height)?;
        let chroma = self.chroma_width.checked_mul(self.chroma_height)?;
        luma.checked_add(chroma.checked_mul(2)?)
    }

    pub fn rgba_len(&self) -> Option<usize> {
        self.width.checked_mul(self.height)?.checked_mul(4)
    }

    fn chroma_index(&self, x: usize, y: usize) -> usize {
        let sx = match self.subsampling {
            ChromaSubsampling::Half2x2 | ChromaSubsampling::Half2x1 => x / 2,
            ChromaSubsampling::Full => x,
        }
        .min(self.chroma_width - 1);
        let sy = match self.subsampling {
            ChromaSubsampling::Half2x2 => y / 2,
            _ => y,
        }
        .min(self.chroma_height - 1);
        sy * self.chroma_width + sx
    }
}

/// Convert one packed Y/Cb/Cr frame into RGBA. `yuv` and `rgba` must match
/// the layout's `yuv_len()` / `rgba_len()`.
pub(crate) fn yuv_to_rgba(layout: &FrameLayout, yuv: &[u8], rgba: &mut [u8]) {
    let luma_len = layout.width * layout.height;
    let chroma_len = layout.chroma_width * layout.chroma_height;
    let (y_plane, rest) = yuv.split_at(luma_len);
    let (u_plane, v_plane) = rest.split_at(chroma_len);

    for row in 0..layout.height {
        for col in 0..layout.width {
            let luma = y_plane[row * layout.width + col] as f32;
            let chroma_idx = layout.chroma_index(col, row);
            let cb = u_plane[chroma_idx] as f32 - 128.0;
            let cr = v_plane[chroma_idx] as f32 - 128.0;

            let r = (luma + 1.402 * cr).clamp(0.0, 255.0) as u8;
            let g = (luma - 0.344_136 * cb - 0.714_136 * cr).clamp(0.0, 255.0) as u8;
            let b = (luma + 1.772 * cb).clamp(0.0, 255.0) as u8;

            let out = (row * layout.width + col) * 4;
            rgba[out] = r;
            rgba[out + 1] = g;
            rgba[out + 2] = b;
            rgba[out + 3] = 255;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_sizes_for_420() {
        let layout = FrameLayout::from_pixel_format(4, 4, th_pixel_fmt_TH_PF_420)
            .expect("4:2:0 layout");
        assert_eq!(layout.yuv_len(), Some(16 + 2 * 4));
        assert_eq!(layout.rgba_len(), Some(64));
    }

    #[test]
    fn grey_frame_converts_to_grey_rgba() {
        let layout = FrameLayout::from_pixel_format(2, 2, th_pixel_fmt_TH_PF_444)
            .expect("4:4:4 layout");
        let yuv = [
            128, 128, 128, 128, // Y
            128, 128, 128, 128, // Cb
            128, 128, 128, 128, // Cr
        ];
        let mut rgba = [0u8; 16];
        yuv_to_rgba(&layout, &yuv, &mut rgba);
        for chunk in rgba.chunks_exact(4) {
            assert_eq!(chunk, [128, 128, 128, 255]);
        }
    }
}
