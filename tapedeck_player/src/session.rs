//! Decoding sessions. At most one session exists at a time; replacing the
//! active stream drops the previous session (closing its decoder) before the
//! next one is constructed.

use std::mem::MaybeUninit;
use std::os::raw::c_char;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use theorafile_rs::{
    OggTheora_File, tf_close, tf_eos, tf_fopen, tf_hasvideo, tf_readvideo, tf_videoinfo,
    th_pixel_fmt,
};

use crate::controller::SessionFactory;
use crate::error::PlayerError;
use crate::hls::{AdaptiveClient, HlsSession};
use crate::playlist::StreamDescriptor;
use crate::source::{self, StreamFormat};
use crate::yuv::{self, FrameLayout};

/// A live decoding session: maps media time to the latest RGBA frame.
pub trait VideoSession {
    /// Human-readable source name, for logs.
    fn source(&self) -> &str;
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    /// Decode forward (never backward) to the frame covering `media_time_ns`
    /// and return the RGBA buffer.
    fn frame_for_media_time(&mut self, media_time_ns: u64) -> Result<&[u8]>;
    /// Total duration when the container knows it; progress display is a
    /// no-op otherwise.
    fn duration_ns(&self) -> Option<u64>;
    fn end_of_stream(&self) -> bool;
}

/// Concrete session backends.
pub enum Session {
    Theora(TheoraSession),
    Hls(HlsSession),
}

impl VideoSession for Session {
    fn source(&self) -> &str {
        match self {
            Self::Theora(inner) => inner.source(),
            Self::Hls(inner) => inner.source(),
        }
    }

    fn width(&self) -> u32 {
        match self {
            Self::Theora(inner) => inner.width(),
            Self::Hls(inner) => inner.width(),
        }
    }

    fn height(&self) -> u32 {
        match self {
            Self::Theora(inner) => inner.height(),
            Self::Hls(inner) => inner.height(),
        }
    }

    fn frame_for_media_time(&mut self, media_time_ns: u64) -> Result<&[u8]> {
        match self {
            Self::Theora(inner) => inner.frame_for_media_time(media_time_ns),
            Self::Hls(inner) => inner.frame_for_media_time(media_time_ns),
        }
    }

    fn duration_ns(&self) -> Option<u64> {
        match self {
            Self::Theora(inner) => inner.duration_ns(),
            Self::Hls(inner) => inner.duration_ns(),
        }
    }

    fn end_of_stream(&self) -> bool {
        match self {
            Self::Theora(inner) => inner.end_of_stream(),
            Self::Hls(inner) => inner.end_of_stream(),
        }
    }
}

/// Opens sessions for playlist descriptors, resolving URLs against the
/// directory the playlist file came from.
pub struct MediaSessionFactory {
    base_dir: PathBuf,
}

impl MediaSessionFactory {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

impl SessionFactory for MediaSessionFactory {
    fn open(&mut self, descriptor: &StreamDescriptor) -> Result<Box<dyn VideoSession>, PlayerError> {
        let format = source::classify(&descriptor.url)?;
        let path = source::media_path(&self.base_dir, &descriptor.url);
        match format {
            StreamFormat::Theora => {
                let session = TheoraSession::open(&path)?;
                Ok(Box::new(Session::Theora(session)))
            }
            StreamFormat::HlsManifest => {
                let mut client = AdaptiveClient::new();
                client.load_manifest(&path)?;
                let session = HlsSession::attach(client)?;
                Ok(Box::new(Session::Hls(session)))
            }
        }
    }
}

enum FrameStep {
    Advanced,
    Duplicate,
    EndOfStream,
}

/// Native Ogg Theora session backed by the theorafile FFI decoder.
pub struct TheoraSession {
    source: String,
    file: OggTheora_File,
    width: u32,
    height: u32,
    frame_duration_ns: Option<f64>,
    layout: FrameLayout,
    yuv_buffer: Vec<u8>,
    rgba_buffer: Vec<u8>,
    frame_cursor: Option<u64>,
    end_of_stream: bool,
}

impl TheoraSession {
    pub fn open(path: &Path) -> Result<Self> {
        let c_path = std::ffi::CString::new(path.to_string_lossy().as_bytes())
            .with_context(|| format!("movie path '{}' contains NUL byte", path.display()))?;

        let mut file = MaybeUninit::<OggTheora_File>::zeroed();
        let open_rc = unsafe { tf_fopen(c_path.as_ptr(), file.as_mut_ptr()) };
        if open_rc != 0 {
            return Err(anyhow!(
                "failed to open Theora movie '{}' (error code {open_rc})",
                path.display()
            ));
        }
        let mut file = unsafe { file.assume_init() };

        if unsafe { tf_hasvideo(&mut file) } == 0 {
            unsafe { tf_close(&mut file) };
            return Err(anyhow!(
                "Theora movie '{}' does not contain a video stream",
                path.display()
            ));
        }

        let mut width: i32 = 0;
        let mut height: i32 = 0;
        let mut fps: f64 = 0.0;
        let mut pixel_format: th_pixel_fmt = 0;
        unsafe {
            tf_videoinfo(
                &mut file,
                (&mut width) as *mut i32,
                (&mut height) as *mut i32,
                (&mut fps) as *mut f64,
                (&mut pixel_format) as *mut th_pixel_fmt,
            );
        }

        let (width_u32, height_u32) = match (u32::try_from(width), u32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => (w, h),
            _ => {
                unsafe { tf_close(&mut file) };
                return Err(anyhow!(
                    "invalid video dimensions {width}x{height} for '{}'",
                    path.display()
                ));
            }
        };

        let layout =
            match FrameLayout::from_pixel_format(width_u32 as usize, height_u32 as usize, pixel_format)
            {
                Some(layout) => layout,
                None => {
                    unsafe { tf_close(&mut file) };
                    return Err(anyhow!(
                        "unsupported pixel format {pixel_format} for '{}'",
                        path.display()
                    ));
                }
            };

        let yuv_len = match layout.yuv_len() {
            Some(len) => len,
            None => {
                unsafe { tf_close(&mut file) };
                return Err(anyhow!("video buffer overflow for '{}'", path.display()));
            }
        };
        let rgba_len = match layout.rgba_len() {
            Some(len) => len,
            None => {
                unsafe { tf_close(&mut file) };
                return Err(anyhow!("RGBA buffer overflow for '{}'", path.display()));
            }
        };

        Ok(Self {
            source: path.display().to_string(),
            file,
            width: width_u32,
            height: height_u32,
            frame_duration_ns: if fps > 0.0 {
                Some(1_000_000_000.0 / fps)
            } else {
                None
            },
            layout,
            yuv_buffer: vec![0u8; yuv_len],
            rgba_buffer: vec![0u8; rgba_len],
            frame_cursor: None,
            end_of_stream: false,
        })
    }

    fn ensure_frame(&mut self, target: u64) -> Result<()> {
        loop {
            match self.frame_cursor {
                Some(current) if current >= target => return Ok(()),
                _ if self.end_of_stream => return Ok(()),
                _ => match self.decode_next_frame()? {
                    FrameStep::Advanced | FrameStep::Duplicate => continue,
                    FrameStep::EndOfStream => return Ok(()),
                },
            }
        }
    }

    fn decode_next_frame(&mut self) -> Result<FrameStep> {
        let rc = unsafe {
            tf_readvideo(
                &mut self.file,
                self.yuv_buffer.as_mut_ptr() as *mut c_char,
                1,
            )
        };
        match rc {
            1 => {
                yuv::yuv_to_rgba(&self.layout, &self.yuv_buffer, &mut self.rgba_buffer);
                self.advance_cursor();
                Ok(FrameStep::Advanced)
            }
            0 => {
                if unsafe { tf_eos(&mut self.file) } != 0 {
                    self.end_of_stream = true;
                    if self.frame_cursor.is_none() {
                        return Err(anyhow!(
                            "Theora movie '{}' ended without yielding a frame",
                            self.source
                        ));
                    }
                    Ok(FrameStep::EndOfStream)
                } else {
                    if self.frame_cursor.is_none() {
                        return Err(anyhow!(
                            "Theora movie '{}' produced a duplicate before the first frame",
                            self.source
                        ));
                    }
                    self.advance_cursor();
                    Ok(FrameStep::Duplicate)
                }
            }
            other => Err(anyhow!(
                "Theora decoder for '{}' returned unexpected status {other}",
                self.source
            )),
        }
    }

    fn advance_cursor(&mut self) {
        self.frame_cursor = Some(match self.frame_cursor {
            Some(value) => value.saturating_add(1),
            None => 0,
        });
    }
}

impl VideoSession for TheoraSession {
    fn source(&self) -> &str {
        &self.source
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn frame_for_media_time(&mut self, media_time_ns: u64) -> Result<&[u8]> {
        let target = match self.frame_duration_ns {
            Some(duration) if duration > 0.0 => {
                (media_time_ns as f64 / duration).floor().max(0.0) as u64
            }
            _ => 0,
        };
        self.ensure_frame(target)?;
        Ok(&self.rgba_buffer)
    }

    fn duration_ns(&self) -> Option<u64> {
        // The container does not carry a total duration; end-of-stream is
        // discovered by decoding.
        None
    }

    fn end_of_stream(&self) -> bool {
        self.end_of_stream
    }
}

impl Drop for TheoraSession {
    fn drop(&mut self) {
        unsafe {
            tf_close(&mut self.file);
        }
    }
}
