//! Adaptive-streaming client. Parses HLS manifests, picks the
//! highest-bandwidth variant of a master playlist, and lays the media
//! segments out on a single media-time line. Decoding of each segment is
//! delegated to the native Theora backend.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use log::warn;
use m3u8_rs::Playlist as HlsPlaylist;

use crate::session::{TheoraSession, VideoSession};
use crate::source;

/// One segment placed on the session's media timeline.
#[derive(Debug, Clone)]
pub struct SegmentEntry {
    pub path: PathBuf,
    pub start_ns: u64,
    pub duration_ns: u64,
}

/// Manifest state for one adaptive stream.
pub struct AdaptiveClient {
    source: String,
    segments: Vec<SegmentEntry>,
    total_duration_ns: u64,
}

impl AdaptiveClient {
    pub fn new() -> Self {
        Self {
            source: String::new(),
            segments: Vec::new(),
            total_duration_ns: 0,
        }
    }

    /// Parse the manifest at `path`. A master playlist is resolved to its
    /// highest-bandwidth variant before the media playlist is read.
    pub fn load_manifest(&mut self, path: &Path) -> Result<()> {
        self.source = path.display().to_string();
        self.read_media_playlist(path, 0)
    }

    fn read_media_playlist(&mut self, path: &Path, depth: u8) -> Result<()> {
        // A master playlist points at media playlists; one level is all the
        // format allows, so anything deeper is a manifest cycle.
        if depth > 1 {
            bail!("manifest '{}' nests master playlists", self.source);
        }

        let data = fs::read(path)
            .with_context(|| format!("reading HLS manifest {}", path.display()))?;
        let playlist = m3u8_rs::parse_playlist_res(&data)
            .map_err(|err| anyhow!("parsing HLS manifest {}: {err}", path.display()))?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));

        match playlist {
            HlsPlaylist::MasterPlaylist(master) => {
                // Bandwidth arrives as attribute text; compare numerically so
                // "1400000" outranks "400000".
                let variant = master
                    .variants
                    .iter()
                    .max_by_key(|variant| variant.bandwidth.parse::<u64>().unwrap_or(0))
                    .with_context(|| {
                        format!("master playlist {} lists no variants", path.display())
                    })?;
                let variant_path = source::media_path(base_dir, &variant.uri);
                self.read_media_playlist(&variant_path, depth + 1)
            }
            HlsPlaylist::MediaPlaylist(media) => {
                let mut start_ns = 0u64;
                for segment in &media.segments {
                    let duration_ns = (segment.duration.max(0.0) as f64 * 1e9) as u64;
                    self.segments.push(SegmentEntry {
                        path: source::media_path(base_dir, &segment.uri),
                        start_ns,
                        duration_ns,
                    });
                    start_ns = start_ns.saturating_add(duration_ns);
                }
                self.total_duration_ns = start_ns;
                if self.segments.is_empty() {
                    bail!("media playlist {} lists no segments", path.display());
                }
                Ok(())
            }
        }
    }

    pub fn segments(&self) -> &[SegmentEntry] {
        &self.segments
    }

    pub fn total_duration_ns(&self) -> u64 {
        self.total_duration_ns
    }

    /// Segment index covering `media_time_ns`, or `None` past the end.
    pub fn segment_for(&self, media_time_ns: u64) -> Option<usize> {
        if media_time_ns >= self.total_duration_ns {
            return None;
        }
        self.segments
            .iter()
            .rposition(|segment| segment.start_ns <= media_time_ns)
    }
}

/// Session over an [`AdaptiveClient`] timeline. Each segment is decoded with
/// the Theora backend; if a segment fails to open, the session holds the last
/// good frame and logs once instead of aborting playback.
pub struct HlsSession {
    client: AdaptiveClient,
    current_segment: usize,
    decoder: Option<TheoraSession>,
    width: u32,
    height: u32,
    held_frame: Vec<u8>,
    warned_segment: Option<usize>,
    end_of_stream: bool,
}

impl HlsSession {
    /// Attach to a loaded manifest. The first segment is opened eagerly so
    /// the session knows its frame dimensions before the first tick.
    pub fn attach(client: AdaptiveClient) -> Result<Self> {
        let first = client
            .segments()
            .first()
            .with_context(|| format!("adaptive stream '{}' has no segments", client.source))?;
        let decoder = TheoraSession::open(&first.path)?;
        let width = decoder.width();
        let height = decoder.height();
        Ok(Self {
            client,
            current_segment: 0,
            decoder: Some(decoder),
            width,
            height,
            held_frame: vec![0u8; (width as usize) * (height as usize) * 4],
            warned_segment: None,
            end_of_stream: false,
        })
    }

    fn switch_segment(&mut self, index: usize) {
        // Drop the old decoder before opening the next segment.
        self.decoder = None;
        let path = self.client.segments()[index].path.clone();
        match TheoraSession::open(&path) {
            Ok(decoder) => {
                if decoder.width() != self.width || decoder.height() != self.height {
                    if self.warned_segment != Some(index) {
                        warn!(
                            "segment '{}' is {}x{}, expected {}x{}; holding last frame",
                            path.display(),
                            decoder.width(),
                            decoder.height(),
                            self.width,
                            self.height
                        );
                        self.warned_segment = Some(index);
                    }
                } else {
                    self.decoder = Some(decoder);
                }
            }
            Err(err) => {
                if self.warned_segment != Some(index) {
                    warn!("failed to open segment '{}': {err:#}; holding last frame", path.display());
                    self.warned_segment = Some(index);
                }
            }
        }
        self.current_segment = index;
    }
}

impl VideoSession for HlsSession {
    fn source(&self) -> &str {
        &self.client.source
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn frame_for_media_time(&mut self, media_time_ns: u64) -> Result<&[u8]> {
        let Some(index) = self.client.segment_for(media_time_ns) else {
            self.end_of_stream = true;
            return Ok(&self.held_frame);
        };
        if index != self.current_segment
            || (self.decoder.is_none() && self.warned_segment != Some(index))
        {
            self.switch_segment(index);
        }

        let start_ns = self.client.segments()[index].start_ns;
        let local_ns = media_time_ns.saturating_sub(start_ns);
        if let Some(decoder) = self.decoder.as_mut() {
            let frame = decoder.frame_for_media_time(local_ns)?;
            self.held_frame.copy_from_slice(frame);
        }
        Ok(&self.held_frame)
    }

    fn duration_ns(&self) -> Option<u64> {
        Some(self.client.total_duration_ns())
    }

    fn end_of_stream(&self) -> bool {
        self.end_of_stream
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_manifest(dir: &Path, name: &str, body: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = fs::File::create(&path).expect("creating manifest fixture");
        file.write_all(body.as_bytes()).expect("writing fixture");
        path
    }

    #[test]
    fn media_playlist_builds_contiguous_timeline() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(
            dir.path(),
            "side_a.m3u8",
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n\
             #EXTINF:4.0,\nseg0.ogv\n#EXTINF:2.5,\nseg1.ogv\n#EXT-X-ENDLIST\n",
        );

        let mut client = AdaptiveClient::new();
        client.load_manifest(&path).expect("loading manifest");

        let segments = client.segments();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].start_ns, 0);
        assert_eq!(segments[0].duration_ns, 4_000_000_000);
        assert_eq!(segments[1].start_ns, 4_000_000_000);
        assert_eq!(client.total_duration_ns(), 6_500_000_000);
        assert_eq!(segments[0].path, dir.path().join("seg0.ogv"));
    }

    #[test]
    fn master_playlist_selects_highest_bandwidth_variant() {
        let dir = tempfile::tempdir().expect("tempdir");
        write_manifest(
            dir.path(),
            "low.m3u8",
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n\
             #EXTINF:4.0,\nlow0.ogv\n#EXT-X-ENDLIST\n",
        );
        write_manifest(
            dir.path(),
            "high.m3u8",
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n\
             #EXTINF:4.0,\nhigh0.ogv\n#EXT-X-ENDLIST\n",
        );
        let master = write_manifest(
            dir.path(),
            "master.m3u8",
            "#EXTM3U\n\
             #EXT-X-STREAM-INF:BANDWIDTH=400000\nlow.m3u8\n\
             #EXT-X-STREAM-INF:BANDWIDTH=1400000\nhigh.m3u8\n",
        );

        let mut client = AdaptiveClient::new();
        client.load_manifest(&master).expect("loading master manifest");
        assert_eq!(client.segments()[0].path, dir.path().join("high0.ogv"));
    }

    #[test]
    fn segment_lookup_covers_timeline_and_rejects_past_end() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(
            dir.path(),
            "side.m3u8",
            "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n\
             #EXTINF:1.0,\na.ogv\n#EXTINF:1.0,\nb.ogv\n#EXT-X-ENDLIST\n",
        );

        let mut client = AdaptiveClient::new();
        client.load_manifest(&path).expect("loading manifest");

        assert_eq!(client.segment_for(0), Some(0));
        assert_eq!(client.segment_for(999_999_999), Some(0));
        assert_eq!(client.segment_for(1_000_000_000), Some(1));
        assert_eq!(client.segment_for(2_000_000_000), None);
    }

    #[test]
    fn empty_media_playlist_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = write_manifest(dir.path(), "empty.m3u8", "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:4\n#EXT-X-ENDLIST\n");

        let mut client = AdaptiveClient::new();
        assert!(client.load_manifest(&path).is_err());
    }
}
