//! Stream URL classification. Mirrors the browser split the showcase was
//! designed around: containers the runtime can decode directly play natively,
//! adaptive manifests go through the HLS client, anything else is reported as
//! unsupported with no fallback.

use std::path::{Path, PathBuf};

use crate::error::PlayerError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamFormat {
    /// Ogg Theora movie the process decodes directly.
    Theora,
    /// HLS media or master manifest handled by the adaptive client.
    HlsManifest,
}

/// Classify a descriptor URL by extension. Remote URLs are unsupported in the
/// native re-host and are reported like any other unknown format.
pub fn classify(url: &str) -> Result<StreamFormat, PlayerError> {
    let lower = url.trim().to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return Err(PlayerError::UnsupportedFormat(url.to_string()));
    }
    if lower.ends_with(".ogv") {
        return Ok(StreamFormat::Theora);
    }
    if lower.ends_with(".m3u8") {
        return Ok(StreamFormat::HlsManifest);
    }
    Err(PlayerError::UnsupportedFormat(url.to_string()))
}

/// Resolve a descriptor URL against the directory the playlist came from.
pub fn media_path(base_dir: &Path, url: &str) -> PathBuf {
    let candidate = Path::new(url);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base_dir.join(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension() {
        assert_eq!(classify("tape/side_a.ogv").unwrap(), StreamFormat::Theora);
        assert_eq!(
            classify("tape/side_a.M3U8").unwrap(),
            StreamFormat::HlsManifest
        );
    }

    #[test]
    fn rejects_remote_and_unknown() {
        assert!(classify("https://cdn.example/side_a.m3u8").is_err());
        assert!(classify("tape/side_a.mp4").is_err());
    }

    #[test]
    fn resolves_relative_paths_against_playlist_dir() {
        let resolved = media_path(Path::new("/assets"), "tape/side_a.ogv");
        assert_eq!(resolved, PathBuf::from("/assets/tape/side_a.ogv"));
        let absolute = media_path(Path::new("/assets"), "/media/side_a.ogv");
        assert_eq!(absolute, PathBuf::from("/media/side_a.ogv"));
    }
}
