//! Fixed ordered playlist of stream descriptors, loaded once at startup.

use std::{fs, path::Path};

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// One playlist entry. `url` points at either a natively decodable movie file
/// or an adaptive-streaming manifest; `label` is what the "now playing"
/// indicator shows.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub url: String,
    pub label: String,
}

/// Immutable ordered list of descriptors. Never empty.
#[derive(Debug, Clone)]
pub struct Playlist {
    entries: Vec<StreamDescriptor>,
}

impl Playlist {
    pub fn from_entries(entries: Vec<StreamDescriptor>) -> Result<Self> {
        ensure!(!entries.is_empty(), "playlist has no entries");
        Ok(Self { entries })
    }

    /// Read a playlist JSON file: an array of `{url, label}` objects.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)
            .with_context(|| format!("reading playlist {}", path.display()))?;
        let entries: Vec<StreamDescriptor> = serde_json::from_slice(&data)
            .with_context(|| format!("parsing playlist {}", path.display()))?;
        Self::from_entries(entries)
            .with_context(|| format!("validating playlist {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&StreamDescriptor> {
        self.entries.get(index)
    }

    pub fn entries(&self) -> &[StreamDescriptor] {
        &self.entries
    }

    /// Index after `index` with wraparound.
    pub fn next_index(&self, index: usize) -> usize {
        (index + 1) % self.entries.len()
    }

    /// Index before `index` with wraparound.
    pub fn previous_index(&self, index: usize) -> usize {
        (index + self.entries.len() - 1) % self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn two_sides() -> Playlist {
        Playlist::from_entries(vec![
            StreamDescriptor {
                url: "A".into(),
                label: "L1".into(),
            },
            StreamDescriptor {
                url: "B".into(),
                label: "L2".into(),
            },
        ])
        .expect("two-entry playlist")
    }

    #[test]
    fn next_then_previous_round_trips_every_index() {
        let playlist = Playlist::from_entries(
            (0..5)
                .map(|idx| StreamDescriptor {
                    url: format!("stream-{idx}"),
                    label: format!("label-{idx}"),
                })
                .collect(),
        )
        .expect("five-entry playlist");

        for index in 0..playlist.len() {
            assert_eq!(playlist.previous_index(playlist.next_index(index)), index);
            assert_eq!(playlist.next_index(playlist.previous_index(index)), index);
        }
    }

    #[test]
    fn wraparound_at_both_ends() {
        let playlist = two_sides();
        assert_eq!(playlist.next_index(1), 0);
        assert_eq!(playlist.previous_index(0), 1);
    }

    #[test]
    fn empty_playlist_is_rejected() {
        assert!(Playlist::from_entries(Vec::new()).is_err());
    }

    #[test]
    fn loads_playlist_json() {
        let mut file = tempfile::NamedTempFile::new().expect("creating playlist fixture");
        file.write_all(br#"[{"url":"side_a.m3u8","label":"Side A"},{"url":"side_b.m3u8","label":"Side B"}]"#)
            .expect("writing fixture");

        let playlist = Playlist::load(file.path()).expect("loading playlist");
        assert_eq!(playlist.len(), 2);
        assert_eq!(playlist.get(0).unwrap().label, "Side A");
        assert_eq!(playlist.get(1).unwrap().url, "side_b.m3u8");
    }
}
