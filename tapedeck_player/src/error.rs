use thiserror::Error;

/// Failures surfaced by the playlist/video controller and its sessions.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The runtime has no decoder for this stream and no fallback is
    /// attempted.
    #[error("unsupported stream format for '{0}'")]
    UnsupportedFormat(String),

    /// `load_by_index` was handed an index outside the playlist. Wrapping is
    /// the caller's job; the controller only validates.
    #[error("stream index {index} out of range for playlist of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// The playback resource refused to start (e.g. no output device).
    #[error("playback start rejected: {0}")]
    StartRejected(String),

    #[error(transparent)]
    Session(#[from] anyhow::Error),
}
