//! Playlist and video playback for the tapedeck showcase.
//!
//! The viewer owns exactly one decoding session at a time. A session maps a
//! media time to an RGBA frame; formats the process can decode directly (Ogg
//! Theora) play natively, while HLS playlists go through an adaptive client
//! that parses the manifest and delegates per-segment decoding. The
//! [`controller::PlayerController`] holds the playlist state machine: ordered
//! stream descriptors, the active index, wrap-around transitions, and
//! end-of-stream auto-advance.

pub mod clock;
pub mod controller;
pub mod error;
pub mod hls;
pub mod playlist;
pub mod session;
pub mod source;
mod yuv;

pub use clock::MediaClock;
pub use controller::{AudioControl, PlayerController, PlayerSurface, SessionFactory};
pub use error::PlayerError;
pub use playlist::{Playlist, StreamDescriptor};
pub use session::{MediaSessionFactory, Session, TheoraSession, VideoSession};
pub use source::StreamFormat;
