//! Audio sidecar. The decoded movies are video-only, so the audible half of
//! playback runs through an optional rodio sink that mirrors the player's
//! mute/volume/pause state. Without the `audio` feature the same control
//! surface is tracked in memory and playback is silent.

use anyhow::Result;
use tapedeck_player::AudioControl;

pub fn create_audio() -> Box<dyn AudioControl> {
    #[cfg(feature = "audio")]
    {
        match RodioAudio::new() {
            Ok(audio) => return Box::new(audio),
            Err(err) => {
                log::warn!("audio output unavailable, continuing silent: {err:#}");
            }
        }
    }
    Box::new(SilentAudio::default())
}

/// Control-state-only backend. Starts muted at zero volume, the same state a
/// fresh browser media element would report.
#[derive(Debug)]
pub struct SilentAudio {
    muted: bool,
    volume: f32,
    playing: bool,
}

impl Default for SilentAudio {
    fn default() -> Self {
        Self {
            muted: true,
            volume: 0.0,
            playing: false,
        }
    }
}

impl AudioControl for SilentAudio {
    fn unmute(&mut self) {
        self.muted = false;
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn pause(&mut self) -> Result<()> {
        self.playing = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        self.playing = true;
        Ok(())
    }
}

#[cfg(feature = "audio")]
pub use rodio_backend::RodioAudio;

#[cfg(feature = "audio")]
mod rodio_backend {
    use anyhow::{Context, Result};
    use rodio::{OutputStream, OutputStreamHandle, Sink};
    use tapedeck_player::AudioControl;

    pub struct RodioAudio {
        _stream: OutputStream,
        _handle: OutputStreamHandle,
        sink: Sink,
        volume: f32,
        muted: bool,
    }

    impl RodioAudio {
        pub fn new() -> Result<Self> {
            let (stream, handle) =
                OutputStream::try_default().context("opening default audio output")?;
            let sink = Sink::try_new(&handle).context("creating audio sink")?;
            sink.pause();
            sink.set_volume(0.0);
            Ok(Self {
                _stream: stream,
                _handle: handle,
                sink,
                volume: 0.0,
                muted: true,
            })
        }

        fn apply_volume(&self) {
            let effective = if self.muted { 0.0 } else { self.volume };
            self.sink.set_volume(effective);
        }
    }

    impl AudioControl for RodioAudio {
        fn unmute(&mut self) {
            self.muted = false;
            self.apply_volume();
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume.clamp(0.0, 1.0);
            self.apply_volume();
        }

        fn pause(&mut self) -> Result<()> {
            self.sink.pause();
            Ok(())
        }

        fn resume(&mut self) -> Result<()> {
            self.sink.play();
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_backend_tracks_control_state() {
        let mut audio = SilentAudio::default();
        assert!(audio.muted);

        audio.unmute();
        audio.set_volume(1.5);
        audio.resume().expect("resume always succeeds");

        assert!(!audio.muted);
        assert_eq!(audio.volume, 1.0);
        assert!(audio.playing);
    }
}
