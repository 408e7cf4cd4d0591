//! Playlist playback controller. Owns the active session and the media
//! clock; the viewer feeds it host time, pointer-driven commands, and the
//! surface/audio handles it should act through.

use anyhow::Result;
use log::{info, warn};

use crate::clock::MediaClock;
use crate::error::PlayerError;
use crate::playlist::{Playlist, StreamDescriptor};
use crate::session::VideoSession;

/// Opens a decoding session for a playlist descriptor.
pub trait SessionFactory {
    fn open(&mut self, descriptor: &StreamDescriptor) -> Result<Box<dyn VideoSession>, PlayerError>;
}

/// Presentation surface the controller drives: the "now playing" indicator,
/// the screen overlay plane, and the camera focus request.
pub trait PlayerSurface {
    fn set_now_playing(&mut self, label: &str);
    fn set_indicator_visible(&mut self, visible: bool);
    fn set_overlay_visible(&mut self, visible: bool);
    fn request_screen_focus(&mut self);
}

/// Audio sidecar control. `resume` is the one operation allowed to refuse;
/// a refusal leaves the controller paused.
pub trait AudioControl {
    fn unmute(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn pause(&mut self) -> Result<()>;
    fn resume(&mut self) -> Result<()>;
}

/// Drives playback through the fixed playlist. At most one session is live;
/// loading an entry always tears the previous session down first.
pub struct PlayerController {
    playlist: Playlist,
    current_index: usize,
    session: Option<Box<dyn VideoSession>>,
    clock: MediaClock,
    ended: bool,
}

impl PlayerController {
    pub fn new(playlist: Playlist, host_now_ns: u64) -> Self {
        Self {
            playlist,
            current_index: 0,
            session: None,
            clock: MediaClock::new(host_now_ns),
            ended: false,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_label(&self) -> &str {
        self.playlist
            .get(self.current_index)
            .map(|descriptor| descriptor.label.as_str())
            .unwrap_or_default()
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Frame dimensions of the live session, once one exists.
    pub fn video_dimensions(&self) -> Option<(u32, u32)> {
        self.session
            .as_ref()
            .map(|session| (session.width(), session.height()))
    }

    /// Load playlist entry `index`: tear down the current session, update
    /// the indicator label, then open the new stream. The new session starts
    /// paused at media time zero.
    pub fn load_by_index(
        &mut self,
        index: usize,
        host_now_ns: u64,
        factory: &mut dyn SessionFactory,
        surface: &mut dyn PlayerSurface,
    ) -> Result<(), PlayerError> {
        let descriptor = self
            .playlist
            .get(index)
            .cloned()
            .ok_or(PlayerError::IndexOutOfRange {
                index,
                len: self.playlist.len(),
            })?;

        // Old session must be gone before the factory opens the next one.
        self.session = None;
        surface.set_now_playing(&descriptor.label);

        let session = factory.open(&descriptor)?;
        info!(
            "loaded stream {} '{}' ({}x{})",
            index,
            descriptor.label,
            session.width(),
            session.height()
        );
        self.session = Some(session);
        self.current_index = index;
        self.clock = MediaClock::new(host_now_ns);
        self.ended = false;
        Ok(())
    }

    /// Start playback: unmuted, full volume, indicator and overlay revealed,
    /// camera focused on the screen. A rejected start is logged and leaves
    /// the controller paused.
    pub fn play(
        &mut self,
        host_now_ns: u64,
        surface: &mut dyn PlayerSurface,
        audio: &mut dyn AudioControl,
    ) {
        if self.session.is_none() {
            warn!("play requested with no stream loaded");
            return;
        }
        if let Err(err) = audio.resume() {
            warn!("playback start rejected: {err:#}");
            return;
        }
        audio.unmute();
        audio.set_volume(1.0);
        self.clock.resume(host_now_ns);
        surface.set_indicator_visible(true);
        surface.set_overlay_visible(true);
        surface.request_screen_focus();
    }

    /// Pause playback. Audio-side failures are swallowed; the clock always
    /// stops.
    pub fn pause(&mut self, host_now_ns: u64, audio: &mut dyn AudioControl) {
        self.clock.pause(host_now_ns);
        if let Err(err) = audio.pause() {
            warn!("audio pause failed: {err:#}");
        }
    }

    /// Advance to the next playlist entry (wrapping) and start it.
    pub fn next(
        &mut self,
        host_now_ns: u64,
        factory: &mut dyn SessionFactory,
        surface: &mut dyn PlayerSurface,
        audio: &mut dyn AudioControl,
    ) {
        let target = self.playlist.next_index(self.current_index);
        self.skip_to(target, host_now_ns, factory, surface, audio);
    }

    /// Step back to the previous playlist entry (wrapping) and start it.
    pub fn previous(
        &mut self,
        host_now_ns: u64,
        factory: &mut dyn SessionFactory,
        surface: &mut dyn PlayerSurface,
        audio: &mut dyn AudioControl,
    ) {
        let target = self.playlist.previous_index(self.current_index);
        self.skip_to(target, host_now_ns, factory, surface, audio);
    }

    fn skip_to(
        &mut self,
        target: usize,
        host_now_ns: u64,
        factory: &mut dyn SessionFactory,
        surface: &mut dyn PlayerSurface,
        audio: &mut dyn AudioControl,
    ) {
        self.pause(host_now_ns, audio);
        match self.load_by_index(target, host_now_ns, factory, surface) {
            Ok(()) => self.play(host_now_ns, surface, audio),
            Err(err) => warn!("failed to load stream {target}: {err:#}"),
        }
    }

    /// Per-frame update. Detects end of stream and auto-advances to the next
    /// playlist entry, keeping playback running.
    pub fn tick(
        &mut self,
        host_now_ns: u64,
        factory: &mut dyn SessionFactory,
        surface: &mut dyn PlayerSurface,
        audio: &mut dyn AudioControl,
    ) {
        let stream_ended = self
            .session
            .as_ref()
            .is_some_and(|session| session.end_of_stream());
        if stream_ended && !self.ended {
            self.ended = true;
            let target = self.playlist.next_index(self.current_index);
            info!("stream {} ended, advancing to {}", self.current_index, target);
            self.skip_to(target, host_now_ns, factory, surface, audio);
        }
    }

    /// Decode forward to the current media time and return the RGBA frame.
    pub fn frame(&mut self, host_now_ns: u64) -> Option<Result<&[u8]>> {
        let position = self.clock.position_ns(host_now_ns);
        self.session
            .as_mut()
            .map(|session| session.frame_for_media_time(position))
    }

    /// Progress through the current stream in `[0, 1]`. `None` while paused,
    /// after the stream ended, or when the container's duration is unknown;
    /// the progress display does nothing in those states.
    pub fn progress(&self, host_now_ns: u64) -> Option<f32> {
        if self.clock.is_paused() || self.ended {
            return None;
        }
        let session = self.session.as_ref()?;
        let duration = session.duration_ns()?;
        if duration == 0 {
            return None;
        }
        let position = self.clock.position_ns(host_now_ns);
        Some((position as f64 / duration as f64).min(1.0) as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct FakeSession {
        source: String,
        duration_ns: Option<u64>,
        end_of_stream: bool,
        frame: Vec<u8>,
        live: Rc<RefCell<usize>>,
    }

    impl FakeSession {
        fn new(source: &str, live: Rc<RefCell<usize>>) -> Self {
            *live.borrow_mut() += 1;
            Self {
                source: source.to_string(),
                duration_ns: Some(10_000_000_000),
                end_of_stream: false,
                frame: vec![0u8; 16],
                live,
            }
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            *self.live.borrow_mut() -= 1;
        }
    }

    impl VideoSession for FakeSession {
        fn source(&self) -> &str {
            &self.source
        }

        fn width(&self) -> u32 {
            2
        }

        fn height(&self) -> u32 {
            2
        }

        fn frame_for_media_time(&mut self, _media_time_ns: u64) -> Result<&[u8]> {
            Ok(&self.frame)
        }

        fn duration_ns(&self) -> Option<u64> {
            self.duration_ns
        }

        fn end_of_stream(&self) -> bool {
            self.end_of_stream
        }
    }

    #[derive(Default)]
    struct FakeFactory {
        live: Rc<RefCell<usize>>,
        live_at_open: Vec<usize>,
        fail_next: bool,
        mark_ended: bool,
    }

    impl SessionFactory for FakeFactory {
        fn open(
            &mut self,
            descriptor: &StreamDescriptor,
        ) -> Result<Box<dyn VideoSession>, PlayerError> {
            self.live_at_open.push(*self.live.borrow());
            if self.fail_next {
                self.fail_next = false;
                return Err(PlayerError::UnsupportedFormat(descriptor.url.clone()));
            }
            let mut session = FakeSession::new(&descriptor.url, Rc::clone(&self.live));
            session.end_of_stream = self.mark_ended;
            Ok(Box::new(session))
        }
    }

    #[derive(Default)]
    struct FakeSurface {
        label: String,
        indicator_visible: bool,
        overlay_visible: bool,
        focus_requests: usize,
    }

    impl PlayerSurface for FakeSurface {
        fn set_now_playing(&mut self, label: &str) {
            self.label = label.to_string();
        }

        fn set_indicator_visible(&mut self, visible: bool) {
            self.indicator_visible = visible;
        }

        fn set_overlay_visible(&mut self, visible: bool) {
            self.overlay_visible = visible;
        }

        fn request_screen_focus(&mut self) {
            self.focus_requests += 1;
        }
    }

    #[derive(Default)]
    struct FakeAudio {
        muted: bool,
        volume: f32,
        reject_resume: bool,
    }

    impl FakeAudio {
        fn new() -> Self {
            Self {
                muted: true,
                volume: 0.0,
                reject_resume: false,
            }
        }
    }

    impl AudioControl for FakeAudio {
        fn unmute(&mut self) {
            self.muted = false;
        }

        fn set_volume(&mut self, volume: f32) {
            self.volume = volume;
        }

        fn pause(&mut self) -> Result<()> {
            Ok(())
        }

        fn resume(&mut self) -> Result<()> {
            if self.reject_resume {
                anyhow::bail!("start rejected");
            }
            Ok(())
        }
    }

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
    fn load_updates_label_and_never_overlaps_sessions() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory::default();
        let mut surface = FakeSurface::default();

        controller
            .load_by_index(0, 0, &mut factory, &mut surface)
            .expect("loading first entry");
        assert_eq!(surface.label, "L1");
        assert_eq!(*factory.live.borrow(), 1);

        controller
            .load_by_index(1, 0, &mut factory, &mut surface)
            .expect("loading second entry");
        assert_eq!(surface.label, "L2");
        assert_eq!(*factory.live.borrow(), 1);

        // The previous session must already be dropped whenever the factory
        // opens the next one.
        assert_eq!(factory.live_at_open, vec![0, 0]);
    }

    #[test]
    fn out_of_range_index_is_rejected() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory::default();
        let mut surface = FakeSurface::default();

        let err = controller
            .load_by_index(5, 0, &mut factory, &mut surface)
            .expect_err("index past the end");
        assert!(matches!(
            err,
            PlayerError::IndexOutOfRange { index: 5, len: 2 }
        ));
    }

    #[test]
    fn play_unmutes_reveals_and_requests_focus() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory::default();
        let mut surface = FakeSurface::default();
        let mut audio = FakeAudio::new();

        controller
            .load_by_index(0, 0, &mut factory, &mut surface)
            .expect("loading entry");
        controller.play(100, &mut surface, &mut audio);

        assert!(!controller.is_paused());
        assert!(!audio.muted);
        assert_eq!(audio.volume, 1.0);
        assert!(surface.indicator_visible);
        assert!(surface.overlay_visible);
        assert_eq!(surface.focus_requests, 1);
    }

    #[test]
    fn rejected_start_leaves_controller_paused() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory::default();
        let mut surface = FakeSurface::default();
        let mut audio = FakeAudio::new();
        audio.reject_resume = true;

        controller
            .load_by_index(0, 0, &mut factory, &mut surface)
            .expect("loading entry");
        controller.play(100, &mut surface, &mut audio);

        assert!(controller.is_paused());
        assert!(audio.muted);
        assert!(!surface.indicator_visible);
        assert_eq!(surface.focus_requests, 0);
    }

    #[test]
    fn next_and_previous_wrap_through_both_entries() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory::default();
        let mut surface = FakeSurface::default();
        let mut audio = FakeAudio::new();

        controller
            .load_by_index(0, 0, &mut factory, &mut surface)
            .expect("loading entry");

        controller.next(100, &mut factory, &mut surface, &mut audio);
        assert_eq!(controller.current_index(), 1);
        assert_eq!(surface.label, "L2");
        assert!(!controller.is_paused());

        controller.next(200, &mut factory, &mut surface, &mut audio);
        assert_eq!(controller.current_index(), 0);
        assert_eq!(surface.label, "L1");

        controller.previous(300, &mut factory, &mut surface, &mut audio);
        assert_eq!(controller.current_index(), 1);
        assert_eq!(surface.label, "L2");
    }

    #[test]
    fn ended_stream_auto_advances_and_keeps_playing() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory {
            mark_ended: true,
            ..FakeFactory::default()
        };
        let mut surface = FakeSurface::default();
        let mut audio = FakeAudio::new();

        controller
            .load_by_index(0, 0, &mut factory, &mut surface)
            .expect("loading entry");
        factory.mark_ended = false;

        controller.tick(100, &mut factory, &mut surface, &mut audio);

        assert_eq!(controller.current_index(), 1);
        assert_eq!(surface.label, "L2");
        assert!(!controller.is_paused());
        assert!(!audio.muted);
        assert!(surface.overlay_visible);
        assert_eq!(surface.focus_requests, 1);
        assert_eq!(*factory.live.borrow(), 1);
    }

    #[test]
    fn failed_skip_logs_and_stays_paused() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory::default();
        let mut surface = FakeSurface::default();
        let mut audio = FakeAudio::new();

        controller
            .load_by_index(0, 0, &mut factory, &mut surface)
            .expect("loading entry");
        factory.fail_next = true;

        controller.next(100, &mut factory, &mut surface, &mut audio);

        assert!(controller.is_paused());
        assert!(!controller.has_session());
    }

    #[test]
    fn progress_is_absent_while_paused_or_without_duration() {
        let mut controller = PlayerController::new(two_sides(), 0);
        let mut factory = FakeFactory::default();
        let mut surface = FakeSurface::default();
        let mut audio = FakeAudio::new();

        controller
            .load_by_index(0, 0, &mut factory, &mut surface)
            .expect("loading entry");
        assert_eq!(controller.progress(500), None);

        controller.play(0, &mut surface, &mut audio);
        let progress = controller.progress(5_000_000_000).expect("mid-stream progress");
        assert!((progress - 0.5).abs() < 1e-6);

        // Past the end the ratio clamps to 1.
        assert_eq!(controller.progress(20_000_000_000), Some(1.0));
    }
}
