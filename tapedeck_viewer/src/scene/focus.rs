//! Camera focus animation. When playback starts, the camera glides from its
//! current pose to a framing of the cassette screen over a fixed duration.
//! Each new request supersedes the one in flight; a generation counter keeps
//! stale animations from writing the camera after being replaced.

use glam::Vec3;

pub const FOCUS_DURATION_NS: u64 = 1_000_000_000;

#[derive(Debug, Clone, Copy)]
pub struct CameraPose {
    pub eye: Vec3,
    pub target: Vec3,
}

#[derive(Debug, Clone, Copy)]
struct ActiveFocus {
    generation: u64,
    start: CameraPose,
    end: CameraPose,
    start_ns: u64,
}

/// Progress of a running focus animation.
#[derive(Debug, Clone, Copy)]
pub struct FocusSample {
    pub pose: CameraPose,
    pub finished: bool,
}

#[derive(Debug, Default)]
pub struct FocusAnimator {
    generation: u64,
    active: Option<ActiveFocus>,
}

impl FocusAnimator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new animation from `start` to `end`. Any animation already in
    /// flight is superseded; its generation becomes stale immediately.
    pub fn start(&mut self, start: CameraPose, end: CameraPose, now_ns: u64) -> u64 {
        self.generation += 1;
        self.active = Some(ActiveFocus {
            generation: self.generation,
            start,
            end,
            start_ns: now_ns,
        });
        self.generation
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Abandon the animation in flight, if any. The caller keeps whatever
    /// pose it last sampled.
    pub fn cancel(&mut self) {
        self.active = None;
    }

    /// Sample the animation at `now_ns`. Returns `None` when nothing is in
    /// flight. A finished sample clears the animation; the caller adopts the
    /// final pose with the up vector re-locked to world +Y.
    pub fn sample(&mut self, now_ns: u64) -> Option<FocusSample> {
        let active = self.active?;
        let elapsed = now_ns.saturating_sub(active.start_ns);
        let t = (elapsed as f32 / FOCUS_DURATION_NS as f32).min(1.0);

        let pose = CameraPose {
            eye: active.start.eye.lerp(active.end.eye, t),
            target: active.start.target.lerp(active.end.target, t),
        };
        let finished = t >= 1.0;
        if finished {
            self.active = None;
        }
        Some(FocusSample { pose, finished })
    }

    /// Whether `generation` is still the animation in flight.
    pub fn is_current(&self, generation: u64) -> bool {
        self.active
            .map(|active| active.generation == generation)
            .unwrap_or(false)
    }
}
