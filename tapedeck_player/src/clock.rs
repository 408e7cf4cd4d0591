//! Media-time bookkeeping. Sessions map media time to frames; this clock
//! turns monotonic host time into media time while absorbing pause/resume so
//! a resumed stream picks up exactly where it stopped.

/// Accumulating media clock driven by host nanoseconds.
#[derive(Debug, Clone, Copy)]
pub struct MediaClock {
    origin_host_ns: u64,
    accumulated_ns: u64,
    paused: bool,
}

impl MediaClock {
    /// A fresh clock starts paused at media time zero.
    pub fn new(host_now_ns: u64) -> Self {
        Self {
            origin_host_ns: host_now_ns,
            accumulated_ns: 0,
            paused: true,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn resume(&mut self, host_now_ns: u64) {
        if self.paused {
            self.origin_host_ns = host_now_ns;
            self.paused = false;
        }
    }

    pub fn pause(&mut self, host_now_ns: u64) {
        if !self.paused {
            self.accumulated_ns = self.position_ns(host_now_ns);
            self.paused = true;
        }
    }

    /// Current media position. Frozen while paused.
    pub fn position_ns(&self, host_now_ns: u64) -> u64 {
        if self.paused {
            self.accumulated_ns
        } else {
            self.accumulated_ns + host_now_ns.saturating_sub(self.origin_host_ns)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_paused_at_zero() {
        let clock = MediaClock::new(1_000);
        assert!(clock.is_paused());
        assert_eq!(clock.position_ns(5_000), 0);
    }

    #[test]
    fn advances_only_while_running() {
        let mut clock = MediaClock::new(0);
        clock.resume(1_000);
        assert_eq!(clock.position_ns(1_500), 500);

        clock.pause(2_000);
        assert_eq!(clock.position_ns(9_999), 1_000);

        clock.resume(10_000);
        assert_eq!(clock.position_ns(10_250), 1_250);
    }

    #[test]
    fn redundant_transitions_are_idempotent() {
        let mut clock = MediaClock::new(0);
        clock.pause(100);
        clock.pause(200);
        assert_eq!(clock.position_ns(300), 0);

        clock.resume(1_000);
        clock.resume(2_000);
        assert_eq!(clock.position_ns(2_000), 1_000);
    }

    #[test]
    fn host_time_regression_does_not_underflow() {
        let mut clock = MediaClock::new(0);
        clock.resume(1_000);
        assert_eq!(clock.position_ns(900), 0);
    }
}
