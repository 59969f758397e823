use std::time::{Duration, Instant};

use crate::types::CycleState;

/// Shared cycle clock every loop synchronizes against
#[derive(Debug)]
pub struct CycleClock {
    /// Current state
    state: CycleState,

    /// Length of one cycle in seconds (> 0 while active)
    duration_secs: f64,

    /// Instant the current cycle started
    start: Option<Instant>,

    /// Last instant captured by the time-sampling tick
    sampled_at: Option<Instant>,
}

impl CycleClock {
    pub fn new() -> Self {
        Self {
            state: CycleState::Inactive,
            duration_secs: 0.0,
            start: None,
            sampled_at: None,
        }
    }

    /// Activate with a new duration anchored at `now`.
    /// Restarting an active clock replaces both duration and anchor.
    pub fn start(&mut self, duration_secs: f64, now: Instant) {
        debug_assert!(duration_secs > 0.0);
        self.state = CycleState::Active;
        self.duration_secs = duration_secs;
        self.start = Some(now);
        self.sampled_at = Some(now);
    }

    /// Return to inactive; the last duration is kept for reference
    pub fn stop(&mut self) {
        self.state = CycleState::Inactive;
    }

    /// Move the anchor to `now` without touching the duration.
    /// Returns false when the clock is not active.
    pub fn reanchor(&mut self, now: Instant) -> bool {
        if !self.is_active() || self.duration_secs <= 0.0 {
            return false;
        }
        self.start = Some(now);
        self.sampled_at = Some(now);
        true
    }

    /// Move the anchor forward by whole cycles once `now` has passed the
    /// end of the current one. Returns how many cycles were skipped.
    pub fn roll_over(&mut self, now: Instant) -> u32 {
        if !self.is_active() || self.duration_secs <= 0.0 {
            return 0;
        }
        let Some(start) = self.start else {
            return 0;
        };

        let elapsed = now.saturating_duration_since(start).as_secs_f64();
        let cycles = (elapsed / self.duration_secs).floor();
        if cycles < 1.0 {
            return 0;
        }

        self.start = Some(start + Duration::from_secs_f64(cycles * self.duration_secs));
        cycles as u32
    }

    /// Record the time observed by the sampling tick
    pub fn sample(&mut self, now: Instant) {
        self.sampled_at = Some(now);
    }

    /// Fraction of the cycle elapsed at the last sample, in [0, 1]
    pub fn progress(&self) -> f64 {
        if !self.is_active() || self.duration_secs <= 0.0 {
            return 0.0;
        }
        match (self.start, self.sampled_at) {
            (Some(start), Some(sampled)) => {
                let elapsed = sampled.saturating_duration_since(start).as_secs_f64();
                (elapsed / self.duration_secs).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Time since the anchor, if active
    pub fn elapsed_at(&self, now: Instant) -> Option<Duration> {
        if !self.is_active() {
            return None;
        }
        self.start.map(|start| now.saturating_duration_since(start))
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == CycleState::Active
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    #[cfg(test)]
    pub fn start_instant(&self) -> Option<Instant> {
        self.start
    }
}

impl Default for CycleClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_state_machine() {
        let mut clock = CycleClock::new();
        let t0 = Instant::now();

        assert_eq!(clock.state(), CycleState::Inactive);
        assert!(!clock.reanchor(t0));

        clock.start(8.0, t0);
        assert_eq!(clock.state(), CycleState::Active);
        assert_eq!(clock.duration_secs(), 8.0);

        clock.stop();
        assert_eq!(clock.state(), CycleState::Inactive);
        assert_eq!(clock.progress(), 0.0);
        assert!(clock.elapsed_at(t0).is_none());
    }

    #[test]
    fn test_progress_follows_samples() {
        let mut clock = CycleClock::new();
        let t0 = Instant::now();
        clock.start(8.0, t0);

        assert_eq!(clock.progress(), 0.0);

        // Progress only moves when the sampling tick runs
        let later = t0 + Duration::from_secs(4);
        assert_eq!(clock.progress(), 0.0);
        clock.sample(later);
        assert!((clock.progress() - 0.5).abs() < 1e-9);

        clock.sample(t0 + Duration::from_secs(20));
        assert_eq!(clock.progress(), 1.0);
    }

    #[test]
    fn test_restart_replaces_duration_and_anchor() {
        let mut clock = CycleClock::new();
        let t0 = Instant::now();
        clock.start(8.0, t0);

        let t1 = t0 + Duration::from_secs(3);
        clock.start(4.0, t1);
        assert_eq!(clock.duration_secs(), 4.0);
        assert_eq!(clock.start_instant(), Some(t1));
        assert_eq!(clock.elapsed_at(t1 + Duration::from_secs(1)), Some(Duration::from_secs(1)));
    }

    #[test]
    fn test_roll_over_keeps_grid() {
        let mut clock = CycleClock::new();
        let t0 = Instant::now();
        clock.start(8.0, t0);

        assert_eq!(clock.roll_over(t0 + Duration::from_secs(7)), 0);
        assert_eq!(clock.start_instant(), Some(t0));

        // Anchor lands on the boundary, not on the instant of the call
        let late = t0 + Duration::from_millis(8_300);
        assert_eq!(clock.roll_over(late), 1);
        assert_eq!(clock.start_instant(), Some(t0 + Duration::from_secs(8)));

        assert_eq!(clock.roll_over(t0 + Duration::from_secs(33)), 3);
        assert_eq!(clock.start_instant(), Some(t0 + Duration::from_secs(32)));

        clock.stop();
        assert_eq!(clock.roll_over(t0 + Duration::from_secs(100)), 0);
    }

    #[test]
    fn test_reanchor_keeps_duration() {
        let mut clock = CycleClock::new();
        let t0 = Instant::now();
        clock.start(8.0, t0);
        clock.sample(t0 + Duration::from_secs(6));

        let t1 = t0 + Duration::from_secs(8);
        assert!(clock.reanchor(t1));
        assert_eq!(clock.duration_secs(), 8.0);
        assert_eq!(clock.progress(), 0.0);
        assert_eq!(clock.start_instant(), Some(t1));
    }
}
