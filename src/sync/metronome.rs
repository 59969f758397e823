use crate::analysis::Tempo;
use crate::sync::timer::TimerToken;

/// One click for the rendering sink
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickEvent {
    /// First beat of a bar
    pub accent: bool,
    /// Beat index within the cycle
    pub beat_index: u32,
    /// Click volume (0.0 - 1.0)
    pub volume: f32,
}

/// Consumer of click events (audio output, test recorder, ...)
pub trait ClickSink {
    fn trigger(&mut self, click: ClickEvent);

    /// Most recent playback failure, if the sink can report one
    fn take_error(&mut self) -> Option<String> {
        None
    }
}

impl ClickSink for Vec<ClickEvent> {
    fn trigger(&mut self, click: ClickEvent) {
        self.push(click);
    }
}

/// Metronome session state. Scheduling lives in the sync session;
/// this only tracks what the next click looks like.
#[derive(Debug)]
pub struct Metronome {
    enabled: bool,
    volume: f32,
    beat_counter: u32,
    pending: Option<TimerToken>,
}

impl Metronome {
    pub fn new(enabled: bool, volume: f32) -> Self {
        Self {
            enabled,
            volume: volume.clamp(0.0, 1.0),
            beat_counter: 0,
            pending: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.volume = if volume.is_nan() { 0.0 } else { volume.clamp(0.0, 1.0) };
    }

    #[cfg(test)]
    pub fn beat_counter(&self) -> u32 {
        self.beat_counter
    }

    /// Token of the pending tick, if a tick chain is running
    pub fn pending(&self) -> Option<TimerToken> {
        self.pending
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    /// Start (or continue) a tick chain at `beat_counter`
    pub fn arm(&mut self, token: TimerToken, beat_counter: u32) {
        self.pending = Some(token);
        self.beat_counter = beat_counter;
    }

    /// Replace the pending token after a tick rescheduled itself
    pub fn rearm(&mut self, token: TimerToken) {
        self.pending = Some(token);
    }

    /// End the tick chain. Returns the token that still needs cancelling.
    pub fn disarm(&mut self) -> Option<TimerToken> {
        self.beat_counter = 0;
        self.pending.take()
    }

    /// Produce the click for the current beat and advance the counter
    pub fn next_click(&mut self, tempo: &Tempo) -> ClickEvent {
        let click = ClickEvent {
            accent: self.beat_counter % tempo.beats_per_bar.max(1) == 0,
            beat_index: self.beat_counter,
            volume: self.volume,
        };

        self.beat_counter += 1;
        if tempo.total_beats_in_cycle > 0 {
            self.beat_counter %= tempo.total_beats_in_cycle;
        }

        click
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::timer::{TimerQueue, TimerTask};
    use std::time::Instant;

    #[test]
    fn test_accent_on_bar_starts_and_wrap() {
        let tempo = Tempo::for_cycle(4.0, 120, 4); // 8 beats
        let mut metronome = Metronome::new(true, 0.5);

        let clicks: Vec<ClickEvent> = (0..10).map(|_| metronome.next_click(&tempo)).collect();
        let accents: Vec<bool> = clicks.iter().map(|c| c.accent).collect();
        let indices: Vec<u32> = clicks.iter().map(|c| c.beat_index).collect();

        assert_eq!(indices, vec![0, 1, 2, 3, 4, 5, 6, 7, 0, 1]);
        assert_eq!(
            accents,
            vec![true, false, false, false, true, false, false, false, true, false]
        );
        assert!(clicks.iter().all(|c| c.volume == 0.5));
    }

    #[test]
    fn test_volume_clamped() {
        let mut metronome = Metronome::new(true, 3.0);
        assert_eq!(metronome.volume(), 1.0);

        metronome.set_volume(-0.2);
        assert_eq!(metronome.volume(), 0.0);

        metronome.set_volume(f32::NAN);
        assert_eq!(metronome.volume(), 0.0);
    }

    #[test]
    fn test_disarm_resets_counter() {
        let mut queue = TimerQueue::new();
        let token = queue.schedule(Instant::now(), TimerTask::MetronomeTick);

        let mut metronome = Metronome::new(true, 1.0);
        metronome.arm(token, 5);
        assert!(metronome.is_running());
        assert_eq!(metronome.beat_counter(), 5);

        assert_eq!(metronome.disarm(), Some(token));
        assert!(!metronome.is_running());
        assert_eq!(metronome.beat_counter(), 0);
        assert_eq!(metronome.disarm(), None);
    }

    #[test]
    fn test_zero_beat_cycle_does_not_wrap() {
        let tempo = Tempo::for_cycle(0.0, 120, 4);
        let mut metronome = Metronome::new(true, 1.0);
        metronome.next_click(&tempo);
        metronome.next_click(&tempo);
        assert_eq!(metronome.beat_counter(), 2);
    }
}
