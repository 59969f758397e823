//! The sync session: one owned context holding the cycle clock, tempo and
//! metronome, driven by [`LoopSync::poll`] from the caller's event loop.

use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, info};

use crate::analysis::tempo::infer_bpm;
use crate::analysis::{estimate_period, PeriodEstimate, Tempo};
use crate::audio::buffer::SampleBuffer;
use crate::audio::wav::{process_recording, CodecError, ProcessedRecording};
use crate::sync::cycle::CycleClock;
use crate::sync::metronome::{ClickSink, Metronome};
use crate::sync::time::TimeSource;
use crate::sync::timer::{DueTimer, TimerQueue, TimerTask, TimerToken};
use crate::types::{
    RecordingGate, DEFAULT_BEATS_PER_BAR, DEFAULT_BPM, RECORDING_GATE_WINDOW, SYNC_TICK_MAX,
    SYNC_TICK_MIN,
};

/// Anything closer than this to a beat boundary counts as on the boundary
const BOUNDARY_EPSILON_SECS: f64 = 0.001;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("cycle duration must be positive and finite, got {0}")]
    InvalidDuration(f64),
}

/// Knobs the session is created with
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Leading audio below this level is ignored when estimating the loop
    pub sound_threshold: f32,
    /// Autocorrelation accuracy (1 = precise, 10 = fast)
    pub accuracy: u8,
    pub min_loop_secs: f64,
    pub max_loop_secs: f64,
    pub metronome_enabled: bool,
    pub metronome_volume: f32,
    /// Fixed tempo instead of inferring one per cycle
    pub bpm_override: Option<u32>,
    pub beats_per_bar: u32,
    /// Period of the time-sampling tick
    pub sync_tick: Duration,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sound_threshold: 0.1,
            accuracy: 3,
            min_loop_secs: 0.5,
            max_loop_secs: 8.0,
            metronome_enabled: false,
            metronome_volume: 0.5,
            bpm_override: None,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
            sync_tick: SYNC_TICK_MAX,
        }
    }
}

/// Position on the beat grid
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BeatPhase {
    pub beat_index_in_cycle: u32,
    /// Fraction of the current beat elapsed, in [0, 1)
    pub position_within_beat: f64,
    pub time_to_next_beat: Duration,
}

pub struct LoopSync<T: TimeSource, S: ClickSink> {
    time: T,
    sink: S,
    settings: SessionSettings,
    timers: TimerQueue,
    cycle: CycleClock,
    tempo: Tempo,
    metronome: Metronome,
    sync_tick: Option<TimerToken>,
}

impl<T: TimeSource, S: ClickSink> LoopSync<T, S> {
    pub fn new(time: T, sink: S, mut settings: SessionSettings) -> Self {
        settings.sync_tick = settings.sync_tick.clamp(SYNC_TICK_MIN, SYNC_TICK_MAX);
        let tempo = Tempo::for_cycle(
            0.0,
            settings.bpm_override.unwrap_or(DEFAULT_BPM),
            settings.beats_per_bar,
        );
        let metronome = Metronome::new(settings.metronome_enabled, settings.metronome_volume);

        Self {
            time,
            sink,
            settings,
            timers: TimerQueue::new(),
            cycle: CycleClock::new(),
            tempo,
            metronome,
            sync_tick: None,
        }
    }

    /// Estimate the period of a master take and start the cycle with it
    pub fn establish_loop(&mut self, take: &SampleBuffer) -> Result<PeriodEstimate, SyncError> {
        let from_onset = take.trim_to_onset(self.settings.sound_threshold);
        let estimate = estimate_period(
            &from_onset.to_mono(),
            from_onset.sample_rate(),
            self.settings.min_loop_secs,
            self.settings.max_loop_secs,
            self.settings.accuracy,
        );

        info!(
            period = estimate.seconds,
            correlation = estimate.correlation,
            take_secs = take.duration_secs(),
            "loop period estimated"
        );

        self.start_sync(estimate.seconds)?;
        Ok(estimate)
    }

    /// Start (or restart) the cycle with a new duration anchored at now
    pub fn start_sync(&mut self, duration_secs: f64) -> Result<Tempo, SyncError> {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return Err(SyncError::InvalidDuration(duration_secs));
        }

        let now = self.time.now();
        self.cycle.start(duration_secs, now);

        let bpm = self
            .settings
            .bpm_override
            .unwrap_or_else(|| infer_bpm(duration_secs, self.tempo.beats_per_bar));
        self.tempo = Tempo::for_cycle(duration_secs, bpm, self.tempo.beats_per_bar);

        self.restart_sync_tick(now);
        if self.metronome.is_enabled() {
            self.restart_metronome(now);
        }

        info!(
            duration = duration_secs,
            bpm = self.tempo.bpm,
            beats = self.tempo.total_beats_in_cycle,
            "sync started"
        );
        Ok(self.tempo)
    }

    pub fn stop_sync(&mut self) {
        self.cycle.stop();
        if let Some(token) = self.sync_tick.take() {
            self.timers.cancel(token);
        }
        self.stop_metronome();
        info!("sync stopped");
    }

    /// Move the cycle start to now, keeping its duration. Click phase follows.
    pub fn reanchor_cycle_start(&mut self) -> bool {
        let now = self.time.now();
        if !self.cycle.reanchor(now) {
            return false;
        }
        if self.metronome.is_enabled() {
            self.restart_metronome(now);
        }
        debug!("cycle start re-anchored");
        true
    }

    /// Fraction of the cycle elapsed, as of the last sampling tick
    pub fn cycle_progress(&self) -> f64 {
        self.cycle.progress()
    }

    pub fn beat_phase(&self) -> BeatPhase {
        self.beat_phase_at(self.time.now())
    }

    pub fn time_to_next_beat(&self) -> Duration {
        self.beat_phase().time_to_next_beat
    }

    /// True within `threshold` before or after a beat boundary
    pub fn is_near_beat(&self, threshold: Duration) -> bool {
        if !self.cycle.is_active() {
            return false;
        }
        let phase = self.beat_phase();
        let interval = self.tempo.beat_interval_secs();
        let threshold = threshold.as_secs_f64();

        let since_beat = phase.position_within_beat * interval;
        phase.time_to_next_beat.as_secs_f64() <= threshold || since_beat <= threshold
    }

    /// Whether a take may start now, or how long to wait for the next beat
    pub fn recording_gate(&self) -> RecordingGate {
        if !self.cycle.is_active() {
            return RecordingGate::Open;
        }
        let to_beat = self.time_to_next_beat();
        let interval = self.tempo.beat_interval();

        if to_beat > RECORDING_GATE_WINDOW && to_beat + RECORDING_GATE_WINDOW < interval {
            RecordingGate::WaitFor(to_beat)
        } else {
            RecordingGate::Open
        }
    }

    /// Flip the metronome on or off. Returns the new state.
    pub fn toggle_metronome(&mut self) -> bool {
        let enabled = !self.metronome.is_enabled();
        self.metronome.set_enabled(enabled);

        if enabled {
            self.restart_metronome(self.time.now());
        } else {
            self.stop_metronome();
        }
        info!(enabled, "metronome toggled");
        enabled
    }

    pub fn set_bpm(&mut self, bpm: u32) {
        self.tempo.set_bpm(bpm, self.cycle.duration_secs());
        if self.metronome.is_running() {
            self.restart_metronome(self.time.now());
        }
        info!(
            bpm = self.tempo.bpm,
            beats = self.tempo.total_beats_in_cycle,
            "tempo changed"
        );
    }

    pub fn set_volume(&mut self, volume: f32) {
        self.metronome.set_volume(volume);
    }

    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) {
        self.tempo.set_beats_per_bar(beats_per_bar);
    }

    /// Pad a later take to the cycle length and re-encode it
    pub fn conform_take(&self, raw: &[u8]) -> Result<ProcessedRecording, CodecError> {
        let target = if self.cycle.is_active() {
            self.cycle.duration_secs()
        } else {
            0.0
        };
        process_recording(raw, target)
    }

    /// Run every task that is due. Returns how many fired.
    pub fn poll(&mut self) -> usize {
        let now = self.time.now();
        let mut fired = 0;

        while let Some(due) = self.timers.pop_due(now) {
            fired += 1;
            match due.task {
                TimerTask::SyncTick => self.on_sync_tick(due, now),
                TimerTask::MetronomeTick => self.on_metronome_tick(due.token, now),
            }
        }

        fired
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    pub fn tempo(&self) -> &Tempo {
        &self.tempo
    }

    pub fn cycle(&self) -> &CycleClock {
        &self.cycle
    }

    pub fn metronome(&self) -> &Metronome {
        &self.metronome
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Playback failure reported by the click sink since the last call
    pub fn take_sink_error(&mut self) -> Option<String> {
        self.sink.take_error()
    }

    #[cfg(test)]
    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    #[cfg(test)]
    pub fn time(&self) -> &T {
        &self.time
    }

    fn beat_phase_at(&self, now: Instant) -> BeatPhase {
        let Some(elapsed) = self.cycle.elapsed_at(now) else {
            return BeatPhase::default();
        };

        let interval = self.tempo.beat_interval_secs();
        let beats = elapsed.as_secs_f64() / interval;
        let whole = beats.floor();
        let position = beats - whole;

        let index = whole as u64;
        let total = self.tempo.total_beats_in_cycle as u64;
        let beat_index_in_cycle = (if total > 0 { index % total } else { index }) as u32;

        BeatPhase {
            beat_index_in_cycle,
            position_within_beat: position,
            time_to_next_beat: Duration::from_secs_f64((1.0 - position) * interval),
        }
    }

    fn restart_sync_tick(&mut self, now: Instant) {
        if let Some(token) = self.sync_tick.take() {
            self.timers.cancel(token);
        }
        let token = self.timers.schedule(now + self.settings.sync_tick, TimerTask::SyncTick);
        self.sync_tick = Some(token);
    }

    /// Cancel any running chain, then start a new one locked to the beat grid
    fn restart_metronome(&mut self, now: Instant) {
        self.stop_metronome();
        if !self.metronome.is_enabled() || !self.cycle.is_active() {
            return;
        }

        let phase = self.beat_phase_at(now);
        let since_beat = phase.position_within_beat * self.tempo.beat_interval_secs();

        let (deadline, beat) = if since_beat < BOUNDARY_EPSILON_SECS {
            (now, phase.beat_index_in_cycle)
        } else {
            let mut next = phase.beat_index_in_cycle + 1;
            if self.tempo.total_beats_in_cycle > 0 {
                next %= self.tempo.total_beats_in_cycle;
            }
            (now + phase.time_to_next_beat, next)
        };

        let token = self.timers.schedule(deadline, TimerTask::MetronomeTick);
        self.metronome.arm(token, beat);
        debug!(beat, "metronome armed");
    }

    fn stop_metronome(&mut self) {
        if let Some(token) = self.metronome.disarm() {
            self.timers.cancel(token);
        }
    }

    fn on_sync_tick(&mut self, due: DueTimer, now: Instant) {
        if self.sync_tick != Some(due.token) {
            return;
        }
        if !self.cycle.is_active() {
            self.sync_tick = None;
            return;
        }

        let skipped = self.cycle.roll_over(now);
        if skipped > 0 {
            debug!(skipped, "cycle rolled over");
        }
        self.cycle.sample(now);

        let period = self.settings.sync_tick;
        let mut next = due.deadline + period;
        if next <= now {
            next = now + period;
        }
        self.sync_tick = Some(self.timers.schedule(next, TimerTask::SyncTick));
    }

    fn on_metronome_tick(&mut self, token: TimerToken, now: Instant) {
        if self.metronome.pending() != Some(token)
            || !self.metronome.is_enabled()
            || !self.cycle.is_active()
        {
            debug!("stale metronome tick ignored");
            return;
        }

        let click = self.metronome.next_click(&self.tempo);
        self.sink.trigger(click);

        // Fixed delay from the moment this tick ran, not from the beat grid
        let next = self.timers.schedule(now + self.tempo.beat_interval(), TimerTask::MetronomeTick);
        self.metronome.rearm(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::{decode_wav, encode_to_wav};
    use crate::sync::metronome::ClickEvent;
    use crate::sync::time::ManualClock;

    type TestSync = LoopSync<ManualClock, Vec<ClickEvent>>;

    fn session(metronome_enabled: bool) -> TestSync {
        let settings = SessionSettings {
            metronome_enabled,
            ..SessionSettings::default()
        };
        LoopSync::new(ManualClock::new(), Vec::new(), settings)
    }

    fn advance(sync: &mut TestSync, millis: u64) {
        sync.time.advance(Duration::from_millis(millis));
        sync.poll();
    }

    #[test]
    fn test_start_sync_infers_tempo() {
        let mut sync = session(false);
        let tempo = sync.start_sync(8.0).unwrap();

        assert_eq!(tempo.bpm, 120);
        assert_eq!(tempo.beats_per_bar, 4);
        assert_eq!(tempo.total_beats_in_cycle, 16);
        assert!(sync.cycle().is_active());
    }

    #[test]
    fn test_start_sync_rejects_bad_duration() {
        let mut sync = session(true);
        assert!(matches!(sync.start_sync(0.0), Err(SyncError::InvalidDuration(_))));
        assert!(sync.start_sync(f64::INFINITY).is_err());
        assert!(!sync.cycle().is_active());
        assert!(sync.timers.is_empty());
    }

    #[test]
    fn test_bpm_override_skips_inference() {
        let settings = SessionSettings {
            bpm_override: Some(90),
            ..SessionSettings::default()
        };
        let mut sync = LoopSync::new(ManualClock::new(), Vec::new(), settings);
        let tempo = sync.start_sync(8.0).unwrap();
        assert_eq!(tempo.bpm, 90);
        assert_eq!(tempo.total_beats_in_cycle, 12);
    }

    #[test]
    fn test_sync_tick_is_clamped() {
        let settings = SessionSettings {
            sync_tick: Duration::ZERO,
            ..SessionSettings::default()
        };
        let sync = LoopSync::new(ManualClock::new(), Vec::new(), settings);
        assert_eq!(sync.settings().sync_tick, SYNC_TICK_MIN);
    }

    #[test]
    fn test_progress_at_half_cycle() {
        let mut sync = session(false);
        sync.start_sync(8.0).unwrap();

        for _ in 0..80 {
            advance(&mut sync, 50);
        }

        let progress = sync.cycle_progress();
        assert!((progress - 0.5).abs() <= 0.1 / 8.0, "progress {}", progress);
    }

    #[test]
    fn test_progress_needs_sampling_tick() {
        let mut sync = session(false);
        sync.start_sync(8.0).unwrap();

        // Time moves but nothing polls
        sync.time.advance(Duration::from_secs(4));
        assert_eq!(sync.cycle_progress(), 0.0);

        sync.poll();
        assert!((sync.cycle_progress() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_progress_wraps_at_cycle_boundary() {
        let mut sync = session(false);
        sync.start_sync(8.0).unwrap();

        // 12s: half way through the second cycle
        for _ in 0..120 {
            advance(&mut sync, 100);
        }
        let progress = sync.cycle_progress();
        assert!((progress - 0.5).abs() <= 0.1 / 8.0, "progress {}", progress);
        assert_eq!(sync.beat_phase().beat_index_in_cycle, 8);

        // Progress and beat grid agree across several cycles
        for _ in 0..200 {
            advance(&mut sync, 100);
        }
        let progress = sync.cycle_progress();
        assert!(progress < 1.0, "progress {}", progress);
        let beat = sync.beat_phase().beat_index_in_cycle;
        assert_eq!(beat, (progress * 16.0).floor() as u32);
    }

    #[test]
    fn test_progress_zero_when_inactive() {
        let mut sync = session(false);
        assert_eq!(sync.cycle_progress(), 0.0);

        sync.start_sync(8.0).unwrap();
        advance(&mut sync, 4000);
        sync.stop_sync();
        assert_eq!(sync.cycle_progress(), 0.0);
        assert_eq!(sync.beat_phase(), BeatPhase::default());
    }

    #[test]
    fn test_metronome_clicks_on_beat_grid() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();

        // First click fires at the cycle start
        sync.poll();
        assert_eq!(sync.sink().len(), 1);
        assert_eq!(
            sync.sink()[0],
            ClickEvent {
                accent: true,
                beat_index: 0,
                volume: 0.5
            }
        );

        advance(&mut sync, 499);
        assert_eq!(sync.sink().len(), 1);
        advance(&mut sync, 1);
        assert_eq!(sync.sink().len(), 2);
        assert!(!sync.sink()[1].accent);

        // Complete the cycle and wrap
        for _ in 0..15 {
            advance(&mut sync, 500);
        }
        let indices: Vec<u32> = sync.sink().iter().map(|c| c.beat_index).collect();
        assert_eq!(indices.len(), 17);
        assert_eq!(indices[15], 15);
        assert_eq!(indices[16], 0);
        assert!(sync.sink()[16].accent);
        assert!(sync.sink()[4].accent);
        assert!(sync.sink()[8].accent);
    }

    #[test]
    fn test_fixed_delay_drifts_when_ticks_run_late() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();
        sync.poll();

        // The event loop gets to the second beat 20ms late
        advance(&mut sync, 520);
        assert_eq!(sync.sink().len(), 2);

        // The third click is due 500ms after the late tick, not on the grid
        advance(&mut sync, 480);
        assert_eq!(sync.sink().len(), 2);
        advance(&mut sync, 20);
        assert_eq!(sync.sink().len(), 3);
    }

    #[test]
    fn test_restart_keeps_single_tick_chain() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();
        advance(&mut sync, 250);
        sync.start_sync(4.0).unwrap();
        sync.start_sync(6.0).unwrap();

        assert_eq!(sync.timers.pending(TimerTask::MetronomeTick), 1);
        assert_eq!(sync.timers.pending(TimerTask::SyncTick), 1);

        sync.poll();
        advance(&mut sync, 500);
        // One click at the start of the first cycle, one at each restart
        // anchor (only the last survived), one a beat later
        assert_eq!(sync.sink().len(), 3);
    }

    #[test]
    fn test_toggle_off_stops_clicks() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();
        sync.poll();
        advance(&mut sync, 500);
        assert_eq!(sync.sink().len(), 2);

        assert!(!sync.toggle_metronome());
        assert_eq!(sync.metronome().beat_counter(), 0);
        assert_eq!(sync.timers.pending(TimerTask::MetronomeTick), 0);

        for _ in 0..4 {
            advance(&mut sync, 500);
        }
        assert_eq!(sync.sink().len(), 2);
    }

    #[test]
    fn test_toggle_on_waits_for_next_beat() {
        let mut sync = session(false);
        sync.start_sync(8.0).unwrap();
        advance(&mut sync, 1200);

        assert!(sync.toggle_metronome());
        sync.poll();
        assert!(sync.sink().is_empty());

        advance(&mut sync, 310);
        assert_eq!(sync.sink().len(), 1);
        assert_eq!(sync.sink()[0].beat_index, 3);
        assert!(!sync.sink()[0].accent);
    }

    #[test]
    fn test_stale_tick_is_ignored() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();

        // A tick whose token is no longer the pending one does nothing
        let stale = sync.timers.schedule(sync.time.now(), TimerTask::MetronomeTick);
        sync.on_metronome_tick(stale, sync.time.now());
        assert!(sync.sink().is_empty());
        assert_ne!(sync.metronome().pending(), Some(stale));
    }

    #[test]
    fn test_stop_sync_cancels_everything() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();
        sync.poll();

        sync.stop_sync();
        assert!(sync.timers.is_empty());
        assert!(!sync.metronome().is_running());

        advance(&mut sync, 2000);
        assert_eq!(sync.sink().len(), 1);
        assert!(!sync.reanchor_cycle_start());
    }

    #[test]
    fn test_reanchor_restarts_click_phase() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();
        sync.poll();
        advance(&mut sync, 500);
        advance(&mut sync, 300);
        assert_eq!(sync.sink().len(), 2);

        assert!(sync.reanchor_cycle_start());
        assert_eq!(sync.cycle_progress(), 0.0);
        assert_eq!(sync.beat_phase().beat_index_in_cycle, 0);
        assert_eq!(sync.timers.pending(TimerTask::MetronomeTick), 1);

        sync.poll();
        assert_eq!(sync.sink().len(), 3);
        assert_eq!(sync.sink()[2].beat_index, 0);
        assert!(sync.sink()[2].accent);
    }

    #[test]
    fn test_set_bpm_clamps_and_restarts() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();
        sync.poll();

        sync.set_bpm(1000);
        assert_eq!(sync.tempo().bpm, 240);
        assert_eq!(sync.tempo().total_beats_in_cycle, 32);
        assert_eq!(sync.timers.pending(TimerTask::MetronomeTick), 1);

        sync.set_bpm(0);
        assert_eq!(sync.tempo().bpm, 40);
        assert_eq!(sync.tempo().total_beats_in_cycle, 5);
    }

    #[test]
    fn test_set_volume_reaches_clicks() {
        let mut sync = session(true);
        sync.set_volume(4.0);
        sync.start_sync(8.0).unwrap();
        sync.poll();
        assert_eq!(sync.sink()[0].volume, 1.0);
    }

    #[test]
    fn test_beats_per_bar_moves_accents() {
        let mut sync = session(true);
        sync.set_beats_per_bar(3);
        sync.start_sync(6.0).unwrap();
        sync.poll();
        for _ in 0..3 {
            advance(&mut sync, 500);
        }
        let accents: Vec<bool> = sync.sink().iter().map(|c| c.accent).collect();
        assert_eq!(accents, vec![true, false, false, true]);
    }

    #[test]
    fn test_is_near_beat_at_120() {
        let mut sync = session(false);
        sync.start_sync(8.0).unwrap();

        // (offset from cycle start in ms, expected)
        let checks = [
            (0, true),
            (50, true),
            (90, true),
            (110, false),
            (250, false),
            (390, false),
            (410, true),
            (500, true),
            (590, true),
            (750, false),
        ];

        let mut at = 0;
        for (offset, expected) in checks {
            sync.time.advance(Duration::from_millis(offset - at));
            at = offset;
            assert_eq!(
                sync.is_near_beat(Duration::from_millis(100)),
                expected,
                "at {}ms",
                offset
            );
        }
    }

    #[test]
    fn test_beat_phase() {
        let mut sync = session(false);
        sync.start_sync(8.0).unwrap();
        sync.time.advance(Duration::from_millis(1250));

        let phase = sync.beat_phase();
        assert_eq!(phase.beat_index_in_cycle, 2);
        assert!((phase.position_within_beat - 0.5).abs() < 1e-9);
        assert!((phase.time_to_next_beat.as_secs_f64() - 0.25).abs() < 1e-9);

        // Wraps after 16 beats
        sync.time.advance(Duration::from_secs(8));
        assert_eq!(sync.beat_phase().beat_index_in_cycle, 2);
    }

    #[test]
    fn test_recording_gate() {
        let mut sync = session(false);
        assert_eq!(sync.recording_gate(), RecordingGate::Open);

        sync.start_sync(8.0).unwrap();
        assert_eq!(sync.recording_gate(), RecordingGate::Open);

        sync.time.advance(Duration::from_millis(200));
        match sync.recording_gate() {
            RecordingGate::WaitFor(wait) => {
                assert!((wait.as_secs_f64() - 0.3).abs() < 1e-6)
            }
            RecordingGate::Open => panic!("expected to wait for the next beat"),
        }

        sync.time.advance(Duration::from_millis(280));
        assert_eq!(sync.recording_gate(), RecordingGate::Open);
    }

    #[test]
    fn test_conform_take_pads_to_cycle() {
        let mut sync = session(false);
        sync.start_sync(2.0).unwrap();

        let take = SampleBuffer::mono(vec![0.25; 4000], 8000);
        let processed = sync.conform_take(&encode_to_wav(&take)).unwrap();
        assert!((processed.duration_secs - 2.0).abs() < 1e-9);
        assert_eq!(decode_wav(&processed.wav).unwrap().len(), 16000);
    }

    #[test]
    fn test_conform_take_decode_error_leaves_state() {
        let mut sync = session(true);
        sync.start_sync(8.0).unwrap();

        assert!(sync.conform_take(b"garbage").is_err());
        assert!(sync.cycle().is_active());
        assert!(sync.metronome().is_running());
    }

    #[test]
    fn test_establish_loop_from_take() {
        let mut state = 0x9e37_79b9u32;
        let pattern: Vec<f32> = (0..2000)
            .map(|_| {
                state ^= state << 13;
                state ^= state >> 17;
                state ^= state << 5;
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        let mut samples = vec![0.0f32; 300];
        samples.extend(pattern.iter().copied().cycle().take(2000 * 3));
        let take = SampleBuffer::mono(samples, 1000);

        let settings = SessionSettings {
            accuracy: 1,
            min_loop_secs: 0.5,
            max_loop_secs: 3.0,
            ..SessionSettings::default()
        };
        let mut sync = LoopSync::new(ManualClock::new(), Vec::new(), settings);

        let estimate = sync.establish_loop(&take).unwrap();
        assert_eq!(estimate.lag_samples, 2000);
        assert!((sync.cycle().duration_secs() - 2.0).abs() < 1e-9);
        assert_eq!(sync.tempo().bpm, 120);
        assert_eq!(sync.tempo().total_beats_in_cycle, 4);
        assert_eq!(sync.cycle().start_instant(), Some(sync.time().origin()));
    }
}
