use std::time::Duration;

/// Sample rate used when a device does not report one (Hz)
pub const SAMPLE_RATE: u32 = 48000;

/// Slowest tempo the metronome accepts
pub const BPM_MIN: u32 = 40;

/// Fastest tempo the metronome accepts
pub const BPM_MAX: u32 = 240;

/// Tempo used when no candidate tiles the cycle in whole bars
pub const DEFAULT_BPM: u32 = 120;

/// Default time signature numerator
pub const DEFAULT_BEATS_PER_BAR: u32 = 4;

/// Bounds for the time-sampling tick that drives progress queries
pub const SYNC_TICK_MIN: Duration = Duration::from_millis(50);
pub const SYNC_TICK_MAX: Duration = Duration::from_millis(100);

/// Distance from a beat boundary inside which a take may start immediately
pub const RECORDING_GATE_WINDOW: Duration = Duration::from_millis(50);

/// Click queue size (events, not samples)
pub const CLICK_QUEUE_CAPACITY: usize = 64;

/// Cycle clock state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Inactive,
    Active,
}

/// Whether a take may start now or should wait for the next beat
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecordingGate {
    Open,
    WaitFor(Duration),
}
