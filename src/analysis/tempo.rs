use std::time::Duration;

use crate::types::{BPM_MAX, BPM_MIN, DEFAULT_BPM};

/// Round tempos tried when tiling a cycle in whole bars
const CANDIDATE_MIN: u32 = 60;
const CANDIDATE_MAX: u32 = 200;
const CANDIDATE_STEP: u32 = 10;

/// Accepted distance from a whole number of bars
const BAR_TOLERANCE: f64 = 0.1;

/// Tempo of the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tempo {
    pub bpm: u32,
    pub beats_per_bar: u32,
    /// Clicks in one full cycle before the beat index wraps
    pub total_beats_in_cycle: u32,
}

impl Tempo {
    /// Build a tempo for a cycle of `duration_secs`, clamping bpm to the valid range
    pub fn for_cycle(duration_secs: f64, bpm: u32, beats_per_bar: u32) -> Self {
        let bpm = clamp_bpm(bpm);
        Self {
            bpm,
            beats_per_bar: beats_per_bar.max(1),
            total_beats_in_cycle: beats_in_cycle(duration_secs, bpm),
        }
    }

    /// Seconds per beat
    pub fn beat_interval_secs(&self) -> f64 {
        60.0 / self.bpm as f64
    }

    /// Delay between clicks (60000 / bpm milliseconds)
    pub fn beat_interval(&self) -> Duration {
        Duration::from_secs_f64(self.beat_interval_secs())
    }

    /// Change tempo and recompute the beat count for the cycle
    pub fn set_bpm(&mut self, bpm: u32, duration_secs: f64) {
        self.bpm = clamp_bpm(bpm);
        self.total_beats_in_cycle = beats_in_cycle(duration_secs, self.bpm);
    }

    pub fn set_beats_per_bar(&mut self, beats_per_bar: u32) {
        self.beats_per_bar = beats_per_bar.max(1);
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::for_cycle(0.0, DEFAULT_BPM, crate::types::DEFAULT_BEATS_PER_BAR)
    }
}

pub fn clamp_bpm(bpm: u32) -> u32 {
    bpm.clamp(BPM_MIN, BPM_MAX)
}

/// Number of beats at `bpm` that fit in `duration_secs`, rounded
pub fn beats_in_cycle(duration_secs: f64, bpm: u32) -> u32 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 || bpm == 0 {
        return 0;
    }
    (duration_secs / (60.0 / bpm as f64)).round() as u32
}

/// Pick a round tempo under which `duration_secs` spans a whole number of bars.
///
/// Candidates are tried nearest-to-120 first, so a cycle that tiles at both
/// 60 and 120 bpm resolves to 120. Falls back to 120 when nothing fits.
pub fn infer_bpm(duration_secs: f64, beats_per_bar: u32) -> u32 {
    if !duration_secs.is_finite() || duration_secs <= 0.0 {
        return DEFAULT_BPM;
    }
    let beats_per_bar = beats_per_bar.max(1) as f64;

    candidates()
        .into_iter()
        .find(|&bpm| {
            let beats = duration_secs / (60.0 / bpm as f64);
            let bars = beats / beats_per_bar;
            let nearest = bars.round();
            nearest >= 1.0 && (bars - nearest).abs() <= BAR_TOLERANCE
        })
        .unwrap_or(DEFAULT_BPM)
}

fn candidates() -> Vec<u32> {
    let mut bpms: Vec<u32> = (CANDIDATE_MIN..=CANDIDATE_MAX)
        .step_by(CANDIDATE_STEP as usize)
        .collect();
    // Stable sort keeps the slower tempo first on equal distance
    bpms.sort_by_key(|bpm| bpm.abs_diff(DEFAULT_BPM));
    bpms
}
