//! Loop period estimation by normalized autocorrelation.
//!
//! The signal is decimated by the accuracy level, then candidate lags are
//! stepped through coarsely. Level 1 keeps full resolution, level 10 trades
//! most of the precision for speed.

use tracing::{debug, trace};

/// Guards the normalization against zero-energy windows
const EPSILON: f64 = 1e-10;

/// Lag step multiplier per accuracy level
const LAG_STEP_PER_LEVEL: f64 = 5.0;

pub const ACCURACY_MIN: u8 = 1;
pub const ACCURACY_MAX: u8 = 10;

/// Result of a period search
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PeriodEstimate {
    /// Winning lag in original-rate samples
    pub lag_samples: usize,

    /// Winning lag in seconds
    pub seconds: f64,

    /// Normalized correlation at the winning lag (0.0 if nothing was searched)
    pub correlation: f64,
}

/// Estimate the repeat period of `samples`.
///
/// Never fails: silence, or a signal shorter than `min_seconds`, yields the
/// minimum lag.
pub fn estimate_period(
    samples: &[f32],
    sample_rate: u32,
    min_seconds: f64,
    max_seconds: f64,
    accuracy: u8,
) -> PeriodEstimate {
    let accuracy = accuracy.clamp(ACCURACY_MIN, ACCURACY_MAX);
    let factor = accuracy as usize;
    let lag_step = ((accuracy as f64 * LAG_STEP_PER_LEVEL).round() as usize).max(1);

    let reduced = downsample(samples, factor);
    let reduced_rate = sample_rate as f64 / factor as f64;

    let min_lag = (min_seconds.max(0.0) * reduced_rate).floor() as usize;
    let max_lag = ((max_seconds.max(0.0) * reduced_rate).floor() as usize)
        .min(reduced.len().saturating_sub(1));
    let log_every = ((reduced_rate / 10.0).floor() as usize).max(1);

    let mut best_lag = min_lag;
    let mut best_corr = f64::NEG_INFINITY;

    if !reduced.is_empty() {
        let mut lag = min_lag;
        while lag <= max_lag {
            let corr = normalized_correlation(&reduced, lag);

            if lag % log_every == 0 {
                trace!(
                    lag,
                    seconds = lag as f64 / reduced_rate,
                    corr,
                    "autocorrelation"
                );
            }

            // Strict comparison: the earliest lag wins ties
            if corr > best_corr {
                best_corr = corr;
                best_lag = lag;
            }

            lag += lag_step;
        }
    }

    let lag_samples = best_lag * factor;
    let seconds = if sample_rate > 0 {
        lag_samples as f64 / sample_rate as f64
    } else {
        0.0
    };
    let correlation = if best_corr.is_finite() { best_corr } else { 0.0 };

    debug!(
        lag = lag_samples,
        seconds,
        correlation,
        accuracy,
        "period estimate"
    );

    PeriodEstimate {
        lag_samples,
        seconds,
        correlation,
    }
}

/// Nearest-neighbour decimation
fn downsample(samples: &[f32], factor: usize) -> Vec<f32> {
    let len = samples.len() / factor;
    (0..len)
        .map(|i| samples.get(i * factor).copied().unwrap_or(0.0))
        .collect()
}

fn normalized_correlation(signal: &[f32], lag: usize) -> f64 {
    if lag >= signal.len() {
        return 0.0;
    }

    let (mut sum, mut energy_a, mut energy_b) = (0.0f64, 0.0f64, 0.0f64);
    for (a, b) in signal.iter().zip(&signal[lag..]) {
        let (a, b) = (*a as f64, *b as f64);
        sum += a * b;
        energy_a += a * a;
        energy_b += b * b;
    }

    sum / (energy_a * energy_b + EPSILON).sqrt()
}
