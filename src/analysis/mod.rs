pub mod autocorr;
pub mod tempo;

pub use autocorr::{estimate_period, PeriodEstimate};
pub use tempo::{infer_bpm, Tempo};
