pub mod cycle;
pub mod metronome;
pub mod session;
pub mod time;
pub mod timer;

pub use metronome::{ClickEvent, ClickSink};
pub use session::{BeatPhase, LoopSync, SessionSettings, SyncError};
pub use time::MonotonicClock;
