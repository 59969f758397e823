use std::time::Instant;

/// Source of "now" for the sync session
pub trait TimeSource {
    fn now(&self) -> Instant;
}

/// Wall-clock monotonic time
#[derive(Debug, Clone, Copy, Default)]
pub struct MonotonicClock;

impl TimeSource for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
pub use manual::ManualClock;

#[cfg(test)]
mod manual {
    use super::TimeSource;
    use std::cell::Cell;
    use std::time::{Duration, Instant};

    /// Time that only moves when a test advances it
    #[derive(Debug)]
    pub struct ManualClock {
        origin: Instant,
        offset: Cell<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Cell::new(Duration::ZERO),
            }
        }

        pub fn advance(&self, by: Duration) {
            self.offset.set(self.offset.get() + by);
        }

        pub fn origin(&self) -> Instant {
            self.origin
        }
    }

    impl TimeSource for ManualClock {
        fn now(&self) -> Instant {
            self.origin + self.offset.get()
        }
    }
}
