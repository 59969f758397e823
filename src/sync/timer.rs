//! Single-threaded timer queue driving the sync session.
//!
//! Every periodic activity is a chain of one-shot tasks: a handler that wants
//! to run again schedules a fresh task and stores the new token. Cancelling
//! a token removes the task before it can fire.

use std::collections::BTreeMap;
use std::time::Instant;

/// Handle to a scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimerToken(u64);

/// Work a timer performs when it fires
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerTask {
    /// Refresh the sampled time behind progress queries
    SyncTick,
    /// Emit one metronome click
    MetronomeTick,
}

/// A task that reached its deadline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTimer {
    pub token: TimerToken,
    pub task: TimerTask,
    pub deadline: Instant,
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    next_id: u64,
    entries: BTreeMap<(Instant, TimerToken), TimerTask>,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, deadline: Instant, task: TimerTask) -> TimerToken {
        let token = TimerToken(self.next_id);
        self.next_id += 1;
        self.entries.insert((deadline, token), task);
        token
    }

    /// Remove a pending task. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, token: TimerToken) -> bool {
        let key = self.entries.keys().find(|(_, t)| *t == token).copied();
        match key {
            Some(key) => self.entries.remove(&key).is_some(),
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.entries.keys().next().map(|(deadline, _)| *deadline)
    }

    /// Pop the earliest task whose deadline is at or before `now`
    pub fn pop_due(&mut self, now: Instant) -> Option<DueTimer> {
        let (&(deadline, token), _) = self.entries.iter().next()?;
        if deadline > now {
            return None;
        }
        let task = self.entries.remove(&(deadline, token))?;
        Some(DueTimer {
            token,
            task,
            deadline,
        })
    }

    /// Number of pending tasks of a given kind
    #[cfg(test)]
    pub fn pending(&self, task: TimerTask) -> usize {
        self.entries.values().filter(|t| **t == task).count()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
