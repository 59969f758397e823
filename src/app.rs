use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::sync::{ClickSink, LoopSync, MonotonicClock, SyncError};

/// BPM change per key press
const BPM_STEP: u32 = 1;

/// Volume change per key press
const VOLUME_STEP: f32 = 0.05;

/// Meters reachable with the beats-per-bar key
const BEATS_PER_BAR_RANGE: std::ops::RangeInclusive<u32> = 2..=7;

/// Message type for user notifications
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageType {
    Info,
    Warning,
    Error,
}

/// User notification message
#[derive(Debug, Clone)]
pub struct Message {
    pub text: String,
    pub msg_type: MessageType,
    pub timestamp: Instant,
}

/// Main application state
pub struct App<S: ClickSink> {
    /// Sync session driving cycle and metronome
    pub sync: LoopSync<MonotonicClock, S>,

    /// Master take the cycle was derived from
    pub master_file: PathBuf,

    /// Cycle length used when sync is (re)started
    pub loop_duration: f64,

    /// Whether to exit the application
    pub should_quit: bool,

    /// Current message to display (if any)
    pub message: Option<Message>,

    /// Message display duration
    pub message_duration: Duration,

    /// Whether to show help view
    pub show_help: bool,
}

impl<S: ClickSink> App<S> {
    pub fn new(sync: LoopSync<MonotonicClock, S>, master_file: PathBuf, loop_duration: f64) -> Self {
        Self {
            sync,
            master_file,
            loop_duration,
            should_quit: false,
            message: None,
            message_duration: Duration::from_secs(3),
            show_help: false,
        }
    }

    /// Run due timers and surface any playback failure
    pub fn tick(&mut self) {
        self.sync.poll();
        if let Some(err) = self.sync.take_sink_error() {
            self.show_error(format!("Audio output error: {}", err));
        }
    }

    /// Start the cycle if stopped, stop it if running
    pub fn toggle_sync(&mut self) {
        if self.sync.cycle().is_active() {
            self.sync.stop_sync();
            self.show_info("Sync stopped");
            return;
        }

        match self.sync.start_sync(self.loop_duration) {
            Ok(tempo) => self.show_info(format!("Sync started at {} BPM", tempo.bpm)),
            Err(SyncError::InvalidDuration(d)) => {
                self.show_error(format!("Cannot start sync with a {:.3}s cycle", d))
            }
        }
    }

    pub fn toggle_metronome(&mut self) {
        let enabled = self.sync.toggle_metronome();
        self.show_info(if enabled { "Metronome on" } else { "Metronome off" });
    }

    pub fn bpm_up(&mut self) {
        let bpm = self.sync.tempo().bpm.saturating_add(BPM_STEP);
        self.sync.set_bpm(bpm);
    }

    pub fn bpm_down(&mut self) {
        let bpm = self.sync.tempo().bpm.saturating_sub(BPM_STEP);
        self.sync.set_bpm(bpm);
    }

    pub fn volume_up(&mut self) {
        let volume = self.sync.metronome().volume() + VOLUME_STEP;
        self.sync.set_volume(volume);
    }

    pub fn volume_down(&mut self) {
        let volume = self.sync.metronome().volume() - VOLUME_STEP;
        self.sync.set_volume(volume);
    }

    /// Step through 2..=7 beats per bar, wrapping back to 2
    pub fn cycle_beats_per_bar(&mut self) {
        let current = self.sync.tempo().beats_per_bar;
        let next = if BEATS_PER_BAR_RANGE.contains(&(current + 1)) {
            current + 1
        } else {
            *BEATS_PER_BAR_RANGE.start()
        };
        self.sync.set_beats_per_bar(next);
        self.show_info(format!("{} beats per bar", next));
    }

    /// Restart the cycle at the current instant
    pub fn reanchor(&mut self) {
        if !self.sync.reanchor_cycle_start() {
            self.show_warning("Sync is not running");
        }
    }

    /// Update message display (auto-clear expired messages)
    pub fn update_message(&mut self) {
        if let Some(ref msg) = self.message {
            if msg.timestamp.elapsed() > self.message_duration {
                self.message = None;
            }
        }
    }

    pub fn show_info(&mut self, text: impl Into<String>) {
        self.set_message(text, MessageType::Info);
    }

    pub fn show_warning(&mut self, text: impl Into<String>) {
        self.set_message(text, MessageType::Warning);
    }

    pub fn show_error(&mut self, text: impl Into<String>) {
        self.set_message(text, MessageType::Error);
    }

    fn set_message(&mut self, text: impl Into<String>, msg_type: MessageType) {
        self.message = Some(Message {
            text: text.into(),
            msg_type,
            timestamp: Instant::now(),
        });
    }

    /// File name of the master take
    pub fn take_name(&self) -> String {
        self.master_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "-".to_string())
    }

    /// Position in the cycle, e.g. "2.40s / 8.00s"
    pub fn cycle_position_str(&self) -> String {
        let cycle = self.sync.cycle();
        if !cycle.is_active() {
            return "-".to_string();
        }
        let duration = cycle.duration_secs();
        format!("{:.2}s / {:.2}s", self.sync.cycle_progress() * duration, duration)
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn toggle_help(&mut self) {
        self.show_help = !self.show_help;
    }
}
