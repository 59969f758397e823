use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

use crate::analysis::autocorr::{ACCURACY_MAX, ACCURACY_MIN};
use crate::sync::SessionSettings;
use crate::types::{BPM_MAX, BPM_MIN, DEFAULT_BEATS_PER_BAR, SYNC_TICK_MAX, SYNC_TICK_MIN};

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub devices: DeviceConfig,

    #[serde(default)]
    pub detection: DetectionConfig,

    #[serde(default)]
    pub metronome: MetronomeConfig,

    #[serde(default)]
    pub sync: SyncConfig,

    /// Write logs here (the interactive session logs nowhere else)
    #[serde(default)]
    pub log_file: Option<PathBuf>,
}

/// Device configuration
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Output device index or name
    pub output: Option<String>,
}

/// Loop detection settings
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub sound_threshold: f32,
    pub accuracy: u8,
    pub min_loop_seconds: f64,
    pub max_loop_seconds: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            sound_threshold: 0.1,
            accuracy: 3,
            min_loop_seconds: 0.5,
            max_loop_seconds: 8.0,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MetronomeConfig {
    pub enabled: bool,
    pub volume: f32,
    /// Fixed tempo; inferred from the cycle length when absent
    pub bpm: Option<u32>,
    pub beats_per_bar: u32,
}

impl Default for MetronomeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            volume: 0.5,
            bpm: None,
            beats_per_bar: DEFAULT_BEATS_PER_BAR,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct SyncConfig {
    pub tick_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            tick_ms: SYNC_TICK_MAX.as_millis() as u64,
        }
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_yaml_str(&content)
            .with_context(|| format!("Invalid config in: {}", path.display()))
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        // An empty file is a valid, all-defaults config
        if content.trim().is_empty() {
            return Ok(Config::default());
        }

        let mut config: Config =
            serde_yaml::from_str(content).context("Failed to parse YAML")?;

        config.validate()?;
        config.clamp_ranges();
        Ok(config)
    }

    /// Reject values no amount of clamping can make sensible
    fn validate(&self) -> Result<()> {
        let d = &self.detection;

        if !(d.min_loop_seconds.is_finite() && d.min_loop_seconds > 0.0) {
            anyhow::bail!(
                "detection.min_loop_seconds must be positive, got {}",
                d.min_loop_seconds
            );
        }

        if !(d.max_loop_seconds.is_finite() && d.max_loop_seconds > 0.0) {
            anyhow::bail!(
                "detection.max_loop_seconds must be positive, got {}",
                d.max_loop_seconds
            );
        }

        if d.max_loop_seconds < d.min_loop_seconds {
            anyhow::bail!(
                "detection.max_loop_seconds {} must be >= min_loop_seconds {}",
                d.max_loop_seconds,
                d.min_loop_seconds
            );
        }

        Ok(())
    }

    fn clamp_ranges(&mut self) {
        let d = &mut self.detection;
        let threshold = if d.sound_threshold.is_nan() {
            0.0
        } else {
            d.sound_threshold.clamp(0.0, 1.0)
        };
        if threshold != d.sound_threshold {
            warn!(from = d.sound_threshold, to = threshold, "sound_threshold clamped");
            d.sound_threshold = threshold;
        }

        let accuracy = d.accuracy.clamp(ACCURACY_MIN, ACCURACY_MAX);
        if accuracy != d.accuracy {
            warn!(from = d.accuracy, to = accuracy, "accuracy clamped");
            d.accuracy = accuracy;
        }

        let m = &mut self.metronome;
        let volume = if m.volume.is_nan() {
            0.0
        } else {
            m.volume.clamp(0.0, 1.0)
        };
        if volume != m.volume {
            warn!(from = m.volume, to = volume, "metronome volume clamped");
            m.volume = volume;
        }

        if let Some(bpm) = m.bpm {
            let clamped = bpm.clamp(BPM_MIN, BPM_MAX);
            if clamped != bpm {
                warn!(from = bpm, to = clamped, "metronome bpm clamped");
                m.bpm = Some(clamped);
            }
        }

        if m.beats_per_bar == 0 {
            warn!("beats_per_bar must be >= 1, using 1");
            m.beats_per_bar = 1;
        }

        let tick = self.sync.tick_ms.clamp(
            SYNC_TICK_MIN.as_millis() as u64,
            SYNC_TICK_MAX.as_millis() as u64,
        );
        if tick != self.sync.tick_ms {
            warn!(from = self.sync.tick_ms, to = tick, "sync tick_ms clamped");
            self.sync.tick_ms = tick;
        }
    }

    /// Settings for a new sync session
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            sound_threshold: self.detection.sound_threshold,
            accuracy: self.detection.accuracy,
            min_loop_secs: self.detection.min_loop_seconds,
            max_loop_secs: self.detection.max_loop_seconds,
            metronome_enabled: self.metronome.enabled,
            metronome_volume: self.metronome.volume,
            bpm_override: self.metronome.bpm,
            beats_per_bar: self.metronome.beats_per_bar,
            sync_tick: Duration::from_millis(self.sync.tick_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_is_default() {
        let config = Config::from_yaml_str("").unwrap();
        assert!(config.devices.output.is_none());
        assert_eq!(config.detection.accuracy, 3);
        assert_eq!(config.sync.tick_ms, 100);

        let settings = config.session_settings();
        assert_eq!(settings.min_loop_secs, 0.5);
        assert_eq!(settings.max_loop_secs, 8.0);
        assert_eq!(settings.bpm_override, None);
        assert_eq!(settings.sync_tick, Duration::from_millis(100));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
devices:
  output: "MacBook Pro Speakers"
detection:
  sound_threshold: 0.2
  accuracy: 1
  min_loop_seconds: 1.0
  max_loop_seconds: 16.0
metronome:
  enabled: true
  volume: 0.8
  bpm: 96
  beats_per_bar: 3
sync:
  tick_ms: 50
log_file: loopsync.log
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.devices.output.as_deref(), Some("MacBook Pro Speakers"));
        assert_eq!(config.log_file, Some(PathBuf::from("loopsync.log")));

        let settings = config.session_settings();
        assert_eq!(settings.sound_threshold, 0.2);
        assert_eq!(settings.accuracy, 1);
        assert_eq!(settings.max_loop_secs, 16.0);
        assert!(settings.metronome_enabled);
        assert_eq!(settings.metronome_volume, 0.8);
        assert_eq!(settings.bpm_override, Some(96));
        assert_eq!(settings.beats_per_bar, 3);
        assert_eq!(settings.sync_tick, Duration::from_millis(50));
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let yaml = "metronome:\n  enabled: true\n";
        let config = Config::from_yaml_str(yaml).unwrap();
        assert!(config.metronome.enabled);
        assert_eq!(config.metronome.volume, 0.5);
        assert_eq!(config.metronome.beats_per_bar, 4);
        assert_eq!(config.detection.max_loop_seconds, 8.0);
    }

    #[test]
    fn test_out_of_range_values_are_clamped() {
        let yaml = r#"
detection:
  sound_threshold: 1.5
  accuracy: 50
metronome:
  volume: 2.0
  bpm: 400
  beats_per_bar: 0
sync:
  tick_ms: 10
"#;
        let config = Config::from_yaml_str(yaml).unwrap();
        assert_eq!(config.detection.sound_threshold, 1.0);
        assert_eq!(config.detection.accuracy, 10);
        assert_eq!(config.metronome.volume, 1.0);
        assert_eq!(config.metronome.bpm, Some(240));
        assert_eq!(config.metronome.beats_per_bar, 1);
        assert_eq!(config.sync.tick_ms, 50);
    }

    #[test]
    fn test_invalid_loop_bounds_rejected() {
        let inverted = "detection:\n  min_loop_seconds: 4.0\n  max_loop_seconds: 2.0\n";
        assert!(Config::from_yaml_str(inverted).is_err());

        let zero = "detection:\n  min_loop_seconds: 0.0\n";
        assert!(Config::from_yaml_str(zero).is_err());
    }

    #[test]
    fn test_malformed_yaml_rejected() {
        assert!(Config::from_yaml_str("metronome: [1, 2").is_err());
        assert!(Config::from_yaml_str("metronome:\n  volume: loud\n").is_err());
    }

    #[test]
    fn test_missing_file() {
        assert!(Config::from_file("/nonexistent/loopsync.yaml").is_err());
    }
}
