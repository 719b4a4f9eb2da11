// ABOUTME: Runtime configuration for metronome instances and room sessions
// ABOUTME: JSON-loadable with defaults for every field, validated before use

use crate::error::Error;
use crate::scheduler::{HORIZON_SECONDS, POLL_INTERVAL_SECONDS};
use crate::sequencer::{validate_beats_per_bar, validate_subdivision, validate_tempo};
use crate::sync::engine::{PROBE_INTERVAL_SECONDS, PROBE_TIMEOUT_SECONDS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metronome and sync settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Look-ahead window; must exceed the poll interval
    pub horizon_seconds: f64,
    /// Scheduler poll cadence
    pub poll_interval_seconds: f64,
    /// Follower probe cadence
    pub probe_interval_seconds: f64,
    /// Bounded wait for a probe reply
    pub probe_timeout_seconds: f64,

    /// Initial tempo in beats per minute
    pub tempo_bpm: f64,
    /// Initial beats per bar
    pub beats_per_bar: u32,
    /// Initial sub-beats per beat (1, 2 or 4)
    pub subdivisions_per_beat: u32,
    /// Accent the first sub-beat of each bar
    pub accent_first_beat: bool,
    /// Initial sound set id
    pub sound_set: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            horizon_seconds: HORIZON_SECONDS,
            poll_interval_seconds: POLL_INTERVAL_SECONDS,
            probe_interval_seconds: PROBE_INTERVAL_SECONDS,
            probe_timeout_seconds: PROBE_TIMEOUT_SECONDS,
            tempo_bpm: 120.0,
            beats_per_bar: 4,
            subdivisions_per_beat: 1,
            accent_first_beat: true,
            sound_set: "click".to_string(),
        }
    }
}

impl Config {
    /// Parse and validate a JSON document; missing fields take defaults
    pub fn from_json_str(text: &str) -> Result<Self, Error> {
        let config: Config = serde_json::from_str(text).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Error> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Check ranges and the timing relations between fields
    pub fn validate(&self) -> Result<(), Error> {
        let positive = |name: &str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(Error::Config(format!("{name} must be positive, got {value}")))
            }
        };
        positive("horizon_seconds", self.horizon_seconds)?;
        positive("poll_interval_seconds", self.poll_interval_seconds)?;
        positive("probe_interval_seconds", self.probe_interval_seconds)?;
        positive("probe_timeout_seconds", self.probe_timeout_seconds)?;

        if self.horizon_seconds <= self.poll_interval_seconds {
            return Err(Error::Config(format!(
                "horizon ({}s) must exceed the poll interval ({}s)",
                self.horizon_seconds, self.poll_interval_seconds
            )));
        }
        if self.probe_timeout_seconds >= self.probe_interval_seconds {
            return Err(Error::Config(format!(
                "probe timeout ({}s) must be shorter than the probe interval ({}s)",
                self.probe_timeout_seconds, self.probe_interval_seconds
            )));
        }

        validate_tempo(self.tempo_bpm)?;
        validate_beats_per_bar(self.beats_per_bar)?;
        validate_subdivision(self.subdivisions_per_beat)?;
        Ok(())
    }
}
