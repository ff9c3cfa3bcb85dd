//! Player configuration
//!
//! Output format, clock region and initial timing for a playback session.
//! Configurations are plain serde structs so they can be kept in a JSON file
//! next to the modules they are used with.

use crate::constants::{
    DEFAULT_SAMPLE_RATE, DEFAULT_SPEED, DEFAULT_TEMPO, MIN_TEMPO, NTSC_BASE_CLOCK, PAL_BASE_CLOCK,
    SPEED_TEMPO_THRESHOLD,
};
use crate::streaming::SampleFormat;
use crate::{ReplayerError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Paula clock region used to turn periods into sample rates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClockRegion {
    /// NTSC clock (7,159,090.5 Hz)
    #[default]
    Ntsc,
    /// PAL clock (7,093,789.2 Hz)
    Pal,
}

impl ClockRegion {
    /// Base clock in Hz
    pub fn base_clock(self) -> f64 {
        match self {
            ClockRegion::Ntsc => NTSC_BASE_CLOCK,
            ClockRegion::Pal => PAL_BASE_CLOCK,
        }
    }
}

/// Playback configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Clock region for period to frequency conversion
    pub clock: ClockRegion,
    /// Ticks per row at song start
    pub initial_speed: u8,
    /// BPM at song start
    pub initial_tempo: u8,
    /// Ticks of audio allowed to queue in the sink before production blocks
    pub backlog_ticks: u32,
    /// Linear gain applied to the mixed output
    pub gain: f32,
    /// Sample format the sink is opened with
    pub sample_format: SampleFormat,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            clock: ClockRegion::Ntsc,
            initial_speed: DEFAULT_SPEED,
            initial_tempo: DEFAULT_TEMPO,
            backlog_ticks: 50,
            gain: 1.0,
            sample_format: SampleFormat::F32,
        }
    }
}

impl PlayerConfig {
    /// Check that every field is usable for playback.
    pub fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(ReplayerError::ConfigError(
                "sample_rate must be greater than 0".into(),
            ));
        }
        if self.backlog_ticks == 0 {
            return Err(ReplayerError::ConfigError(
                "backlog_ticks must be greater than 0".into(),
            ));
        }
        if self.initial_speed == 0 || self.initial_speed > SPEED_TEMPO_THRESHOLD {
            return Err(ReplayerError::ConfigError(format!(
                "initial_speed {} outside 1..={}",
                self.initial_speed, SPEED_TEMPO_THRESHOLD
            )));
        }
        if self.initial_tempo < MIN_TEMPO {
            return Err(ReplayerError::ConfigError(format!(
                "initial_tempo {} below minimum of {}",
                self.initial_tempo, MIN_TEMPO
            )));
        }
        if !self.gain.is_finite() || self.gain < 0.0 {
            return Err(ReplayerError::ConfigError(format!(
                "gain {} must be a finite, non-negative number",
                self.gain
            )));
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)
            .map_err(|e| ReplayerError::ConfigError(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON configuration from disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&text)
    }

    /// Serialize as pretty JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ReplayerError::ConfigError(format!("failed to serialize config: {e}")))
    }

    /// Bytes of queued audio allowed before the sequencer waits on the sink.
    pub fn backlog_bytes(&self, samples_per_tick: usize) -> usize {
        self.backlog_ticks as usize * samples_per_tick * self.sample_format.bytes_per_sample()
    }
}
