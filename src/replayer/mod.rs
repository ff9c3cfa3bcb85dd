//! Playback Engine
//!
//! Channel synthesis, effects and sequencing for decoded modules.
//!
//! - [`Sequencer`] walks the song tick by tick and pushes each mixed tick
//!   into an [`AudioSink`](crate::streaming::AudioSink).
//! - [`ModPlayer`] wraps it for pull-style use through [`PlaybackController`].

pub mod channel;
pub mod effect_engine;
pub mod mixer;
pub mod oscillator;
pub mod player;
pub mod sequencer;
pub mod timing;

pub use channel::{finetune_factor, ChannelState};
pub use mixer::{ChannelMask, Mixer};
pub use oscillator::{Oscillator, OscillatorControl, Waveform};
pub use player::ModPlayer;
pub use sequencer::{AdvanceResult, FlowControl, RowOutcome, Sequencer, SongPosition};
pub use timing::TimingConfig;

use crate::config::PlayerConfig;
use crate::constants::samples_per_tick;
use crate::mod_parser::{FormatParser, ModParser, Module};
use crate::Result;
use std::sync::Arc;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    /// Not playing; position at the start
    #[default]
    Stopped,
    /// Producing audio
    Playing,
    /// Holding the current position
    Paused,
}

/// Transport control shared by players
pub trait PlaybackController {
    /// Start or resume playback
    fn play(&mut self) -> Result<()>;

    /// Pause, keeping the position
    fn pause(&mut self) -> Result<()>;

    /// Stop and rewind
    fn stop(&mut self) -> Result<()>;

    /// Current state
    fn state(&self) -> PlaybackState;
}

/// Summary of a freshly loaded module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSummary {
    /// Song name
    pub name: String,
    /// Samples with waveform data
    pub sample_count: usize,
    /// Patterns stored in the file
    pub pattern_count: usize,
    /// Entries in the playback sequence
    pub sequence_length: usize,
    /// Total waveform bytes
    pub waveform_bytes: usize,
    /// Samples per tick at the configured rate and initial tempo
    pub samples_per_tick: usize,
}

impl LoadSummary {
    /// Summarize a module for the given configuration
    pub fn new(module: &Module, config: &PlayerConfig) -> Self {
        LoadSummary {
            name: module.name.clone(),
            sample_count: module.used_sample_count(),
            pattern_count: module.patterns.len(),
            sequence_length: module.sequence.len(),
            waveform_bytes: module.waveform_bytes(),
            samples_per_tick: samples_per_tick(config.sample_rate, config.initial_tempo),
        }
    }

    /// Human readable description
    pub fn format_info(&self) -> String {
        let name = if self.name.is_empty() {
            "(untitled)"
        } else {
            self.name.as_str()
        };
        format!(
            "Song:      {}\nFormat:    ProTracker M.K. (4 channels)\nSamples:   {} used, {} bytes\nPatterns:  {}\nSequence:  {} positions\nTick:      {} samples",
            name,
            self.sample_count,
            self.waveform_bytes,
            self.pattern_count,
            self.sequence_length,
            self.samples_per_tick
        )
    }
}

/// Decode module bytes into a stopped player with the default configuration
pub fn load_song(data: &[u8]) -> Result<(ModPlayer, LoadSummary)> {
    load_song_with_config(data, PlayerConfig::default())
}

/// Decode module bytes into a stopped player
pub fn load_song_with_config(
    data: &[u8],
    config: PlayerConfig,
) -> Result<(ModPlayer, LoadSummary)> {
    let module = ModParser.parse(data)?;
    let summary = LoadSummary::new(&module, &config);
    let player = ModPlayer::new(Arc::new(module), config)?;
    Ok((player, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mod_parser::tests::create_minimal_mod;
    use crate::{FormatError, ReplayerError};

    #[test]
    fn test_load_song_summary() {
        let data = create_minimal_mod(&[0, 1, 0], 3, 2);
        let (player, summary) = load_song(&data).unwrap();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert_eq!(summary.name, "test song");
        assert_eq!(summary.pattern_count, 2);
        assert_eq!(summary.sequence_length, 3);
        assert_eq!(summary.samples_per_tick, 882);
        let info = summary.format_info();
        assert!(info.contains("test song"));
        assert!(info.contains("Patterns:  2"));
    }

    #[test]
    fn test_load_song_rejects_bad_tag() {
        let mut data = create_minimal_mod(&[0], 1, 1);
        data[1080..1084].copy_from_slice(b"FLT4");
        assert!(matches!(
            load_song(&data),
            Err(ReplayerError::Format(FormatError::UnsupportedVariant { .. }))
        ));
    }

    #[test]
    fn test_load_song_rejects_bad_config() {
        let data = create_minimal_mod(&[0], 1, 1);
        let config = PlayerConfig {
            sample_rate: 0,
            ..PlayerConfig::default()
        };
        assert!(matches!(
            load_song_with_config(&data, config),
            Err(ReplayerError::ConfigError(_))
        ));
    }

    #[test]
    fn test_untitled_summary() {
        let summary = LoadSummary {
            name: String::new(),
            sample_count: 0,
            pattern_count: 1,
            sequence_length: 1,
            waveform_bytes: 0,
            samples_per_tick: 882,
        };
        assert!(summary.format_info().contains("(untitled)"));
    }
}
