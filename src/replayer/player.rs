//! Pull-style player
//!
//! [`ModPlayer`] wraps a [`Sequencer`] for callers that want arbitrary-sized
//! sample blocks (audio callbacks, offline rendering) instead of pushing
//! whole ticks into an [`AudioSink`](crate::streaming::AudioSink). Partially
//! consumed ticks carry over to the next call.

use super::sequencer::{AdvanceResult, Sequencer, SongPosition};
use super::{PlaybackController, PlaybackState};
use crate::config::PlayerConfig;
use crate::constants::ROWS_PER_PATTERN;
use crate::mod_parser::Module;
use crate::Result;
use std::sync::Arc;

/// Module player producing samples on demand
#[derive(Debug, Clone)]
pub struct ModPlayer {
    sequencer: Sequencer,
    state: PlaybackState,
    pending: Vec<f32>,
    pending_pos: usize,
    loop_count: u32,
}

impl ModPlayer {
    /// Create a stopped player for a shared module
    pub fn new(module: Arc<Module>, config: PlayerConfig) -> Result<Self> {
        Ok(ModPlayer {
            sequencer: Sequencer::new(module, config)?,
            state: PlaybackState::Stopped,
            pending: Vec::new(),
            pending_pos: 0,
            loop_count: 0,
        })
    }

    /// Create a stopped player with the default configuration
    pub fn from_module(module: Module) -> Result<Self> {
        Self::new(Arc::new(module), PlayerConfig::default())
    }

    /// Fill `buffer` with the next samples; silence unless playing
    pub fn generate_samples_into(&mut self, buffer: &mut [f32]) {
        if self.state != PlaybackState::Playing {
            buffer.fill(0.0);
            return;
        }

        let mut filled = 0;
        while filled < buffer.len() {
            if self.pending_pos >= self.pending.len() {
                self.render_next_tick();
            }
            let available = &self.pending[self.pending_pos..];
            let count = available.len().min(buffer.len() - filled);
            buffer[filled..filled + count].copy_from_slice(&available[..count]);
            filled += count;
            self.pending_pos += count;
        }
    }

    /// Generate `count` samples into a new buffer
    pub fn generate_samples(&mut self, count: usize) -> Vec<f32> {
        let mut samples = vec![0.0; count];
        self.generate_samples_into(&mut samples);
        samples
    }

    fn render_next_tick(&mut self) {
        if let AdvanceResult::RowAdvanced(outcome) = self.sequencer.render_tick() {
            if outcome.looped {
                self.loop_count += 1;
                tracing::debug!(loops = self.loop_count, "song looped");
            }
        }
        self.pending.clear();
        self.pending.extend_from_slice(self.sequencer.tick_buffer());
        self.pending_pos = 0;
    }

    /// Playback position as a fraction (0.0 to 1.0) of the sequence
    pub fn playback_position(&self) -> f32 {
        let total_rows = self.sequencer.module().sequence.len() * ROWS_PER_PATTERN;
        if total_rows == 0 {
            return 0.0;
        }
        let position = self.sequencer.position();
        let current = position.sequence_index * ROWS_PER_PATTERN + position.row;
        current as f32 / total_rows as f32
    }

    /// Current song position
    pub fn position(&self) -> SongPosition {
        self.sequencer.position()
    }

    /// Number of times the song has wrapped since the last stop
    pub fn loop_count(&self) -> u32 {
        self.loop_count
    }

    /// Mute or unmute a channel (0-3)
    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        self.sequencer.mixer_mut().set_channel_mute(channel, mute);
    }

    /// Check if a channel is muted
    pub fn is_channel_muted(&self, channel: usize) -> bool {
        self.sequencer.mixer().is_channel_muted(channel)
    }

    /// Underlying sequencer
    pub fn sequencer(&self) -> &Sequencer {
        &self.sequencer
    }

    /// Mutable access to the underlying sequencer
    pub fn sequencer_mut(&mut self) -> &mut Sequencer {
        &mut self.sequencer
    }

    /// The module being played
    pub fn module(&self) -> &Module {
        self.sequencer.module()
    }

    /// Samples per tick at the current tempo
    pub fn samples_per_tick(&self) -> usize {
        self.sequencer.samples_per_tick()
    }
}

impl PlaybackController for ModPlayer {
    fn play(&mut self) -> Result<()> {
        self.state = PlaybackState::Playing;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        self.state = PlaybackState::Paused;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.state = PlaybackState::Stopped;
        self.sequencer.reset();
        self.pending.clear();
        self.pending_pos = 0;
        self.loop_count = 0;
        Ok(())
    }

    fn state(&self) -> PlaybackState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mod_parser::{Note, Pattern, Sample};

    fn tone_module() -> Module {
        let mut samples = vec![Sample::default(); 31];
        let mut waveforms = vec![Vec::new(); 31];
        samples[0] = Sample {
            name: "saw".into(),
            length_words: 64,
            finetune: 0,
            volume: 48,
            loop_start_words: 0,
            loop_length_words: 64,
        };
        waveforms[0] = (0..128).map(|i| (i as i8).wrapping_mul(2)).collect();

        let mut pattern = Pattern::empty();
        if let Some(row) = pattern.division_mut(0) {
            row.notes[0] = Note {
                sample: 1,
                period: 428,
                command: 0,
            };
        }
        Module {
            name: "player test".into(),
            samples,
            waveforms,
            patterns: vec![pattern],
            sequence: vec![0, 0],
        }
    }

    #[test]
    fn test_silent_until_played() {
        let mut player = ModPlayer::from_module(tone_module()).unwrap();
        assert_eq!(player.state(), PlaybackState::Stopped);
        assert!(player.generate_samples(512).iter().all(|&s| s == 0.0));

        player.play().unwrap();
        assert!(player.generate_samples(512).iter().any(|&s| s != 0.0));
    }

    #[test]
    fn test_block_size_does_not_change_output() {
        let mut whole = ModPlayer::from_module(tone_module()).unwrap();
        whole.play().unwrap();
        let reference = whole.generate_samples(3000);

        let mut chunked = ModPlayer::from_module(tone_module()).unwrap();
        chunked.play().unwrap();
        let mut collected = Vec::new();
        for size in [100, 882, 1, 1017, 1000] {
            collected.extend(chunked.generate_samples(size));
        }
        assert_eq!(collected, reference);
    }

    #[test]
    fn test_pause_keeps_position_and_stop_rewinds() {
        let mut player = ModPlayer::from_module(tone_module()).unwrap();
        player.play().unwrap();
        player.generate_samples(882 * 6 * 3);
        let before = player.position();
        assert!(before.row >= 3);

        player.pause().unwrap();
        assert!(player.generate_samples(2000).iter().all(|&s| s == 0.0));
        assert_eq!(player.position(), before);

        player.stop().unwrap();
        assert_eq!(player.position(), SongPosition::default());
        assert_eq!(player.playback_position(), 0.0);
    }

    #[test]
    fn test_playback_position_fraction() {
        let mut player = ModPlayer::from_module(tone_module()).unwrap();
        player.play().unwrap();
        // one full pattern of a two-entry sequence
        player.generate_samples(882 * 6 * 64);
        assert!((player.playback_position() - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_loop_counter() {
        let mut player = ModPlayer::from_module(tone_module()).unwrap();
        player.play().unwrap();
        player.generate_samples(882 * 6 * 128 + 1);
        assert_eq!(player.loop_count(), 1);
        player.stop().unwrap();
        assert_eq!(player.loop_count(), 0);
    }

    #[test]
    fn test_channel_mute() {
        let mut player = ModPlayer::from_module(tone_module()).unwrap();
        player.set_channel_mute(0, true);
        assert!(player.is_channel_muted(0));
        player.play().unwrap();
        assert!(player.generate_samples(2000).iter().all(|&s| s == 0.0));
    }
}
