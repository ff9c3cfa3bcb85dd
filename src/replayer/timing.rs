//! Tick timing
//!
//! A tick is the smallest unit of playback time. Its length in output
//! samples depends on the output rate and the current BPM; `speed` ticks
//! make up one row.

use crate::constants::{samples_per_tick, DEFAULT_SAMPLE_RATE, DEFAULT_TEMPO, MIN_TEMPO};

/// Output rate and tempo
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingConfig {
    /// Audio sample rate in Hz
    pub sample_rate: u32,
    /// Beats per minute (125 gives 50 ticks per second)
    pub tempo: u8,
}

impl TimingConfig {
    /// Timing for the given output rate at the given tempo
    pub fn new(sample_rate: u32, tempo: u8) -> Self {
        TimingConfig {
            sample_rate,
            tempo: tempo.max(MIN_TEMPO),
        }
    }

    /// Samples per tick (882 at 44.1kHz and 125 BPM)
    pub fn samples_per_tick(&self) -> usize {
        samples_per_tick(self.sample_rate, self.tempo)
    }

    /// Tick rate in Hz
    pub fn ticks_per_second(&self) -> f32 {
        f32::from(self.tempo) * 2.0 / 5.0
    }

    /// Duration of one tick in seconds
    pub fn tick_seconds(&self) -> f64 {
        self.samples_per_tick() as f64 / f64::from(self.sample_rate)
    }

    /// Same output rate, different tempo
    pub fn with_tempo(self, tempo: u8) -> Self {
        Self::new(self.sample_rate, tempo)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SAMPLE_RATE, DEFAULT_TEMPO)
    }
}
