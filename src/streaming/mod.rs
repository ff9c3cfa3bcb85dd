//! Audio Sink Domain
//!
//! The sequencer pushes one mixed mono buffer per tick into an [`AudioSink`]
//! and throttles itself against the sink's backlog. Three sinks ship with
//! the crate:
//!
//! - [`CaptureSink`]: in-memory, used by tests and offline rendering
//! - [`RealtimePlayer`]: ring-buffer queue drained by a consumer thread
//! - `AudioDevice` (feature `streaming`): system audio output through rodio

pub mod capture;
pub mod realtime;
pub mod ring_buffer;

#[cfg(feature = "streaming")]
pub mod audio_device;

#[cfg(feature = "streaming")]
pub use audio_device::AudioDevice;
pub use capture::CaptureSink;
pub use realtime::{PlaybackStats, RealtimePlayer};
pub use ring_buffer::{RingBuffer, RingBufferError};

use crate::Result;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Buffer backoff time in microseconds
pub const BUFFER_BACKOFF_MICROS: u64 = 100;

/// PCM sample format accepted by a sink
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 32-bit float in [-1.0, 1.0]
    #[default]
    F32,
    /// 8-bit signed integer
    I8,
}

impl SampleFormat {
    /// Size of one mono sample in bytes
    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::F32 => 4,
            SampleFormat::I8 => 1,
        }
    }

    /// Convert a working-range sample to signed 8-bit (truncating)
    pub fn to_i8(sample: f32) -> i8 {
        (sample * 128.0).clamp(-128.0, 127.0) as i8
    }

    /// Reduce a working-range sample to the precision of this format
    pub fn quantize(self, sample: f32) -> f32 {
        match self {
            SampleFormat::F32 => sample,
            SampleFormat::I8 => f32::from(Self::to_i8(sample)) / 128.0,
        }
    }
}

/// Destination for mixed tick buffers
///
/// Implementations accept mono PCM in the working range [-1.0, 1.0] and
/// convert to their own [`SampleFormat`].
pub trait AudioSink {
    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Sample format the sink was opened with
    fn format(&self) -> SampleFormat;

    /// Queue one buffer for playback
    fn enqueue(&mut self, samples: &[f32]) -> Result<()>;

    /// Bytes queued but not yet played
    fn queued_bytes(&self) -> usize;

    /// Begin consuming queued audio (un-pause)
    fn start(&mut self) -> Result<()>;

    /// Block until the backlog is at or below `threshold_bytes`
    ///
    /// The default implementation polls [`queued_bytes`](Self::queued_bytes),
    /// sleeping [`BUFFER_BACKOFF_MICROS`] between polls.
    fn wait_until_below(&mut self, threshold_bytes: usize) -> Result<()> {
        while self.queued_bytes() > threshold_bytes {
            std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
        }
        Ok(())
    }
}

/// Configuration for streaming playback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    /// Size of the ring buffer (in samples)
    pub ring_buffer_size: usize,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Number of audio channels (the mixer produces mono)
    pub channels: u16,
}

impl StreamConfig {
    /// Small buffer: 4096 samples, about 93ms at 44.1kHz
    pub fn low_latency(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 4096,
            sample_rate,
            channels: 1,
        }
    }

    /// Large buffer: 16384 samples, about 372ms at 44.1kHz
    pub fn stable(sample_rate: u32) -> Self {
        StreamConfig {
            ring_buffer_size: 16384,
            sample_rate,
            channels: 1,
        }
    }

    /// Buffer large enough to hold `backlog_samples` plus one extra tick
    pub fn for_backlog(sample_rate: u32, backlog_samples: usize, tick_samples: usize) -> Self {
        StreamConfig {
            ring_buffer_size: (backlog_samples + tick_samples + 1).next_power_of_two(),
            sample_rate,
            channels: 1,
        }
    }

    /// Get latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        ((self.ring_buffer_size as f32) / (self.sample_rate as f32)) * 1000.0
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::stable(crate::constants::DEFAULT_SAMPLE_RATE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_config_latency() {
        let config = StreamConfig::low_latency(44100);
        let latency = config.latency_ms();
        assert!(latency > 90.0 && latency < 95.0);
    }

    #[test]
    fn test_backlog_config_fits_backlog_and_tick() {
        let config = StreamConfig::for_backlog(44100, 50 * 882, 882);
        assert!(config.ring_buffer_size > 51 * 882);
        assert!(config.ring_buffer_size.is_power_of_two());
    }

    #[test]
    fn test_sample_format_sizes() {
        assert_eq!(SampleFormat::F32.bytes_per_sample(), 4);
        assert_eq!(SampleFormat::I8.bytes_per_sample(), 1);
    }

    #[test]
    fn test_i8_conversion_saturates() {
        assert_eq!(SampleFormat::to_i8(1.0), 127);
        assert_eq!(SampleFormat::to_i8(-1.0), -128);
        assert_eq!(SampleFormat::to_i8(0.5), 64);
        assert_eq!(SampleFormat::to_i8(0.0), 0);
    }

    #[test]
    fn test_quantize_keeps_f32() {
        assert_eq!(SampleFormat::F32.quantize(0.123), 0.123);
        assert_eq!(SampleFormat::I8.quantize(0.5), 0.5);
    }
}
