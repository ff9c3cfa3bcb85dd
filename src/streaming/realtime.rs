//! Ring-buffer backed sink
//!
//! The producer side of a real-time stream. A consumer (the rodio source in
//! `AudioDevice`, or any thread holding [`RealtimePlayer::get_buffer`])
//! drains the shared [`RingBuffer`].

use super::{AudioSink, RingBuffer, SampleFormat, StreamConfig, BUFFER_BACKOFF_MICROS};
use crate::{ReplayerError, Result};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Playback statistics for monitoring overruns and buffer health
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PlaybackStats {
    /// Number of times a write found the buffer full
    pub overrun_count: usize,
    /// Number of samples handed to the buffer
    pub samples_written: usize,
    /// Buffer fill after the last write
    pub fill_percentage: f32,
}

/// Real-time sample queue implementing [`AudioSink`]
pub struct RealtimePlayer {
    buffer: Arc<RingBuffer>,
    config: StreamConfig,
    format: SampleFormat,
    stats: Arc<Mutex<PlaybackStats>>,
    started: Arc<AtomicBool>,
    scratch: Vec<f32>,
}

impl RealtimePlayer {
    /// Backoff rounds before a full buffer is reported as a stalled consumer
    /// (about one second at the default backoff)
    const MAX_RETRIES: u32 = 10_000;

    /// Create a stream with a ring buffer sized by `config`
    pub fn new(config: StreamConfig, format: SampleFormat) -> Result<Self> {
        if config.sample_rate == 0 {
            return Err(ReplayerError::ConfigError(
                "stream sample rate must be greater than 0".into(),
            ));
        }
        let buffer = Arc::new(RingBuffer::new(config.ring_buffer_size)?);

        Ok(RealtimePlayer {
            buffer,
            config,
            format,
            stats: Arc::new(Mutex::new(PlaybackStats::default())),
            started: Arc::new(AtomicBool::new(false)),
            scratch: Vec::new(),
        })
    }

    /// Write all samples, backing off while the buffer is full
    ///
    /// Returns the number of samples written, which is short only when the
    /// consumer stopped draining for longer than the retry budget.
    pub fn write_blocking(&self, samples: &[f32]) -> usize {
        let mut total_written = 0;
        let mut remaining = samples;
        let mut retries = 0;

        while !remaining.is_empty() && retries < Self::MAX_RETRIES {
            let written = self.buffer.write(remaining);
            self.record_write(written, written < remaining.len());
            total_written += written;

            if written == 0 {
                std::thread::sleep(Duration::from_micros(BUFFER_BACKOFF_MICROS));
                retries += 1;
            } else {
                remaining = &remaining[written..];
                retries = 0;
            }
        }

        total_written
    }

    /// Write what fits without blocking
    pub fn write_nonblocking(&self, samples: &[f32]) -> usize {
        let written = self.buffer.write(samples);
        self.record_write(written, written < samples.len());
        written
    }

    fn record_write(&self, written: usize, overrun: bool) {
        let mut stats = self.stats.lock();
        if overrun {
            stats.overrun_count += 1;
        }
        stats.samples_written += written;
        stats.fill_percentage = self.buffer.fill_percentage();
    }

    /// Get current playback statistics
    pub fn get_stats(&self) -> PlaybackStats {
        *self.stats.lock()
    }

    /// Discard all pending samples
    pub fn flush(&self) {
        self.buffer.clear();
    }

    /// True once [`AudioSink::start`] has been called
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Get buffer latency in milliseconds
    pub fn latency_ms(&self) -> f32 {
        self.config.latency_ms()
    }

    /// Get the stream configuration
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Shared ring buffer for the consumer side
    pub fn get_buffer(&self) -> Arc<RingBuffer> {
        Arc::clone(&self.buffer)
    }
}

impl AudioSink for RealtimePlayer {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate
    }

    fn format(&self) -> SampleFormat {
        self.format
    }

    fn enqueue(&mut self, samples: &[f32]) -> Result<()> {
        let written = match self.format {
            SampleFormat::F32 => self.write_blocking(samples),
            SampleFormat::I8 => {
                let mut scratch = std::mem::take(&mut self.scratch);
                scratch.clear();
                scratch.extend(samples.iter().map(|&s| SampleFormat::I8.quantize(s)));
                let written = self.write_blocking(&scratch);
                self.scratch = scratch;
                written
            }
        };

        if written < samples.len() {
            return Err(ReplayerError::AudioDeviceError(format!(
                "audio consumer stalled: queued {written} of {} samples",
                samples.len()
            )));
        }
        Ok(())
    }

    fn queued_bytes(&self) -> usize {
        self.buffer.available_read() * self.format.bytes_per_sample()
    }

    fn start(&mut self) -> Result<()> {
        self.started.store(true, Ordering::Release);
        Ok(())
    }
}

impl Drop for RealtimePlayer {
    fn drop(&mut self) {
        let stats = self.stats.lock();
        tracing::debug!(
            samples = stats.samples_written,
            overruns = stats.overrun_count,
            "realtime stream closed"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_stream(format: SampleFormat) -> RealtimePlayer {
        let config = StreamConfig {
            ring_buffer_size: 64,
            sample_rate: 44_100,
            channels: 1,
        };
        RealtimePlayer::new(config, format).unwrap()
    }

    #[test]
    fn test_enqueue_and_queued_bytes() {
        let mut stream = small_stream(SampleFormat::F32);
        stream.enqueue(&[0.25; 10]).unwrap();
        assert_eq!(stream.queued_bytes(), 40);
        assert_eq!(stream.get_stats().samples_written, 10);
    }

    #[test]
    fn test_i8_stream_quantizes() {
        let mut stream = small_stream(SampleFormat::I8);
        stream.enqueue(&[0.3]).unwrap();
        assert_eq!(stream.queued_bytes(), 1);
        let mut out = [0.0];
        stream.get_buffer().read(&mut out);
        assert_eq!(out[0], f32::from(SampleFormat::to_i8(0.3)) / 128.0);
    }

    #[test]
    fn test_nonblocking_overrun_counted() {
        let stream = small_stream(SampleFormat::F32);
        assert_eq!(stream.write_nonblocking(&[0.0; 100]), 63);
        assert_eq!(stream.get_stats().overrun_count, 1);
        stream.flush();
        assert_eq!(stream.queued_bytes(), 0);
    }

    #[test]
    fn test_blocking_write_with_consumer_thread() {
        let mut stream = small_stream(SampleFormat::F32);
        let buffer = stream.get_buffer();
        let consumer = std::thread::spawn(move || {
            let mut total = 0;
            let mut chunk = [0.0; 16];
            while total < 1000 {
                total += buffer.read(&mut chunk);
                std::thread::yield_now();
            }
            total
        });

        stream.enqueue(&[0.5; 1000]).unwrap();
        assert_eq!(consumer.join().unwrap(), 1000);
    }

    #[test]
    fn test_start_sets_flag() {
        let mut stream = small_stream(SampleFormat::F32);
        assert!(!stream.is_started());
        stream.start().unwrap();
        assert!(stream.is_started());
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let config = StreamConfig::low_latency(0);
        assert!(RealtimePlayer::new(config, SampleFormat::F32).is_err());
    }
}
