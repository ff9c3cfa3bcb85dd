//! In-memory sink
//!
//! Records every enqueued buffer. Nothing drains it on its own: the queued
//! byte count only drops through [`CaptureSink::drain`] or when the
//! sequencer waits on the backlog, which simulates the device catching up.

use super::{AudioSink, SampleFormat};
use crate::{ReplayerError, Result};

/// Sink that keeps all produced audio in memory
#[derive(Debug, Clone)]
pub struct CaptureSink {
    sample_rate: u32,
    format: SampleFormat,
    samples: Vec<f32>,
    buffer_lengths: Vec<usize>,
    pending: usize,
    started: bool,
    wait_calls: usize,
    fail_after: Option<usize>,
}

impl CaptureSink {
    /// Create an empty capture sink
    pub fn new(sample_rate: u32, format: SampleFormat) -> Self {
        CaptureSink {
            sample_rate,
            format,
            samples: Vec::new(),
            buffer_lengths: Vec::new(),
            pending: 0,
            started: false,
            wait_calls: 0,
            fail_after: None,
        }
    }

    /// Sink whose enqueue fails once `buffers` buffers have been accepted
    pub fn failing_after(sample_rate: u32, buffers: usize) -> Self {
        CaptureSink {
            fail_after: Some(buffers),
            ..Self::new(sample_rate, SampleFormat::F32)
        }
    }

    /// Every sample enqueued so far, at the sink's format precision
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Captured audio as signed 8-bit PCM
    pub fn samples_i8(&self) -> Vec<i8> {
        self.samples.iter().map(|&s| SampleFormat::to_i8(s)).collect()
    }

    /// Length of every enqueued buffer, in order
    pub fn buffer_lengths(&self) -> &[usize] {
        &self.buffer_lengths
    }

    /// Number of enqueued buffers
    pub fn buffer_count(&self) -> usize {
        self.buffer_lengths.len()
    }

    /// Captured duration in seconds
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Pretend the device consumed up to `samples` queued samples
    pub fn drain(&mut self, samples: usize) {
        self.pending = self.pending.saturating_sub(samples);
    }

    /// True once [`AudioSink::start`] was called
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// How often the producer had to wait on the backlog
    pub fn wait_calls(&self) -> usize {
        self.wait_calls
    }
}

impl AudioSink for CaptureSink {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn format(&self) -> SampleFormat {
        self.format
    }

    fn enqueue(&mut self, samples: &[f32]) -> Result<()> {
        if self.fail_after == Some(self.buffer_lengths.len()) {
            return Err(ReplayerError::AudioDeviceError(
                "capture sink closed".into(),
            ));
        }
        let format = self.format;
        self.samples
            .extend(samples.iter().map(|&s| format.quantize(s)));
        self.buffer_lengths.push(samples.len());
        self.pending += samples.len();
        Ok(())
    }

    fn queued_bytes(&self) -> usize {
        self.pending * self.format.bytes_per_sample()
    }

    fn start(&mut self) -> Result<()> {
        self.started = true;
        Ok(())
    }

    fn wait_until_below(&mut self, threshold_bytes: usize) -> Result<()> {
        if self.queued_bytes() > threshold_bytes {
            self.wait_calls += 1;
            self.pending = threshold_bytes / self.format.bytes_per_sample();
        }
        Ok(())
    }
}
