//! Audio device integration using rodio
//!
//! Opens the default output device paused and feeds it from the ring buffer
//! of a [`RealtimePlayer`]. [`AudioSink::start`] un-pauses the device.

use super::{AudioSink, RealtimePlayer, RingBuffer, SampleFormat, StreamConfig};
use crate::{ReplayerError, Result};
use rodio::{OutputStream, Sink, Source};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

const SOURCE_CHUNK: usize = 1024;

/// rodio source reading from the shared ring buffer
struct RingBufferSource {
    ring_buffer: Arc<RingBuffer>,
    sample_rate: u32,
    channels: u16,
    finished: Arc<AtomicBool>,
    chunk: Vec<f32>,
    chunk_pos: usize,
}

impl RingBufferSource {
    fn new(
        ring_buffer: Arc<RingBuffer>,
        sample_rate: u32,
        channels: u16,
        finished: Arc<AtomicBool>,
    ) -> Self {
        RingBufferSource {
            ring_buffer,
            sample_rate,
            channels,
            finished,
            chunk: vec![0.0; SOURCE_CHUNK],
            chunk_pos: SOURCE_CHUNK,
        }
    }
}

impl Source for RingBufferSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(SOURCE_CHUNK)
    }

    fn channels(&self) -> u16 {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn total_duration(&self) -> Option<Duration> {
        None
    }
}

impl Iterator for RingBufferSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.finished.load(Ordering::Relaxed) {
            return None;
        }

        if self.chunk_pos >= self.chunk.len() {
            let read = self.ring_buffer.read(&mut self.chunk);
            // Underrun plays silence to keep the stream alive
            self.chunk[read..].fill(0.0);
            self.chunk_pos = 0;
        }

        let sample = self.chunk[self.chunk_pos];
        self.chunk_pos += 1;
        Some(sample)
    }
}

/// System audio output implementing [`AudioSink`]
pub struct AudioDevice {
    stream: RealtimePlayer,
    _output: OutputStream,
    sink: Sink,
    finished: Arc<AtomicBool>,
}

impl AudioDevice {
    /// Open the default output device, paused, with a fresh ring buffer
    pub fn open(config: StreamConfig, format: SampleFormat) -> Result<Self> {
        let stream = RealtimePlayer::new(config, format)?;

        let (output, handle) = OutputStream::try_default().map_err(|e| {
            ReplayerError::AudioDeviceError(format!("Failed to create audio stream: {e}"))
        })?;
        let sink = Sink::try_new(&handle).map_err(|e| {
            ReplayerError::AudioDeviceError(format!("Failed to create audio sink: {e}"))
        })?;
        sink.pause();

        let finished = Arc::new(AtomicBool::new(false));
        sink.append(RingBufferSource::new(
            stream.get_buffer(),
            config.sample_rate,
            config.channels,
            Arc::clone(&finished),
        ));

        tracing::info!(
            sample_rate = config.sample_rate,
            latency_ms = config.latency_ms(),
            "audio device opened"
        );

        Ok(AudioDevice {
            stream,
            _output: output,
            sink,
            finished,
        })
    }

    /// Pause playback
    pub fn pause(&self) {
        self.sink.pause();
    }

    /// Resume playback
    pub fn play(&self) {
        self.sink.play();
    }

    /// Signal that no more samples will be produced
    pub fn finish(&self) {
        self.finished.store(true, Ordering::Relaxed);
    }

    /// Producer-side stream statistics
    pub fn stream(&self) -> &RealtimePlayer {
        &self.stream
    }
}

impl AudioSink for AudioDevice {
    fn sample_rate(&self) -> u32 {
        self.stream.sample_rate()
    }

    fn format(&self) -> SampleFormat {
        self.stream.format()
    }

    fn enqueue(&mut self, samples: &[f32]) -> Result<()> {
        self.stream.enqueue(samples)
    }

    fn queued_bytes(&self) -> usize {
        self.stream.queued_bytes()
    }

    fn start(&mut self) -> Result<()> {
        self.stream.start()?;
        self.sink.play();
        Ok(())
    }
}

impl Drop for AudioDevice {
    fn drop(&mut self) {
        self.finish();
        self.sink.pause();
    }
}
