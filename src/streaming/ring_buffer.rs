//! Single-producer, single-consumer sample queue
//!
//! The sequencer thread writes mixed tick buffers; the audio callback reads
//! them. Storage is fixed at `capacity * size_of::<f32>()` bytes. Positions
//! are free-running counters masked into the power-of-two storage.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Error type for ring buffer operations
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RingBufferError {
    /// Zero-sized buffer requested
    #[error("Ring buffer capacity must be greater than 0")]
    ZeroCapacity,

    /// Allocation above the safety limit
    #[error("Ring buffer capacity {requested} exceeds maximum safe size {max}")]
    TooLarge {
        /// Rounded capacity that was requested
        requested: usize,
        /// Largest accepted capacity
        max: usize,
    },
}

impl From<RingBufferError> for crate::ReplayerError {
    fn from(err: RingBufferError) -> Self {
        crate::ReplayerError::AudioDeviceError(err.to_string())
    }
}

/// Ring buffer for streaming audio samples
#[derive(Debug)]
pub struct RingBuffer {
    storage: Mutex<Vec<f32>>,
    written: AtomicUsize,
    read: AtomicUsize,
    capacity: usize,
    mask: usize,
}

impl RingBuffer {
    /// 256 MB worth of f32 samples
    const MAX_CAPACITY: usize = 256 * 1024 * 1024 / std::mem::size_of::<f32>();

    /// Create a ring buffer; capacity is rounded up to a power of two
    pub fn new(requested_capacity: usize) -> Result<Self, RingBufferError> {
        if requested_capacity == 0 {
            return Err(RingBufferError::ZeroCapacity);
        }
        let capacity = requested_capacity.next_power_of_two();
        if capacity > Self::MAX_CAPACITY {
            return Err(RingBufferError::TooLarge {
                requested: capacity,
                max: Self::MAX_CAPACITY,
            });
        }

        Ok(RingBuffer {
            storage: Mutex::new(vec![0.0; capacity]),
            written: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
            capacity,
            mask: capacity - 1,
        })
    }

    /// Storage size in samples
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Samples waiting to be read
    pub fn available_read(&self) -> usize {
        let written = self.written.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        written.wrapping_sub(read)
    }

    /// Free slots; one slot stays unused so full and empty are distinguishable
    pub fn available_write(&self) -> usize {
        self.capacity - 1 - self.available_read()
    }

    /// Copy as many samples as fit; returns the number written
    pub fn write(&self, samples: &[f32]) -> usize {
        let mut storage = self.storage.lock();

        let start = self.written.load(Ordering::Acquire);
        let count = samples.len().min(self.available_write());
        if count == 0 {
            return 0;
        }

        let index = start & self.mask;
        let head = count.min(self.capacity - index);
        storage[index..index + head].copy_from_slice(&samples[..head]);
        storage[..count - head].copy_from_slice(&samples[head..count]);
        drop(storage);

        self.written
            .store(start.wrapping_add(count), Ordering::Release);
        count
    }

    /// Copy queued samples into `dest`; returns the number read
    pub fn read(&self, dest: &mut [f32]) -> usize {
        let storage = self.storage.lock();

        let start = self.read.load(Ordering::Acquire);
        let count = dest.len().min(self.available_read());
        if count == 0 {
            return 0;
        }

        let index = start & self.mask;
        let head = count.min(self.capacity - index);
        dest[..head].copy_from_slice(&storage[index..index + head]);
        dest[head..count].copy_from_slice(&storage[..count - head]);
        drop(storage);

        self.read.store(start.wrapping_add(count), Ordering::Release);
        count
    }

    /// Discard everything queued
    pub fn clear(&self) {
        let _storage = self.storage.lock();
        let written = self.written.load(Ordering::Acquire);
        self.read.store(written, Ordering::Release);
    }

    /// True when nothing is queued
    pub fn is_empty(&self) -> bool {
        self.available_read() == 0
    }

    /// Fraction of the storage in use (0.0 to 1.0)
    pub fn fill_percentage(&self) -> f32 {
        (self.available_read() as f32) / (self.capacity as f32)
    }
}
