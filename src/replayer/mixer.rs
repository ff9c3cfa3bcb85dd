//! Output Mixer
//!
//! Sums the four channel tick buffers into one mono buffer. Channels can be
//! muted through a [`ChannelMask`]; muted channels keep running and are only
//! left out of the sum.

use crate::constants::CHANNEL_COUNT;
use bitflags::bitflags;

bitflags! {
    /// Set of muted channels
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ChannelMask: u8 {
        /// Channel 1
        const CH_1 = 0x01;
        /// Channel 2
        const CH_2 = 0x02;
        /// Channel 3
        const CH_3 = 0x04;
        /// Channel 4
        const CH_4 = 0x08;
    }
}

impl ChannelMask {
    /// Flag for a zero-based channel index, `None` past channel 4
    pub fn channel(index: usize) -> Option<Self> {
        if index < CHANNEL_COUNT {
            Self::from_bits(1 << index)
        } else {
            None
        }
    }
}

/// Mono mixer with per-channel mute and output gain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Mixer {
    muted: ChannelMask,
    gain: f32,
}

impl Default for Mixer {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Mixer {
    /// Mixer with all channels audible
    pub fn new(gain: f32) -> Self {
        Mixer {
            muted: ChannelMask::empty(),
            gain,
        }
    }

    /// Mute or unmute a channel (0-3); out-of-range indices are ignored
    pub fn set_channel_mute(&mut self, channel: usize, mute: bool) {
        if let Some(flag) = ChannelMask::channel(channel) {
            self.muted.set(flag, mute);
        }
    }

    /// Check if a channel is muted
    pub fn is_channel_muted(&self, channel: usize) -> bool {
        ChannelMask::channel(channel).is_some_and(|flag| self.muted.contains(flag))
    }

    /// Currently muted channels
    pub fn muted(&self) -> ChannelMask {
        self.muted
    }

    /// Output gain
    pub fn gain(&self) -> f32 {
        self.gain
    }

    /// Sum unmuted channels into `out`, apply gain and clamp to [-1, 1]
    pub fn mix(&self, channels: &[Vec<f32>; CHANNEL_COUNT], out: &mut [f32]) {
        out.fill(0.0);
        for (index, buffer) in channels.iter().enumerate() {
            if self.is_channel_muted(index) {
                continue;
            }
            for (acc, &sample) in out.iter_mut().zip(buffer) {
                *acc += sample;
            }
        }
        for sample in out.iter_mut() {
            *sample = (*sample * self.gain).clamp(-1.0, 1.0);
        }
    }
}
