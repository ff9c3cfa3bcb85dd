//! Vibrato / tremolo oscillator
//!
//! Each channel carries two of these. The value at a given tick is
//! `depth * f(phase)` where `phase = (ticks * speed mod 64) / 64` and `f`
//! is one of four unit waveforms in [-1, 1].

use crate::constants::OSCILLATOR_PERIOD;
use bitflags::bitflags;
use std::f32::consts::TAU;

bitflags! {
    /// Control nibble of the E4x / E7x commands
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OscillatorControl: u8 {
        /// Waveform selector (bits 0-1)
        const WAVEFORM = 0b0011;
        /// Keep the phase when a new note starts
        const NO_RETRIGGER = 0b0100;
    }
}

/// Oscillator waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Waveform {
    /// Sine
    #[default]
    Sine,
    /// Falling ramp
    Sawtooth,
    /// Square
    Square,
    /// Pseudo-random, refreshed every tick
    Random,
}

impl Waveform {
    /// Waveform for the two selector bits
    pub fn from_selector(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Waveform::Sine,
            1 => Waveform::Sawtooth,
            2 => Waveform::Square,
            _ => Waveform::Random,
        }
    }
}

const RANDOM_SEED: u32 = 0x00AB_CDEF;

/// Per-channel pitch or volume oscillator
#[derive(Debug, Clone, PartialEq)]
pub struct Oscillator {
    waveform: Waveform,
    retrigger: bool,
    speed: u8,
    depth: u8,
    ticks: u32,
    seed: u32,
    random: f32,
}

impl Default for Oscillator {
    fn default() -> Self {
        Self::new()
    }
}

impl Oscillator {
    /// Sine oscillator with zero speed and depth
    pub fn new() -> Self {
        Oscillator {
            waveform: Waveform::Sine,
            retrigger: true,
            speed: 0,
            depth: 0,
            ticks: 0,
            seed: RANDOM_SEED,
            random: 0.0,
        }
    }

    /// Update speed and depth; zero values keep the previous setting
    pub fn set_params(&mut self, speed: u8, depth: u8) {
        if speed != 0 {
            self.speed = speed;
        }
        if depth != 0 {
            self.depth = depth;
        }
    }

    /// Apply an E4x / E7x control nibble
    pub fn set_control(&mut self, control: u8) {
        let control = OscillatorControl::from_bits_truncate(control);
        self.waveform = Waveform::from_selector((control & OscillatorControl::WAVEFORM).bits());
        self.retrigger = !control.contains(OscillatorControl::NO_RETRIGGER);
    }

    /// Restart the phase for a new note unless retriggering is suppressed
    pub fn note_on(&mut self) {
        if self.retrigger {
            self.ticks = 0;
        }
    }

    /// Move to the next tick
    pub fn advance(&mut self) {
        self.ticks = self.ticks.wrapping_add(1);
        if self.waveform == Waveform::Random {
            self.seed = self.seed.wrapping_mul(65).wrapping_add(17) & 0x1FFF_FFFF;
            self.random = ((self.seed >> 20) as i32 - 256) as f32 / 256.0;
        }
    }

    /// Current output: `depth * f(phase)`
    pub fn value(&self) -> f32 {
        let step = self.ticks.wrapping_mul(u32::from(self.speed)) % OSCILLATOR_PERIOD;
        let phase = step as f32 / OSCILLATOR_PERIOD as f32;
        let unit = match self.waveform {
            Waveform::Sine => (TAU * phase).sin(),
            Waveform::Sawtooth => 1.0 - 2.0 * (phase + 0.5).fract(),
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Random => self.random,
        };
        f32::from(self.depth) * unit
    }

    /// Selected waveform
    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    /// Whether a new note restarts the phase
    pub fn retriggers(&self) -> bool {
        self.retrigger
    }

    /// Ticks since the last restart
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Phase steps per tick
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Amplitude
    pub fn depth(&self) -> u8 {
        self.depth
    }
}
