//! Channel Synthesizer
//!
//! One [`ChannelState`] per output channel. On every row the sequencer hands
//! it a [`Note`]; on every tick it runs the active effect and renders one
//! tick of audio from the selected sample by linear interpolation.
//!
//! Channels keep sample *numbers*, never references: the [`Module`] is
//! passed in on each call and stays read-only for the whole session.

use super::effect_engine;
use super::oscillator::Oscillator;
use crate::constants::{MAX_VOLUME, PERIOD_MAX, PERIOD_MIN};
use crate::mod_parser::{Effect, Module, Note};

/// Runtime state of one channel
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub(crate) sample: Option<u8>,
    pub(crate) period: u16,
    pub(crate) position: f64,
    pub(crate) looping: bool,
    pub(crate) volume: u8,
    pub(crate) finetune: i8,
    pub(crate) porta_target: u16,
    pub(crate) porta_step: u8,
    pub(crate) vibrato: Oscillator,
    pub(crate) tremolo: Oscillator,
    pub(crate) effect: Effect,
    /// Vibrato offset for the current tick, in period units
    pub(crate) period_offset: f32,
    /// Tremolo offset for the current tick, in volume units
    pub(crate) volume_offset: f32,
}

impl Default for ChannelState {
    fn default() -> Self {
        Self::new()
    }
}

impl ChannelState {
    /// Silent channel with no sample selected
    pub fn new() -> Self {
        ChannelState {
            sample: None,
            period: 0,
            position: 0.0,
            looping: false,
            volume: 0,
            finetune: 0,
            porta_target: 0,
            porta_step: 0,
            vibrato: Oscillator::new(),
            tremolo: Oscillator::new(),
            effect: Effect::None,
            period_offset: 0.0,
            volume_offset: 0.0,
        }
    }

    /// Apply the note of a new row
    pub fn apply_note(&mut self, note: &Note, module: &Module) {
        let effect = note.effect();
        self.effect = effect;

        if note.sample != 0 {
            match module.sample(note.sample) {
                Some(header) => {
                    self.sample = Some(note.sample);
                    self.position = 0.0;
                    self.looping = false;
                    // Oscillator parameter rows leave volume and finetune alone
                    if !matches!(effect, Effect::Vibrato { .. } | Effect::Tremolo { .. }) {
                        self.volume = header.volume.min(MAX_VOLUME);
                        self.finetune = header.finetune;
                    }
                }
                None => tracing::warn!(sample = note.sample, "note references missing sample"),
            }
        }

        if note.period != 0 {
            if effect.is_tone_portamento() {
                self.porta_target = note.period;
                if note.param() != 0 {
                    self.porta_step = note.param();
                }
            } else {
                self.period = note.period;
                self.position = 0.0;
                self.looping = false;
                self.vibrato.note_on();
                self.tremolo.note_on();
            }
        }
    }

    /// Run one tick: effect, render into `out`, advance oscillators
    ///
    /// `out` is always fully written; it stays silent when no sample is
    /// playing or the pitch is zero.
    pub fn advance(
        &mut self,
        module: &Module,
        first_tick: bool,
        base_clock: f64,
        sample_rate: u32,
        out: &mut [f32],
    ) {
        self.period_offset = 0.0;
        self.volume_offset = 0.0;
        effect_engine::apply(self, first_tick);

        self.render(module, base_clock, sample_rate, out);

        self.vibrato.advance();
        self.tremolo.advance();
    }

    fn render(&mut self, module: &Module, base_clock: f64, sample_rate: u32, out: &mut [f32]) {
        out.fill(0.0);

        let Some(number) = self.sample else {
            return;
        };
        let (Some(header), Some(wave)) = (module.sample(number), module.waveform(number)) else {
            return;
        };
        if self.period == 0 || wave.is_empty() || sample_rate == 0 {
            return;
        }

        let period = (f64::from(self.period) + f64::from(self.period_offset)).max(1.0);
        let rate = base_clock / (period * 2.0 * finetune_factor(self.finetune));
        let ratio = rate / f64::from(sample_rate);

        let loop_range = header
            .loop_range_bytes()
            .filter(|range| range.start < wave.len())
            .map(|range| (range.start, range.end.min(wave.len())));
        let end = loop_range.map_or(wave.len(), |(_, loop_end)| loop_end);

        let gain = self.effective_volume() / f32::from(MAX_VOLUME) / 128.0;

        for slot in out.iter_mut() {
            if self.position >= end as f64 {
                match loop_range {
                    Some((start, loop_end)) => {
                        let length = (loop_end - start) as f64;
                        self.position = start as f64 + (self.position - loop_end as f64) % length;
                        self.looping = true;
                    }
                    None => break,
                }
            }

            let floor = self.position as usize;
            let frac = self.position - floor as f64;
            let mut ceil = if frac > 0.0 { floor + 1 } else { floor };
            if ceil >= end {
                match loop_range {
                    Some((start, _)) => ceil = start,
                    None => break,
                }
            }

            let a = f64::from(wave[floor]);
            let b = f64::from(wave[ceil]);
            *slot = ((a + (b - a) * frac) as f32) * gain;

            self.position += ratio;
        }
    }

    /// Volume after tremolo, 0..=64
    pub fn effective_volume(&self) -> f32 {
        (f32::from(self.volume) + self.volume_offset).clamp(0.0, f32::from(MAX_VOLUME))
    }

    /// Add to the period, saturating at the slide bounds
    pub(crate) fn slide_period(&mut self, delta: i32) {
        let period = (i32::from(self.period) + delta)
            .clamp(i32::from(PERIOD_MIN), i32::from(PERIOD_MAX));
        self.period = period as u16;
    }

    /// Add to the volume, saturating at 0 and 64
    pub(crate) fn slide_volume(&mut self, delta: i32) {
        self.volume = (i32::from(self.volume) + delta).clamp(0, i32::from(MAX_VOLUME)) as u8;
    }

    /// Selected sample number (1-based)
    pub fn sample(&self) -> Option<u8> {
        self.sample
    }

    /// Current period, without vibrato
    pub fn period(&self) -> u16 {
        self.period
    }

    /// Fractional playback position in bytes
    pub fn position(&self) -> f64 {
        self.position
    }

    /// True once playback has wrapped around the loop
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Current volume, without tremolo
    pub fn volume(&self) -> u8 {
        self.volume
    }

    /// Current finetune
    pub fn finetune(&self) -> i8 {
        self.finetune
    }

    /// Tone portamento target period
    pub fn porta_target(&self) -> u16 {
        self.porta_target
    }

    /// Tone portamento step per tick
    pub fn porta_step(&self) -> u8 {
        self.porta_step
    }

    /// Effect of the current row
    pub fn effect(&self) -> Effect {
        self.effect
    }

    /// Pitch oscillator
    pub fn vibrato(&self) -> &Oscillator {
        &self.vibrato
    }

    /// Volume oscillator
    pub fn tremolo(&self) -> &Oscillator {
        &self.tremolo
    }
}

/// Pitch factor for a finetune in eighths of a semitone
///
/// Positive finetune shrinks the factor, raising the playback rate.
pub fn finetune_factor(finetune: i8) -> f64 {
    2f64.powf(-f64::from(finetune) / (8.0 * 12.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NTSC_BASE_CLOCK;
    use crate::mod_parser::{Pattern, Sample};
    use approx::assert_relative_eq;

    const RATE: u32 = 44_100;

    fn module_with(sample: Sample, wave: Vec<i8>) -> Module {
        let mut samples = vec![Sample::default(); 31];
        let mut waveforms = vec![Vec::new(); 31];
        samples[0] = sample;
        waveforms[0] = wave;
        Module {
            name: "channel test".into(),
            samples,
            waveforms,
            patterns: vec![Pattern::empty()],
            sequence: vec![0],
        }
    }

    fn ramp_module(len: usize, loop_start_words: u16, loop_length_words: u16) -> Module {
        let wave: Vec<i8> = (0..len).map(|i| i as i8).collect();
        module_with(
            Sample {
                name: "ramp".into(),
                length_words: (len / 2) as u16,
                finetune: 0,
                volume: 64,
                loop_start_words,
                loop_length_words,
            },
            wave,
        )
    }

    fn note(sample: u8, period: u16, command: u16) -> Note {
        Note {
            sample,
            period,
            command,
        }
    }

    /// Clock giving a source rate of `ratio * RATE` at period 1
    fn clock_for_ratio(ratio: f64) -> f64 {
        2.0 * f64::from(RATE) * ratio
    }

    #[test]
    fn test_silent_without_sample_or_period() {
        let module = ramp_module(64, 0, 0);
        let mut channel = ChannelState::new();
        let mut out = vec![1.0; 32];
        channel.advance(&module, true, NTSC_BASE_CLOCK, RATE, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));

        channel.apply_note(&note(1, 0, 0), &module);
        out.fill(1.0);
        channel.advance(&module, true, NTSC_BASE_CLOCK, RATE, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_note_resets_sample_state() {
        let mut module = ramp_module(64, 0, 0);
        module.samples[0].volume = 40;
        module.samples[0].finetune = -3;
        let mut channel = ChannelState::new();
        channel.apply_note(&note(1, 428, 0), &module);
        assert_eq!(channel.sample(), Some(1));
        assert_eq!(channel.volume(), 40);
        assert_eq!(channel.finetune(), -3);
        assert_eq!(channel.period(), 428);
        assert_eq!(channel.position(), 0.0);
    }

    #[test]
    fn test_vibrato_row_keeps_volume() {
        let mut module = ramp_module(64, 0, 0);
        module.samples[0].volume = 40;
        let mut channel = ChannelState::new();
        channel.apply_note(&note(1, 428, 0), &module);
        assert_eq!(channel.volume(), 40);
        channel.volume = 16;
        channel.apply_note(&note(1, 0, 0x484), &module);
        assert_eq!(channel.volume(), 16);
        channel.apply_note(&note(1, 0, 0), &module);
        assert_eq!(channel.volume(), 40);
    }

    #[test]
    fn test_tone_portamento_records_target() {
        let module = ramp_module(64, 0, 0);
        let mut channel = ChannelState::new();
        channel.apply_note(&note(1, 428, 0), &module);
        channel.apply_note(&note(0, 214, 0x308), &module);
        assert_eq!(channel.period(), 428);
        assert_eq!(channel.porta_target(), 214);
        assert_eq!(channel.porta_step(), 8);

        channel.apply_note(&note(0, 300, 0x300), &module);
        assert_eq!(channel.porta_target(), 300);
        assert_eq!(channel.porta_step(), 8);
    }

    #[test]
    fn test_slide_with_tone_portamento_sets_step() {
        let module = ramp_module(64, 0, 0);
        let mut channel = ChannelState::new();
        channel.apply_note(&note(1, 428, 0), &module);
        channel.apply_note(&note(0, 214, 0x504), &module);
        assert_eq!(channel.period(), 428);
        assert_eq!(channel.porta_target(), 214);
        assert_eq!(channel.porta_step(), 4);

        let mut out = vec![0.0; 16];
        for tick in 0..6 {
            channel.advance(&module, tick == 0, NTSC_BASE_CLOCK, RATE, &mut out);
        }
        assert_eq!(channel.period(), 428 - 5 * 4);

        channel.apply_note(&note(0, 300, 0x500), &module);
        assert_eq!(channel.porta_target(), 300);
        assert_eq!(channel.porta_step(), 4);
    }

    #[test]
    fn test_unity_rate_reproduces_waveform() {
        let module = ramp_module(64, 0, 0);
        let mut channel = ChannelState::new();
        channel.sample = Some(1);
        channel.volume = 64;
        channel.period = 1;

        let mut out = vec![0.0; 16];
        channel.render(&module, clock_for_ratio(1.0), RATE, &mut out);
        for (i, &s) in out.iter().enumerate() {
            assert_relative_eq!(s, i as f32 / 128.0);
        }
    }

    #[test]
    fn test_rendering_is_deterministic() {
        let module = ramp_module(256, 0, 0);
        let render = || {
            let mut channel = ChannelState::new();
            channel.apply_note(&note(1, 300, 0), &module);
            let mut out = vec![0.0; 882];
            channel.advance(&module, true, NTSC_BASE_CLOCK, RATE, &mut out);
            out
        };
        assert_eq!(render(), render());
    }

    #[test]
    fn test_one_shot_sample_stops() {
        let module = ramp_module(8, 0, 0);
        let mut channel = ChannelState::new();
        channel.sample = Some(1);
        channel.volume = 64;
        channel.period = 1;
        let mut out = vec![1.0; 16];
        channel.render(&module, clock_for_ratio(1.0), RATE, &mut out);
        // Ratio 1: bytes 0..8 then silence
        assert_relative_eq!(out[7], 7.0 / 128.0);
        assert!(out[8..].iter().all(|&s| s == 0.0));

        out.fill(1.0);
        channel.render(&module, clock_for_ratio(1.0), RATE, &mut out);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_loop_wraps_inside_region() {
        // loop bytes [20, 30)
        let module = ramp_module(40, 10, 5);
        let mut channel = ChannelState::new();
        channel.sample = Some(1);
        channel.volume = 64;
        channel.period = 1;
        let mut out = vec![0.0; 100];
        channel.render(&module, clock_for_ratio(1.0), RATE, &mut out);

        assert!(channel.is_looping());
        assert_relative_eq!(out[29], 29.0 / 128.0);
        assert_relative_eq!(out[30], 20.0 / 128.0);
        for &s in &out {
            assert!(s < 30.0 / 128.0);
        }
    }

    #[test]
    fn test_loop_wrap_keeps_fraction() {
        let module = ramp_module(40, 10, 5);
        let mut channel = ChannelState::new();
        channel.sample = Some(1);
        channel.volume = 64;
        channel.period = 1;
        channel.position = 29.5;
        let mut out = vec![0.0; 2];
        // Ratio 1.5
        channel.render(&module, clock_for_ratio(1.5), RATE, &mut out);
        // Slot 0 interpolates between byte 29 and the loop start
        assert_relative_eq!(out[0], 24.5 / 128.0);
        // 31.0 wraps to 21.0
        assert_relative_eq!(out[1], 21.0 / 128.0);
    }

    #[test]
    fn test_volume_scales_output() {
        let module = ramp_module(16, 0, 0);
        let mut channel = ChannelState::new();
        channel.sample = Some(1);
        channel.volume = 32;
        channel.period = 1;
        let mut out = vec![0.0; 4];
        channel.render(&module, clock_for_ratio(1.0), RATE, &mut out);
        assert_relative_eq!(out[2], 2.0 / 128.0 * 0.5);
    }

    #[test]
    fn test_finetune_factor_direction() {
        assert_relative_eq!(finetune_factor(0), 1.0);
        assert!(finetune_factor(7) < 1.0);
        assert!(finetune_factor(-8) > 1.0);
        assert_relative_eq!(finetune_factor(-96), 2.0);
    }

    #[test]
    fn test_missing_sample_number_is_ignored() {
        let module = ramp_module(16, 0, 0);
        let mut channel = ChannelState::new();
        channel.apply_note(&note(1, 428, 0), &module);
        channel.apply_note(&note(40, 0, 0), &module);
        assert_eq!(channel.sample(), Some(1));
    }

    #[test]
    fn test_saturating_slides() {
        let mut channel = ChannelState::new();
        channel.period = 120;
        channel.slide_period(-50);
        assert_eq!(channel.period(), PERIOD_MIN);
        channel.slide_period(5000);
        assert_eq!(channel.period(), PERIOD_MAX);
        channel.volume = 60;
        channel.slide_volume(10);
        assert_eq!(channel.volume(), 64);
        channel.slide_volume(-100);
        assert_eq!(channel.volume(), 0);
    }
}
