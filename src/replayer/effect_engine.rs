//! Effect Engine
//!
//! Per-tick effect processing for one channel. [`apply`] is a single
//! exhaustive match over [`Effect`]; the helpers below it are the individual
//! effects and can be exercised on a bare [`ChannelState`].
//!
//! Position jump, pattern break and set tempo act on the sequencer and are
//! no-ops at channel level.

use super::channel::ChannelState;
use crate::constants::MAX_VOLUME;
use crate::mod_parser::{Effect, ExtendedEffect, VolumeSlide};

/// Vibrato scale: period units per oscillator unit (negative: pitch rises first)
const VIBRATO_SCALE: f32 = -2.0;

/// Tremolo scale: volume units per oscillator unit
const TREMOLO_SCALE: f32 = -4.0;

/// Run the channel's current effect for one tick
pub fn apply(channel: &mut ChannelState, first_tick: bool) {
    match channel.effect {
        Effect::None | Effect::Arpeggio { .. } => {}
        Effect::PortamentoUp { step } => {
            if !first_tick {
                portamento(channel, -i32::from(step));
            }
        }
        Effect::PortamentoDown { step } => {
            if !first_tick {
                portamento(channel, i32::from(step));
            }
        }
        Effect::TonePortamento { .. } => {
            if !first_tick {
                tone_portamento(channel);
            }
        }
        Effect::Vibrato { speed, depth } => {
            if first_tick {
                channel.vibrato.set_params(speed, depth);
            }
            vibrato(channel);
        }
        Effect::TonePortamentoVolumeSlide { slide } => {
            if !first_tick {
                tone_portamento(channel);
                volume_slide(channel, slide);
            }
        }
        Effect::VibratoVolumeSlide { slide } => {
            if !first_tick {
                vibrato(channel);
                volume_slide(channel, slide);
            }
        }
        Effect::Tremolo { speed, depth } => {
            if first_tick {
                channel.tremolo.set_params(speed, depth);
            }
            tremolo(channel);
        }
        Effect::SetOffset { offset } => {
            if first_tick {
                set_offset(channel, offset);
            }
        }
        Effect::VolumeSlide { slide } => {
            if !first_tick {
                volume_slide(channel, slide);
            }
        }
        Effect::SetVolume { volume } => set_volume(channel, volume),
        Effect::Extended(extended) => apply_extended(channel, extended, first_tick),
        Effect::PositionJump { .. }
        | Effect::PatternBreak { .. }
        | Effect::SetTempo { .. }
        | Effect::Unsupported { .. } => {}
    }
}

fn apply_extended(channel: &mut ChannelState, effect: ExtendedEffect, first_tick: bool) {
    match effect {
        ExtendedEffect::FinePortamentoUp { step } => {
            if first_tick {
                portamento(channel, -i32::from(step));
            }
        }
        ExtendedEffect::FinePortamentoDown { step } => {
            if first_tick {
                portamento(channel, i32::from(step));
            }
        }
        ExtendedEffect::FineVolumeSlideUp { amount } => {
            if first_tick {
                channel.slide_volume(i32::from(amount));
            }
        }
        ExtendedEffect::FineVolumeSlideDown { amount } => {
            if first_tick {
                channel.slide_volume(-i32::from(amount));
            }
        }
        ExtendedEffect::SetVibratoWaveform { control } => channel.vibrato.set_control(control),
        ExtendedEffect::SetTremoloWaveform { control } => channel.tremolo.set_control(control),
        ExtendedEffect::Unsupported { .. } => {}
    }
}

/// Slide the period by `delta`, clamped to 113..=856
///
/// A channel that has no pitch yet stays silent.
pub fn portamento(channel: &mut ChannelState, delta: i32) {
    if channel.period != 0 {
        channel.slide_period(delta);
    }
}

/// Step the period toward the tone portamento target without overshooting
pub fn tone_portamento(channel: &mut ChannelState) {
    let target = channel.porta_target;
    if target == 0 || channel.period == 0 {
        return;
    }
    let step = u16::from(channel.porta_step);
    channel.period = if channel.period < target {
        channel.period.saturating_add(step).min(target)
    } else {
        channel.period.saturating_sub(step).max(target)
    };
}

/// Modulate this tick's period by the vibrato oscillator
pub fn vibrato(channel: &mut ChannelState) {
    channel.period_offset = VIBRATO_SCALE * channel.vibrato.value();
}

/// Modulate this tick's volume by the tremolo oscillator
pub fn tremolo(channel: &mut ChannelState) {
    channel.volume_offset = TREMOLO_SCALE * channel.tremolo.value();
}

/// Slide the volume, saturating at 0 and 64
pub fn volume_slide(channel: &mut ChannelState, slide: VolumeSlide) {
    match slide {
        VolumeSlide::Up(amount) => channel.slide_volume(i32::from(amount)),
        VolumeSlide::Down(amount) => channel.slide_volume(-i32::from(amount)),
    }
}

/// Jump to `offset * 256` bytes into the sample
pub fn set_offset(channel: &mut ChannelState, offset: u8) {
    channel.position = f64::from(offset) * 256.0;
    channel.looping = false;
}

/// Set the volume, clamped to 64
pub fn set_volume(channel: &mut ChannelState, volume: u8) {
    channel.volume = volume.min(MAX_VOLUME);
}
