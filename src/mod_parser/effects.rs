//! Effect Command Decoder
//!
//! Turns the 12-bit effect command stored with every note into a tagged
//! [`Effect`] that carries only the parameters its kind uses.
//!
//! Command layout:
//! ```text
//! bits 11-8  effect kind (0x0-0xF)
//! bits  7-4  parameter x (extended kind when effect kind is 0xE)
//! bits  3-0  parameter y
//! ```

/// Direction and amount of a volume slide
///
/// A nonzero `x` nibble slides up and takes precedence over `y`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VolumeSlide {
    /// Raise volume by the amount every non-first tick
    Up(u8),
    /// Lower volume by the amount every non-first tick
    Down(u8),
}

impl VolumeSlide {
    /// Decode from the parameter byte
    pub fn from_param(param: u8) -> Self {
        let x = param >> 4;
        let y = param & 0x0F;
        if x != 0 {
            VolumeSlide::Up(x)
        } else {
            VolumeSlide::Down(y)
        }
    }
}

/// Extended (0xE) effect sub-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtendedEffect {
    /// E1y: one-shot period decrease
    FinePortamentoUp {
        /// Period units
        step: u8,
    },
    /// E2y: one-shot period increase
    FinePortamentoDown {
        /// Period units
        step: u8,
    },
    /// E4y: vibrato waveform (bits 0-1) and no-retrigger flag (bit 2)
    SetVibratoWaveform {
        /// Raw control nibble
        control: u8,
    },
    /// E7y: tremolo waveform (bits 0-1) and no-retrigger flag (bit 2)
    SetTremoloWaveform {
        /// Raw control nibble
        control: u8,
    },
    /// EAy: one-shot volume increase
    FineVolumeSlideUp {
        /// Volume units
        amount: u8,
    },
    /// EBy: one-shot volume decrease
    FineVolumeSlideDown {
        /// Volume units
        amount: u8,
    },
    /// Any other sub-command (filter, glissando, finetune, loop, retrigger,
    /// note cut/delay, pattern delay, invert loop). Ignored by the player.
    Unsupported {
        /// Sub-command nibble
        kind: u8,
        /// Parameter nibble
        param: u8,
    },
}

impl ExtendedEffect {
    /// Decode from the parameter byte of an 0xE command
    pub fn from_param(param: u8) -> Self {
        let kind = param >> 4;
        let y = param & 0x0F;
        match kind {
            0x1 => ExtendedEffect::FinePortamentoUp { step: y },
            0x2 => ExtendedEffect::FinePortamentoDown { step: y },
            0x4 => ExtendedEffect::SetVibratoWaveform { control: y },
            0x7 => ExtendedEffect::SetTremoloWaveform { control: y },
            0xA => ExtendedEffect::FineVolumeSlideUp { amount: y },
            0xB => ExtendedEffect::FineVolumeSlideDown { amount: y },
            _ => ExtendedEffect::Unsupported { kind, param: y },
        }
    }
}

/// Decoded effect command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Effect {
    /// Command 0x000
    #[default]
    None,
    /// 0xy: recognized but not applied
    Arpeggio {
        /// First semitone offset
        first: u8,
        /// Second semitone offset
        second: u8,
    },
    /// 1xx: slide period down (pitch up) on non-first ticks
    PortamentoUp {
        /// Period units per tick
        step: u8,
    },
    /// 2xx: slide period up (pitch down) on non-first ticks
    PortamentoDown {
        /// Period units per tick
        step: u8,
    },
    /// 3xx: slide toward the note's period without retriggering
    TonePortamento {
        /// Period units per tick (0 keeps the previous step)
        step: u8,
    },
    /// 4xy: pitch oscillator
    Vibrato {
        /// Phase steps per tick (0 keeps the previous speed)
        speed: u8,
        /// Amplitude (0 keeps the previous depth)
        depth: u8,
    },
    /// 5xy: continue tone portamento while sliding volume
    TonePortamentoVolumeSlide {
        /// Volume slide parameters
        slide: VolumeSlide,
    },
    /// 6xy: continue vibrato while sliding volume
    VibratoVolumeSlide {
        /// Volume slide parameters
        slide: VolumeSlide,
    },
    /// 7xy: volume oscillator
    Tremolo {
        /// Phase steps per tick (0 keeps the previous speed)
        speed: u8,
        /// Amplitude (0 keeps the previous depth)
        depth: u8,
    },
    /// 9xx: start playback at `offset * 256` bytes
    SetOffset {
        /// Offset in 256-byte units
        offset: u8,
    },
    /// Axy: volume slide on non-first ticks
    VolumeSlide {
        /// Volume slide parameters
        slide: VolumeSlide,
    },
    /// Bxx: continue at sequence position `position` after this row
    PositionJump {
        /// Sequence index
        position: u8,
    },
    /// Cxx: set volume (clamped to 64)
    SetVolume {
        /// Requested volume
        volume: u8,
    },
    /// Dxy: continue at row `x * 10 + y` of the next pattern
    PatternBreak {
        /// Target row, already converted from the decimal encoding
        row: u8,
    },
    /// Exy: extended command
    Extended(ExtendedEffect),
    /// Fxx: speed (1..=32) or BPM (33..=255); 0 is ignored
    SetTempo {
        /// Raw parameter
        value: u8,
    },
    /// 8xx and anything else outside the supported catalogue
    Unsupported {
        /// Effect kind nibble
        kind: u8,
        /// Parameter byte
        param: u8,
    },
}

impl Effect {
    /// Decode a 12-bit effect command
    pub fn decode(command: u16) -> Self {
        let kind = ((command >> 8) & 0x0F) as u8;
        let param = (command & 0xFF) as u8;
        let x = param >> 4;
        let y = param & 0x0F;

        match kind {
            0x0 if param == 0 => Effect::None,
            0x0 => Effect::Arpeggio {
                first: x,
                second: y,
            },
            0x1 => Effect::PortamentoUp { step: param },
            0x2 => Effect::PortamentoDown { step: param },
            0x3 => Effect::TonePortamento { step: param },
            0x4 => Effect::Vibrato { speed: x, depth: y },
            0x5 => Effect::TonePortamentoVolumeSlide {
                slide: VolumeSlide::from_param(param),
            },
            0x6 => Effect::VibratoVolumeSlide {
                slide: VolumeSlide::from_param(param),
            },
            0x7 => Effect::Tremolo { speed: x, depth: y },
            0x9 => Effect::SetOffset { offset: param },
            0xA => Effect::VolumeSlide {
                slide: VolumeSlide::from_param(param),
            },
            0xB => Effect::PositionJump { position: param },
            0xC => Effect::SetVolume { volume: param },
            0xD => Effect::PatternBreak { row: x * 10 + y },
            0xE => Effect::Extended(ExtendedEffect::from_param(param)),
            0xF => Effect::SetTempo { value: param },
            _ => Effect::Unsupported { kind, param },
        }
    }

    /// True for effects whose note period is a slide target rather than a new pitch
    pub fn is_tone_portamento(&self) -> bool {
        matches!(
            self,
            Effect::TonePortamento { .. } | Effect::TonePortamentoVolumeSlide { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_command_is_none() {
        assert_eq!(Effect::decode(0x000), Effect::None);
    }

    #[test]
    fn test_arpeggio_recognized() {
        assert_eq!(
            Effect::decode(0x037),
            Effect::Arpeggio {
                first: 3,
                second: 7
            }
        );
    }

    #[test]
    fn test_pitch_effects() {
        assert_eq!(Effect::decode(0x1_20), Effect::PortamentoUp { step: 0x20 });
        assert_eq!(Effect::decode(0x2_05), Effect::PortamentoDown { step: 5 });
        assert_eq!(Effect::decode(0x3_10), Effect::TonePortamento { step: 0x10 });
        assert_eq!(Effect::decode(0x4_8F), Effect::Vibrato { speed: 8, depth: 15 });
        assert!(Effect::decode(0x3_00).is_tone_portamento());
        assert!(Effect::decode(0x5_01).is_tone_portamento());
        assert!(!Effect::decode(0x6_01).is_tone_portamento());
    }

    #[test]
    fn test_volume_slide_up_takes_precedence() {
        assert_eq!(VolumeSlide::from_param(0x34), VolumeSlide::Up(3));
        assert_eq!(VolumeSlide::from_param(0x04), VolumeSlide::Down(4));
        assert_eq!(
            Effect::decode(0xA_20),
            Effect::VolumeSlide {
                slide: VolumeSlide::Up(2)
            }
        );
    }

    #[test]
    fn test_pattern_break_is_decimal() {
        assert_eq!(Effect::decode(0xD_16), Effect::PatternBreak { row: 16 });
        assert_eq!(Effect::decode(0xD_00), Effect::PatternBreak { row: 0 });
    }

    #[test]
    fn test_extended_effects() {
        assert_eq!(
            Effect::decode(0xE_13),
            Effect::Extended(ExtendedEffect::FinePortamentoUp { step: 3 })
        );
        assert_eq!(
            Effect::decode(0xE_46),
            Effect::Extended(ExtendedEffect::SetVibratoWaveform { control: 6 })
        );
        assert_eq!(
            Effect::decode(0xE_B2),
            Effect::Extended(ExtendedEffect::FineVolumeSlideDown { amount: 2 })
        );
        assert_eq!(
            Effect::decode(0xE_C3),
            Effect::Extended(ExtendedEffect::Unsupported { kind: 0xC, param: 3 })
        );
    }

    #[test]
    fn test_panning_is_unsupported() {
        assert_eq!(
            Effect::decode(0x8_40),
            Effect::Unsupported {
                kind: 8,
                param: 0x40
            }
        );
    }
}
