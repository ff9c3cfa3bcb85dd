//! Decoded module data model
//!
//! Everything here is immutable once [`decode`](super::decode) returns. The
//! replayer borrows a [`Module`] for the duration of playback and addresses
//! samples and patterns by index.

use super::effects::Effect;
use crate::constants::{CHANNEL_COUNT, ROWS_PER_PATTERN, SAMPLE_COUNT};
use std::ops::Range;

/// Sample header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sample {
    /// Sample name (up to 22 characters)
    pub name: String,
    /// Length in 16-bit words
    pub length_words: u16,
    /// Signed finetune (-8..=7)
    pub finetune: i8,
    /// Default volume (0..=64)
    pub volume: u8,
    /// Loop start in 16-bit words
    pub loop_start_words: u16,
    /// Loop length in 16-bit words
    pub loop_length_words: u16,
}

impl Sample {
    /// Waveform length in bytes
    pub fn byte_len(&self) -> usize {
        self.length_words as usize * 2
    }

    /// True when the header defines a loop (loop length above one word)
    pub fn has_loop(&self) -> bool {
        self.loop_length_words > 1
    }

    /// Loop region in bytes, `None` when the sample does not loop
    pub fn loop_range_bytes(&self) -> Option<Range<usize>> {
        if !self.has_loop() {
            return None;
        }
        let start = self.loop_start_words as usize * 2;
        Some(start..start + self.loop_length_words as usize * 2)
    }

    /// True when the slot carries no waveform data
    pub fn is_empty(&self) -> bool {
        self.length_words == 0
    }
}

/// One note event on one channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Note {
    /// Sample number (1-based, 0 keeps the current sample)
    pub sample: u8,
    /// Amiga period (0 keeps the current pitch)
    pub period: u16,
    /// Packed 12-bit effect command
    pub command: u16,
}

impl Note {
    /// Decode a note from its 4-byte on-disk form
    ///
    /// ```text
    /// byte 0: ssss pppp   sample high nibble, period bits 11-8
    /// byte 1: pppp pppp   period bits 7-0
    /// byte 2: ssss eeee   sample low nibble, effect kind
    /// byte 3: xxxx yyyy   effect parameter
    /// ```
    pub fn from_bytes(bytes: [u8; 4]) -> Self {
        Note {
            sample: (bytes[0] & 0xF0) | (bytes[2] >> 4),
            period: (u16::from(bytes[0] & 0x0F) << 8) | u16::from(bytes[1]),
            command: (u16::from(bytes[2] & 0x0F) << 8) | u16::from(bytes[3]),
        }
    }

    /// Effect kind nibble
    pub fn effect_kind(&self) -> u8 {
        ((self.command >> 8) & 0x0F) as u8
    }

    /// Byte-level effect parameter
    pub fn param(&self) -> u8 {
        (self.command & 0xFF) as u8
    }

    /// High parameter nibble (extended sub-kind when the kind is 0xE)
    pub fn param_x(&self) -> u8 {
        self.param() >> 4
    }

    /// Low parameter nibble
    pub fn param_y(&self) -> u8 {
        self.param() & 0x0F
    }

    /// Decoded effect
    pub fn effect(&self) -> Effect {
        Effect::decode(self.command)
    }
}

/// One row: a note per channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Division {
    /// Notes in channel order
    pub notes: [Note; CHANNEL_COUNT],
}

/// 64 rows of notes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    divisions: Vec<Division>,
}

impl Pattern {
    /// Build a pattern from exactly [`ROWS_PER_PATTERN`] divisions
    ///
    /// Short inputs are padded with empty rows and long inputs truncated.
    pub fn new(mut divisions: Vec<Division>) -> Self {
        divisions.resize(ROWS_PER_PATTERN, Division::default());
        Pattern { divisions }
    }

    /// Pattern with every row empty
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Row by index, `None` past row 63
    pub fn division(&self, row: usize) -> Option<&Division> {
        self.divisions.get(row)
    }

    /// All rows in order
    pub fn divisions(&self) -> &[Division] {
        &self.divisions
    }

    /// Mutable access to a row (used when building modules programmatically)
    pub fn division_mut(&mut self, row: usize) -> Option<&mut Division> {
        self.divisions.get_mut(row)
    }
}

/// Decoded M.K. module
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Module {
    /// Song name (up to 20 characters)
    pub name: String,
    /// The 31 sample headers in file order
    pub samples: Vec<Sample>,
    /// Signed 8-bit waveforms, parallel to `samples`
    pub waveforms: Vec<Vec<i8>>,
    /// Patterns, indexed by the values in `sequence`
    pub patterns: Vec<Pattern>,
    /// Playback order of pattern indices
    pub sequence: Vec<u8>,
}

impl Module {
    /// Sample header by 1-based sample number
    pub fn sample(&self, number: u8) -> Option<&Sample> {
        Self::slot(number).and_then(|i| self.samples.get(i))
    }

    /// Waveform by 1-based sample number
    pub fn waveform(&self, number: u8) -> Option<&[i8]> {
        Self::slot(number).and_then(|i| self.waveforms.get(i).map(Vec::as_slice))
    }

    /// Pattern played at a position in the sequence
    pub fn pattern_at(&self, sequence_index: usize) -> Option<&Pattern> {
        let pattern = *self.sequence.get(sequence_index)?;
        self.patterns.get(pattern as usize)
    }

    /// Number of samples with a nonzero length
    pub fn used_sample_count(&self) -> usize {
        self.samples.iter().filter(|s| !s.is_empty()).count()
    }

    /// Total waveform bytes across all samples
    pub fn waveform_bytes(&self) -> usize {
        self.waveforms.iter().map(Vec::len).sum()
    }

    fn slot(number: u8) -> Option<usize> {
        let number = number as usize;
        (1..=SAMPLE_COUNT).contains(&number).then(|| number - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn looped_sample() -> Sample {
        Sample {
            name: "lead".into(),
            length_words: 20,
            finetune: 0,
            volume: 64,
            loop_start_words: 10,
            loop_length_words: 5,
        }
    }

    #[test]
    fn test_loop_range_in_bytes() {
        let sample = looped_sample();
        assert!(sample.has_loop());
        assert_eq!(sample.loop_range_bytes(), Some(20..30));
        assert_eq!(sample.byte_len(), 40);
    }

    #[test]
    fn test_single_word_loop_is_inactive() {
        let sample = Sample {
            loop_length_words: 1,
            ..looped_sample()
        };
        assert!(!sample.has_loop());
        assert_eq!(sample.loop_range_bytes(), None);
    }

    #[test]
    fn test_note_unpacking() {
        // sample 0x1A, period 0x1AC (428), command 0xC40
        let note = Note::from_bytes([0x11, 0xAC, 0xAC, 0x40]);
        assert_eq!(note.sample, 0x1A);
        assert_eq!(note.period, 428);
        assert_eq!(note.command, 0xC40);
        assert_eq!(note.effect_kind(), 0xC);
        assert_eq!(note.param(), 0x40);
        assert_eq!(note.param_x(), 4);
        assert_eq!(note.param_y(), 0);
    }

    #[test]
    fn test_pattern_always_has_64_rows() {
        assert_eq!(Pattern::empty().divisions().len(), 64);
        assert!(Pattern::empty().division(64).is_none());
    }

    #[test]
    fn test_sample_lookup_is_one_based() {
        let module = Module {
            name: String::new(),
            samples: vec![looped_sample(); SAMPLE_COUNT],
            waveforms: vec![Vec::new(); SAMPLE_COUNT],
            patterns: vec![Pattern::empty()],
            sequence: vec![0],
        };
        assert!(module.sample(0).is_none());
        assert!(module.sample(1).is_some());
        assert!(module.sample(31).is_some());
        assert!(module.sample(32).is_none());
        assert!(module.pattern_at(0).is_some());
        assert!(module.pattern_at(1).is_none());
    }
}
