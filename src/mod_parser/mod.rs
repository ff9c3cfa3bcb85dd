//! M.K. Module Decoder
//!
//! Decodes the 4-channel, 31-sample ProTracker "M.K." layout into a
//! [`Module`]. Decoding is a single forward pass over the buffer with no I/O;
//! any failure aborts with a [`FormatError`] and no partial module.
//!
//! File layout (all multi-byte integers big-endian):
//! ```text
//! offset  size       field
//! 0       20         song name, null padded
//! 20      31 * 30    sample headers
//! 950     1          sequence length
//! 951     1          reserved
//! 952     128        sequence table (pattern indices)
//! 1080    4          format tag "M.K."
//! 1084    n * 1024   patterns (64 rows * 4 channels * 4 bytes)
//! ...                sample waveforms, signed 8-bit, in sample order
//! ```

pub mod effects;
pub mod module;
pub mod reader;

pub use effects::{Effect, ExtendedEffect, VolumeSlide};
pub use module::{Division, Module, Note, Pattern, Sample};
pub use reader::ByteReader;

use crate::constants::{CHANNEL_COUNT, ROWS_PER_PATTERN, SAMPLE_COUNT, SEQUENCE_TABLE_LEN};
use crate::FormatError;

/// Format tag accepted by the decoder
pub const MK_TAG: [u8; 4] = *b"M.K.";

/// Byte offset of the format tag
pub const TAG_OFFSET: usize = 1080;

/// Size of one encoded pattern in bytes
pub const PATTERN_BYTES: usize = ROWS_PER_PATTERN * CHANNEL_COUNT * 4;

const NAME_LEN: usize = 20;
const SAMPLE_NAME_LEN: usize = 22;

/// Common interface for module format parsers
pub trait FormatParser {
    /// Decode a complete module from raw file bytes
    fn parse(&self, data: &[u8]) -> Result<Module, FormatError>;

    /// Get parser name
    fn name(&self) -> &str;
}

/// Parser for the "M.K." layout
#[derive(Debug, Default, Clone, Copy)]
pub struct ModParser;

impl FormatParser for ModParser {
    fn parse(&self, data: &[u8]) -> Result<Module, FormatError> {
        decode(data)
    }

    fn name(&self) -> &str {
        "ProTracker M.K."
    }
}

/// Decode a module from raw bytes
pub fn decode(data: &[u8]) -> Result<Module, FormatError> {
    let mut reader = ByteReader::new(data);

    let name = reader.read_padded_string(NAME_LEN)?;
    check_tag(data)?;

    let samples = (0..SAMPLE_COUNT)
        .map(|_| read_sample_header(&mut reader))
        .collect::<Result<Vec<_>, _>>()?;

    let sequence_len = reader.read_u8()? as usize;
    reader.skip(1)?;
    let table: [u8; SEQUENCE_TABLE_LEN] = reader.read_array()?;

    // Pattern count comes from the whole table, including entries past the
    // declared sequence length.
    let pattern_count = table.iter().copied().max().unwrap_or(0) as usize + 1;
    let sequence = table[..sequence_len.min(SEQUENCE_TABLE_LEN)].to_vec();
    if sequence.is_empty() {
        tracing::warn!("module declares an empty sequence");
    }

    reader.skip(MK_TAG.len())?;

    let patterns = (0..pattern_count)
        .map(|_| read_pattern(&mut reader))
        .collect::<Result<Vec<_>, _>>()?;

    let waveforms = samples
        .iter()
        .map(|sample| {
            reader
                .read_bytes(sample.byte_len())
                .map(|raw| raw.iter().map(|&b| b as i8).collect::<Vec<i8>>())
        })
        .collect::<Result<Vec<_>, _>>()?;

    for (index, sample) in samples.iter().enumerate() {
        if let Some(range) = sample.loop_range_bytes() {
            if range.end > sample.byte_len() {
                tracing::warn!(
                    sample = index + 1,
                    loop_end = range.end,
                    length = sample.byte_len(),
                    "loop region extends past sample data"
                );
            }
        }
    }

    tracing::debug!(
        name = %name,
        patterns = pattern_count,
        sequence_len = sequence.len(),
        trailing_bytes = reader.remaining(),
        "decoded M.K. module"
    );

    Ok(Module {
        name,
        samples,
        waveforms,
        patterns,
        sequence,
    })
}

fn check_tag(data: &[u8]) -> Result<(), FormatError> {
    let raw = data
        .get(TAG_OFFSET..TAG_OFFSET + MK_TAG.len())
        .ok_or(FormatError::Truncated {
            offset: TAG_OFFSET,
            needed: MK_TAG.len(),
            available: data.len().saturating_sub(TAG_OFFSET),
        })?;
    let mut tag = [0u8; 4];
    tag.copy_from_slice(raw);
    if tag != MK_TAG {
        return Err(FormatError::UnsupportedVariant { tag });
    }
    Ok(())
}

fn read_sample_header(reader: &mut ByteReader<'_>) -> Result<Sample, FormatError> {
    let name = reader.read_padded_string(SAMPLE_NAME_LEN)?;
    let length_words = reader.read_u16_be()?;
    let finetune = sign_extend_nibble(reader.read_u8()?);
    let volume = reader.read_u8()?;
    let loop_start_words = reader.read_u16_be()?;
    let loop_length_words = reader.read_u16_be()?;
    Ok(Sample {
        name,
        length_words,
        finetune,
        volume,
        loop_start_words,
        loop_length_words,
    })
}

fn read_pattern(reader: &mut ByteReader<'_>) -> Result<Pattern, FormatError> {
    let mut divisions = Vec::with_capacity(ROWS_PER_PATTERN);
    for _ in 0..ROWS_PER_PATTERN {
        let mut division = Division::default();
        for note in division.notes.iter_mut() {
            *note = Note::from_bytes(reader.read_array()?);
        }
        divisions.push(division);
    }
    Ok(Pattern::new(divisions))
}

/// Sign-extend the low nibble of a finetune byte to -8..=7
pub fn sign_extend_nibble(raw: u8) -> i8 {
    (((raw & 0x0F) << 4) as i8) >> 4
}
