//! Amiga / ProTracker Constants
//!
//! Shared constants used by the decoder, the channel synthesizer and the sequencer.

/// Number of output channels in an M.K. module.
pub const CHANNEL_COUNT: usize = 4;

/// Number of sample slots in an M.K. module.
pub const SAMPLE_COUNT: usize = 31;

/// Rows (divisions) per pattern.
pub const ROWS_PER_PATTERN: usize = 64;

/// Maximum length of the playback sequence table.
pub const SEQUENCE_TABLE_LEN: usize = 128;

/// Paula base clock for NTSC machines (Hz).
///
/// Sample rate for a period `p` is `clock / (2 * p)`.
pub const NTSC_BASE_CLOCK: f64 = 7_159_090.5;

/// Paula base clock for PAL machines (Hz).
pub const PAL_BASE_CLOCK: f64 = 7_093_789.2;

/// Highest pitch the effect engine slides to.
pub const PERIOD_MIN: u16 = 113;

/// Lowest pitch the effect engine slides to.
pub const PERIOD_MAX: u16 = 856;

/// Full channel volume.
pub const MAX_VOLUME: u8 = 64;

/// Standard output sample rate.
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;

/// Ticks per row when a module starts.
pub const DEFAULT_SPEED: u8 = 6;

/// Tempo when a module starts (50 ticks per second).
pub const DEFAULT_TEMPO: u8 = 125;

/// SetTempo parameters up to this value set the speed, above it the BPM.
pub const SPEED_TEMPO_THRESHOLD: u8 = 32;

/// Lowest BPM a SetTempo command can select.
pub const MIN_TEMPO: u8 = SPEED_TEMPO_THRESHOLD + 1;

/// Phase steps of one vibrato/tremolo cycle.
pub const OSCILLATOR_PERIOD: u32 = 64;

/// Samples per tick for the given output rate and tempo.
///
/// A tempo of 125 BPM corresponds to 50 ticks per second, so the tick rate
/// is `tempo * 2 / 5` Hz.
#[inline]
pub fn samples_per_tick(sample_rate: u32, tempo: u8) -> usize {
    let tempo = u64::from(tempo.max(1));
    (u64::from(sample_rate) * 5 / (tempo * 2)) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tick_is_882_samples() {
        assert_eq!(samples_per_tick(DEFAULT_SAMPLE_RATE, DEFAULT_TEMPO), 882);
    }

    #[test]
    fn test_faster_tempo_shortens_tick() {
        let slow = samples_per_tick(DEFAULT_SAMPLE_RATE, 100);
        let fast = samples_per_tick(DEFAULT_SAMPLE_RATE, 200);
        assert!(fast < slow);
        assert_eq!(fast, 551);
    }

    #[test]
    fn test_extreme_sample_rate_does_not_overflow() {
        assert_eq!(samples_per_tick(u32::MAX, 125), 85_899_345);
    }

    #[test]
    fn test_period_bounds_ordered() {
        assert!(PERIOD_MIN < PERIOD_MAX);
    }
}
