//! Sequencer
//!
//! Walks the module's sequence row by row. For every row it hands each
//! channel its note, renders `speed` ticks (each mixed into one mono tick
//! buffer) and then resolves position jump / pattern break requests to pick
//! the next row. Playback loops over the whole sequence until the caller
//! stops it.

use super::channel::ChannelState;
use super::mixer::Mixer;
use super::timing::TimingConfig;
use crate::config::PlayerConfig;
use crate::constants::{CHANNEL_COUNT, ROWS_PER_PATTERN, SPEED_TEMPO_THRESHOLD};
use crate::mod_parser::{Division, Effect, Module};
use crate::streaming::AudioSink;
use crate::{ReplayerError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Where the sequencer is in the song
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SongPosition {
    /// Index into the sequence
    pub sequence_index: usize,
    /// Pattern number at that index
    pub pattern: u8,
    /// Row within the pattern (0..64)
    pub row: usize,
    /// Next tick to render within the row
    pub tick: u8,
}

/// Flow control requested by the notes of one row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowControl {
    /// Position jump target (sequence index)
    pub position_jump: Option<u8>,
    /// Pattern break target (row in the next pattern)
    pub pattern_break: Option<u8>,
}

impl FlowControl {
    /// Collect jump and break requests from any channel of the row
    ///
    /// When several channels carry the same kind of request the rightmost wins.
    pub fn scan(division: &Division) -> Self {
        let mut flow = FlowControl::default();
        for note in &division.notes {
            match note.effect() {
                Effect::PositionJump { position } => flow.position_jump = Some(position),
                Effect::PatternBreak { row } => flow.pattern_break = Some(row),
                _ => {}
            }
        }
        flow
    }

    /// Next `(sequence_index, row)` after the row at `(sequence_index, row)`
    ///
    /// Out-of-range jump targets restart the sequence and out-of-range
    /// break rows start the pattern from the top.
    pub fn resolve(&self, sequence_index: usize, row: usize, sequence_len: usize) -> (usize, usize) {
        let len = sequence_len.max(1);
        let following = (sequence_index + 1) % len;

        let jump = self.position_jump.map(|position| {
            let position = position as usize;
            if position < len {
                position
            } else {
                tracing::warn!(position, len, "position jump past end of sequence");
                0
            }
        });
        let break_row = self.pattern_break.map(|row| {
            let row = row as usize;
            if row < ROWS_PER_PATTERN {
                row
            } else {
                tracing::warn!(row, "pattern break past last row");
                0
            }
        });

        match (jump, break_row) {
            (None, None) if row + 1 < ROWS_PER_PATTERN => (sequence_index, row + 1),
            (None, None) => (following, 0),
            (Some(target), None) => (target, 0),
            (None, Some(target_row)) => (following, target_row),
            (Some(target), Some(target_row)) => (target, target_row),
        }
    }
}

/// Result of a finished row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowOutcome {
    /// Requests found in the row
    pub flow: FlowControl,
    /// Position the next row starts at
    pub next: SongPosition,
    /// True when the next row is not after the finished one (end-of-sequence
    /// wrap or backward jump)
    pub looped: bool,
}

/// Result of rendering one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvanceResult {
    /// More ticks remain in the current row
    WithinRow,
    /// The row finished and the next one was selected
    RowAdvanced(RowOutcome),
}

/// Pattern/row state machine driving four channels
#[derive(Debug, Clone)]
pub struct Sequencer {
    module: Arc<Module>,
    config: PlayerConfig,
    timing: TimingConfig,
    channels: [ChannelState; CHANNEL_COUNT],
    channel_buffers: [Vec<f32>; CHANNEL_COUNT],
    mix_buffer: Vec<f32>,
    mixer: Mixer,
    current_row: Division,
    sequence_index: usize,
    row: usize,
    tick: u8,
    speed: u8,
    ticks_rendered: u64,
}

impl Sequencer {
    /// Create a sequencer positioned at the start of the song
    pub fn new(module: Arc<Module>, config: PlayerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Sequencer {
            module,
            config,
            timing: TimingConfig::new(config.sample_rate, config.initial_tempo),
            channels: Default::default(),
            channel_buffers: Default::default(),
            mix_buffer: Vec::new(),
            mixer: Mixer::new(config.gain),
            current_row: Division::default(),
            sequence_index: 0,
            row: 0,
            tick: 0,
            speed: config.initial_speed,
            ticks_rendered: 0,
        })
    }

    /// Rewind to the first row and reset every channel and the tempo
    pub fn reset(&mut self) {
        self.channels = Default::default();
        self.timing = TimingConfig::new(self.config.sample_rate, self.config.initial_tempo);
        self.speed = self.config.initial_speed;
        self.current_row = Division::default();
        self.sequence_index = 0;
        self.row = 0;
        self.tick = 0;
        self.ticks_rendered = 0;
        self.mix_buffer.clear();
    }

    /// Render the next tick into the internal mix buffer
    ///
    /// The first tick of a row dispatches the row's notes; the last one
    /// resolves flow control and moves to the next row.
    pub fn render_tick(&mut self) -> AdvanceResult {
        if self.tick == 0 {
            self.dispatch_row();
        }

        let tick_len = self.timing.samples_per_tick();
        let first_tick = self.tick == 0;
        let base_clock = self.config.clock.base_clock();
        let sample_rate = self.timing.sample_rate;
        let module = &*self.module;

        for (channel, buffer) in self.channels.iter_mut().zip(self.channel_buffers.iter_mut()) {
            buffer.resize(tick_len, 0.0);
            channel.advance(module, first_tick, base_clock, sample_rate, buffer);
        }
        self.mix_buffer.resize(tick_len, 0.0);
        self.mixer.mix(&self.channel_buffers, &mut self.mix_buffer);

        self.tick += 1;
        self.ticks_rendered += 1;
        if self.tick >= self.speed {
            self.tick = 0;
            AdvanceResult::RowAdvanced(self.finish_row())
        } else {
            AdvanceResult::WithinRow
        }
    }

    /// Most recently rendered tick
    pub fn tick_buffer(&self) -> &[f32] {
        &self.mix_buffer
    }

    fn dispatch_row(&mut self) {
        let division = self
            .module
            .pattern_at(self.sequence_index)
            .and_then(|pattern| pattern.division(self.row))
            .copied()
            .unwrap_or_default();

        for (channel, note) in self.channels.iter_mut().zip(division.notes.iter()) {
            channel.apply_note(note, &self.module);
        }

        for note in &division.notes {
            if let Effect::SetTempo { value } = note.effect() {
                self.set_tempo(value);
            }
        }

        self.current_row = division;
    }

    fn set_tempo(&mut self, value: u8) {
        match value {
            0 => {}
            1..=SPEED_TEMPO_THRESHOLD => {
                tracing::trace!(speed = value, "speed change");
                self.speed = value;
            }
            _ => {
                tracing::trace!(bpm = value, "tempo change");
                self.timing = self.timing.with_tempo(value);
            }
        }
    }

    fn finish_row(&mut self) -> RowOutcome {
        let flow = FlowControl::scan(&self.current_row);
        let sequence_len = self.module.sequence.len();
        let (next_index, next_row) = flow.resolve(self.sequence_index, self.row, sequence_len);

        let looped = (next_index, next_row) <= (self.sequence_index, self.row);

        if flow != FlowControl::default() {
            tracing::trace!(
                from_index = self.sequence_index,
                from_row = self.row,
                to_index = next_index,
                to_row = next_row,
                jump = ?flow.position_jump,
                pattern_break = ?flow.pattern_break,
                "flow control"
            );
        }

        self.sequence_index = next_index;
        self.row = next_row;

        RowOutcome {
            flow,
            next: self.position(),
            looped,
        }
    }

    /// Render ticks until the current row is finished, queueing each on `sink`
    ///
    /// Before every tick the sequencer waits until the sink holds no more
    /// than `backlog_ticks` worth of audio.
    pub fn play_row<S: AudioSink + ?Sized>(&mut self, sink: &mut S) -> Result<RowOutcome> {
        loop {
            let threshold = self.config.backlog_bytes(self.timing.samples_per_tick());
            sink.wait_until_below(threshold)?;
            let result = self.render_tick();
            sink.enqueue(&self.mix_buffer)?;
            if let AdvanceResult::RowAdvanced(outcome) = result {
                return Ok(outcome);
            }
        }
    }

    /// Start the sink and play until `stop` is set
    ///
    /// The flag is checked between rows. Sink errors end playback and are
    /// returned to the caller.
    pub fn run<S: AudioSink + ?Sized>(&mut self, sink: &mut S, stop: &AtomicBool) -> Result<()> {
        if sink.sample_rate() != self.timing.sample_rate {
            return Err(ReplayerError::ConfigError(format!(
                "sink runs at {} Hz, player configured for {} Hz",
                sink.sample_rate(),
                self.timing.sample_rate
            )));
        }
        if sink.format() != self.config.sample_format {
            return Err(ReplayerError::ConfigError(format!(
                "sink format {:?} does not match configured {:?}",
                sink.format(),
                self.config.sample_format
            )));
        }

        sink.start()?;
        while !stop.load(Ordering::Relaxed) {
            self.play_row(sink)?;
        }
        tracing::debug!(ticks = self.ticks_rendered, "playback stopped");
        Ok(())
    }

    /// Current position
    pub fn position(&self) -> SongPosition {
        SongPosition {
            sequence_index: self.sequence_index,
            pattern: self
                .module
                .sequence
                .get(self.sequence_index)
                .copied()
                .unwrap_or(0),
            row: self.row,
            tick: self.tick,
        }
    }

    /// Ticks per row
    pub fn speed(&self) -> u8 {
        self.speed
    }

    /// Current tick timing
    pub fn timing(&self) -> TimingConfig {
        self.timing
    }

    /// Samples in the next tick
    pub fn samples_per_tick(&self) -> usize {
        self.timing.samples_per_tick()
    }

    /// Ticks rendered since the start or the last reset
    pub fn ticks_rendered(&self) -> u64 {
        self.ticks_rendered
    }

    /// Channel state by index (0-3)
    pub fn channel(&self, index: usize) -> Option<&ChannelState> {
        self.channels.get(index)
    }

    /// The module being played
    pub fn module(&self) -> &Module {
        &self.module
    }

    /// Playback configuration
    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    /// Mixer (mute state, gain)
    pub fn mixer(&self) -> &Mixer {
        &self.mixer
    }

    /// Mutable mixer access
    pub fn mixer_mut(&mut self) -> &mut Mixer {
        &mut self.mixer
    }
}
