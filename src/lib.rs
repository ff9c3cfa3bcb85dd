//! ProTracker M.K. Module Replayer
//!
//! Decodes 4-channel, 31-sample ProTracker "M.K." modules and plays them
//! through a software model of the Amiga's Paula sound hardware. Samples are
//! resampled by linear interpolation from the note period, run through the
//! tracker effect engine once per tick and mixed into one mono stream.
//!
//! # Features
//! - Strict, all-or-nothing decoder for the M.K. layout
//! - Per-channel synthesis with sample loops, finetune and volume
//! - Portamento, tone portamento, vibrato, tremolo, volume slides, sample
//!   offset, position jump, pattern break and speed/tempo effects
//! - Backlog-throttled push into any [`AudioSink`], or pull-style rendering
//!   through [`ModPlayer`]
//!
//! # Crate feature flags
//! - `mod-format` (default): module decoding and file loading (`mod_parser`, `mod_loader`)
//! - `replayer` (default): synthesis, effects and sequencing (`replayer`)
//! - `streaming` (opt-in): system audio output (enables optional `rodio` dep)
//!
//! # Quick start
//! ## Render to memory
//! ```no_run
//! # #[cfg(feature = "replayer")]
//! # {
//! use mod_replayer::replayer::PlaybackController;
//! use mod_replayer::load_song;
//! let data = std::fs::read("song.mod").unwrap();
//! let (mut player, summary) = load_song(&data).unwrap();
//! println!("{}", summary.format_info());
//! player.play().unwrap();
//! let audio = player.generate_samples(summary.samples_per_tick * 6);
//! # }
//! ```
//!
//! ## Push ticks into a sink
//! ```no_run
//! # #[cfg(feature = "replayer")]
//! # {
//! use std::sync::Arc;
//! use mod_replayer::{CaptureSink, PlayerConfig, SampleFormat, Sequencer};
//! let module = mod_replayer::mod_loader::load_file("song.mod").unwrap();
//! let mut sequencer = Sequencer::new(Arc::new(module), PlayerConfig::default()).unwrap();
//! let mut sink = CaptureSink::new(44_100, SampleFormat::F32);
//! for _ in 0..64 {
//!     sequencer.play_row(&mut sink).unwrap();
//! }
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod constants;
pub mod error;

#[cfg(feature = "mod-format")]
pub mod mod_loader; // Module File I/O
#[cfg(feature = "mod-format")]
pub mod mod_parser; // M.K. Format Decoding
#[cfg(feature = "replayer")]
pub mod replayer; // Playback Engine
pub mod streaming; // Audio Sinks & Streaming

pub use config::{ClockRegion, PlayerConfig};
pub use error::{FormatError, ReplayerError, Result};

#[cfg(feature = "mod-format")]
pub use mod_parser::{decode, Effect, Module, Note, Pattern, Sample};
#[cfg(feature = "replayer")]
pub use replayer::{
    load_song, load_song_with_config, LoadSummary, ModPlayer, PlaybackController, PlaybackState,
    Sequencer, SongPosition,
};
#[cfg(feature = "streaming")]
pub use streaming::AudioDevice;
pub use streaming::{
    AudioSink, CaptureSink, RealtimePlayer, RingBuffer, SampleFormat, StreamConfig,
};
