//! Typed error hierarchy for the breathing sequencer.
//!
//! Two enums cover the library surface:
//! - `ConfigError`: invalid durations, repeat counts, presets or a missing sink
//! - `SequenceError`: failures raised synchronously while starting or advancing a sequence
//!
//! Duplicate lifecycle calls (`start()` while running, `stop()` after the end)
//! are not errors; the sequencer ignores them.

use thiserror::Error;

use crate::phase::PhaseKind;

/// Invalid configuration, detected before any phase starts.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{kind} duration must be greater than zero, got {seconds}s")]
    NonPositiveDuration { kind: PhaseKind, seconds: f64 },

    #[error("{kind} duration must be a finite number of seconds")]
    NonFiniteDuration { kind: PhaseKind },

    #[error("{kind} duration of {seconds}s exceeds the {max}s maximum")]
    DurationTooLong {
        kind: PhaseKind,
        seconds: f64,
        max: f64,
    },

    #[error("repeat count must be at least 1, got {repeat}")]
    InvalidRepeat { repeat: u32 },

    #[error("repeat count must be at most {max}, got {repeat}")]
    RepeatTooLarge { repeat: u32, max: u32 },

    #[error("sequence needs at least one phase")]
    EmptySequence,

    #[error("no presentation sink attached to the sequencer")]
    MissingSink,

    #[error("unknown preset '{name}'")]
    UnknownPreset { name: String },

    #[error("frame interval of {millis}ms is shorter than the 10ms minimum")]
    InvalidFrameInterval { millis: u64 },
}

/// Errors surfaced by `Sequencer::start` and the phase transitions it drives.
#[derive(Debug, Error)]
pub enum SequenceError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("presentation sink failed: {0}")]
    Sink(#[source] anyhow::Error),
}
