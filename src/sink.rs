//! Presentation sink contract between the sequencer and whatever draws the session.
//!
//! The sequencer never renders anything itself. It pushes lifecycle events and
//! progress samples into a `PresentationSink` injected at construction.

use std::time::Duration;

use serde::Serialize;

use crate::phase::{PhaseSpec, ProgressSample};

/// Terminal state reached by a sequence run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SequenceState {
    Idle,
    Running,
    Completed,
    Cancelled,
}

impl SequenceState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SequenceState::Completed | SequenceState::Cancelled)
    }
}

impl std::fmt::Display for SequenceState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SequenceState::Idle => write!(f, "idle"),
            SequenceState::Running => write!(f, "running"),
            SequenceState::Completed => write!(f, "completed"),
            SequenceState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Snapshot handed to `on_sequence_end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceSummary {
    pub state: SequenceState,
    pub phases_completed: usize,
    pub phases_planned: usize,
    pub elapsed: Duration,
}

/// Receives every visible update of a breathing session.
///
/// Fallible callbacks propagate synchronously to the caller of
/// `Sequencer::start` (or to `Sequencer::run` for ticks after the first one).
/// `on_frame` is best-effort and infallible; sinks that cannot animate
/// continuously simply ignore it.
pub trait PresentationSink: Send + Sync {
    /// Called once before the first phase, with the full queue in run order.
    fn on_sequence_start(&self, queue: &[PhaseSpec]) -> anyhow::Result<()>;

    /// Called when a phase begins, before its first progress sample.
    fn on_phase_start(&self, spec: &PhaseSpec) -> anyhow::Result<()>;

    /// Called on every countdown tick, including the immediate one at phase start.
    fn on_progress(&self, spec: &PhaseSpec, sample: ProgressSample) -> anyhow::Result<()>;

    /// Sub-second indicator update with unrounded percent.
    fn on_frame(&self, _spec: &PhaseSpec, _percent: f64) {}

    /// Called after a phase ran to its end (never for a cancelled phase).
    fn on_phase_complete(&self, _spec: &PhaseSpec) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once when the sequence completes or is stopped.
    fn on_sequence_end(&self, summary: &SequenceSummary) -> anyhow::Result<()>;
}
