//! Newline-delimited JSON events.
//!
//! Indicator frames are not emitted; consumers get the per-second samples only.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::phase::{PhaseKind, PhaseSpec, ProgressSample};
use crate::sink::{PresentationSink, SequenceState, SequenceSummary};

/// A single JSON line.
#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent<'a> {
    SequenceStart {
        phases: usize,
        total_secs: f64,
    },
    PhaseStart {
        kind: PhaseKind,
        label: &'a str,
        duration_secs: f64,
    },
    Progress {
        kind: PhaseKind,
        countdown: u64,
        percent: u8,
        instruction: String,
    },
    PhaseComplete {
        kind: PhaseKind,
    },
    SequenceEnd {
        state: SequenceState,
        phases_completed: usize,
        phases_planned: usize,
        elapsed_ms: u64,
    },
}

pub struct JsonUI<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonUI<W> {
    pub fn new(out: W) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(PoisonError::into_inner)
    }

    fn out(&self) -> MutexGuard<'_, W> {
        self.out.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: &UiEvent<'_>) -> anyhow::Result<()> {
        let mut out = self.out();
        serde_json::to_writer(&mut *out, event)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> PresentationSink for JsonUI<W> {
    fn on_sequence_start(&self, queue: &[PhaseSpec]) -> anyhow::Result<()> {
        self.emit(&UiEvent::SequenceStart {
            phases: queue.len(),
            total_secs: queue.iter().map(|p| p.duration().as_secs_f64()).sum(),
        })
    }

    fn on_phase_start(&self, spec: &PhaseSpec) -> anyhow::Result<()> {
        self.emit(&UiEvent::PhaseStart {
            kind: spec.kind(),
            label: spec.label(),
            duration_secs: spec.duration().as_secs_f64(),
        })
    }

    fn on_progress(&self, spec: &PhaseSpec, sample: ProgressSample) -> anyhow::Result<()> {
        self.emit(&UiEvent::Progress {
            kind: spec.kind(),
            countdown: sample.countdown,
            percent: sample.percent,
            instruction: spec.instruction(sample.countdown),
        })
    }

    fn on_phase_complete(&self, spec: &PhaseSpec) -> anyhow::Result<()> {
        self.emit(&UiEvent::PhaseComplete { kind: spec.kind() })
    }

    fn on_sequence_end(&self, summary: &SequenceSummary) -> anyhow::Result<()> {
        self.emit(&UiEvent::SequenceEnd {
            state: summary.state,
            phases_completed: summary.phases_completed,
            phases_planned: summary.phases_planned,
            elapsed_ms: summary.elapsed.as_millis() as u64,
        })
    }
}
