//! Line-per-tick output for dumb terminals and pipes.

use std::io::Write;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::phase::{PhaseSpec, ProgressSample};
use crate::sink::{PresentationSink, SequenceState, SequenceSummary};

/// Writes each instruction update as its own line.
pub struct PlainUI<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> PlainUI<W> {
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

    fn line(&self, text: &str) -> anyhow::Result<()> {
        let mut out = self.out();
        writeln!(out, "{}", text)?;
        out.flush()?;
        Ok(())
    }
}

impl<W: Write + Send> PresentationSink for PlainUI<W> {
    fn on_sequence_start(&self, queue: &[PhaseSpec]) -> anyhow::Result<()> {
        let total: f64 = queue.iter().map(|p| p.duration().as_secs_f64()).sum();
        self.line(&format!(
            "Starting {} phases ({}s). Press Enter or Ctrl-C to stop.",
            queue.len(),
            total.round()
        ))
    }

    fn on_phase_start(&self, _spec: &PhaseSpec) -> anyhow::Result<()> {
        Ok(())
    }

    fn on_progress(&self, spec: &PhaseSpec, sample: ProgressSample) -> anyhow::Result<()> {
        self.line(&spec.instruction(sample.countdown))
    }

    fn on_sequence_end(&self, summary: &SequenceSummary) -> anyhow::Result<()> {
        let secs = summary.elapsed.as_secs();
        match summary.state {
            SequenceState::Completed => self.line(&format!(
                "Done: {}/{} phases in {}s",
                summary.phases_completed, summary.phases_planned, secs
            )),
            _ => self.line(&format!(
                "Stopped: {}/{} phases in {}s",
                summary.phases_completed, summary.phases_planned, secs
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseKind;
    use std::time::Duration;

    #[test]
    fn test_plain_output_lines() {
        let ui = PlainUI::new(Vec::new());
        let hold = PhaseSpec::with_default_label(PhaseKind::Hold, 7.0).unwrap();
        ui.on_sequence_start(std::slice::from_ref(&hold)).unwrap();
        ui.on_phase_start(&hold).unwrap();
        ui.on_progress(
            &hold,
            ProgressSample {
                countdown: 7,
                percent: 100,
            },
        )
        .unwrap();
        ui.on_sequence_end(&SequenceSummary {
            state: SequenceState::Completed,
            phases_completed: 1,
            phases_planned: 1,
            elapsed: Duration::from_secs(7),
        })
        .unwrap();

        let out = String::from_utf8(ui.into_inner()).unwrap();
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            vec![
                "Starting 1 phases (7s). Press Enter or Ctrl-C to stop.",
                "Hold breath for 7",
                "Done: 1/1 phases in 7s",
            ]
        );
    }

    #[test]
    fn test_plain_output_when_stopped() {
        let ui = PlainUI::new(Vec::new());
        ui.on_sequence_end(&SequenceSummary {
            state: SequenceState::Cancelled,
            phases_completed: 4,
            phases_planned: 9,
            elapsed: Duration::from_millis(26_400),
        })
        .unwrap();
        let out = String::from_utf8(ui.into_inner()).unwrap();
        assert_eq!(out, "Stopped: 4/9 phases in 26s\n");
    }
}
