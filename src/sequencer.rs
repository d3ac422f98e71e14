//! Sequence orchestration: runs the repeated phase queue one phase at a time.
//!
//! The `Sequencer` is the single owner of the queue and of the active
//! `PhaseAnimator`. Phase completion arrives as a `PhaseCompletion` future; the
//! next phase is started synchronously while that completion is handled, so two
//! phases never tick at the same time.
//!
//! ```text
//! Idle ──start()──▶ Running ──queue drained──▶ Completed
//!                      │
//!                      └────stop()───────────▶ Cancelled
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Largest accepted repeat count.
pub const MAX_REPEAT: u32 = 10_000;

/// Reject a repeat count of zero or above `MAX_REPEAT`.
pub fn validate_repeat(repeat: u32) -> Result<(), ConfigError> {
    if repeat == 0 {
        return Err(ConfigError::InvalidRepeat { repeat });
    }
    if repeat > MAX_REPEAT {
        return Err(ConfigError::RepeatTooLarge {
            repeat,
            max: MAX_REPEAT,
        });
    }
    Ok(())
}

use crate::animator::{Cadence, PhaseAnimator, PhaseCompletion, PhaseOutcome};
use crate::config::Timing;
use crate::errors::{ConfigError, SequenceError};
use crate::phase::{PhaseLabels, PhaseSpec};
use crate::sink::{PresentationSink, SequenceState, SequenceSummary};

/// Drives a breathing session through its phases.
pub struct Sequencer {
    sink: Option<Arc<dyn PresentationSink>>,
    cadence: Cadence,
    state: SequenceState,
    queue: VecDeque<PhaseSpec>,
    animator: Option<PhaseAnimator>,
    completion: Option<PhaseCompletion>,
    phases_planned: usize,
    phases_completed: usize,
    started_at: Option<Instant>,
    ended_at: Option<Instant>,
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

impl Sequencer {
    /// Create an idle sequencer with no sink attached.
    pub fn new() -> Self {
        Self {
            sink: None,
            cadence: Cadence::default(),
            state: SequenceState::Idle,
            queue: VecDeque::new(),
            animator: None,
            completion: None,
            phases_planned: 0,
            phases_completed: 0,
            started_at: None,
            ended_at: None,
        }
    }

    /// Attach the presentation sink every phase reports to.
    pub fn with_sink(mut self, sink: Arc<dyn PresentationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_cadence(mut self, cadence: Cadence) -> Self {
        self.cadence = cadence;
        self
    }

    pub fn state(&self) -> SequenceState {
        self.state
    }

    /// Phases still waiting to run, excluding the active one.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    /// The phase currently ticking, if any.
    pub fn current(&self) -> Option<&PhaseSpec> {
        self.animator
            .as_ref()
            .filter(|animator| animator.is_active())
            .map(PhaseAnimator::spec)
    }

    pub fn summary(&self) -> SequenceSummary {
        SequenceSummary {
            state: self.state,
            phases_completed: self.phases_completed,
            phases_planned: self.phases_planned,
            elapsed: match self.started_at {
                Some(start) => self.ended_at.unwrap_or_else(Instant::now) - start,
                None => Duration::ZERO,
            },
        }
    }

    /// The queue `start()` would run: `repeat` copies of `phases`, in order.
    pub fn plan(phases: &[PhaseSpec], repeat: u32) -> Result<Vec<PhaseSpec>, ConfigError> {
        validate_repeat(repeat)?;
        if phases.is_empty() {
            return Err(ConfigError::EmptySequence);
        }
        Ok((0..repeat).flat_map(|_| phases.iter().cloned()).collect())
    }

    /// Start the default inhale/hold/exhale cycle for `timing`.
    pub fn start_sequence(&mut self, timing: &Timing) -> Result<(), SequenceError> {
        let cycle = timing.cycle(&PhaseLabels::default())?;
        self.start(&cycle, timing.repeat)
    }

    /// Build the queue and run its first phase.
    ///
    /// Calling this while a sequence is running is ignored. A finished or
    /// stopped sequencer starts over with a fresh queue.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self, phases: &[PhaseSpec], repeat: u32) -> Result<(), SequenceError> {
        if self.state == SequenceState::Running {
            debug!("start ignored, sequence already running");
            return Ok(());
        }
        if self.state.is_terminal() {
            debug!(previous = %self.state, "restarting sequence");
        }
        let sink = self.sink.clone().ok_or(ConfigError::MissingSink)?;
        let queue = Self::plan(phases, repeat)?;

        sink.on_sequence_start(&queue).map_err(SequenceError::Sink)?;

        info!(
            phases = phases.len(),
            repeat,
            total = queue.len(),
            "sequence started"
        );
        self.phases_planned = queue.len();
        self.phases_completed = 0;
        self.queue = queue.into();
        self.started_at = Some(Instant::now());
        self.ended_at = None;
        self.state = SequenceState::Running;

        self.advance()
    }

    /// Stop the sequence: cancel the active phase and drop the rest of the queue.
    ///
    /// No tick or completion from the cancelled phase is observed after this
    /// returns. Ignored unless a sequence is running.
    pub fn stop(&mut self) -> Result<(), SequenceError> {
        if self.state != SequenceState::Running {
            debug!(state = %self.state, "stop ignored, sequence not running");
            return Ok(());
        }
        self.halt();
        self.state = SequenceState::Cancelled;
        info!(
            completed = self.phases_completed,
            planned = self.phases_planned,
            "sequence cancelled"
        );
        self.end()
    }

    /// Wait for the active phase to finish and start the next one.
    ///
    /// Returns immediately when nothing is running. Cancel-safe: dropping the
    /// future before it resolves leaves the active phase untouched.
    pub async fn step(&mut self) -> Result<(), SequenceError> {
        let Some(completion) = self.completion.as_mut() else {
            return Ok(());
        };
        let outcome = completion.await;
        self.completion = None;

        match outcome {
            Some(PhaseOutcome::Completed) => {
                self.phases_completed += 1;
                let notified = match (&self.animator, &self.sink) {
                    (Some(animator), Some(sink)) => {
                        debug!(kind = %animator.spec().kind(), "phase complete");
                        sink.on_phase_complete(animator.spec())
                    }
                    _ => Ok(()),
                };
                if let Err(err) = notified {
                    return Err(self.fail(err));
                }
                self.advance()
            }
            Some(PhaseOutcome::Failed(err)) => Err(self.fail(err)),
            // The drive task went away without reporting, e.g. a panicking sink.
            None if self.state == SequenceState::Running => {
                Err(self.fail(anyhow::anyhow!("phase ended without completing")))
            }
            None => Ok(()),
        }
    }

    /// Run until the queue drains or `stop` is cancelled.
    pub async fn run(&mut self, stop: CancellationToken) -> Result<SequenceSummary, SequenceError> {
        while self.state == SequenceState::Running {
            tokio::select! {
                biased;

                () = stop.cancelled() => self.stop()?,
                result = self.step() => result?,
            }
        }
        Ok(self.summary())
    }

    fn advance(&mut self) -> Result<(), SequenceError> {
        if self.state != SequenceState::Running {
            debug!(state = %self.state, "advance ignored, sequence not running");
            return Ok(());
        }
        let sink = self.sink.clone().ok_or(ConfigError::MissingSink)?;

        let Some(spec) = self.queue.pop_front() else {
            self.animator = None;
            self.state = SequenceState::Completed;
            info!(completed = self.phases_completed, "sequence completed");
            return self.end();
        };

        let mut animator = PhaseAnimator::configure(spec, sink, self.cadence);
        match animator.start() {
            Ok(completion) => {
                self.animator = Some(animator);
                self.completion = Some(completion);
                Ok(())
            }
            Err(err) => Err(self.fail(err)),
        }
    }

    /// Cancel the active phase and discard the queue.
    fn halt(&mut self) {
        if let Some(mut animator) = self.animator.take() {
            animator.cancel();
        }
        self.completion = None;
        self.queue.clear();
    }

    fn end(&mut self) -> Result<(), SequenceError> {
        self.ended_at = Some(Instant::now());
        let summary = self.summary();
        match &self.sink {
            Some(sink) => sink.on_sequence_end(&summary).map_err(SequenceError::Sink),
            None => Ok(()),
        }
    }

    /// Abort after a sink failure mid-sequence, still closing out the run.
    fn fail(&mut self, err: anyhow::Error) -> SequenceError {
        self.halt();
        self.state = SequenceState::Cancelled;
        warn!(error = %err, "sequence aborted by presentation failure");
        if let Err(end_err) = self.end() {
            warn!(error = %end_err, "sink failed while ending sequence");
        }
        SequenceError::Sink(err)
    }
}
