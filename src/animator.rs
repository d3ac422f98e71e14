//! Timed driver for a single phase.
//!
//! A `PhaseAnimator` emits an immediate sample when started, one sample per
//! countdown tick, optional sub-second indicator frames, and a final
//! zero-countdown sample at the deadline. Completion is reported exactly once
//! through the returned `PhaseCompletion`; cancelling a run drops the
//! completion sender so the owner never observes it.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};
use tracing::{debug, trace};

use crate::errors::ConfigError;
use crate::phase::PhaseSpec;
use crate::sink::PresentationSink;

/// Shortest accepted frame interval.
pub const MIN_FRAME_INTERVAL: Duration = Duration::from_millis(10);

/// How often a running phase reports progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cadence {
    /// Countdown tick interval.
    pub tick: Duration,
    /// Indicator frame interval; `None` runs discrete-only.
    pub frame: Option<Duration>,
}

impl Default for Cadence {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(1),
            frame: Some(Duration::from_millis(50)),
        }
    }
}

impl Cadence {
    /// Countdown ticks only, no continuous indicator.
    pub fn discrete() -> Self {
        Self {
            frame: None,
            ..Self::default()
        }
    }

    /// One-second ticks plus frames every `millis`; `0` disables frames.
    pub fn with_frame_millis(millis: u64) -> Result<Self, ConfigError> {
        if millis == 0 {
            return Ok(Self::discrete());
        }
        let frame = Duration::from_millis(millis);
        if frame < MIN_FRAME_INTERVAL {
            return Err(ConfigError::InvalidFrameInterval { millis });
        }
        Ok(Self {
            frame: Some(frame),
            ..Self::default()
        })
    }

    pub fn is_continuous(&self) -> bool {
        self.frame.is_some()
    }
}

/// How a phase run ended, as seen by its owner.
#[derive(Debug)]
pub enum PhaseOutcome {
    Completed,
    /// The sink rejected a tick; the run stopped at that point.
    Failed(anyhow::Error),
}

/// Resolves once the phase finishes, or to `None` if the run was cancelled.
#[derive(Debug)]
pub struct PhaseCompletion(oneshot::Receiver<PhaseOutcome>);

impl Future for PhaseCompletion {
    type Output = Option<PhaseOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx).map(Result::ok)
    }
}

/// Execution state of the active run. At most one exists per animator.
struct PhaseRun {
    /// `true` while the run may still emit. Held across every emission, so
    /// flipping it to `false` waits out an in-flight callback.
    live: Arc<Mutex<bool>>,
    task: JoinHandle<()>,
}

fn lock(live: &Mutex<bool>) -> MutexGuard<'_, bool> {
    live.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives one phase from its full duration down to zero.
pub struct PhaseAnimator {
    spec: PhaseSpec,
    sink: Arc<dyn PresentationSink>,
    cadence: Cadence,
    run: Option<PhaseRun>,
}

impl PhaseAnimator {
    /// Store the phase and its sink. Does not start timing.
    pub fn configure(spec: PhaseSpec, sink: Arc<dyn PresentationSink>, cadence: Cadence) -> Self {
        Self {
            spec,
            sink,
            cadence,
            run: None,
        }
    }

    pub fn spec(&self) -> &PhaseSpec {
        &self.spec
    }

    /// Whether a run is still ticking.
    pub fn is_active(&self) -> bool {
        self.run.as_ref().is_some_and(|run| *lock(&run.live))
    }

    /// Begin a timed run.
    ///
    /// The phase start and the first sample are delivered before this returns,
    /// so the initial countdown is visible without waiting a tick. A previous
    /// run of this animator is cancelled first.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self) -> anyhow::Result<PhaseCompletion> {
        self.cancel();

        let started_at = Instant::now();
        self.sink.on_phase_start(&self.spec)?;
        if self.cadence.is_continuous() {
            self.sink.on_frame(
                &self.spec,
                self.spec.kind().interpolate(Duration::ZERO, self.spec.duration()),
            );
        }
        self.sink.on_progress(&self.spec, self.spec.sample_at(Duration::ZERO))?;

        debug!(
            kind = %self.spec.kind(),
            duration_ms = self.spec.duration().as_millis() as u64,
            "phase started"
        );

        let (done_tx, done_rx) = oneshot::channel();
        let live = Arc::new(Mutex::new(true));
        let task = tokio::spawn(drive(
            self.spec.clone(),
            Arc::clone(&self.sink),
            self.cadence,
            started_at,
            Arc::clone(&live),
            done_tx,
        ));

        self.run = Some(PhaseRun {
            live,
            task,
        });
        Ok(PhaseCompletion(done_rx))
    }

    /// Stop the active run without reporting completion.
    ///
    /// Returns `true` if a run was still ticking. Calling this with nothing
    /// running is a no-op.
    pub fn cancel(&mut self) -> bool {
        let Some(run) = self.run.take() else {
            return false;
        };
        let was_live = std::mem::replace(&mut *lock(&run.live), false);
        run.task.abort();
        if was_live {
            debug!(kind = %self.spec.kind(), "phase cancelled");
        }
        was_live
    }
}

impl Drop for PhaseAnimator {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Roughly 30 years out, for deadlines that do not fit in an `Instant`.
fn far_future() -> Instant {
    Instant::now() + Duration::from_secs(86_400 * 365 * 30)
}

async fn next_frame(frames: &mut Option<Interval>) -> Instant {
    match frames {
        Some(interval) => interval.tick().await,
        None => std::future::pending().await,
    }
}

/// Emit through `f` only while the run is live. `None` means the run was cancelled.
fn emit<T>(live: &Mutex<bool>, f: impl FnOnce() -> T) -> Option<T> {
    let guard = lock(live);
    if !*guard {
        return None;
    }
    let out = f();
    drop(guard);
    Some(out)
}

async fn drive(
    spec: PhaseSpec,
    sink: Arc<dyn PresentationSink>,
    cadence: Cadence,
    started_at: Instant,
    live: Arc<Mutex<bool>>,
    done: oneshot::Sender<PhaseOutcome>,
) {
    let duration = spec.duration();
    let deadline = started_at.checked_add(duration).unwrap_or_else(far_future);
    let deadline = time::sleep_until(deadline);
    tokio::pin!(deadline);

    let mut ticks = time::interval_at(started_at + cadence.tick, cadence.tick);
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut frames = cadence.frame.map(|every| {
        let mut interval = time::interval_at(started_at + every, every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        interval
    });

    loop {
        tokio::select! {
            biased;

            () = &mut deadline => {
                let mut guard = lock(&live);
                if !*guard {
                    return;
                }
                if cadence.is_continuous() {
                    sink.on_frame(&spec, spec.kind().interpolate(duration, duration));
                }
                let result = sink.on_progress(&spec, spec.sample_at(duration));
                *guard = false;
                drop(guard);

                let outcome = match result {
                    Ok(()) => PhaseOutcome::Completed,
                    Err(err) => PhaseOutcome::Failed(err),
                };
                debug!(kind = %spec.kind(), "phase finished");
                let _ = done.send(outcome);
                return;
            }
            _ = ticks.tick() => {
                let elapsed = started_at.elapsed();
                if elapsed >= duration {
                    continue;
                }
                let sample = spec.sample_at(elapsed);
                trace!(
                    kind = %spec.kind(),
                    countdown = sample.countdown,
                    percent = sample.percent,
                    "tick"
                );
                match emit(&live, || sink.on_progress(&spec, sample)) {
                    None => return,
                    Some(Ok(())) => {}
                    Some(Err(err)) => {
                        *lock(&live) = false;
                        let _ = done.send(PhaseOutcome::Failed(err));
                        return;
                    }
                }
            }
            _ = next_frame(&mut frames) => {
                let elapsed = started_at.elapsed();
                if elapsed >= duration {
                    continue;
                }
                let percent = spec.kind().interpolate(elapsed, duration);
                if emit(&live, || sink.on_frame(&spec, percent)).is_none() {
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{PhaseKind, ProgressSample};
    use crate::sink::testing::RecordingSink;

    fn animator(
        kind: PhaseKind,
        seconds: f64,
        cadence: Cadence,
    ) -> (PhaseAnimator, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let spec = PhaseSpec::with_default_label(kind, seconds).unwrap();
        let animator = PhaseAnimator::configure(spec, sink.clone(), cadence);
        (animator, sink)
    }

    fn countdowns(sink: &RecordingSink) -> Vec<u64> {
        sink.progress().iter().map(|(_, s)| s.countdown).collect()
    }

    fn percents(sink: &RecordingSink) -> Vec<u8> {
        sink.progress().iter().map(|(_, s)| s.percent).collect()
    }

    #[test]
    fn test_cadence_with_frame_millis() {
        assert_eq!(Cadence::with_frame_millis(0).unwrap(), Cadence::discrete());
        assert_eq!(
            Cadence::with_frame_millis(40).unwrap().frame,
            Some(Duration::from_millis(40))
        );
        assert_eq!(
            Cadence::with_frame_millis(5).unwrap_err(),
            ConfigError::InvalidFrameInterval { millis: 5 }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_sample_is_emitted_synchronously() {
        let (mut animator, sink) = animator(PhaseKind::Inhale, 4.0, Cadence::discrete());
        let _completion = animator.start().unwrap();
        assert_eq!(
            sink.progress(),
            vec![(
                PhaseKind::Inhale,
                ProgressSample {
                    countdown: 4,
                    percent: 0
                }
            )]
        );
        assert!(animator.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inhale_runs_to_completion() {
        let (mut animator, sink) = animator(PhaseKind::Inhale, 4.0, Cadence::discrete());
        let completion = animator.start().unwrap();
        let outcome = completion.await;
        assert!(matches!(outcome, Some(PhaseOutcome::Completed)));
        assert_eq!(countdowns(&sink), vec![4, 3, 2, 1, 0]);
        assert_eq!(percents(&sink), vec![0, 25, 50, 75, 100]);
        assert!(!animator.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_hold_and_exhale_percent_policies() {
        let (mut hold, hold_sink) = animator(PhaseKind::Hold, 7.0, Cadence::discrete());
        hold.start().unwrap().await;
        assert_eq!(countdowns(&hold_sink), vec![7, 6, 5, 4, 3, 2, 1, 0]);
        assert!(percents(&hold_sink).iter().all(|p| *p == 100));

        let (mut exhale, exhale_sink) = animator(PhaseKind::Exhale, 8.0, Cadence::discrete());
        exhale.start().unwrap().await;
        assert_eq!(countdowns(&exhale_sink), vec![8, 7, 6, 5, 4, 3, 2, 1, 0]);
        let pct = percents(&exhale_sink);
        assert_eq!(pct.first(), Some(&100));
        assert_eq!(pct.last(), Some(&0));
        assert!(pct.windows(2).all(|w| w[0] >= w[1]));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fractional_duration_emits_final_zero_once() {
        let (mut animator, sink) = animator(PhaseKind::Exhale, 2.5, Cadence::discrete());
        animator.start().unwrap().await;
        let cd = countdowns(&sink);
        assert_eq!(cd.iter().filter(|c| **c == 0).count(), 1);
        assert_eq!(cd.last(), Some(&0));
        assert_eq!(percents(&sink).last(), Some(&0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_frames_interpolate_between_ticks() {
        let cadence = Cadence::with_frame_millis(100).unwrap();
        let (mut animator, sink) = animator(PhaseKind::Inhale, 1.0, cadence);
        animator.start().unwrap().await;

        let frames = sink.frames();
        assert!(frames.len() >= 10, "expected sub-second frames, got {}", frames.len());
        assert_eq!(frames.first().map(|f| f.1), Some(0.0));
        assert_eq!(frames.last().map(|f| f.1), Some(100.0));
        assert!(frames.windows(2).all(|w| w[0].1 <= w[1].1));
        assert_eq!(countdowns(&sink), vec![1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_ticks_and_suppresses_completion() {
        let (mut animator, sink) = animator(PhaseKind::Hold, 7.0, Cadence::default());
        let completion = animator.start().unwrap();

        time::sleep(Duration::from_millis(2500)).await;
        assert!(animator.cancel());
        let seen = sink.events().len();

        time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.events().len(), seen);
        assert!(completion.await.is_none());
        assert!(!countdowns(&sink).contains(&0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_is_idempotent() {
        let (mut animator, _sink) = animator(PhaseKind::Inhale, 3.0, Cadence::discrete());
        assert!(!animator.cancel());
        let _completion = animator.start().unwrap();
        assert!(animator.cancel());
        assert!(!animator.cancel());
        assert!(!animator.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_after_completion_is_noop() {
        let (mut animator, sink) = animator(PhaseKind::Inhale, 1.0, Cadence::discrete());
        animator.start().unwrap().await;
        let seen = sink.events().len();
        assert!(!animator.cancel());
        assert_eq!(sink.events().len(), seen);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_cancels_previous_run() {
        let (mut animator, sink) = animator(PhaseKind::Inhale, 2.0, Cadence::discrete());
        let first = animator.start().unwrap();
        time::sleep(Duration::from_millis(500)).await;
        let second = animator.start().unwrap();

        assert!(first.await.is_none());
        assert!(matches!(second.await, Some(PhaseOutcome::Completed)));
        assert_eq!(countdowns(&sink), vec![2, 2, 1, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_on_tick_is_reported() {
        let sink = Arc::new(RecordingSink::failing_on_progress(2));
        let spec = PhaseSpec::with_default_label(PhaseKind::Inhale, 5.0).unwrap();
        let mut animator = PhaseAnimator::configure(spec, sink.clone(), Cadence::discrete());
        let outcome = animator.start().unwrap().await;
        match outcome {
            Some(PhaseOutcome::Failed(err)) => assert!(err.to_string().contains("refused")),
            other => panic!("Expected Failed outcome, got {:?}", other),
        }
        assert_eq!(countdowns(&sink), vec![5, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_failure_on_first_sample_fails_start() {
        let sink = Arc::new(RecordingSink::failing_on_progress(0));
        let spec = PhaseSpec::with_default_label(PhaseKind::Hold, 5.0).unwrap();
        let mut animator = PhaseAnimator::configure(spec, sink, Cadence::discrete());
        assert!(animator.start().is_err());
        assert!(!animator.is_active());
    }
}
