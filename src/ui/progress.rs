use crate::phase::{PhaseKind, PhaseSpec, ProgressSample};
use crate::sink::{PresentationSink, SequenceState, SequenceSummary};
use crate::ui::icons::{CHECK, CLOCK, STOP, phase_icon};
use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Terminal UI for a breathing session, rendered via `indicatif` progress bars.
///
/// Two bars are stacked vertically:
/// - Breath bar: the indicator that fills while inhaling, stays full while
///   holding and empties while exhaling, with the instruction as its message
/// - Session bar: how many phases of the queue have completed
pub struct BreathUI {
    multi: MultiProgress,
    breath_bar: ProgressBar,
    session_bar: ProgressBar,
    continuous: bool,
}

impl BreathUI {
    /// Create the UI drawing to stderr.
    ///
    /// # Arguments
    /// * `continuous`: when `true` the breath bar follows sub-second frames;
    ///   when `false` it only moves on countdown ticks
    pub fn new(continuous: bool) -> Self {
        Self::with_draw_target(ProgressDrawTarget::stderr(), continuous)
    }

    pub fn with_draw_target(target: ProgressDrawTarget, continuous: bool) -> Self {
        let multi = MultiProgress::with_draw_target(target);

        let breath_style = ProgressStyle::default_bar()
            .template("{prefix} [{bar:50.cyan/blue}] {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let breath_bar = multi.add(ProgressBar::new(100));
        breath_bar.set_style(breath_style);

        let session_style = ProgressStyle::default_bar()
            .template("{prefix:.bold.dim} [{bar:20.green/white}] {pos}/{len} {msg}")
            .expect("progress bar template is a valid static string")
            .progress_chars("█▓▒░");

        let session_bar = multi.add(ProgressBar::new(0));
        session_bar.set_style(session_style);
        session_bar.set_prefix("Session");

        Self {
            multi,
            breath_bar,
            session_bar,
            continuous,
        }
    }

    /// Print a line above the bars, falling back to `eprintln!` if drawing fails.
    fn print_line(&self, msg: impl AsRef<str>) {
        if self.multi.println(msg.as_ref()).is_err() {
            eprintln!("{}", msg.as_ref());
        }
    }

    fn set_indicator(&self, percent: f64) {
        self.breath_bar.set_position(percent.round().clamp(0.0, 100.0) as u64);
    }
}

fn phase_name(kind: PhaseKind) -> &'static str {
    match kind {
        PhaseKind::Inhale => "Inhale",
        PhaseKind::Hold => "Hold",
        PhaseKind::Exhale => "Exhale",
    }
}

fn format_secs(secs: u64) -> String {
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}s", secs)
    }
}

impl PresentationSink for BreathUI {
    fn on_sequence_start(&self, queue: &[PhaseSpec]) -> anyhow::Result<()> {
        let total: f64 = queue.iter().map(|p| p.duration().as_secs_f64()).sum();
        self.session_bar.set_length(queue.len() as u64);
        self.session_bar.set_position(0);

        self.print_line("");
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
        self.print_line(format!(
            "{} Breathing session: {} phases, {}",
            style("▶").green().bold(),
            style(queue.len()).yellow().bold(),
            format_secs(total.round() as u64)
        ));
        self.print_line(format!(
            "{}",
            style("Press Enter or Ctrl-C to stop").dim()
        ));
        self.print_line(format!("{}", style("═".repeat(60)).cyan()));
        Ok(())
    }

    fn on_phase_start(&self, spec: &PhaseSpec) -> anyhow::Result<()> {
        let (from, _) = spec.kind().indicator_range();
        self.breath_bar
            .set_prefix(format!("{}{:<6}", phase_icon(spec.kind()), phase_name(spec.kind())));
        self.set_indicator(f64::from(from));
        self.session_bar
            .set_message(format!("{}", style(spec.label()).dim()));
        Ok(())
    }

    fn on_progress(&self, spec: &PhaseSpec, sample: ProgressSample) -> anyhow::Result<()> {
        self.breath_bar
            .set_message(format!("{}", style(spec.instruction(sample.countdown)).bold()));
        if !self.continuous {
            self.set_indicator(f64::from(sample.percent));
        }
        Ok(())
    }

    fn on_frame(&self, _spec: &PhaseSpec, percent: f64) {
        if self.continuous {
            self.set_indicator(percent);
        }
    }

    fn on_phase_complete(&self, _spec: &PhaseSpec) -> anyhow::Result<()> {
        self.session_bar.inc(1);
        Ok(())
    }

    fn on_sequence_end(&self, summary: &SequenceSummary) -> anyhow::Result<()> {
        self.breath_bar.finish_and_clear();
        let elapsed = format_secs(summary.elapsed.as_secs());
        match summary.state {
            SequenceState::Completed => {
                self.session_bar
                    .finish_with_message(format!("{}", style("complete").green()));
                self.print_line(format!(
                    "\n{}Session complete: {} phases in {}\n",
                    CHECK,
                    style(summary.phases_completed).green().bold(),
                    elapsed
                ));
            }
            _ => {
                self.session_bar.abandon_with_message(format!("{}", style("stopped").yellow()));
                self.print_line(format!(
                    "\n{}Session stopped after {}/{} phases {}{}\n",
                    STOP,
                    style(summary.phases_completed).yellow().bold(),
                    summary.phases_planned,
                    CLOCK,
                    elapsed
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn hidden(continuous: bool) -> BreathUI {
        BreathUI::with_draw_target(ProgressDrawTarget::hidden(), continuous)
    }

    fn spec(kind: PhaseKind, secs: f64) -> PhaseSpec {
        PhaseSpec::with_default_label(kind, secs).unwrap()
    }

    #[test]
    fn test_format_secs() {
        assert_eq!(format_secs(8), "8s");
        assert_eq!(format_secs(57), "57s");
        assert_eq!(format_secs(125), "2m 5s");
    }

    #[test]
    fn test_sequence_start_sizes_session_bar() {
        let ui = hidden(true);
        let queue = vec![spec(PhaseKind::Inhale, 4.0), spec(PhaseKind::Hold, 7.0)];
        ui.on_sequence_start(&queue).unwrap();
        assert_eq!(ui.session_bar.length(), Some(2));
        assert_eq!(ui.session_bar.position(), 0);
    }

    #[test]
    fn test_phase_start_resets_indicator() {
        let ui = hidden(true);
        ui.on_phase_start(&spec(PhaseKind::Exhale, 8.0)).unwrap();
        assert_eq!(ui.breath_bar.position(), 100);
        ui.on_phase_start(&spec(PhaseKind::Inhale, 4.0)).unwrap();
        assert_eq!(ui.breath_bar.position(), 0);
    }

    #[test]
    fn test_continuous_indicator_follows_frames_only() {
        let ui = hidden(true);
        let inhale = spec(PhaseKind::Inhale, 4.0);
        ui.on_frame(&inhale, 37.4);
        assert_eq!(ui.breath_bar.position(), 37);
        ui.on_progress(
            &inhale,
            ProgressSample {
                countdown: 2,
                percent: 50,
            },
        )
        .unwrap();
        assert_eq!(ui.breath_bar.position(), 37);
        assert!(ui.breath_bar.message().contains("Breathe in for 2"));
    }

    #[test]
    fn test_discrete_indicator_follows_ticks() {
        let ui = hidden(false);
        let exhale = spec(PhaseKind::Exhale, 8.0);
        ui.on_frame(&exhale, 10.0);
        assert_eq!(ui.breath_bar.position(), 0);
        ui.on_progress(
            &exhale,
            ProgressSample {
                countdown: 6,
                percent: 75,
            },
        )
        .unwrap();
        assert_eq!(ui.breath_bar.position(), 75);
    }

    #[test]
    fn test_phase_complete_advances_session() {
        let ui = hidden(false);
        let queue = vec![spec(PhaseKind::Inhale, 1.0); 3];
        ui.on_sequence_start(&queue).unwrap();
        ui.on_phase_complete(&queue[0]).unwrap();
        ui.on_phase_complete(&queue[1]).unwrap();
        assert_eq!(ui.session_bar.position(), 2);

        ui.on_sequence_end(&SequenceSummary {
            state: SequenceState::Cancelled,
            phases_completed: 2,
            phases_planned: 3,
            elapsed: Duration::from_secs(2),
        })
        .unwrap();
        assert!(ui.session_bar.is_finished());
    }
}
