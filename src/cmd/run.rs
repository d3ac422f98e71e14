//! Session commands: `breathe start` and `breathe plan`.

use anyhow::Result;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use breathe::config::{BreatheToml, Timing, TimingOverrides};
use breathe::ui::{UiMode, build_sink, icons::phase_icon};
use breathe::{Cadence, PhaseSpec, Sequencer};

use super::super::TimingArgs;

impl TimingArgs {
    fn overrides(&self) -> TimingOverrides {
        TimingOverrides {
            breathe_in: self.breathe_in,
            hold: self.hold,
            breathe_out: self.breathe_out,
            repeat: self.repeat,
        }
    }
}

/// Load breathe.toml and layer CLI flags over the environment, the preset and `[timing]`.
fn resolve(config_path: &Path, args: &TimingArgs) -> Result<(BreatheToml, Timing)> {
    let toml = BreatheToml::load_or_default(config_path)?;
    let overrides = args.overrides().or(TimingOverrides::from_env()?);
    let timing = toml.resolve_timing(args.preset.as_deref(), &overrides)?;
    tracing::debug!(
        breathe_in = timing.breathe_in,
        hold = timing.hold,
        breathe_out = timing.breathe_out,
        repeat = timing.repeat,
        preset = args.preset.as_deref().unwrap_or("-"),
        "Resolved timing"
    );
    Ok((toml, timing))
}

pub async fn cmd_start(
    config_path: &Path,
    args: &TimingArgs,
    ui: Option<&str>,
    frame_ms: Option<u64>,
) -> Result<()> {
    let (toml, timing) = resolve(config_path, args)?;
    let mode: UiMode = ui.unwrap_or(&toml.display.ui).parse()?;
    let cadence = match frame_ms {
        Some(millis) => Cadence::with_frame_millis(millis)?,
        None => toml.display.cadence()?,
    };
    let phases = timing.cycle(&toml.labels)?;

    let mut sequencer = Sequencer::new()
        .with_sink(build_sink(mode, &cadence))
        .with_cadence(cadence);

    let stop = CancellationToken::new();
    spawn_stop_listeners(&stop);

    sequencer.start(&phases, timing.repeat)?;
    let summary = sequencer.run(stop).await?;

    tracing::info!(
        state = %summary.state,
        completed = summary.phases_completed,
        planned = summary.phases_planned,
        elapsed_ms = summary.elapsed.as_millis() as u64,
        "Session finished"
    );
    Ok(())
}

/// Cancel `stop` on Ctrl-C, or on Enter when stdin is a terminal.
fn spawn_stop_listeners(stop: &CancellationToken) {
    let on_signal = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received Ctrl-C, stopping session");
            on_signal.cancel();
        }
    });

    if std::io::stdin().is_terminal() {
        let on_enter = stop.clone();
        // Blocking read on its own thread; it is abandoned when the process exits.
        std::thread::spawn(move || {
            let mut line = String::new();
            if matches!(std::io::stdin().read_line(&mut line), Ok(n) if n > 0) {
                tracing::info!("Enter pressed, stopping session");
                on_enter.cancel();
            }
        });
    }
}

pub fn cmd_plan(config_path: &Path, args: &TimingArgs) -> Result<()> {
    let (toml, timing) = resolve(config_path, args)?;
    let cycle = timing.cycle(&toml.labels)?;
    let queue = Sequencer::plan(&cycle, timing.repeat)?;
    let total: Duration = queue.iter().map(PhaseSpec::duration).sum();

    println!();
    println!("Session Plan");
    println!("============");
    println!();
    println!(
        "{} in / {} hold / {} out, {} x {}",
        format_duration(cycle[0].duration()),
        format_duration(cycle[1].duration()),
        format_duration(cycle[2].duration()),
        timing.repeat,
        if timing.repeat == 1 { "cycle" } else { "cycles" }
    );
    println!();
    println!("{:<5} {:<10} {:<10} Instruction", "#", "Phase", "Duration");
    println!("{:<5} {:<10} {:<10} -----------", "---", "------", "--------");

    for (i, spec) in queue.iter().enumerate() {
        println!(
            "{:<5} {}{:<8} {:<10} {}",
            i + 1,
            phase_icon(spec.kind()),
            spec.kind().to_string(),
            format_duration(spec.duration()),
            console::style(spec.label()).dim()
        );
    }

    println!();
    println!(
        "{} phases, {} total",
        queue.len(),
        format_duration(total)
    );
    println!();
    Ok(())
}

/// `4s`, `0.5s`, `1m 3s`.
fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs_f64();
    if secs.fract() != 0.0 && secs < 60.0 {
        return format!("{:.1}s", secs);
    }
    let whole = secs.round() as u64;
    if whole >= 60 {
        format!("{}m {}s", whole / 60, whole % 60)
    } else {
        format!("{}s", whole)
    }
}
