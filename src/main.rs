use anyhow::Result;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

mod cmd;

#[derive(Parser)]
#[command(name = "breathe")]
#[command(version, about = "Guided breathing exercises in the terminal")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to breathe.toml. Defaults to <config dir>/breathe/breathe.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Append logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Timing flags shared by `start` and `plan`. Unset flags fall back to the
/// environment, then the preset, then `[timing]` in breathe.toml.
#[derive(Args, Debug, Clone, Default)]
pub struct TimingArgs {
    /// Inhale duration in seconds
    #[arg(long = "breathe-in", value_name = "SECS")]
    pub breathe_in: Option<f64>,

    /// Hold duration in seconds
    #[arg(long, value_name = "SECS")]
    pub hold: Option<f64>,

    /// Exhale duration in seconds
    #[arg(long = "breathe-out", value_name = "SECS")]
    pub breathe_out: Option<f64>,

    /// Number of inhale/hold/exhale cycles
    #[arg(short, long)]
    pub repeat: Option<u32>,

    /// Start from a named preset (see `breathe presets`)
    #[arg(short, long)]
    pub preset: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a breathing session. Press Enter or Ctrl-C to stop early
    Start {
        #[command(flatten)]
        timing: TimingArgs,

        /// Output mode: full, minimal or json
        #[arg(long)]
        ui: Option<String>,

        /// Indicator frame interval in milliseconds (0 for once per second)
        #[arg(long, value_name = "MS")]
        frame_ms: Option<u64>,
    },
    /// Print the phase queue a session would run, without running it
    Plan {
        #[command(flatten)]
        timing: TimingArgs,
    },
    /// List built-in and configured presets
    Presets,
    /// View or validate configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the current configuration
    Show,
    /// Validate the configuration file
    Validate,
    /// Write a default breathe.toml
    Init {
        /// Overwrite an existing file without asking
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = breathe::logging::init_logging(cli.verbose, cli.log_file.as_deref())?;
    let config_path = breathe::config::config_path(cli.config.as_deref())?;
    tracing::debug!(config = %config_path.display(), "Resolved config path");

    match &cli.command {
        Commands::Start {
            timing,
            ui,
            frame_ms,
        } => cmd::cmd_start(&config_path, timing, ui.as_deref(), *frame_ms).await?,
        Commands::Plan { timing } => cmd::cmd_plan(&config_path, timing)?,
        Commands::Presets => cmd::cmd_presets(&config_path)?,
        Commands::Config { command } => cmd::cmd_config(&config_path, command.clone())?,
    }

    Ok(())
}
