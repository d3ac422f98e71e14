//! Configuration commands: `breathe config` and `breathe presets`.

use anyhow::Result;
use std::io::IsTerminal;
use std::path::Path;

use breathe::config::{BreatheToml, Timing, TimingOverrides};
use breathe::ui::icons::{CHECK, CROSS};

use super::super::ConfigCommands;

fn print_timing(timing: &Timing) {
    println!("  breathe_in = {}", timing.breathe_in);
    println!("  hold = {}", timing.hold);
    println!("  breathe_out = {}", timing.breathe_out);
    println!("  repeat = {}", timing.repeat);
}

fn print_sections(toml: &BreatheToml) {
    println!("[timing]");
    print_timing(&toml.timing);
    println!();

    println!("[labels]");
    println!("  inhale = \"{}\"", toml.labels.inhale);
    println!("  hold = \"{}\"", toml.labels.hold);
    println!("  exhale = \"{}\"", toml.labels.exhale);
    println!();

    println!("[display]");
    println!("  ui = \"{}\"", toml.display.ui);
    println!("  frame_interval_ms = {}", toml.display.frame_interval_ms);
    println!();

    for (name, timing) in &toml.presets {
        println!("[presets.{}]", name);
        print_timing(timing);
        println!();
    }
}

pub fn cmd_config(config_path: &Path, command: Option<ConfigCommands>) -> Result<()> {
    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Breathe Configuration");
            println!("=====================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                println!();
                BreatheToml::load(config_path)?
            } else {
                println!("No breathe.toml found at {}", config_path.display());
                println!();
                println!("Using default configuration:");
                println!();
                BreatheToml::default()
            };
            print_sections(&toml);

            let env = TimingOverrides::from_env()?;
            if env != TimingOverrides::default() {
                println!("Effective timing (with environment overrides):");
                print_timing(&env.apply(toml.timing));
                println!();
            }

            if !config_path.exists() {
                println!("Run 'breathe config init' to create a breathe.toml file.");
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No breathe.toml found. Using defaults (valid).");
                return Ok(());
            }

            let toml = BreatheToml::load(config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("{}Configuration is valid.", CHECK);
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  {}{}", CROSS, warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                let overwrite = std::io::stdin().is_terminal()
                    && dialoguer::Confirm::new()
                        .with_prompt(format!(
                            "breathe.toml already exists at {}. Overwrite?",
                            config_path.display()
                        ))
                        .default(false)
                        .interact()
                        .unwrap_or(false);

                if !overwrite {
                    println!("breathe.toml already exists at {}", config_path.display());
                    println!("Use --force to overwrite it.");
                    return Ok(());
                }
            }

            BreatheToml::default().save(config_path)?;
            tracing::info!(path = %config_path.display(), "Wrote default config");

            println!("Created breathe.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [timing] breathe_in, hold, breathe_out, repeat");
            println!("  - [labels] the instruction shown for each phase");
            println!("  - [display] ui, frame_interval_ms");
            println!("  - [presets.<name>] for named timings");
            println!();
        }
    }

    Ok(())
}

pub fn cmd_presets(config_path: &Path) -> Result<()> {
    let toml = BreatheToml::load_or_default(config_path)?;

    println!();
    println!(
        "{:<12} {:<8} {:<8} {:<8} {:<8} Total",
        "Preset", "In", "Hold", "Out", "Repeat"
    );
    println!(
        "{:<12} {:<8} {:<8} {:<8} {:<8} -----",
        "------------", "--", "----", "---", "------"
    );

    for (name, timing) in toml.presets() {
        let source = if toml.presets.contains_key(&name) {
            format!(" {}", console::style("(config)").dim())
        } else {
            String::new()
        };
        println!(
            "{:<12} {:<8} {:<8} {:<8} {:<8} {}s{}",
            name,
            timing.breathe_in,
            timing.hold,
            timing.breathe_out,
            timing.repeat,
            timing.total_seconds(),
            source
        );
    }
    println!();
    println!("Use a preset with 'breathe start --preset <name>'.");
    println!();
    Ok(())
}
