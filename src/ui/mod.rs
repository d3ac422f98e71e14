//! Presentation sinks for the terminal.
//!
//! Three output modes share the `PresentationSink` contract:
//! - `full`: indicatif bars with a growing/shrinking breath indicator
//! - `minimal`: one plain line per countdown tick
//! - `json`: one JSON object per event, for machine consumption

pub mod icons;
pub mod json;
pub mod plain;
pub mod progress;

use std::sync::Arc;

use crate::animator::Cadence;
use crate::sink::PresentationSink;

pub use json::JsonUI;
pub use plain::PlainUI;
pub use progress::BreathUI;

/// Output mode for a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UiMode {
    /// Rich terminal UI with progress bars
    #[default]
    Full,
    /// Plain line-per-tick output
    Minimal,
    /// JSON-formatted events
    Json,
}

impl std::str::FromStr for UiMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(Self::Full),
            "minimal" => Ok(Self::Minimal),
            "json" => Ok(Self::Json),
            _ => anyhow::bail!("Invalid ui mode '{}'. Valid values: full, minimal, json", s),
        }
    }
}

impl std::fmt::Display for UiMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UiMode::Full => write!(f, "full"),
            UiMode::Minimal => write!(f, "minimal"),
            UiMode::Json => write!(f, "json"),
        }
    }
}

/// Build the sink for `mode`.
///
/// Only the full UI animates the indicator between ticks; the other modes
/// ignore frames.
pub fn build_sink(mode: UiMode, cadence: &Cadence) -> Arc<dyn PresentationSink> {
    match mode {
        UiMode::Full => Arc::new(BreathUI::new(cadence.is_continuous())),
        UiMode::Minimal => Arc::new(PlainUI::new(std::io::stdout())),
        UiMode::Json => Arc::new(JsonUI::new(std::io::stdout())),
    }
}
