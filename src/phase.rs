//! Phase definitions for the breathing cycle.
//!
//! This module provides:
//! - `PhaseKind`: inhale, hold or exhale, carrying its percent-mapping policy
//! - `PhaseSpec`: an immutable, validated phase (kind, label, duration)
//! - `ProgressSample`: the countdown/percent pair emitted on every tick
//! - `PhaseLabels` and `breathing_cycle` to build the base (inhale, hold, exhale) triple

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ConfigError;

/// Longest accepted phase, in seconds (one day).
pub const MAX_PHASE_SECONDS: f64 = 86_400.0;

/// The three segments of a breathing cycle.
///
/// The kind decides how remaining time maps to the indicator percent:
///
/// | Kind     | Percent                               | Indicator |
/// |----------|---------------------------------------|-----------|
/// | `Inhale` | `round(100 * elapsed / duration)`     | 0 → 100   |
/// | `Hold`   | `100`                                 | 100 → 100 |
/// | `Exhale` | `round(100 * remaining / duration)`   | 100 → 0   |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseKind {
    Inhale,
    Hold,
    Exhale,
}

impl PhaseKind {
    /// Base cycle order.
    pub const CYCLE: [PhaseKind; 3] = [PhaseKind::Inhale, PhaseKind::Hold, PhaseKind::Exhale];

    /// Instruction text shown before the countdown number.
    pub fn default_label(self) -> &'static str {
        match self {
            PhaseKind::Inhale => "Breathe in for",
            PhaseKind::Hold => "Hold breath for",
            PhaseKind::Exhale => "Breathe out for",
        }
    }

    /// Indicator size at the start and at the end of the phase, in percent.
    pub fn indicator_range(self) -> (u8, u8) {
        match self {
            PhaseKind::Inhale => (0, 100),
            PhaseKind::Hold => (100, 100),
            PhaseKind::Exhale => (100, 0),
        }
    }

    /// Unrounded indicator percent for a point in the phase.
    ///
    /// `elapsed` is clamped to `[0, duration]`, so the result always lies in `[0.0, 100.0]`.
    pub fn interpolate(self, elapsed: Duration, duration: Duration) -> f64 {
        let total = duration.as_secs_f64();
        let fraction = if total > 0.0 {
            (elapsed.as_secs_f64() / total).clamp(0.0, 1.0)
        } else {
            1.0
        };
        match self {
            PhaseKind::Inhale => 100.0 * fraction,
            PhaseKind::Hold => 100.0,
            PhaseKind::Exhale => 100.0 * (1.0 - fraction),
        }
    }

    /// Rounded indicator percent used in progress samples.
    pub fn percent(self, elapsed: Duration, duration: Duration) -> u8 {
        self.interpolate(elapsed, duration).round() as u8
    }
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseKind::Inhale => write!(f, "inhale"),
            PhaseKind::Hold => write!(f, "hold"),
            PhaseKind::Exhale => write!(f, "exhale"),
        }
    }
}

impl std::str::FromStr for PhaseKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "inhale" | "in" => Ok(PhaseKind::Inhale),
            "hold" => Ok(PhaseKind::Hold),
            "exhale" | "out" => Ok(PhaseKind::Exhale),
            _ => anyhow::bail!(
                "Invalid phase kind '{}'. Valid values: inhale, hold, exhale",
                s
            ),
        }
    }
}

/// A single configured phase. Validated on construction, never mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseSpec {
    kind: PhaseKind,
    label: String,
    duration: Duration,
}

impl PhaseSpec {
    /// Create a phase lasting `seconds`.
    ///
    /// Zero, negative, non-finite and longer-than-`MAX_PHASE_SECONDS`
    /// durations are rejected.
    pub fn new(
        kind: PhaseKind,
        label: impl Into<String>,
        seconds: f64,
    ) -> Result<Self, ConfigError> {
        if !seconds.is_finite() {
            return Err(ConfigError::NonFiniteDuration { kind });
        }
        if seconds <= 0.0 {
            return Err(ConfigError::NonPositiveDuration { kind, seconds });
        }
        if seconds > MAX_PHASE_SECONDS {
            return Err(ConfigError::DurationTooLong {
                kind,
                seconds,
                max: MAX_PHASE_SECONDS,
            });
        }
        Ok(Self {
            kind,
            label: label.into(),
            duration: Duration::from_secs_f64(seconds),
        })
    }

    /// Create a phase with the kind's default instruction label.
    pub fn with_default_label(kind: PhaseKind, seconds: f64) -> Result<Self, ConfigError> {
        Self::new(kind, kind.default_label(), seconds)
    }

    pub fn kind(&self) -> PhaseKind {
        self.kind
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Instruction line as displayed next to the indicator, e.g. `"Breathe in for 4"`.
    pub fn instruction(&self, countdown: u64) -> String {
        format!("{} {}", self.label, countdown)
    }

    /// Sample for a point `elapsed` into the phase.
    pub fn sample_at(&self, elapsed: Duration) -> ProgressSample {
        let elapsed = elapsed.min(self.duration);
        let remaining = self.duration - elapsed;
        ProgressSample {
            countdown: remaining.as_secs_f64().round() as u64,
            percent: self.kind.percent(elapsed, self.duration),
        }
    }
}

/// One tick's worth of progress: whole seconds remaining and indicator percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProgressSample {
    pub countdown: u64,
    pub percent: u8,
}

/// Instruction labels for each phase kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseLabels {
    #[serde(default = "default_inhale_label")]
    pub inhale: String,
    #[serde(default = "default_hold_label")]
    pub hold: String,
    #[serde(default = "default_exhale_label")]
    pub exhale: String,
}

fn default_inhale_label() -> String {
    PhaseKind::Inhale.default_label().to_string()
}

fn default_hold_label() -> String {
    PhaseKind::Hold.default_label().to_string()
}

fn default_exhale_label() -> String {
    PhaseKind::Exhale.default_label().to_string()
}

impl Default for PhaseLabels {
    fn default() -> Self {
        Self {
            inhale: default_inhale_label(),
            hold: default_hold_label(),
            exhale: default_exhale_label(),
        }
    }
}

impl PhaseLabels {
    pub fn get(&self, kind: PhaseKind) -> &str {
        match kind {
            PhaseKind::Inhale => &self.inhale,
            PhaseKind::Hold => &self.hold,
            PhaseKind::Exhale => &self.exhale,
        }
    }
}

/// Build the base (inhale, hold, exhale) triple.
pub fn breathing_cycle(
    breathe_in: f64,
    hold: f64,
    breathe_out: f64,
    labels: &PhaseLabels,
) -> Result<Vec<PhaseSpec>, ConfigError> {
    PhaseKind::CYCLE
        .into_iter()
        .zip([breathe_in, hold, breathe_out])
        .map(|(kind, seconds)| PhaseSpec::new(kind, labels.get(kind), seconds))
        .collect()
}
