//! Shared UI icons.
//!
//! Each icon has a plain-text fallback for terminals without emoji support.

use console::Emoji;

use crate::phase::PhaseKind;

// Phase indicators
pub static INHALE: Emoji<'_, '_> = Emoji("🌬️  ", "[IN]");
pub static HOLD: Emoji<'_, '_> = Emoji("⏸️  ", "[HOLD]");
pub static EXHALE: Emoji<'_, '_> = Emoji("🍃 ", "[OUT]");

// Session status
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static STOP: Emoji<'_, '_> = Emoji("⏹️  ", "[STOP]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");

pub fn phase_icon(kind: PhaseKind) -> Emoji<'static, 'static> {
    match kind {
        PhaseKind::Inhale => INHALE,
        PhaseKind::Hold => HOLD,
        PhaseKind::Exhale => EXHALE,
    }
}
