pub mod animator;
pub mod config;
pub mod errors;
pub mod logging;
pub mod phase;
pub mod sequencer;
pub mod sink;
pub mod ui;

pub use animator::{Cadence, PhaseAnimator, PhaseCompletion, PhaseOutcome};
pub use config::{BreatheToml, Timing, TimingOverrides};
pub use errors::{ConfigError, SequenceError};
pub use phase::{PhaseKind, PhaseLabels, PhaseSpec, ProgressSample};
pub use sequencer::Sequencer;
pub use sink::{PresentationSink, SequenceState, SequenceSummary};
