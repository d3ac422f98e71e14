//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module   | Commands handled        |
//! |----------|-------------------------|
//! | `run`    | `Start`, `Plan`         |
//! | `config` | `Config`, `Presets`     |

pub mod config;
pub mod run;

pub use config::{cmd_config, cmd_presets};
pub use run::{cmd_plan, cmd_start};
