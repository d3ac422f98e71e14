//! Configuration for breathing sessions.
//!
//! Settings are read from `breathe.toml` (by default in the user's config
//! directory) and layered as file → environment → CLI.
//!
//! # Configuration File Format
//!
//! ```toml
//! [timing]
//! breathe_in = 4.0
//! hold = 7.0
//! breathe_out = 8.0
//! repeat = 3
//!
//! [labels]
//! inhale = "Breathe in for"
//! hold = "Hold breath for"
//! exhale = "Breathe out for"
//!
//! [display]
//! ui = "full"
//! frame_interval_ms = 50
//!
//! [presets.box]
//! breathe_in = 4.0
//! hold = 4.0
//! breathe_out = 4.0
//! repeat = 4
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::animator::Cadence;
use crate::errors::ConfigError;
use crate::phase::{PhaseLabels, PhaseSpec, breathing_cycle};

pub const CONFIG_FILE_NAME: &str = "breathe.toml";

/// Environment variables consulted between the config file and CLI flags.
pub const ENV_BREATHE_IN: &str = "BREATHE_IN";
pub const ENV_HOLD: &str = "BREATHE_HOLD";
pub const ENV_BREATHE_OUT: &str = "BREATHE_OUT";
pub const ENV_REPEAT: &str = "BREATHE_REPEAT";

/// Durations (seconds) of one cycle and how many cycles to run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    #[serde(default = "default_breathe_in")]
    pub breathe_in: f64,
    #[serde(default = "default_hold")]
    pub hold: f64,
    #[serde(default = "default_breathe_out")]
    pub breathe_out: f64,
    #[serde(default = "default_repeat")]
    pub repeat: u32,
}

fn default_breathe_in() -> f64 {
    4.0
}

fn default_hold() -> f64 {
    7.0
}

fn default_breathe_out() -> f64 {
    8.0
}

fn default_repeat() -> u32 {
    3
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            breathe_in: default_breathe_in(),
            hold: default_hold(),
            breathe_out: default_breathe_out(),
            repeat: default_repeat(),
        }
    }
}

impl Timing {
    pub fn new(breathe_in: f64, hold: f64, breathe_out: f64, repeat: u32) -> Self {
        Self {
            breathe_in,
            hold,
            breathe_out,
            repeat,
        }
    }

    /// The (inhale, hold, exhale) triple with the given labels.
    pub fn cycle(&self, labels: &PhaseLabels) -> Result<Vec<PhaseSpec>, ConfigError> {
        breathing_cycle(self.breathe_in, self.hold, self.breathe_out, labels)
    }

    /// Check every duration and the repeat count.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cycle(&PhaseLabels::default())?;
        crate::sequencer::validate_repeat(self.repeat)
    }

    pub fn cycle_seconds(&self) -> f64 {
        self.breathe_in + self.hold + self.breathe_out
    }

    pub fn total_seconds(&self) -> f64 {
        self.cycle_seconds() * f64::from(self.repeat)
    }
}

/// Partial timing, used for the environment and CLI layers.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TimingOverrides {
    pub breathe_in: Option<f64>,
    pub hold: Option<f64>,
    pub breathe_out: Option<f64>,
    pub repeat: Option<u32>,
}

impl TimingOverrides {
    /// Read `BREATHE_IN`, `BREATHE_HOLD`, `BREATHE_OUT` and `BREATHE_REPEAT`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        fn parse<T: std::str::FromStr>(key: &str, value: Option<String>) -> Result<Option<T>>
        where
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            value
                .map(|v| {
                    v.trim()
                        .parse::<T>()
                        .with_context(|| format!("Invalid value '{}' for {}", v, key))
                })
                .transpose()
        }

        Ok(Self {
            breathe_in: parse(ENV_BREATHE_IN, lookup(ENV_BREATHE_IN))?,
            hold: parse(ENV_HOLD, lookup(ENV_HOLD))?,
            breathe_out: parse(ENV_BREATHE_OUT, lookup(ENV_BREATHE_OUT))?,
            repeat: parse(ENV_REPEAT, lookup(ENV_REPEAT))?,
        })
    }

    /// Field-wise `self`, falling back to `lower` where unset.
    pub fn or(self, lower: Self) -> Self {
        Self {
            breathe_in: self.breathe_in.or(lower.breathe_in),
            hold: self.hold.or(lower.hold),
            breathe_out: self.breathe_out.or(lower.breathe_out),
            repeat: self.repeat.or(lower.repeat),
        }
    }

    pub fn apply(&self, base: Timing) -> Timing {
        Timing {
            breathe_in: self.breathe_in.unwrap_or(base.breathe_in),
            hold: self.hold.unwrap_or(base.hold),
            breathe_out: self.breathe_out.unwrap_or(base.breathe_out),
            repeat: self.repeat.unwrap_or(base.repeat),
        }
    }
}

/// Presets shipped with the binary. Entries in `[presets]` replace these by name.
pub fn builtin_presets() -> BTreeMap<String, Timing> {
    BTreeMap::from([
        ("478".to_string(), Timing::default()),
        ("box".to_string(), Timing::new(4.0, 4.0, 4.0, 4)),
        ("relax".to_string(), Timing::new(4.0, 2.0, 6.0, 5)),
    ])
}

/// Output settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// UI mode: full, minimal or json
    #[serde(default = "default_ui")]
    pub ui: String,
    /// Indicator frame interval; 0 updates the indicator once per second only
    #[serde(default = "default_frame_interval_ms")]
    pub frame_interval_ms: u64,
}

fn default_ui() -> String {
    "full".to_string()
}

fn default_frame_interval_ms() -> u64 {
    50
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            ui: default_ui(),
            frame_interval_ms: default_frame_interval_ms(),
        }
    }
}

impl DisplayConfig {
    pub fn cadence(&self) -> Result<Cadence, ConfigError> {
        Cadence::with_frame_millis(self.frame_interval_ms)
    }
}

/// Parsed `breathe.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BreatheToml {
    #[serde(default)]
    pub timing: Timing,
    #[serde(default)]
    pub labels: PhaseLabels,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub presets: BTreeMap<String, Timing>,
}

impl BreatheToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::parse(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse breathe.toml")
    }

    /// Returns default configuration if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration, creating the parent directory if needed.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = toml::to_string_pretty(self).context("Failed to serialize breathe.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Built-in presets merged with the file's `[presets]` table.
    pub fn presets(&self) -> BTreeMap<String, Timing> {
        let mut presets = builtin_presets();
        presets.extend(self.presets.iter().map(|(k, v)| (k.clone(), *v)));
        presets
    }

    pub fn preset(&self, name: &str) -> Result<Timing, ConfigError> {
        self.presets
            .get(name)
            .copied()
            .or_else(|| builtin_presets().get(name).copied())
            .ok_or_else(|| ConfigError::UnknownPreset {
                name: name.to_string(),
            })
    }

    /// Resolve the session timing: overrides → preset (if named) → `[timing]`.
    pub fn resolve_timing(
        &self,
        preset: Option<&str>,
        overrides: &TimingOverrides,
    ) -> Result<Timing, ConfigError> {
        let base = match preset {
            Some(name) => self.preset(name)?,
            None => self.timing,
        };
        let timing = overrides.apply(base);
        timing.validate()?;
        Ok(timing)
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if let Err(err) = self.timing.validate() {
            warnings.push(format!("[timing]: {}", err));
        }

        for (name, timing) in &self.presets {
            if let Err(err) = timing.validate() {
                warnings.push(format!("[presets.{}]: {}", name, err));
            }
        }

        if self.display.ui.parse::<crate::ui::UiMode>().is_err() {
            warnings.push(format!(
                "Invalid ui '{}': should be one of full, minimal, json",
                self.display.ui
            ));
        }

        if let Err(err) = self.display.cadence() {
            warnings.push(format!("[display]: {}", err));
        }

        for kind in crate::phase::PhaseKind::CYCLE {
            if self.labels.get(kind).trim().is_empty() {
                warnings.push(format!("Empty label for {} phase", kind));
            }
        }

        warnings
    }
}

/// `<config dir>/breathe/breathe.toml`, if the platform has a config directory.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("breathe").join(CONFIG_FILE_NAME))
}

/// The explicit path if given, otherwise the platform default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_config_path()
            .context("No config directory on this platform; pass --config <path>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_parse_empty_uses_defaults() {
        let toml = BreatheToml::parse("").unwrap();
        assert_eq!(toml, BreatheToml::default());
        assert_eq!(toml.timing, Timing::new(4.0, 7.0, 8.0, 3));
        assert_eq!(toml.labels.inhale, "Breathe in for");
        assert_eq!(toml.display.frame_interval_ms, 50);
    }

    #[test]
    fn test_parse_partial_sections() {
        let toml = BreatheToml::parse(
            r#"
            [timing]
            hold = 4
            repeat = 5

            [labels]
            exhale = "Let go for"

            [presets.calm]
            breathe_in = 5.5
            breathe_out = 5.5
            "#,
        )
        .unwrap();
        assert_eq!(toml.timing, Timing::new(4.0, 4.0, 8.0, 5));
        assert_eq!(toml.labels.exhale, "Let go for");
        assert_eq!(toml.labels.hold, "Hold breath for");
        assert_eq!(toml.presets["calm"], Timing::new(5.5, 7.0, 5.5, 3));
    }

    #[test]
    fn test_parse_invalid_toml() {
        let result = BreatheToml::parse("[timing\nhold = ");
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse breathe.toml")
        );
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = BreatheToml::load_or_default(&dir.path().join("breathe.toml")).unwrap();
        assert_eq!(toml, BreatheToml::default());
    }

    #[test]
    fn test_save_creates_parent_and_loads_back() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested/breathe.toml");
        let mut toml = BreatheToml::default();
        toml.presets
            .insert("short".to_string(), Timing::new(1.0, 1.0, 1.0, 1));
        toml.save(&path).unwrap();

        let loaded = BreatheToml::load(&path).unwrap();
        assert_eq!(loaded, toml);
    }

    #[test]
    fn test_file_preset_overrides_builtin() {
        let toml = BreatheToml::parse(
            r#"
            [presets.box]
            breathe_in = 5.0
            hold = 5.0
            breathe_out = 5.0
            repeat = 2
            "#,
        )
        .unwrap();
        assert_eq!(toml.preset("box").unwrap(), Timing::new(5.0, 5.0, 5.0, 2));
        assert_eq!(toml.preset("relax").unwrap(), Timing::new(4.0, 2.0, 6.0, 5));
        assert_eq!(toml.presets().len(), 3);
        assert_eq!(
            toml.preset("nope").unwrap_err(),
            ConfigError::UnknownPreset {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_resolve_timing_precedence() {
        let toml = BreatheToml::parse("[timing]\nbreathe_in = 3.0\nrepeat = 2").unwrap();

        let plain = toml
            .resolve_timing(None, &TimingOverrides::default())
            .unwrap();
        assert_eq!(plain, Timing::new(3.0, 7.0, 8.0, 2));

        let preset = toml
            .resolve_timing(Some("box"), &TimingOverrides::default())
            .unwrap();
        assert_eq!(preset, Timing::new(4.0, 4.0, 4.0, 4));

        let cli = TimingOverrides {
            hold: Some(1.5),
            ..TimingOverrides::default()
        };
        let env = TimingOverrides {
            hold: Some(9.0),
            repeat: Some(1),
            ..TimingOverrides::default()
        };
        let layered = toml.resolve_timing(Some("box"), &cli.or(env)).unwrap();
        assert_eq!(layered, Timing::new(4.0, 1.5, 4.0, 1));
    }

    #[test]
    fn test_resolve_timing_rejects_invalid_values() {
        let toml = BreatheToml::default();
        let zero_repeat = TimingOverrides {
            repeat: Some(0),
            ..TimingOverrides::default()
        };
        assert_eq!(
            toml.resolve_timing(None, &zero_repeat).unwrap_err(),
            ConfigError::InvalidRepeat { repeat: 0 }
        );
        let negative = TimingOverrides {
            breathe_out: Some(-1.0),
            ..TimingOverrides::default()
        };
        assert!(matches!(
            toml.resolve_timing(None, &negative),
            Err(ConfigError::NonPositiveDuration { .. })
        ));
    }

    #[test]
    fn test_overrides_from_lookup() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_BREATHE_IN, "6"), (ENV_REPEAT, " 2 ")]);
        let overrides =
            TimingOverrides::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(overrides.breathe_in, Some(6.0));
        assert_eq!(overrides.hold, None);
        assert_eq!(overrides.repeat, Some(2));
    }

    #[test]
    fn test_overrides_from_lookup_invalid_number() {
        let err = TimingOverrides::from_lookup(|key| {
            (key == ENV_HOLD).then(|| "long".to_string())
        })
        .unwrap_err();
        assert!(err.to_string().contains("BREATHE_HOLD"));
    }

    #[test]
    fn test_validate_reports_warnings() {
        let toml = BreatheToml::parse(
            r#"
            [timing]
            repeat = 0

            [labels]
            hold = "  "

            [display]
            ui = "fancy"
            frame_interval_ms = 3

            [presets.broken]
            hold = 0.0
            "#,
        )
        .unwrap();
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 5, "{:?}", warnings);
        assert!(warnings.iter().any(|w| w.starts_with("[timing]")));
        assert!(warnings.iter().any(|w| w.starts_with("[presets.broken]")));
        assert!(warnings.iter().any(|w| w.contains("Invalid ui 'fancy'")));
        assert!(warnings.iter().any(|w| w.starts_with("[display]")));
        assert!(warnings.iter().any(|w| w.contains("Empty label for hold")));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(BreatheToml::default().validate().is_empty());
    }

    #[test]
    fn test_total_seconds() {
        assert_eq!(Timing::default().cycle_seconds(), 19.0);
        assert_eq!(Timing::default().total_seconds(), 57.0);
    }

    #[test]
    fn test_config_path_prefers_explicit() {
        let path = config_path(Some(Path::new("/tmp/custom.toml"))).unwrap();
        assert_eq!(path, PathBuf::from("/tmp/custom.toml"));
    }
}
