// Engine tuning constants.
//
// `EngineConfig` collects every timing and probability constant the engine
// uses: mood onset chances and lifetimes, the key/scale rotation gates, the
// pedal disable chance and cooldown, and the insect-burst preemption chance.
// Musical bands (octaves, velocities, durations) are not here; they belong
// to the style profiles and the weather mapper.
//
// Configs are JSON. `EngineConfig` and its sections are `#[serde(default)]`,
// so a file only needs the fields it changes (a mood entry, when present,
// must give both its chance and its lifetime):
//
//     { "pedal": { "disable_chance": 0.02 }, "insect_preempt_chance": 0.3 }
//
// All times are milliseconds; all chances are per-tick probabilities.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::params::Span;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Onset chance and lifetime for one mood. Both fields are required when a
/// mood appears in a config file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoodTiming {
    /// Per-tick probability of switching on while off.
    pub chance: f64,
    /// Lifetime, drawn once at activation.
    pub duration_ms: Span<u64>,
}

impl MoodTiming {
    fn new(chance: f64, min_ms: u64, max_ms: u64) -> Self {
        Self {
            chance,
            duration_ms: Span::new(min_ms, max_ms),
        }
    }
}

/// Timer gate plus trial for key/scale rotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub interval_ms: u64,
    pub chance: f64,
    /// Gate and chance while the chaotic mood is active.
    pub chaotic_interval_ms: u64,
    pub chaotic_chance: f64,
}

impl Default for RotationConfig {
    fn default() -> Self {
        Self {
            interval_ms: 180_000,
            chance: 0.01,
            chaotic_interval_ms: 30_000,
            chaotic_chance: 0.05,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PedalConfig {
    /// Per-tick chance of disabling the sustain pedal while enabled.
    pub disable_chance: f64,
    /// How long sustain stays disabled, drawn once at disable time.
    pub cooldown_ms: Span<u64>,
}

impl Default for PedalConfig {
    fn default() -> Self {
        Self {
            disable_chance: 0.01,
            cooldown_ms: Span::new(15_000, 30_000),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub chaotic: MoodTiming,
    pub insect_burst: MoodTiming,
    pub hardcore: MoodTiming,
    pub rotation: RotationConfig,
    pub pedal: PedalConfig,
    /// Chance that an active insect-burst mood preempts the tick.
    pub insect_preempt_chance: f64,
    /// Replaces every style's silence band when set.
    pub silence_ms: Option<Span<u32>>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chaotic: MoodTiming::new(0.005, 30_000, 120_000),
            insect_burst: MoodTiming::new(0.01, 5_000, 15_000),
            hardcore: MoodTiming::new(0.008, 20_000, 60_000),
            rotation: RotationConfig::default(),
            pedal: PedalConfig::default(),
            insect_preempt_chance: 0.6,
            silence_ms: None,
        }
    }
}

impl EngineConfig {
    /// A config with every mood switched off. Useful for steady renders and
    /// for tests that need a predictable state machine.
    pub fn calm() -> Self {
        let mut config = Self::default();
        config.chaotic.chance = 0.0;
        config.insect_burst.chance = 0.0;
        config.hardcore.chance = 0.0;
        config
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Reject probabilities outside [0, 1].
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chances = [
            ("chaotic.chance", self.chaotic.chance),
            ("insect_burst.chance", self.insect_burst.chance),
            ("hardcore.chance", self.hardcore.chance),
            ("rotation.chance", self.rotation.chance),
            ("rotation.chaotic_chance", self.rotation.chaotic_chance),
            ("pedal.disable_chance", self.pedal.disable_chance),
            ("insect_preempt_chance", self.insect_preempt_chance),
        ];
        for (field, p) in chances {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid {
                    field,
                    reason: format!("{p} is not a probability"),
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_json_is_default() {
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn partial_json_overrides_only_named_fields() {
        let config = EngineConfig::from_json_str(
            r#"{
                "chaotic": {"chance": 0.0, "duration_ms": {"min": 5000, "max": 6000}},
                "pedal": {"cooldown_ms": {"min": 1000, "max": 2000}}
            }"#,
        )
        .unwrap();
        assert_eq!(config.chaotic.chance, 0.0);
        assert_eq!(config.chaotic.duration_ms, Span::new(5_000, 6_000));
        assert_eq!(config.pedal.cooldown_ms, Span::new(1_000, 2_000));
        assert_eq!(config.pedal.disable_chance, 0.01);
        assert_eq!(config.hardcore, EngineConfig::default().hardcore);
    }

    #[test]
    fn rejects_bad_probability() {
        let err = EngineConfig::from_json_str(r#"{"insect_preempt_chance": 1.5}"#).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                field: "insect_preempt_chance",
                ..
            }
        ));
    }

    #[test]
    fn mood_entries_must_be_complete() {
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"hardcore": {"chance": 0.1}}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{chaotic"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = EngineConfig::load(Path::new("/nonexistent/player-piano.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/player-piano.json"));
    }

    #[test]
    fn calm_disables_moods() {
        let calm = EngineConfig::calm();
        assert_eq!(calm.chaotic.chance, 0.0);
        assert_eq!(calm.insect_burst.chance, 0.0);
        assert_eq!(calm.hardcore.chance, 0.0);
        assert_eq!(calm.rotation, RotationConfig::default());
    }
}
