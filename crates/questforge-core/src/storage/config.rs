//! TOML-based application configuration.
//!
//! Stores tunables for:
//! - Base XP/Gold per action
//! - Boss defeat rewards
//! - Engine timing (debounce window, expiry sweep, critical strike chance)
//! - Focus sessions
//!
//! Configuration is stored at `~/.config/questforge/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::error::{ConfigError, CoreError};

/// XP and Gold paid for one action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPair {
    pub xp: u64,
    pub gold: u64,
}

const fn pair(xp: u64, gold: u64) -> RewardPair {
    RewardPair { xp, gold }
}

/// Base rewards before any modifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardConfig {
    #[serde(default = "default_task")]
    pub task: RewardPair,
    #[serde(default = "default_side_quest")]
    pub side_quest: RewardPair,
    #[serde(default = "default_habit")]
    pub habit: RewardPair,
    #[serde(default = "default_weekly")]
    pub weekly: RewardPair,
    #[serde(default = "default_monthly")]
    pub monthly: RewardPair,
    #[serde(default = "default_yearly")]
    pub yearly: RewardPair,
    #[serde(default = "default_life")]
    pub life: RewardPair,
    #[serde(default = "default_checklist_item")]
    pub checklist_item: RewardPair,
    #[serde(default = "default_focus_minute")]
    pub focus_minute: RewardPair,
}

/// Boss defeat payouts: `base + per_level × player level`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BossConfig {
    #[serde(default = "default_life_xp")]
    pub life_xp: u64,
    #[serde(default = "default_life_xp_per_level")]
    pub life_xp_per_level: u64,
    #[serde(default = "default_life_gold")]
    pub life_gold: u64,
    #[serde(default = "default_life_gold_per_level")]
    pub life_gold_per_level: u64,
    #[serde(default = "default_yearly_xp")]
    pub yearly_xp: u64,
    #[serde(default = "default_yearly_xp_per_level")]
    pub yearly_xp_per_level: u64,
    #[serde(default = "default_yearly_gold")]
    pub yearly_gold: u64,
    #[serde(default = "default_yearly_gold_per_level")]
    pub yearly_gold_per_level: u64,
}

/// Engine timing and randomness.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Quiet period before a burst of mutations is written out.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// How often expired effects are pruned.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
    #[serde(default = "default_critical_strike_chance")]
    pub critical_strike_chance: f64,
    /// Fixed seed for reproducible critical strikes and chest loot.
    #[serde(default)]
    pub rng_seed: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FocusConfig {
    #[serde(default = "default_focus_minutes")]
    pub default_minutes: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/questforge/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub rewards: RewardConfig,
    #[serde(default)]
    pub boss: BossConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub focus: FocusConfig,
}

// Default functions
fn default_task() -> RewardPair {
    pair(50, 10)
}
fn default_side_quest() -> RewardPair {
    pair(40, 8)
}
fn default_habit() -> RewardPair {
    pair(20, 5)
}
fn default_weekly() -> RewardPair {
    pair(150, 30)
}
fn default_monthly() -> RewardPair {
    pair(400, 80)
}
fn default_yearly() -> RewardPair {
    pair(1000, 200)
}
fn default_life() -> RewardPair {
    pair(2500, 500)
}
fn default_checklist_item() -> RewardPair {
    pair(5, 1)
}
fn default_focus_minute() -> RewardPair {
    pair(2, 0)
}
fn default_life_xp() -> u64 {
    5000
}
fn default_life_xp_per_level() -> u64 {
    250
}
fn default_life_gold() -> u64 {
    2000
}
fn default_life_gold_per_level() -> u64 {
    100
}
fn default_yearly_xp() -> u64 {
    1500
}
fn default_yearly_xp_per_level() -> u64 {
    100
}
fn default_yearly_gold() -> u64 {
    600
}
fn default_yearly_gold_per_level() -> u64 {
    40
}
fn default_debounce_ms() -> u64 {
    500
}
fn default_sweep_interval_secs() -> u64 {
    60
}
fn default_critical_strike_chance() -> f64 {
    0.5
}
fn default_focus_minutes() -> u32 {
    25
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            task: default_task(),
            side_quest: default_side_quest(),
            habit: default_habit(),
            weekly: default_weekly(),
            monthly: default_monthly(),
            yearly: default_yearly(),
            life: default_life(),
            checklist_item: default_checklist_item(),
            focus_minute: default_focus_minute(),
        }
    }
}

impl Default for BossConfig {
    fn default() -> Self {
        Self {
            life_xp: default_life_xp(),
            life_xp_per_level: default_life_xp_per_level(),
            life_gold: default_life_gold(),
            life_gold_per_level: default_life_gold_per_level(),
            yearly_xp: default_yearly_xp(),
            yearly_xp_per_level: default_yearly_xp_per_level(),
            yearly_gold: default_yearly_gold(),
            yearly_gold_per_level: default_yearly_gold_per_level(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            sweep_interval_secs: default_sweep_interval_secs(),
            critical_strike_chance: default_critical_strike_chance(),
            rng_seed: None,
        }
    }
}

impl Default for FocusConfig {
    fn default() -> Self {
        Self {
            default_minutes: default_focus_minutes(),
        }
    }
}

impl Config {
    /// Top-level tables, in file order.
    pub const SECTIONS: [&'static str; 4] = ["rewards", "boss", "engine", "focus"];

    /// Check ranges the types alone do not enforce.
    ///
    /// # Errors
    ///
    /// Returns the first out-of-range key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let chance = self.engine.critical_strike_chance;
        if !(0.0..=1.0).contains(&chance) {
            return Err(ConfigError::InvalidValue {
                key: "engine.critical_strike_chance".into(),
                message: format!("{chance} is outside 0.0..=1.0"),
            });
        }
        if self.focus.default_minutes == 0 {
            return Err(ConfigError::InvalidValue {
                key: "focus.default_minutes".into(),
                message: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Restore one section to its defaults.
    ///
    /// # Errors
    ///
    /// Returns `UnknownKey` for a name outside [`Config::SECTIONS`].
    pub fn reset_section(&mut self, section: &str) -> Result<(), ConfigError> {
        match section {
            "rewards" => self.rewards = RewardConfig::default(),
            "boss" => self.boss = BossConfig::default(),
            "engine" => self.engine = EngineConfig::default(),
            "focus" => self.focus = FocusConfig::default(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    fn get_json_value_by_path<'a>(
        root: &'a serde_json::Value,
        key: &str,
    ) -> Option<&'a serde_json::Value> {
        if key.is_empty() {
            return None;
        }

        let mut current = root;
        for part in key.split('.') {
            current = current.get(part)?;
        }
        Some(current)
    }

    fn set_json_value_by_path(
        root: &mut serde_json::Value,
        key: &str,
        value: &str,
    ) -> Result<(), ConfigError> {
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value.parse::<bool>().map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| invalid(format!("cannot parse '{value}' as number")))?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    // Optional values (e.g. the RNG seed) accept a number or "none".
                    serde_json::Value::Null => match value {
                        "none" | "null" => serde_json::Value::Null,
                        other => serde_json::Value::Number(
                            other
                                .parse::<u64>()
                                .map_err(|e| invalid(e.to_string()))?
                                .into(),
                        ),
                    },
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current.get_mut(part).ok_or_else(unknown)?;
        }

        Err(unknown())
    }

    fn path() -> Result<PathBuf, CoreError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from the default location, writing defaults if the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, CoreError> {
        Self::load_from(&Self::path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, CoreError> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).map_err(|e| {
                ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                }
                .into()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Persist to the default location.
    pub fn save(&self) -> Result<(), CoreError> {
        self.save_to(&Self::path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CoreError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))?;
        Ok(())
    }

    /// Get a config value as string by dot-separated key.
    pub fn get(&self, key: &str) -> Option<String> {
        let json = serde_json::to_value(self).ok()?;
        let val = Self::get_json_value_by_path(&json, key)?;
        match val {
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Set a config value by key without saving.
    ///
    /// Reward and boss amounts must be non-negative integers. The config is
    /// left unchanged when the new value is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed or
    /// it falls outside the allowed range.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut json = serde_json::to_value(&*self)?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|err| {
            tracing::warn!(error = %err, "using default configuration");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.rewards.task, pair(50, 10));
        assert_eq!(parsed.engine.debounce_ms, 500);
        assert!(parsed.engine.rng_seed.is_none());
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let parsed: Config = toml::from_str(
            r#"
            [rewards.task]
            xp = 75
            gold = 15

            [engine]
            rng_seed = 9
            "#,
        )
        .unwrap();
        assert_eq!(parsed.rewards.task, pair(75, 15));
        assert_eq!(parsed.rewards.habit, default_habit());
        assert_eq!(parsed.engine.rng_seed, Some(9));
        assert_eq!(parsed.engine.sweep_interval_secs, 60);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("rewards.task.xp").as_deref(), Some("50"));
        assert_eq!(cfg.get("engine.critical_strike_chance").as_deref(), Some("0.5"));
        assert!(cfg.get("rewards.missing").is_none());
    }

    #[test]
    fn set_updates_nested_values() {
        let mut cfg = Config::default();
        cfg.set("boss.life_xp", "9000").unwrap();
        cfg.set("engine.critical_strike_chance", "0.25").unwrap();
        cfg.set("engine.rng_seed", "42").unwrap();
        assert_eq!(cfg.boss.life_xp, 9000);
        assert_eq!(cfg.engine.critical_strike_chance, 0.25);
        assert_eq!(cfg.engine.rng_seed, Some(42));
    }

    #[test]
    fn set_rejects_unknown_key_and_bad_type() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("engine.nonexistent", "1"),
            Err(CoreError::Config(ConfigError::UnknownKey(_)))
        ));
        assert!(cfg.set("rewards.task.xp", "lots").is_err());
    }

    #[test]
    fn set_rejects_out_of_range_values() {
        let mut cfg = Config::default();
        assert!(cfg.set("rewards.task.gold", "-5").is_err());
        assert!(cfg.set("boss.yearly_xp", "2.5").is_err());
        assert!(matches!(
            cfg.set("engine.critical_strike_chance", "1.5"),
            Err(CoreError::Config(ConfigError::InvalidValue { .. }))
        ));
        assert!(cfg.set("focus.default_minutes", "0").is_err());
        assert_eq!(cfg.rewards.task.gold, 10);
        assert_eq!(cfg.engine.critical_strike_chance, 0.5);
        assert_eq!(cfg.focus.default_minutes, 25);
    }

    #[test]
    fn reset_section_leaves_the_others() {
        let mut cfg = Config::default();
        cfg.set("boss.life_xp", "9000").unwrap();
        cfg.set("focus.default_minutes", "50").unwrap();
        cfg.reset_section("boss").unwrap();
        assert_eq!(cfg.boss.life_xp, default_life_xp());
        assert_eq!(cfg.focus.default_minutes, 50);
        assert!(matches!(
            cfg.reset_section("shop"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn load_from_writes_defaults_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.focus.default_minutes, 25);
        assert!(path.exists());

        std::fs::write(&path, "[focus]\ndefault_minutes = 50\n").unwrap();
        assert_eq!(Config::load_from(&path).unwrap().focus.default_minutes, 50);

        std::fs::write(&path, "not = [valid").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
