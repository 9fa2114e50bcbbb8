//! TOML-based application configuration.
//!
//! Stores the policy knobs shared by both processes:
//! - Daily usage limit
//! - Wind decay rate and notification thresholds
//! - Shield behavior (safety activation, cooldown, safe-unlock threshold)
//! - Companion progression bounds
//! - Snapshot log retention
//!
//! Configuration is stored at `~/.config/windward/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::data_dir;
use crate::error::ConfigError;

/// Daily limit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitConfig {
    /// Daily blocked-app budget in seconds.
    #[serde(default = "default_daily_seconds")]
    pub daily_seconds: u32,
}

/// Wind behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindConfig {
    /// Wind points shed per minute of break time.
    #[serde(default = "default_fall_rate")]
    pub fall_rate_per_minute: f64,
    /// Wind percentages that trigger an outbound notification when crossed.
    #[serde(default = "default_notify_thresholds")]
    pub notify_thresholds: Vec<u8>,
}

/// Shield behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShieldConfig {
    /// Whether the safety shield auto-activates at 100 wind.
    #[serde(default = "default_true")]
    pub safety_enabled: bool,
    /// Re-activation suppression window after an unlock, in seconds.
    #[serde(default = "default_cooldown_seconds")]
    pub cooldown_seconds: u32,
    /// Wind level under which a safety break may be unlocked without penalty.
    #[serde(default = "default_safe_unlock_threshold")]
    pub safe_unlock_threshold: f64,
}

/// Companion progression configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    /// Final evolution phase.
    #[serde(default = "default_max_phase")]
    pub max_phase: u8,
}

/// Snapshot log configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// Records older than this many days may be pruned.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/windward/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub limit: LimitConfig,
    #[serde(default)]
    pub wind: WindConfig,
    #[serde(default)]
    pub shield: ShieldConfig,
    #[serde(default)]
    pub companion: CompanionConfig,
    #[serde(default)]
    pub log: LogConfig,
}

// Default functions
fn default_daily_seconds() -> u32 {
    1800
}
fn default_fall_rate() -> f64 {
    2.0
}
fn default_notify_thresholds() -> Vec<u8> {
    vec![50, 80, 90]
}
fn default_cooldown_seconds() -> u32 {
    30
}
fn default_safe_unlock_threshold() -> f64 {
    60.0
}
fn default_max_phase() -> u8 {
    5
}
fn default_retention_days() -> u32 {
    90
}
fn default_true() -> bool {
    true
}

impl Default for LimitConfig {
    fn default() -> Self {
        Self {
            daily_seconds: default_daily_seconds(),
        }
    }
}

impl Default for WindConfig {
    fn default() -> Self {
        Self {
            fall_rate_per_minute: default_fall_rate(),
            notify_thresholds: default_notify_thresholds(),
        }
    }
}

impl Default for ShieldConfig {
    fn default() -> Self {
        Self {
            safety_enabled: true,
            cooldown_seconds: default_cooldown_seconds(),
            safe_unlock_threshold: default_safe_unlock_threshold(),
        }
    }
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            max_phase: default_max_phase(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            limit: LimitConfig::default(),
            wind: WindConfig::default(),
            shield: ShieldConfig::default(),
            companion: CompanionConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Config {
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
        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() {
            return Err(ConfigError::UnknownKey(key.to_string()));
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            let is_leaf = parts.peek().is_none();
            if is_leaf {
                let obj = current
                    .as_object_mut()
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
                let existing = obj
                    .get(part)
                    .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;

                let invalid = |message: String| ConfigError::InvalidValue {
                    key: key.to_string(),
                    message,
                };

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|e| invalid(e.to_string()))?,
                    ),
                    serde_json::Value::Number(_) => {
                        if let Ok(n) = value.parse::<u64>() {
                            serde_json::Value::Number(n.into())
                        } else if let Ok(n) = value.parse::<f64>() {
                            serde_json::Number::from_f64(n)
                                .map(serde_json::Value::Number)
                                .ok_or_else(|| {
                                    invalid(format!("cannot parse '{value}' as number"))
                                })?
                        } else {
                            return Err(invalid(format!("cannot parse '{value}' as number")));
                        }
                    }
                    serde_json::Value::Object(_) | serde_json::Value::Array(_) => {
                        serde_json::from_str(value).map_err(|e| invalid(e.to_string()))?
                    }
                    _ => serde_json::Value::String(value.into()),
                };

                obj.insert(part.to_string(), new_value);
                return Ok(());
            }

            current = current
                .get_mut(part)
                .ok_or_else(|| ConfigError::UnknownKey(key.to_string()))?;
        }

        Err(ConfigError::UnknownKey(key.to_string()))
    }

    fn path() -> Result<PathBuf, ConfigError> {
        let dir = data_dir().map_err(|e| ConfigError::LoadFailed {
            path: PathBuf::from("~/.config"),
            message: e.to_string(),
        })?;
        Ok(dir.join("config.toml"))
    }

    /// Load from disk or return default.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::path()?;
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                let cfg: Config =
                    toml::from_str(&content).map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
                Ok(cfg)
            }
            Err(_) => {
                let cfg = Self::default();
                cfg.save()?;
                Ok(cfg)
            }
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = Self::path()?;
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.clone(),
            message: e.to_string(),
        })?;
        std::fs::write(&path, content).map_err(|e| ConfigError::SaveFailed {
            path,
            message: e.to_string(),
        })?;
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

    /// Set a config value by key. Returns an error if the key is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| ConfigError::ParseFailed(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        *self = serde_json::from_value(json).map_err(|e| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        })?;
        self.save()?;
        Ok(())
    }

    /// Load from disk, returning default on error.
    /// This is a convenience method that never fails.
    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_default()
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
        assert_eq!(parsed.limit.daily_seconds, 1800);
        assert_eq!(parsed.shield.cooldown_seconds, 30);
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("limit.daily_seconds").as_deref(), Some("1800"));
        assert_eq!(cfg.get("shield.safety_enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("wind.fall_rate_per_minute").as_deref(), Some("2.0"));
        assert!(cfg.get("wind.missing_key").is_none());
    }

    #[test]
    fn set_json_value_by_path_updates_nested_number() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "limit.daily_seconds", "3600").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "limit.daily_seconds").unwrap(),
            &serde_json::Value::Number(3600.into())
        );
    }

    #[test]
    fn set_json_value_by_path_updates_nested_bool() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "shield.safety_enabled", "false").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "shield.safety_enabled").unwrap(),
            &serde_json::Value::Bool(false)
        );
    }

    #[test]
    fn set_json_value_by_path_updates_array() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        Config::set_json_value_by_path(&mut json, "wind.notify_thresholds", "[25, 75]").unwrap();
        assert_eq!(
            Config::get_json_value_by_path(&json, "wind.notify_thresholds").unwrap(),
            &serde_json::json!([25, 75])
        );
    }

    #[test]
    fn set_json_value_by_path_rejects_unknown_key() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result = Config::set_json_value_by_path(&mut json, "wind.nonexistent_key", "1");
        assert!(result.is_err());
    }

    #[test]
    fn set_json_value_by_path_rejects_invalid_type() {
        let mut json = serde_json::to_value(Config::default()).unwrap();
        let result =
            Config::set_json_value_by_path(&mut json, "shield.safety_enabled", "not_a_bool");
        assert!(result.is_err());
    }

    #[test]
    fn config_default_values() {
        let cfg = Config::default();
        assert_eq!(cfg.limit.daily_seconds, 1800);
        assert_eq!(cfg.wind.fall_rate_per_minute, 2.0);
        assert_eq!(cfg.wind.notify_thresholds, vec![50, 80, 90]);
        assert!(cfg.shield.safety_enabled);
        assert_eq!(cfg.shield.safe_unlock_threshold, 60.0);
        assert_eq!(cfg.companion.max_phase, 5);
        assert_eq!(cfg.log.retention_days, 90);
    }
}
