//! TOML-based application configuration.
//!
//! Stores:
//! - Focus cycle lengths and the long-break interval
//! - Values written with every study session
//! - Notification preferences
//! - Which backend receives completed sessions
//!
//! Configuration is stored at `~/.config/studdyhub/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::data_dir;
use crate::cycle::CycleDurations;
use crate::error::ConfigError;
use crate::recorder::SessionDefaults;

/// Environment variable that overrides `backend.api_key`.
pub const API_KEY_ENV: &str = "STUDDYHUB_API_KEY";

/// Cycle-specific configuration. Durations are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleConfig {
    #[serde(default = "default_focus_secs")]
    pub focus_secs: u64,
    #[serde(default = "default_short_break_secs")]
    pub short_break_secs: u64,
    #[serde(default = "default_long_break_secs")]
    pub long_break_secs: u64,
    #[serde(default = "default_focus_phases_before_long_break")]
    pub focus_phases_before_long_break: u32,
    #[serde(default)]
    pub auto_start_next_phase: bool,
}

/// Notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_true")]
    pub vibration: bool,
    /// Chat webhook that also receives phase changes (optional).
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// SQLite file in the data directory.
    Local,
    /// Hosted REST data store.
    Remote,
    /// Do not persist sessions.
    None,
}

/// Where completed focus sessions are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,
    /// Project URL of the hosted data store, e.g. `https://xyz.supabase.co`.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/studdyhub/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub cycle: CycleConfig,
    #[serde(default)]
    pub session: SessionDefaults,
    #[serde(default)]
    pub notifications: NotificationsConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

// Default functions
fn default_focus_secs() -> u64 {
    25 * 60
}
fn default_short_break_secs() -> u64 {
    5 * 60
}
fn default_long_break_secs() -> u64 {
    15 * 60
}
fn default_focus_phases_before_long_break() -> u32 {
    4
}
fn default_true() -> bool {
    true
}
fn default_backend_kind() -> BackendKind {
    BackendKind::Local
}
fn default_table() -> String {
    "study_sessions".into()
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            focus_secs: default_focus_secs(),
            short_break_secs: default_short_break_secs(),
            long_break_secs: default_long_break_secs(),
            focus_phases_before_long_break: default_focus_phases_before_long_break(),
            auto_start_next_phase: false,
        }
    }
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            vibration: true,
            webhook_url: None,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
            url: None,
            table: default_table(),
            api_key: None,
        }
    }
}

impl BackendConfig {
    /// `STUDDYHUB_API_KEY` wins over the stored key.
    pub fn resolved_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .or_else(|| self.api_key.clone())
            .filter(|key| !key.is_empty())
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
        let unknown = || ConfigError::UnknownKey(key.to_string());
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };

        let mut parts = key.split('.').peekable();
        if parts.peek().is_none() || key.is_empty() {
            return Err(unknown());
        }

        let mut current = root;
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                let obj = current.as_object_mut().ok_or_else(unknown)?;
                let existing = obj.get(part).ok_or_else(unknown)?;

                let new_value = match existing {
                    serde_json::Value::Bool(_) => serde_json::Value::Bool(
                        value
                            .parse::<bool>()
                            .map_err(|_| invalid(format!("'{value}' is not a bool")))?,
                    ),
                    serde_json::Value::Number(_) => value
                        .parse::<u64>()
                        .map(|n| serde_json::Value::Number(n.into()))
                        .map_err(|_| invalid(format!("'{value}' is not a whole number")))?,
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

    fn path() -> Result<PathBuf, ConfigError> {
        Ok(data_dir()?.join("config.toml"))
    }

    /// Load from disk, writing defaults on first use.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file exists but cannot be parsed,
    /// or if the default config cannot be written to disk.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or fails validation.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(content) => {
                let cfg: Config = toml::from_str(&content).map_err(|e| ConfigError::LoadFailed {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                })?;
                cfg.validate()?;
                Ok(cfg)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let cfg = Self::default();
                cfg.save_to(path)?;
                Ok(cfg)
            }
            Err(e) => Err(ConfigError::LoadFailed {
                path: path.to_path_buf(),
                message: e.to_string(),
            }),
        }
    }

    /// Persist to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::path()?)
    }

    /// # Errors
    ///
    /// Returns an error if the config cannot be serialized or written to disk.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let save_failed = |message: String| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message,
        };
        let content = toml::to_string_pretty(self).map_err(|e| save_failed(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| save_failed(e.to_string()))
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

    /// Every leaf as `(dot.path, value)`, sorted by key. Secrets are masked.
    pub fn entries(&self) -> Vec<(String, String)> {
        fn walk(prefix: &str, value: &serde_json::Value, out: &mut Vec<(String, String)>) {
            match value {
                serde_json::Value::Object(map) => {
                    for (name, child) in map {
                        let path = if prefix.is_empty() {
                            name.clone()
                        } else {
                            format!("{prefix}.{name}")
                        };
                        walk(&path, child, out);
                    }
                }
                serde_json::Value::String(s) => out.push((prefix.to_string(), s.clone())),
                other => out.push((prefix.to_string(), other.to_string())),
            }
        }

        let mut out = Vec::new();
        if let Ok(json) = serde_json::to_value(self) {
            walk("", &json, &mut out);
        }
        for (key, value) in &mut out {
            if key == "backend.api_key" && value != "null" {
                *value = "********".into();
            }
        }
        out
    }

    /// Restore one section (`cycle`, `session`, `notifications`, `backend`)
    /// to its defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if `section` is not a known section.
    pub fn reset_section(&mut self, section: &str) -> Result<(), ConfigError> {
        match section {
            "cycle" => self.cycle = CycleConfig::default(),
            "session" => self.session = SessionDefaults::default(),
            "notifications" => self.notifications = NotificationsConfig::default(),
            "backend" => self.backend = BackendConfig::default(),
            other => return Err(ConfigError::UnknownKey(other.to_string())),
        }
        Ok(())
    }

    /// Set a config value by key in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the resulting config is invalid. `self` is unchanged on error.
    pub fn set_value(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let invalid = |message: String| ConfigError::InvalidValue {
            key: key.to_string(),
            message,
        };
        let mut json = serde_json::to_value(&*self).map_err(|e| invalid(e.to_string()))?;
        Self::set_json_value_by_path(&mut json, key, value)?;
        let updated: Config = serde_json::from_value(json).map_err(|e| invalid(e.to_string()))?;
        updated.validate()?;
        *self = updated;
        Ok(())
    }

    /// Set a config value by key and save.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is unknown, the value cannot be parsed,
    /// or the config cannot be saved.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        self.set_value(key, value)?;
        self.save()
    }

    /// # Errors
    ///
    /// Returns the first invalid field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.durations()
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "cycle".into(),
                message: e.to_string(),
            })?;
        self.session
            .validate()
            .map_err(|e| ConfigError::InvalidValue {
                key: "session.focus_level".into(),
                message: e.to_string(),
            })?;
        if self.backend.kind == BackendKind::Remote {
            let url = self
                .backend
                .url
                .as_deref()
                .filter(|u| !u.is_empty())
                .ok_or_else(|| ConfigError::MissingKey("backend.url".into()))?;
            url::Url::parse(url).map_err(|e| ConfigError::InvalidValue {
                key: "backend.url".into(),
                message: e.to_string(),
            })?;
        }
        Ok(())
    }

    pub fn durations(&self) -> CycleDurations {
        CycleDurations {
            focus_secs: self.cycle.focus_secs,
            short_break_secs: self.cycle.short_break_secs,
            long_break_secs: self.cycle.long_break_secs,
            focus_phases_before_long_break: self.cycle.focus_phases_before_long_break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_flatten_sections_and_mask_key() {
        let mut cfg = Config::default();
        cfg.backend.api_key = Some("secret".into());
        let entries = cfg.entries();

        let get = |k: &str| {
            entries
                .iter()
                .find(|(key, _)| key == k)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("cycle.focus_secs").as_deref(), Some("1500"));
        assert_eq!(get("session.focus_level").as_deref(), Some("4"));
        assert_eq!(get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(get("backend.api_key").as_deref(), Some("********"));
        assert!(entries.iter().all(|(_, v)| v != "secret"));
    }

    #[test]
    fn reset_section_leaves_other_sections() {
        let mut cfg = Config::default();
        cfg.set_value("cycle.focus_secs", "600").unwrap();
        cfg.set_value("session.focus_level", "2").unwrap();

        cfg.reset_section("cycle").unwrap();
        assert_eq!(cfg.cycle.focus_secs, 1500);
        assert_eq!(cfg.session.focus_level, 2);
        assert!(matches!(
            cfg.reset_section("theme"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn default_config_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).unwrap();
        let parsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.cycle.focus_secs, 1500);
        assert_eq!(parsed.session.focus_level, 4);
        assert_eq!(parsed.backend.kind, BackendKind::Local);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let parsed: Config = toml::from_str("[cycle]\nfocus_secs = 3000\n").unwrap();
        assert_eq!(parsed.cycle.focus_secs, 3000);
        assert_eq!(parsed.cycle.short_break_secs, 300);
        assert_eq!(parsed.backend.table, "study_sessions");
    }

    #[test]
    fn get_supports_dot_path_keys() {
        let cfg = Config::default();
        assert_eq!(cfg.get("cycle.focus_secs").as_deref(), Some("1500"));
        assert_eq!(cfg.get("notifications.enabled").as_deref(), Some("true"));
        assert_eq!(cfg.get("backend.kind").as_deref(), Some("local"));
        assert!(cfg.get("cycle.missing_key").is_none());
    }

    #[test]
    fn set_value_updates_number_and_bool() {
        let mut cfg = Config::default();
        cfg.set_value("cycle.long_break_secs", "1200").unwrap();
        cfg.set_value("cycle.auto_start_next_phase", "true").unwrap();
        assert_eq!(cfg.cycle.long_break_secs, 1200);
        assert!(cfg.cycle.auto_start_next_phase);
    }

    #[test]
    fn set_value_fills_optional_string() {
        let mut cfg = Config::default();
        cfg.set_value("notifications.webhook_url", "https://chat.example/hook")
            .unwrap();
        assert_eq!(
            cfg.notifications.webhook_url.as_deref(),
            Some("https://chat.example/hook")
        );
    }

    #[test]
    fn set_value_rejects_unknown_key() {
        let mut cfg = Config::default();
        let err = cfg.set_value("cycle.nonexistent", "1").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn set_value_rejects_invalid_type() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("notifications.enabled", "maybe").is_err());
        assert!(cfg.set_value("cycle.focus_secs", "-5").is_err());
    }

    #[test]
    fn set_value_rejects_invalid_config_and_keeps_old() {
        let mut cfg = Config::default();
        assert!(cfg.set_value("session.focus_level", "9").is_err());
        assert!(cfg.set_value("cycle.focus_secs", "0").is_err());
        assert_eq!(cfg.session.focus_level, 4);
        assert_eq!(cfg.cycle.focus_secs, 1500);
    }

    #[test]
    fn remote_backend_requires_url() {
        let mut cfg = Config::default();
        let err = cfg.set_value("backend.kind", "remote").unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey(_)));

        cfg.set_value("backend.url", "https://example.supabase.co").unwrap();
        cfg.set_value("backend.kind", "remote").unwrap();
        assert_eq!(cfg.backend.kind, BackendKind::Remote);
    }

    #[test]
    fn load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let cfg = Config::load_from(&path).unwrap();
        assert_eq!(cfg.cycle.focus_secs, 1500);
        assert!(path.exists());
    }

    #[test]
    fn save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.set_value("session.distractions", "2").unwrap();
        cfg.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.session.distractions, 2);
    }

    #[test]
    fn load_from_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[cycle]\nfocus_secs = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn durations_follow_cycle_section() {
        let mut cfg = Config::default();
        cfg.set_value("cycle.focus_phases_before_long_break", "3")
            .unwrap();
        assert_eq!(cfg.durations().focus_phases_before_long_break, 3);
    }
}
