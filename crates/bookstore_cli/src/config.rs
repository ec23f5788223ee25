//! Layered application configuration.
//!
//! # Responsibility
//! - Load `bookstore.yaml`, deep-merge `bookstore-{profile}.yaml` on top and
//!   apply `BOOKSTORE_*` environment overrides.
//!
//! # Invariants
//! - Missing files are skipped; every key has a default.
//! - The active profile is `BOOKSTORE_PROFILE`, then the CLI argument, then `dev`.
//! - A loaded config has passed `AppConfig::validate`.

use serde::Deserialize;
use serde_yaml::{Mapping, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROFILE: &str = "dev";
pub const IN_MEMORY_DATABASE: &str = ":memory:";
const BASE_FILE: &str = "bookstore.yaml";

#[derive(Debug)]
pub enum ConfigError {
    Read { path: PathBuf, source: std::io::Error },
    Parse { source_name: String, message: String },
    Invalid { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            Self::Parse {
                source_name,
                message,
            } => write!(f, "invalid config in {source_name}: {message}"),
            Self::Invalid { key, message } => write!(f, "invalid config value `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Read { source, .. } => Some(source),
            Self::Parse { .. } | Self::Invalid { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub loans: LoanConfig,
    pub notifications: NotificationConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// File path, or `:memory:` for a throwaway database.
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: "bookstore.db".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Rotating file output directory; stderr when unset.
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: bookstore_core::default_log_level().to_string(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LoanConfig {
    pub period_days: u32,
}

impl Default for LoanConfig {
    fn default() -> Self {
        Self {
            period_days: bookstore_core::DEFAULT_LOAN_PERIOD_DAYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    pub email_enabled: bool,
    pub sender: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_enabled: false,
            sender: "noreply@bookstore.local".to_string(),
        }
    }
}

/// Resolved configuration plus the profile it was loaded for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedConfig {
    pub profile: String,
    pub config: AppConfig,
}

impl AppConfig {
    /// Loads from `dir` using the process environment.
    pub fn load(dir: &Path, profile: Option<&str>) -> Result<LoadedConfig, ConfigError> {
        Self::load_with_env(dir, profile, |key| std::env::var(key).ok())
    }

    /// Loads from `dir`, reading overrides through `env`.
    pub fn load_with_env(
        dir: &Path,
        profile: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<LoadedConfig, ConfigError> {
        let profile = env("BOOKSTORE_PROFILE")
            .filter(|value| !value.trim().is_empty())
            .or_else(|| profile.map(str::to_string))
            .unwrap_or_else(|| DEFAULT_PROFILE.to_string());

        let mut merged = Value::Mapping(Mapping::new());
        for name in [BASE_FILE.to_string(), format!("bookstore-{profile}.yaml")] {
            if let Some(layer) = read_layer(&dir.join(name))? {
                merge_values(&mut merged, layer);
            }
        }

        let mut config: AppConfig =
            serde_yaml::from_value(merged).map_err(|err| ConfigError::Parse {
                source_name: format!("profile `{profile}`"),
                message: err.to_string(),
            })?;
        config.apply_env(env)?;
        config.validate()?;
        Ok(LoadedConfig { profile, config })
    }

    /// Parses one YAML document without layering; unset keys use defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|err| ConfigError::Parse {
            source_name: "inline yaml".to_string(),
            message: err.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self, env: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(bind) = env("BOOKSTORE_SERVER_BIND") {
            self.server.bind = bind;
        }
        if let Some(path) = env("BOOKSTORE_DATABASE_PATH") {
            self.database.path = path;
        }
        if let Some(level) = env("BOOKSTORE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = env("BOOKSTORE_LOG_DIR") {
            self.logging.dir = (!dir.trim().is_empty()).then(|| PathBuf::from(dir));
        }
        if let Some(days) = env("BOOKSTORE_LOAN_PERIOD_DAYS") {
            self.loans.period_days = days.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "loans.period_days",
                message: format!("`{days}` is not a whole number of days"),
            })?;
        }
        if let Some(enabled) = env("BOOKSTORE_EMAIL_ENABLED") {
            self.notifications.email_enabled = parse_flag(&enabled).ok_or_else(|| {
                ConfigError::Invalid {
                    key: "notifications.email_enabled",
                    message: format!("`{enabled}` is not a boolean"),
                }
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.database.path.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "database.path",
                message: "must not be empty".to_string(),
            });
        }
        if self.loans.period_days == 0 {
            return Err(ConfigError::Invalid {
                key: "loans.period_days",
                message: "must be greater than zero".to_string(),
            });
        }
        if self.notifications.email_enabled && !self.notifications.sender.contains('@') {
            return Err(ConfigError::Invalid {
                key: "notifications.sender",
                message: format!("`{}` is not an email address", self.notifications.sender),
            });
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.server.bind.parse().map_err(|_| ConfigError::Invalid {
            key: "server.bind",
            message: format!("`{}` is not a socket address", self.server.bind),
        })
    }

    pub fn is_in_memory(&self) -> bool {
        self.database.path == IN_MEMORY_DATABASE
    }
}

fn read_layer(path: &Path) -> Result<Option<Value>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let value: Value = serde_yaml::from_str(&content).map_err(|err| ConfigError::Parse {
        source_name: path.display().to_string(),
        message: err.to_string(),
    })?;
    // An empty file parses as null.
    Ok((!value.is_null()).then_some(value))
}

/// Recursively overlays `overlay` onto `base`; mappings merge, everything
/// else is replaced.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{AppConfig, ConfigError, DEFAULT_PROFILE};
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn missing_files_fall_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let loaded = AppConfig::load_with_env(dir.path(), None, no_env).unwrap();

        assert_eq!(loaded.profile, DEFAULT_PROFILE);
        assert_eq!(loaded.config, AppConfig::default());
        assert_eq!(loaded.config.loans.period_days, 14);
    }

    #[test]
    fn profile_file_is_deep_merged_over_base() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("bookstore.yaml"),
            "server:\n  bind: 127.0.0.1:9000\nlogging:\n  level: warn\n  dir: /tmp/base\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("bookstore-test.yaml"),
            "logging:\n  level: trace\ndatabase:\n  path: ':memory:'\n",
        )
        .unwrap();

        let loaded = AppConfig::load_with_env(dir.path(), Some("test"), no_env).unwrap();
        let config = loaded.config;
        assert_eq!(loaded.profile, "test");
        assert_eq!(config.server.bind, "127.0.0.1:9000");
        assert_eq!(config.logging.level, "trace");
        assert_eq!(config.logging.dir, Some(PathBuf::from("/tmp/base")));
        assert!(config.is_in_memory());
    }

    #[test]
    fn environment_wins_over_files_and_selects_profile() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bookstore-qa.yaml"), "loans:\n  period_days: 7\n").unwrap();
        fs::write(dir.path().join("bookstore-cli.yaml"), "loans:\n  period_days: 3\n").unwrap();

        let env = env_from(&[
            ("BOOKSTORE_PROFILE", "qa"),
            ("BOOKSTORE_SERVER_BIND", "0.0.0.0:8181"),
            ("BOOKSTORE_EMAIL_ENABLED", "yes"),
            ("BOOKSTORE_LOG_DIR", ""),
        ]);
        let loaded = AppConfig::load_with_env(dir.path(), Some("cli"), env).unwrap();

        assert_eq!(loaded.profile, "qa");
        assert_eq!(loaded.config.loans.period_days, 7);
        assert_eq!(loaded.config.server.bind, "0.0.0.0:8181");
        assert!(loaded.config.notifications.email_enabled);
        assert_eq!(loaded.config.logging.dir, None);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let dir = tempfile::tempdir().unwrap();

        let zero_days = env_from(&[("BOOKSTORE_LOAN_PERIOD_DAYS", "0")]);
        let err = AppConfig::load_with_env(dir.path(), None, zero_days).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "loans.period_days",
                ..
            }
        ));

        let bad_days = env_from(&[("BOOKSTORE_LOAN_PERIOD_DAYS", "two weeks")]);
        assert!(AppConfig::load_with_env(dir.path(), None, bad_days).is_err());

        let bad_bind = AppConfig::from_yaml_str("server:\n  bind: not-an-address\n").unwrap_err();
        assert!(bad_bind.to_string().contains("server.bind"));
    }

    #[test]
    fn malformed_yaml_reports_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("bookstore.yaml"), "server: [unclosed\n").unwrap();

        let err = AppConfig::load_with_env(dir.path(), None, no_env).unwrap_err();
        match err {
            ConfigError::Parse { source_name, .. } => {
                assert!(source_name.ends_with("bookstore.yaml"))
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
