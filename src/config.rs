use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use std::{env, fmt::Display, fs};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("malformed config file {path}: {source}")]
    Parse { path: PathBuf, source: serde_yaml::Error },

    #[error("config must list at least one admin key")]
    NoAdminKeys,

    #[error("sessiontimeout must be a positive number of seconds, got {0}")]
    InvalidTimeout(i64),

    #[error("invalid value for {key}: {message}")]
    InvalidSetting { key: &'static str, message: String },
}

/// Event settings read once at startup and shared read-only with every handler.
#[derive(Clone, Debug, Deserialize)]
pub struct Config {
    #[serde(rename = "adminkeys")]
    pub admin_keys: HashSet<String>,
    #[serde(rename = "sessiontimeout")]
    pub session_timeout: i64,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        let config = Config::parse(&raw)
            .map_err(|e| match e {
                ConfigError::Parse { source, .. } => {
                    ConfigError::Parse { path: path.to_path_buf(), source }
                }
                other => other,
            })?;

        info!(
            "Loaded {} admin key(s), session timeout {}s",
            config.admin_keys.len(),
            config.session_timeout
        );
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<Config, ConfigError> {
        let config: Config = serde_yaml::from_str(raw)
            .map_err(|source| ConfigError::Parse { path: PathBuf::new(), source })?;

        if config.admin_keys.iter().all(|key| key.is_empty()) {
            return Err(ConfigError::NoAdminKeys);
        }
        let representable = chrono::Duration::try_seconds(config.session_timeout).is_some();
        if config.session_timeout <= 0 || !representable {
            return Err(ConfigError::InvalidTimeout(config.session_timeout));
        }

        Ok(config)
    }

    pub fn is_admin_key(&self, key: &str) -> bool {
        !key.is_empty() && self.admin_keys.contains(key)
    }

    pub fn session_timeout(&self) -> chrono::Duration {
        // parse rejects timeouts chrono cannot represent
        chrono::Duration::try_seconds(self.session_timeout).unwrap_or(chrono::Duration::MAX)
    }
}

/// Process-level settings taken from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
    pub config_file: PathBuf,
    pub database_url: String,
    pub bind: String,
    pub image_timeout: Duration,
    pub report_command: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Settings, ConfigError> {
        Ok(Settings {
            config_file: PathBuf::from(load_or("FOOKIE_CONFIG_FILE", "config.yaml")),
            database_url: load_or("DATABASE_URL", "db.sqlite"),
            bind: load_or("FOOKIE_BIND", "127.0.0.1:9000"),
            image_timeout: Duration::from_secs(parse_or("FOOKIE_IMAGE_TIMEOUT", 10)?),
            report_command: env::var("FOOKIE_REPORT_COMMAND")
                .ok()
                .filter(|cmd| !cmd.trim().is_empty()),
        })
    }
}

fn load_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    })
}

fn parse_or<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw.trim().parse().map_err(|e: T::Err| {
            warn!("Invalid {key} value: {e}");
            ConfigError::InvalidSetting { key, message: e.to_string() }
        }),
        Err(_) => {
            info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_admin_keys_and_timeout() {
        let raw = "adminkeys:\n  - FRANK\n  - ANNA\n\nsessiontimeout: 3600";
        let config = Config::parse(raw).unwrap();

        assert_eq!(config.session_timeout, 3600);
        assert!(config.is_admin_key("FRANK"));
        assert!(config.is_admin_key("ANNA"));
        assert!(!config.is_admin_key("frank"));
        assert!(!config.is_admin_key(""));
    }

    #[test]
    fn rejects_missing_keys() {
        assert!(matches!(Config::parse("sessiontimeout: 10"), Err(ConfigError::Parse { .. })));
        assert!(matches!(Config::parse("adminkeys: [FRANK]"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn rejects_empty_key_list_and_bad_timeout() {
        let no_keys = Config::parse("adminkeys: []\nsessiontimeout: 10");
        assert!(matches!(no_keys, Err(ConfigError::NoAdminKeys)));

        let zero = Config::parse("adminkeys: [FRANK]\nsessiontimeout: 0");
        assert!(matches!(zero, Err(ConfigError::InvalidTimeout(0))));

        let words = Config::parse("adminkeys: [FRANK]\nsessiontimeout: soon");
        assert!(matches!(words, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn rejects_timeout_too_large_for_a_duration() {
        let result = Config::parse("adminkeys: [FRANK]\nsessiontimeout: 9223372036854775807");
        assert!(matches!(result, Err(ConfigError::InvalidTimeout(i64::MAX))));
    }

    #[test]
    fn oversized_timeout_built_by_hand_does_not_panic() {
        let config = Config {
            admin_keys: ["FRANK".to_string()].into_iter().collect(),
            session_timeout: i64::MAX,
        };
        assert_eq!(config.session_timeout(), chrono::Duration::MAX);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "adminkeys:\n  - FRANK\n\nsessiontimeout: 3600").unwrap();

        let config = Config::load(file.path()).unwrap();
        assert!(config.is_admin_key("FRANK"));
        assert_eq!(config.session_timeout(), chrono::Duration::seconds(3600));
    }

    #[test]
    fn missing_file_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::load(&dir.path().join("nope.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn malformed_file_reports_its_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "adminkeys: [FRANK").unwrap();

        match Config::load(file.path()) {
            Err(ConfigError::Parse { path, .. }) => assert_eq!(path, file.path()),
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
