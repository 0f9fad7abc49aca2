//! Application configuration loaded from `hubsync.toml`.
//!
//! ```toml
//! [hubs.staging]
//! hub_id = "5b32377e4cedfd01c45036d8"
//! base_url = "https://api.example-hub.net/v2/content"
//!
//! [import]
//! schedule = true
//!
//! [import.unschedule_poll]
//! max_attempts = 20
//!
//! [logging]
//! level = "debug"
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{ConfigError, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Named hub profiles, selected on the command line with `--hub`.
    pub hubs: BTreeMap<String, HubProfile>,
    pub import: ImportSettings,
    pub logging: LoggingConfig,
}

/// Connection details for one hub.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubProfile {
    pub hub_id: String,
    pub base_url: String,
    /// Bearer token. Prefer `HUBSYNC_TOKEN_<PROFILE>` over storing it here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Defaults for `event import`; command line flags can only switch them on.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ImportSettings {
    pub schedule: bool,
    pub catchup: bool,
    pub original_ids: bool,
    pub unschedule_poll: PollSettings,
}

/// Backoff used while waiting for an edition to leave `UNSCHEDULING`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub factor: f64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 15,
            initial_delay_ms: 500,
            max_delay_ms: 8_000,
            factor: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default tracing filter when `RUST_LOG` is unset.
    pub level: String,
    /// Directory for action logs; the platform data directory when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl AppConfig {
    /// Load configuration from `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml_str(raw: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Look up a hub profile and fill in its token from the environment if needed.
    pub fn hub(&self, profile: &str) -> Result<HubProfile> {
        let mut hub = self
            .hubs
            .get(profile)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownProfile(profile.to_string()))?;

        let env_var = token_env_var(profile);
        if let Ok(token) = std::env::var(&env_var) {
            if !token.trim().is_empty() {
                hub.token = Some(token.trim().to_string());
            }
        }

        if hub.token.is_none() {
            return Err(ConfigError::MissingToken {
                profile: profile.to_string(),
                env_var,
            });
        }

        Ok(hub)
    }
}

/// `HUBSYNC_TOKEN_<PROFILE>`, upper-cased with dashes turned into underscores.
pub fn token_env_var(profile: &str) -> String {
    format!(
        "HUBSYNC_TOKEN_{}",
        profile.to_ascii_uppercase().replace(['-', '.'], "_")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::tempdir;

    const SAMPLE: &str = r#"
        [hubs.source]
        hub_id = "hub-a"
        base_url = "https://hub.example/a"
        token = "secret-a"

        [hubs.dest-eu]
        hub_id = "hub-b"
        base_url = "https://hub.example/b"

        [import]
        schedule = true

        [import.unschedule_poll]
        max_attempts = 3

        [logging]
        level = "debug"
    "#;

    #[test]
    fn parses_profiles_and_defaults() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.hubs.len(), 2);
        assert_eq!(config.hubs["source"].hub_id, "hub-a");
        assert!(config.import.schedule);
        assert!(!config.import.catchup);
        assert_eq!(config.import.unschedule_poll.max_attempts, 3);
        assert_eq!(config.import.unschedule_poll.initial_delay_ms, 500);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn invalid_file_is_an_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hubsync.toml");
        std::fs::write(&path, "[hubs.broken\nhub_id = 1").unwrap();
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    #[serial]
    fn token_comes_from_environment() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        std::env::set_var("HUBSYNC_TOKEN_DEST_EU", "env-token");
        let hub = config.hub("dest-eu").unwrap();
        assert_eq!(hub.token.as_deref(), Some("env-token"));
        std::env::remove_var("HUBSYNC_TOKEN_DEST_EU");
    }

    #[test]
    #[serial]
    fn missing_token_and_unknown_profile() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert!(matches!(
            config.hub("dest-eu"),
            Err(ConfigError::MissingToken { .. })
        ));
        assert!(matches!(
            config.hub("nope"),
            Err(ConfigError::UnknownProfile(_))
        ));
        assert_eq!(config.hub("source").unwrap().token.as_deref(), Some("secret-a"));
    }
}
