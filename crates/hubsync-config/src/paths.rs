//! Default file locations.
//!
//! Everything hubsync writes without being told where lives under the
//! platform data directory, e.g. `~/.local/share/hubsync` on Linux.

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

/// Environment variable that overrides the config file location.
pub const CONFIG_ENV_VAR: &str = "HUBSYNC_CONFIG";

const CONFIG_FILE_NAME: &str = "hubsync.toml";

/// Root directories used to derive default paths.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectPaths {
    pub config_dir: PathBuf,
    pub data_dir: PathBuf,
}

impl ProjectPaths {
    /// Resolve the platform directories for hubsync.
    pub fn discover() -> Result<Self> {
        let dirs = ProjectDirs::from("io", "hubsync", "hubsync").ok_or(ConfigError::NoHomeDirectory)?;
        Ok(Self {
            config_dir: dirs.config_dir().to_path_buf(),
            data_dir: dirs.data_dir().to_path_buf(),
        })
    }

    /// Use a single root for both config and data (handy for tests and portable installs).
    pub fn rooted_at(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            config_dir: root.to_path_buf(),
            data_dir: root.to_path_buf(),
        }
    }

    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE_NAME)
    }

    /// Mapping file for imports into the given destination hub.
    pub fn mapping_file(&self, hub_id: &str) -> PathBuf {
        self.data_dir
            .join("mappings")
            .join(format!("event-{}.json", sanitize_component(hub_id)))
    }

    /// Log file for a run of `kind` ("export" or "import") started at `started`.
    pub fn log_file(&self, kind: &str, started: DateTime<Utc>) -> PathBuf {
        self.data_dir.join("logs").join(log_file_name(kind, started))
    }
}

/// `event-<kind>-<timestamp>.log`
pub fn log_file_name(kind: &str, started: DateTime<Utc>) -> String {
    format!("event-{}-{}.log", kind, started.format("%Y%m%d-%H%M%S"))
}

/// Config file path, honouring `HUBSYNC_CONFIG`.
pub fn default_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }
    Ok(ProjectPaths::discover()?.config_file())
}

pub fn default_mapping_path(hub_id: &str) -> Result<PathBuf> {
    Ok(ProjectPaths::discover()?.mapping_file(hub_id))
}

pub fn default_log_path(kind: &str) -> Result<PathBuf> {
    Ok(ProjectPaths::discover()?.log_file(kind, Utc::now()))
}

// Hub ids end up in file names.
fn sanitize_component(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect()
}
