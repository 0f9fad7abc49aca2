//! Error types for configuration loading.

use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown hub profile: {0}")]
    UnknownProfile(String),

    #[error("No access token for hub profile '{profile}' (set it in the config or in {env_var})")]
    MissingToken { profile: String, env_var: String },

    #[error("Could not determine a home directory for hubsync data")]
    NoHomeDirectory,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
