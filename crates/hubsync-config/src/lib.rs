//! Configuration management for hubsync.
//!
//! Hub profiles, import defaults and logging settings are read from a TOML
//! file (`hubsync.toml`). File locations that hubsync needs when the user
//! does not name one explicitly (config file, mapping files, log files) are
//! derived from the platform's project directories.

pub mod config;
pub mod error;
pub mod paths;

pub use config::{AppConfig, HubProfile, ImportSettings, LoggingConfig, PollSettings};
pub use error::{ConfigError, Result};
pub use paths::{
    default_config_path, default_log_path, default_mapping_path, log_file_name, ProjectPaths,
};
