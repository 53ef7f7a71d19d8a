//! Configuration management for ZipBox
//!
//! Settings are loaded in layers:
//! 1. Struct-level defaults (only for optional fields)
//! 2. TOML configuration file
//! 3. Environment variables (highest priority)
//!
//! The listen port, request timeout, maximum file size, and allowed extension
//! list have no defaults: they must be supplied by the file or the
//! environment, and are validated as positive/non-empty at load time.
//!
//! # Environment Variables
//!
//! Overrides use the pattern `ZIPBOX__<section>__<key>`:
//! - `ZIPBOX__SERVER__PORT=8080`
//! - `ZIPBOX__SERVER__TIMEOUT_SECS=30`
//! - `ZIPBOX__FILES__MAX_FILE_SIZE=10MB`
//!
//! # Configuration File
//!
//! By default the configuration is read from `config/zipbox.toml`; the path
//! can be overridden with the `ZIPBOX_CONFIG` environment variable.

mod models;
mod size;
mod sources;
mod validation;

pub use models::{Config, FilesConfig, ServerConfig};
pub use size::ByteSize;
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    Validation(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if the file is malformed, a required field is
    /// missing, or validation rejects a value.
    pub fn load() -> Result<Self, ConfigError> {
        let config = sources::load()?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }
}
