use super::size::ByteSize;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub files: FilesConfig,
}

/// HTTP server settings
///
/// `port` and `timeout_secs` carry no defaults: they must be present in the
/// loaded sources and are checked by validation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    pub timeout_secs: u64,
}

/// Download and archive settings
///
/// `max_file_size` and `allowed_extensions` carry no defaults either; the
/// directories fall back to paths under `data/`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FilesConfig {
    pub max_file_size: ByteSize,
    pub allowed_extensions: Vec<String>,
    #[serde(default = "default_downloads_dir")]
    pub downloads_dir: PathBuf,
    #[serde(default = "default_archives_dir")]
    pub archives_dir: PathBuf,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Config {
    /// Base URL under which finished archives are exposed to clients.
    pub fn public_base_url(&self) -> String {
        format!("http://localhost:{}", self.server.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_downloads_dir() -> PathBuf {
    PathBuf::from("data/downloads")
}

fn default_archives_dir() -> PathBuf {
    PathBuf::from("data/archives")
}
