//! HTTP download stage
//!
//! Fetches one URL at a time: validates the file type against the configured
//! extension allow-list (falling back to a HEAD content-type probe), enforces
//! the size cap, and streams the body to the downloads directory.

use futures_util::StreamExt;
use reqwest::{Client, StatusCode, header};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use url::Url;

use crate::config::Config;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "ZipBox/0.1.0";

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("file type not allowed: {url}")]
    InvalidFile { url: String },

    #[error("file exceeds size limit of {limit} bytes")]
    FileTooLarge { limit: u64 },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: StatusCode },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DownloadError>;

/// Per-URL result inside a batch. A failed download degrades the batch
/// instead of aborting it.
#[derive(Debug)]
pub enum DownloadOutcome {
    Saved(PathBuf),
    Failed { url: String, reason: String },
}

/// HTTP downloader shared by all tasks
///
/// The file counter spans tasks so that concurrently downloading tasks can
/// never collide on a filename.
pub struct Downloader {
    client: Client,
    allowed_extensions: Vec<String>,
    max_file_size: u64,
    downloads_dir: PathBuf,
    file_counter: AtomicU64,
}

impl Downloader {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(config.server.request_timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            allowed_extensions: config
                .files
                .allowed_extensions
                .iter()
                .map(|ext| ext.to_ascii_lowercase())
                .collect(),
            max_file_size: config.files.max_file_size.as_u64(),
            downloads_dir: config.files.downloads_dir.clone(),
            file_counter: AtomicU64::new(0),
        })
    }

    /// Download every URL of a batch, best-effort. Individual failures are
    /// logged and recorded, never fatal to the batch.
    pub async fn fetch_batch(&self, urls: &[String], task_id: u64) -> Vec<DownloadOutcome> {
        let mut outcomes = Vec::with_capacity(urls.len());

        for url in urls {
            match self.download(url, task_id).await {
                Ok(path) => {
                    debug!(%url, path = %path.display(), "Download finished");
                    outcomes.push(DownloadOutcome::Saved(path));
                }
                Err(err) => {
                    warn!(%url, task_id, error = %err, "Download failed, skipping URL");
                    outcomes.push(DownloadOutcome::Failed {
                        url: url.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        outcomes
    }

    /// Download a single URL to the downloads directory and return the
    /// local path.
    pub async fn download(&self, raw_url: &str, task_id: u64) -> Result<PathBuf> {
        let url = Url::parse(raw_url)?;
        let extension = self.resolve_extension(&url).await?;

        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::HttpStatus {
                url: raw_url.to_string(),
                status,
            });
        }

        // Reject early when the declared length already exceeds the cap. An
        // absent length is not trusted as "small": the limit is enforced
        // again while streaming.
        if let Some(declared) = response.content_length() {
            if declared > self.max_file_size {
                return Err(DownloadError::FileTooLarge {
                    limit: self.max_file_size,
                });
            }
        }

        tokio::fs::create_dir_all(&self.downloads_dir).await?;

        let sequence = self.file_counter.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self
            .downloads_dir
            .join(format!("Task_{task_id:02}_{sequence}.{extension}"));

        if let Err(err) = self.stream_to_file(response, &path).await {
            // Drop whatever partial content made it to disk
            let _ = tokio::fs::remove_file(&path).await;
            return Err(err);
        }

        Ok(path)
    }

    /// Resolve the file extension for a URL, either straight from its path
    /// or, when the path extension is not allow-listed, from a HEAD
    /// content-type probe (name-containment match).
    async fn resolve_extension(&self, url: &Url) -> Result<String> {
        if let Some(ext) = url_extension(url) {
            if self.allowed_extensions.iter().any(|a| *a == ext) {
                return Ok(ext);
            }
        }

        let response = self.client.head(url.clone()).send().await?;
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        debug!(url = %url, %content_type, "HEAD probe for disallowed extension");

        self.allowed_extensions
            .iter()
            .find(|allowed| content_type.contains(allowed.as_str()))
            .cloned()
            .ok_or_else(|| DownloadError::InvalidFile {
                url: url.to_string(),
            })
    }

    async fn stream_to_file(&self, response: reqwest::Response, path: &Path) -> Result<()> {
        let mut file = tokio::fs::File::create(path).await?;
        let mut stream = response.bytes_stream();
        let mut written: u64 = 0;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len() as u64;
            if written > self.max_file_size {
                return Err(DownloadError::FileTooLarge {
                    limit: self.max_file_size,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(())
    }
}

/// Lower-cased extension of the URL path, if any.
fn url_extension(url: &Url) -> Option<String> {
    Path::new(url.path())
        .extension()
        .and_then(OsStr::to_str)
        .map(str::to_ascii_lowercase)
}
