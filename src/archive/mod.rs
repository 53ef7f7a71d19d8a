//! ZIP archive stage
//!
//! Bundles the downloaded files of one task into a single deflate-compressed
//! archive. Entries are added under their base filename; inputs sharing a
//! name are not deduplicated, the last one written wins.

use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("zip write failed: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

/// Builds task archives inside a fixed archives directory.
pub struct Archiver {
    archives_dir: PathBuf,
}

impl Archiver {
    pub fn new(archives_dir: PathBuf) -> Self {
        Self { archives_dir }
    }

    /// Create `{archives_dir}/{base_name}.zip` from the given files and
    /// return its path. Inputs that cannot be opened are skipped with a
    /// warning, mirroring the best-effort handling of the download stage.
    pub fn build(&self, base_name: &str, files: &[PathBuf]) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.archives_dir)?;

        let archive_path = self.archives_dir.join(format!("{base_name}.zip"));
        let mut writer = ZipWriter::new(File::create(&archive_path)?);
        let options =
            SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        for source in files {
            let Some(entry_name) = source.file_name().and_then(OsStr::to_str) else {
                warn!(path = %source.display(), "Skipping file without a usable name");
                continue;
            };

            let mut reader = match File::open(source) {
                Ok(file) => file,
                Err(err) => {
                    warn!(path = %source.display(), error = %err, "Skipping unreadable file");
                    continue;
                }
            };

            writer.start_file(entry_name, options)?;
            std::io::copy(&mut reader, &mut writer)?;
        }

        writer.finish()?;
        info!(path = %archive_path.display(), files = files.len(), "Archive created");

        Ok(archive_path)
    }

    /// Delete source files after archiving. Cleanup is best-effort: the
    /// archive already exists, so deletion errors are only logged.
    pub fn remove_files(&self, files: &[PathBuf]) {
        for path in files {
            if let Err(err) = std::fs::remove_file(path) {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!(path = %path.display(), error = %err, "Failed to delete downloaded file");
                }
            }
        }
    }
}
