//! Append-only audit log for lifecycle events.

use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::{AppError, Result};

/// Append-only line log recording lifecycle events with RFC 3339 timestamps.
#[derive(Debug)]
pub struct AuditWriter {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl AuditWriter {
    /// Open the audit log at `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Bootstrap`] if the file cannot be opened.
    pub async fn open(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|err| {
                AppError::Bootstrap(format!("cannot open audit log {}: {err}", path.display()))
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        })
    }

    /// Append one timestamped event line and flush it.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Io`] on a failed write; callers treat the log as
    /// best-effort and only warn.
    pub async fn record(&mut self, event: &str) -> Result<()> {
        let line = format!("{} {event}\n", Utc::now().to_rfc3339());
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(|err| AppError::Io(format!("audit write failed: {err}")))?;
        self.writer
            .flush()
            .await
            .map_err(|err| AppError::Io(format!("audit flush failed: {err}")))?;
        Ok(())
    }

    /// Path this writer appends to.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered events to disk.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Shutdown`] if the final flush fails.
    pub async fn close(&mut self) -> Result<()> {
        self.writer
            .flush()
            .await
            .map_err(|err| AppError::Shutdown(format!("audit flush failed: {err}")))
    }
}
