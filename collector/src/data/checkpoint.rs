//! Backfill checkpoint persistence
//!
//! A checkpoint is the open time of the last candle that was durably stored.
//! The next run resumes one interval after it.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::CollectorError;
use crate::Result;

#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn read_checkpoint(&self) -> Result<Option<DateTime<Utc>>>;
    async fn write_checkpoint(&self, last_date: DateTime<Utc>) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CheckpointFile {
    last_date: String,
}

/// JSON file `{"last_date": "<RFC 3339>"}`, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct JsonFileCheckpoint {
    path: PathBuf,
}

impl JsonFileCheckpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CollectorError {
        CollectorError::CheckpointIo {
            path: self.path.clone(),
            source,
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl CheckpointStore for JsonFileCheckpoint {
    async fn read_checkpoint(&self) -> Result<Option<DateTime<Utc>>> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(self.io_error(err)),
        };

        let file: CheckpointFile = serde_json::from_str(&raw)?;
        parse_last_date(&file.last_date).map(Some)
    }

    async fn write_checkpoint(&self, last_date: DateTime<Utc>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let body = serde_json::to_vec(&CheckpointFile {
            last_date: last_date.to_rfc3339(),
        })?;

        // Write aside, flush, then rename over the old file
        let temp = self.temp_path();
        let mut file = tokio::fs::File::create(&temp)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(&body).await.map_err(|e| self.io_error(e))?;
        file.sync_all().await.map_err(|e| self.io_error(e))?;
        drop(file);

        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }
}

/// RFC 3339, or a naive ISO-8601 timestamp taken as UTC.
fn parse_last_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Ok(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|_| CollectorError::CheckpointFormat(format!("invalid last_date: {:?}", raw)))
}

/// In-memory checkpoint that also keeps every value written.
#[derive(Debug, Default)]
pub struct MemoryCheckpoint {
    state: Mutex<(Option<DateTime<Utc>>, Vec<DateTime<Utc>>)>,
}

impl MemoryCheckpoint {
    pub fn new(initial: Option<DateTime<Utc>>) -> Self {
        Self {
            state: Mutex::new((initial, Vec::new())),
        }
    }

    pub fn current(&self) -> Option<DateTime<Utc>> {
        self.lock().0
    }

    /// Checkpoints written so far, in order
    pub fn history(&self) -> Vec<DateTime<Utc>> {
        self.lock().1.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, (Option<DateTime<Utc>>, Vec<DateTime<Utc>>)> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpoint {
    async fn read_checkpoint(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.current())
    }

    async fn write_checkpoint(&self, last_date: DateTime<Utc>) -> Result<()> {
        let mut state = self.lock();
        state.0 = Some(last_date);
        state.1.push(last_date);
        Ok(())
    }
}
