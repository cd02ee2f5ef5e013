use crate::format::FormatChoice;
use crate::paths::AppPaths;
use crate::persist::{read_json_document, write_json_document};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

pub const HISTORY_CAPACITY: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobOutcome {
    pub url: String,
    pub timestamp: u64,
    pub status: OutcomeStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    pub format: FormatChoice,
    pub quality: String,
}

impl JobOutcome {
    pub fn success(url: &str, destination: &Path, format: FormatChoice, quality: &str) -> Self {
        Self {
            url: url.to_string(),
            timestamp: now_epoch_seconds(),
            status: OutcomeStatus::Success,
            error: None,
            destination: Some(destination.to_string_lossy().to_string()),
            format,
            quality: quality.to_string(),
        }
    }

    pub fn failed(
        url: &str,
        destination: &Path,
        format: FormatChoice,
        quality: &str,
        error: impl Into<String>,
    ) -> Self {
        Self {
            status: OutcomeStatus::Failed,
            error: Some(error.into()),
            ..Self::success(url, destination, format, quality)
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OutcomeStatus::Success
    }
}

#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn for_paths(paths: &AppPaths) -> Self {
        Self::new(paths.history_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> Vec<JobOutcome> {
        read_json_document(&self.path).unwrap_or_default()
    }

    pub fn append(&self, outcome: JobOutcome) -> Result<()> {
        let mut entries = self.list();
        entries.insert(0, outcome);
        entries.truncate(HISTORY_CAPACITY);
        write_json_document(&self.path, &entries)
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

pub fn now_epoch_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
