//! Date-keyed dataset persistence.
//!
//! Every trading date gets exactly one artifact, `stock_data_YYYYMMDD.<ext>`,
//! holding a single table named [`TABLE_NAME`]. Saving replaces any existing
//! artifact for that date wholesale; nothing is ever merged or appended.
//!
//! Writes go to a temporary file that is renamed into place, so a reader never
//! observes a half-written artifact. The orchestrator's exists-then-save
//! sequence is still not atomic across processes: two concurrent runs for the
//! same date may both fetch and the last rename wins.

pub mod parquet;
pub mod sqlite;

pub use parquet::ParquetStore;
pub use sqlite::SqliteStore;

use crate::domain::{Dataset, TradingDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the table held by every artifact.
pub const TABLE_NAME: &str = "twse_daily_price";

/// Artifact file name prefix; the `YYYYMMDD` date and extension follow.
pub const ARTIFACT_PREFIX: &str = "stock_data_";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage I/O error: {0}")]
    Io(String),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("no dataset stored for {date}")]
    NotFound { date: TradingDate },
}

/// What a save actually did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Written { path: PathBuf, rows: usize },
    /// Empty dataset: nothing written, no artifact created.
    Skipped,
}

/// Which artifact format to persist with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Parquet,
    Sqlite,
}

/// Trait for dataset stores.
pub trait DatasetStore: Send + Sync {
    /// Human-readable name of this store.
    fn name(&self) -> &str;

    /// Path of the artifact for `date`, whether or not it exists.
    fn artifact_path(&self, date: TradingDate) -> PathBuf;

    /// True iff a dataset for `date` is already persisted.
    fn exists(&self, date: TradingDate) -> Result<bool, StoreError>;

    /// Replace the artifact for `dataset.date`. Empty datasets are skipped.
    fn save(&self, dataset: &Dataset) -> Result<SaveOutcome, StoreError>;

    /// Read back the dataset for `date`.
    fn load(&self, date: TradingDate) -> Result<Dataset, StoreError>;

    /// Number of records stored for `date`.
    fn row_count(&self, date: TradingDate) -> Result<usize, StoreError> {
        self.load(date).map(|dataset| dataset.len())
    }

    /// Dates with a persisted artifact, ascending.
    fn list_dates(&self) -> Result<Vec<TradingDate>, StoreError>;
}

/// Open the store for `backend` rooted at `dir`.
pub fn open_store(backend: StorageBackend, dir: impl Into<PathBuf>) -> Box<dyn DatasetStore> {
    match backend {
        StorageBackend::Parquet => Box::new(ParquetStore::new(dir)),
        StorageBackend::Sqlite => Box::new(SqliteStore::new(dir)),
    }
}

/// `stock_data_YYYYMMDD.<ext>`
pub fn artifact_file_name(date: TradingDate, ext: &str) -> String {
    format!("{ARTIFACT_PREFIX}{}.{ext}", date.yyyymmdd())
}

/// Inverse of [`artifact_file_name`]; `None` for anything else.
pub fn parse_artifact_file_name(name: &str, ext: &str) -> Option<TradingDate> {
    let stem = name.strip_prefix(ARTIFACT_PREFIX)?.strip_suffix(ext)?.strip_suffix('.')?;
    if stem.len() != 8 {
        return None;
    }
    TradingDate::from_yyyymmdd(stem).ok()
}

/// Scan `dir` for artifacts with extension `ext`. A missing directory is empty.
pub(crate) fn list_artifact_dates(dir: &Path, ext: &str) -> Result<Vec<TradingDate>, StoreError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let entries = fs::read_dir(dir).map_err(|e| StoreError::Io(format!("read dir: {e}")))?;
    let mut dates = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| StoreError::Io(format!("dir entry: {e}")))?;
        if let Some(date) = entry
            .file_name()
            .to_str()
            .and_then(|name| parse_artifact_file_name(name, ext))
        {
            dates.push(date);
        }
    }
    dates.sort();
    Ok(dates)
}

pub(crate) fn ensure_dir(dir: &Path) -> Result<(), StoreError> {
    fs::create_dir_all(dir).map_err(|e| StoreError::Io(format!("failed to create dir: {e}")))
}

/// Rename `tmp` over `path`, cleaning up `tmp` if that fails.
pub(crate) fn commit_tmp(tmp: &Path, path: &Path) -> Result<(), StoreError> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        StoreError::Io(format!("atomic rename failed: {e}"))
    })
}
