//! SQLite dataset store: one database file per trading date.
//!
//! Layout: `{dir}/stock_data_{YYYYMMDD}.db`, each holding the single table
//! [`TABLE_NAME`]. NaN prices are stored as NULL and read back as NaN.

use super::{
    artifact_file_name, commit_tmp, ensure_dir, list_artifact_dates, DatasetStore, SaveOutcome,
    StoreError, TABLE_NAME,
};
use crate::domain::{CanonicalRecord, Dataset, TradingDate};
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};

const EXT: &str = "db";

fn nullable(v: f64) -> Option<f64> {
    if v.is_nan() {
        None
    } else {
        Some(v)
    }
}

pub struct SqliteStore {
    dir: PathBuf,
}

impl SqliteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn open_read_only(path: &Path) -> Result<Connection, StoreError> {
        Ok(Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }

    fn has_table(conn: &Connection) -> Result<bool, StoreError> {
        let found: Option<String> = conn
            .query_row(
                "SELECT name FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![TABLE_NAME],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn write_db(path: &Path, records: &[CanonicalRecord]) -> Result<(), StoreError> {
        let mut conn = Connection::open(path)?;
        conn.execute_batch(&format!(
            "DROP TABLE IF EXISTS {TABLE_NAME};
             CREATE TABLE {TABLE_NAME} (
                 trade_date   TEXT    NOT NULL,
                 stock_id     TEXT    NOT NULL,
                 stock_name   TEXT    NOT NULL,
                 volume       INTEGER NOT NULL,
                 transactions REAL,
                 trade_value  REAL,
                 open_price   REAL,
                 high_price   REAL,
                 low_price    REAL,
                 close_price  REAL,
                 price_change REAL
             );"
        ))?;

        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(&format!(
                "INSERT INTO {TABLE_NAME} (
                     trade_date, stock_id, stock_name, volume, transactions, trade_value,
                     open_price, high_price, low_price, close_price, price_change
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
            ))?;
            for r in records {
                stmt.execute(params![
                    r.trade_date.to_string(),
                    r.stock_id,
                    r.stock_name,
                    i64::try_from(r.volume).unwrap_or(i64::MAX),
                    nullable(r.transactions),
                    nullable(r.trade_value),
                    nullable(r.open_price),
                    nullable(r.high_price),
                    nullable(r.low_price),
                    nullable(r.close_price),
                    nullable(r.price_change),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }
}

impl DatasetStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn artifact_path(&self, date: TradingDate) -> PathBuf {
        self.dir.join(artifact_file_name(date, EXT))
    }

    /// The file must exist and contain the dataset table; a stray empty
    /// database does not count.
    fn exists(&self, date: TradingDate) -> Result<bool, StoreError> {
        let path = self.artifact_path(date);
        if !path.is_file() {
            return Ok(false);
        }
        let conn = Self::open_read_only(&path)?;
        Self::has_table(&conn)
    }

    fn save(&self, dataset: &Dataset) -> Result<SaveOutcome, StoreError> {
        if dataset.is_empty() {
            tracing::info!(date = %dataset.date, "empty dataset; skipping save");
            return Ok(SaveOutcome::Skipped);
        }

        ensure_dir(&self.dir)?;

        let path = self.artifact_path(dataset.date);
        let tmp_path = path.with_extension("db.tmp");
        if tmp_path.exists() {
            fs::remove_file(&tmp_path)
                .map_err(|e| StoreError::Io(format!("remove stale temp file: {e}")))?;
        }

        if let Err(e) = Self::write_db(&tmp_path, &dataset.records) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        commit_tmp(&tmp_path, &path)?;

        tracing::info!(
            date = %dataset.date,
            rows = dataset.len(),
            path = %path.display(),
            "saved dataset"
        );

        Ok(SaveOutcome::Written {
            path,
            rows: dataset.len(),
        })
    }

    fn load(&self, date: TradingDate) -> Result<Dataset, StoreError> {
        if !self.exists(date)? {
            return Err(StoreError::NotFound { date });
        }
        let conn = Self::open_read_only(&self.artifact_path(date))?;
        let mut stmt = conn.prepare(&format!(
            "SELECT stock_id, stock_name, volume, transactions, trade_value,
                    open_price, high_price, low_price, close_price, price_change
             FROM {TABLE_NAME} ORDER BY rowid"
        ))?;

        let f = |v: Option<f64>| v.unwrap_or(f64::NAN);
        let rows = stmt.query_map([], |row| {
            let volume: i64 = row.get(2)?;
            Ok(CanonicalRecord {
                trade_date: date,
                stock_id: row.get(0)?,
                stock_name: row.get(1)?,
                volume: u64::try_from(volume).unwrap_or(0),
                transactions: f(row.get(3)?),
                trade_value: f(row.get(4)?),
                open_price: f(row.get(5)?),
                high_price: f(row.get(6)?),
                low_price: f(row.get(7)?),
                close_price: f(row.get(8)?),
                price_change: f(row.get(9)?),
            })
        })?;

        let records = rows.collect::<Result<Vec<_>, _>>()?;
        if records.is_empty() {
            return Err(StoreError::Validation(format!(
                "table {TABLE_NAME} is empty for {date}"
            )));
        }
        Ok(Dataset::new(date, records))
    }

    fn row_count(&self, date: TradingDate) -> Result<usize, StoreError> {
        if !self.exists(date)? {
            return Err(StoreError::NotFound { date });
        }
        let conn = Self::open_read_only(&self.artifact_path(date))?;
        let count: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {TABLE_NAME}"), [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn list_dates(&self) -> Result<Vec<TradingDate>, StoreError> {
        list_artifact_dates(&self.dir, EXT)
    }
}
