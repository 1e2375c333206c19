//! Parquet dataset store.
//!
//! Layout: `{dir}/stock_data_{YYYYMMDD}.parquet` plus a
//! `stock_data_{YYYYMMDD}.meta.json` sidecar (table name, row count, content
//! hash, write time).
//!
//! Features:
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema check, row count > 0)
//! - Sidecar metadata per date

use super::{
    artifact_file_name, commit_tmp, ensure_dir, list_artifact_dates, DatasetStore, SaveOutcome,
    StoreError, TABLE_NAME,
};
use crate::domain::{CanonicalRecord, Dataset, TradingDate};
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const EXT: &str = "parquet";

const COLUMNS: [&str; 11] = [
    "trade_date",
    "stock_id",
    "stock_name",
    "volume",
    "transactions",
    "trade_value",
    "open_price",
    "high_price",
    "low_price",
    "close_price",
    "price_change",
];

/// Metadata sidecar for a stored date.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetMeta {
    pub trade_date: TradingDate,
    pub table: String,
    pub row_count: usize,
    pub data_hash: String,
    pub written_at: chrono::NaiveDateTime,
}

/// The Parquet store.
pub struct ParquetStore {
    dir: PathBuf,
}

impl ParquetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path to the metadata sidecar for a date.
    fn meta_path(&self, date: TradingDate) -> PathBuf {
        self.dir
            .join(format!("{}{}.meta.json", super::ARTIFACT_PREFIX, date.yyyymmdd()))
    }

    /// Metadata for a stored date, if the sidecar is present and readable.
    pub fn get_meta(&self, date: TradingDate) -> Option<DatasetMeta> {
        let content = fs::read_to_string(self.meta_path(date)).ok()?;
        serde_json::from_str(&content).ok()
    }
}

impl DatasetStore for ParquetStore {
    fn name(&self) -> &str {
        "parquet"
    }

    fn artifact_path(&self, date: TradingDate) -> PathBuf {
        self.dir.join(artifact_file_name(date, EXT))
    }

    fn exists(&self, date: TradingDate) -> Result<bool, StoreError> {
        Ok(self.artifact_path(date).is_file())
    }

    fn save(&self, dataset: &Dataset) -> Result<SaveOutcome, StoreError> {
        if dataset.is_empty() {
            tracing::info!(date = %dataset.date, "empty dataset; skipping save");
            return Ok(SaveOutcome::Skipped);
        }

        ensure_dir(&self.dir)?;

        let mut df = records_to_dataframe(&dataset.records)?;
        let path = self.artifact_path(dataset.date);
        let tmp_path = path.with_extension("parquet.tmp");

        write_parquet(&mut df, &tmp_path)?;
        commit_tmp(&tmp_path, &path)?;

        let meta = DatasetMeta {
            trade_date: dataset.date,
            table: TABLE_NAME.to_string(),
            row_count: dataset.len(),
            data_hash: dataset
                .content_hash()
                .map_err(|e| StoreError::Io(format!("hash serialization: {e}")))?,
            written_at: chrono::Local::now().naive_local(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| StoreError::Io(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(dataset.date), meta_json)
            .map_err(|e| StoreError::Io(format!("meta write: {e}")))?;

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
        let path = self.artifact_path(date);
        if !path.is_file() {
            return Err(StoreError::NotFound { date });
        }
        let records = load_and_validate_parquet(&path)?;
        Ok(Dataset::new(date, records))
    }

    /// Read from the sidecar; falls back to loading the file if it is missing.
    fn row_count(&self, date: TradingDate) -> Result<usize, StoreError> {
        if !self.exists(date)? {
            return Err(StoreError::NotFound { date });
        }
        match self.get_meta(date) {
            Some(meta) => Ok(meta.row_count),
            None => self.load(date).map(|dataset| dataset.len()),
        }
    }

    fn list_dates(&self) -> Result<Vec<TradingDate>, StoreError> {
        list_artifact_dates(&self.dir, EXT)
    }
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

/// Convert canonical records to a Polars DataFrame.
fn records_to_dataframe(records: &[CanonicalRecord]) -> Result<DataFrame, StoreError> {
    let epoch = epoch();
    let dates: Vec<i32> = records
        .iter()
        .map(|r| (r.trade_date.as_naive() - epoch).num_days() as i32)
        .collect();
    let ids: Vec<String> = records.iter().map(|r| r.stock_id.clone()).collect();
    let names: Vec<String> = records.iter().map(|r| r.stock_name.clone()).collect();
    let volumes: Vec<u64> = records.iter().map(|r| r.volume).collect();
    let float_col = |name: &str, get: fn(&CanonicalRecord) -> f64| {
        Column::new(name.into(), records.iter().map(get).collect::<Vec<f64>>())
    };

    DataFrame::new(vec![
        Column::new("trade_date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| StoreError::Parquet(format!("date cast: {e}")))?,
        Column::new("stock_id".into(), ids),
        Column::new("stock_name".into(), names),
        Column::new("volume".into(), volumes),
        float_col("transactions", |r| r.transactions),
        float_col("trade_value", |r| r.trade_value),
        float_col("open_price", |r| r.open_price),
        float_col("high_price", |r| r.high_price),
        float_col("low_price", |r| r.low_price),
        float_col("close_price", |r| r.close_price),
        float_col("price_change", |r| r.price_change),
    ])
    .map_err(|e| StoreError::Parquet(format!("dataframe creation: {e}")))
}

/// Write a DataFrame to a Parquet file.
fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), StoreError> {
    let file =
        fs::File::create(path).map_err(|e| StoreError::Parquet(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| StoreError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

/// Load a Parquet file and validate its integrity.
fn load_and_validate_parquet(path: &Path) -> Result<Vec<CanonicalRecord>, StoreError> {
    let file = fs::File::open(path).map_err(|e| StoreError::Parquet(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| StoreError::Parquet(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(StoreError::Validation("empty parquet file".into()));
    }

    for col_name in &COLUMNS {
        if df.column(col_name).is_err() {
            return Err(StoreError::Validation(format!(
                "missing column '{col_name}'"
            )));
        }
    }

    dataframe_to_records(&df)
}

/// Convert a DataFrame back to canonical records.
fn dataframe_to_records(df: &DataFrame) -> Result<Vec<CanonicalRecord>, StoreError> {
    let col = |name: &str| {
        df.column(name)
            .map_err(|e| StoreError::Parquet(format!("column read: {e}")))
    };
    let type_err = |name: &str, e: PolarsError| StoreError::Parquet(format!("{name} column type: {e}"));

    let date_ca = col("trade_date")?.date().map_err(|e| type_err("trade_date", e))?;
    let id_ca = col("stock_id")?.str().map_err(|e| type_err("stock_id", e))?;
    let name_ca = col("stock_name")?.str().map_err(|e| type_err("stock_name", e))?;
    let vol_ca = col("volume")?.u64().map_err(|e| type_err("volume", e))?;

    let mut floats = Vec::with_capacity(7);
    for name in COLUMNS[4..].iter().copied() {
        floats.push(col(name)?.f64().map_err(|e| type_err(name, e))?);
    }

    let epoch = epoch();
    let n = df.height();
    let mut records = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null date at row {i}")))?;
        let stock_id = id_ca
            .get(i)
            .ok_or_else(|| StoreError::Parquet(format!("null stock_id at row {i}")))?;
        let f = |k: usize| floats[k].get(i).unwrap_or(f64::NAN);

        records.push(CanonicalRecord {
            trade_date: TradingDate::new(epoch + chrono::Duration::days(date_days as i64)),
            stock_id: stock_id.to_string(),
            stock_name: name_ca.get(i).unwrap_or_default().to_string(),
            volume: vol_ca.get(i).unwrap_or(0),
            transactions: f(0),
            trade_value: f(1),
            open_price: f(2),
            high_price: f(3),
            low_price: f(4),
            close_price: f(5),
            price_change: f(6),
        });
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> TradingDate {
        TradingDate::from_ymd(2024, 9, 13).unwrap()
    }

    fn sample_dataset() -> Dataset {
        let rec = |id: &str, close: f64, volume: u64| CanonicalRecord {
            trade_date: date(),
            stock_id: id.into(),
            stock_name: format!("name-{id}"),
            volume,
            transactions: 10.0,
            trade_value: 1_000.0,
            open_price: close,
            high_price: close,
            low_price: close,
            close_price: close,
            price_change: -0.5,
        };
        Dataset::new(date(), vec![rec("2330", 950.0, 1_000), rec("1101", f64::NAN, 0)])
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());

        store.save(&sample_dataset()).unwrap();
        let loaded = store.load(date()).unwrap();

        assert_eq!(loaded, sample_dataset());
        assert!(loaded.records[1].close_price.is_nan());
    }

    #[test]
    fn exists_tracks_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path().join("nested/data"));

        assert!(!store.exists(date()).unwrap());
        store.save(&sample_dataset()).unwrap();
        assert!(store.exists(date()).unwrap());
        assert!(dir.path().join("nested/data/stock_data_20240913.parquet").is_file());
        assert!(!dir.path().join("nested/data/stock_data_20240913.parquet.tmp").exists());
    }

    #[test]
    fn empty_dataset_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path().join("data"));

        let outcome = store.save(&Dataset::empty(date())).unwrap();
        assert_eq!(outcome, SaveOutcome::Skipped);
        assert!(!store.exists(date()).unwrap());
        assert!(!dir.path().join("data").exists());
    }

    #[test]
    fn save_replaces_existing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());

        store.save(&sample_dataset()).unwrap();
        let mut smaller = sample_dataset();
        smaller.records.truncate(1);
        store.save(&smaller).unwrap();

        assert_eq!(store.load(date()).unwrap().len(), 1);
        assert_eq!(store.get_meta(date()).unwrap().row_count, 1);
    }

    #[test]
    fn meta_sidecar_names_table() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());

        store.save(&sample_dataset()).unwrap();
        let meta = store.get_meta(date()).unwrap();
        assert_eq!(meta.table, TABLE_NAME);
        assert_eq!(meta.row_count, 2);
        assert_eq!(meta.data_hash, sample_dataset().content_hash().unwrap());
    }

    #[test]
    fn list_dates_ignores_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());

        store.save(&sample_dataset()).unwrap();
        let earlier = TradingDate::from_ymd(2024, 9, 12).unwrap();
        let mut other = sample_dataset();
        other.date = earlier;
        for rec in &mut other.records {
            rec.trade_date = earlier;
        }
        store.save(&other).unwrap();

        assert_eq!(
            store.list_dates().unwrap(),
            vec![earlier, date()]
        );
    }

    #[test]
    fn row_count_reads_sidecar_then_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(matches!(
            store.row_count(date()),
            Err(StoreError::NotFound { .. })
        ));

        store.save(&sample_dataset()).unwrap();
        assert_eq!(store.row_count(date()).unwrap(), 2);

        fs::remove_file(store.meta_path(date())).unwrap();
        assert_eq!(store.row_count(date()).unwrap(), 2);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ParquetStore::new(dir.path());
        assert!(matches!(store.load(date()), Err(StoreError::NotFound { .. })));
    }
}
