//! Market data provider trait and structured error types.
//!
//! The MarketDataProvider trait abstracts over the exchange endpoint so the
//! orchestrator can be driven by a scripted provider in tests. Providers never
//! let a failure escape `fetch`: it is logged, reported alongside an empty
//! table, and the pipeline treats it like a day with no data.

use crate::domain::{RawTable, TradingDate};
use thiserror::Error;

/// Structured error types for provider operations.
///
/// These are designed to be displayable in CLI output and log lines.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("HTTP {status} from provider")]
    HttpStatus { status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Result of a provider call after failures have been recovered.
#[derive(Debug, Default)]
pub struct FetchReport {
    pub table: RawTable,
    /// The failure that was converted into an empty table, if any.
    pub error: Option<DataError>,
}

impl FetchReport {
    pub fn ok(table: RawTable) -> Self {
        Self { table, error: None }
    }

    pub fn failed(error: DataError) -> Self {
        Self {
            table: RawTable::empty(),
            error: Some(error),
        }
    }
}

/// Trait for daily market summary providers.
///
/// Implementations handle the specifics of one endpoint. The store sits
/// beside this trait, not below it: providers don't know about persistence.
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Perform the request for `date`, surfacing every failure.
    ///
    /// `Ok` with an empty table means the provider answered but had no rows
    /// (non-trading day, not yet published).
    fn try_fetch(&self, date: TradingDate) -> Result<RawTable, DataError>;

    /// Fetch the raw table for `date`, converting failures into an empty
    /// table plus the reported error.
    fn fetch(&self, date: TradingDate) -> FetchReport {
        match self.try_fetch(date) {
            Ok(table) => {
                tracing::info!(provider = self.name(), %date, rows = table.len(), "fetched raw table");
                FetchReport::ok(table)
            }
            Err(e) => {
                tracing::warn!(provider = self.name(), %date, error = %e, "fetch failed; treating as empty");
                FetchReport::failed(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Failing;

    impl MarketDataProvider for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn try_fetch(&self, _date: TradingDate) -> Result<RawTable, DataError> {
            Err(DataError::HttpStatus { status: 503 })
        }
    }

    #[test]
    fn fetch_recovers_failures_as_empty() {
        let report = Failing.fetch(TradingDate::from_ymd(2024, 9, 13).unwrap());
        assert!(report.table.is_empty());
        assert_eq!(report.error.unwrap().to_string(), "HTTP 503 from provider");
    }
}
