//! FetchOutcome: what one pipeline invocation did.

use super::date::TradingDate;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Dataset already persisted; no network call, no write.
    AlreadyPresent,
    /// Fetched, normalized and written.
    FetchedAndSaved,
    /// Provider returned nothing usable; nothing written.
    FetchedEmpty,
    /// Resolved date was in the future; nothing fetched.
    AbortedFutureDate,
}

impl fmt::Display for FetchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FetchStatus::AlreadyPresent => "already present",
            FetchStatus::FetchedAndSaved => "fetched and saved",
            FetchStatus::FetchedEmpty => "fetched empty",
            FetchStatus::AbortedFutureDate => "aborted (future date)",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchOutcome {
    /// The date the outcome refers to. For `AbortedFutureDate` this is the
    /// last trading day at or before today, not the rejected date.
    pub target_date: TradingDate,
    pub status: FetchStatus,
    /// Records written (or already on disk when known).
    pub records: usize,
    /// Recovered provider failure, if any.
    pub provider_error: Option<String>,
}

impl FetchOutcome {
    pub fn new(target_date: TradingDate, status: FetchStatus) -> Self {
        Self {
            target_date,
            status,
            records: 0,
            provider_error: None,
        }
    }

    /// Final console line naming the date now considered persisted.
    pub fn status_line(&self) -> String {
        match self.status {
            FetchStatus::AlreadyPresent => format!(
                "{}: dataset already present, nothing to do",
                self.target_date
            ),
            FetchStatus::FetchedAndSaved => format!(
                "{}: fetched and saved {} records",
                self.target_date, self.records
            ),
            FetchStatus::FetchedEmpty => match &self.provider_error {
                Some(err) => format!(
                    "{}: provider returned no data ({err}); nothing saved",
                    self.target_date
                ),
                None => format!(
                    "{}: provider returned no data; nothing saved",
                    self.target_date
                ),
            },
            FetchStatus::AbortedFutureDate => format!(
                "{}: resolved date is in the future, fetch aborted",
                self.target_date
            ),
        }
    }
}
