//! TradingDate: a calendar date with no time component.

use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A calendar date identifying one trading session's dataset.
///
/// Equality and ordering are by date only. Displays as `YYYY-MM-DD`; the
/// provider and artifact names use the compact `YYYYMMDD` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TradingDate(NaiveDate);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid date '{input}': expected {expected}")]
pub struct DateParseError {
    pub input: String,
    pub expected: &'static str,
}

impl TradingDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build from year/month/day, `None` if the date does not exist.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse the compact `YYYYMMDD` form.
    pub fn from_yyyymmdd(s: &str) -> Result<Self, DateParseError> {
        NaiveDate::parse_from_str(s, "%Y%m%d")
            .map(Self)
            .map_err(|_| DateParseError {
                input: s.to_string(),
                expected: "YYYYMMDD",
            })
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// `YYYYMMDD`, as sent to the provider and used in artifact names.
    pub fn yyyymmdd(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }

    pub fn weekday(&self) -> Weekday {
        self.0.weekday()
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    /// The previous calendar day, `None` at the bottom of chrono's range.
    pub fn pred(&self) -> Option<Self> {
        self.0.pred_opt().map(Self)
    }
}

impl From<NaiveDate> for TradingDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl From<TradingDate> for NaiveDate {
    fn from(date: TradingDate) -> Self {
        date.0
    }
}

impl FromStr for TradingDate {
    type Err = DateParseError;

    /// Accepts `YYYY-MM-DD` or `YYYYMMDD`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.contains('-') {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .map(Self)
                .map_err(|_| DateParseError {
                    input: s.to_string(),
                    expected: "YYYY-MM-DD",
                })
        } else {
            Self::from_yyyymmdd(s)
        }
    }
}

impl fmt::Display for TradingDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}
