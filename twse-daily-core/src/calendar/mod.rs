//! Trading calendar: weekends, market holidays, and backward search for the
//! most recent trading day.
//!
//! The holiday set is built once from an injected [`HolidayProvider`] for a
//! window of two years either side of an anchor year. Nothing here reads the
//! clock or any global state, so tests can substitute a fixed calendar.

pub mod taiwan;

pub use taiwan::TaiwanHolidays;

use crate::domain::TradingDate;
use chrono::{NaiveDate, Weekday};
use std::collections::BTreeSet;
use std::ops::RangeInclusive;
use thiserror::Error;

/// Years either side of the anchor year covered by the holiday set.
pub const HOLIDAY_WINDOW_YEARS: i32 = 2;

/// Upper bound on the backward search in [`TradingCalendar::find_last_trading_day`].
pub const MAX_LOOKBACK_DAYS: u32 = 366;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CalendarError {
    #[error(
        "no trading day found within {lookback_days} days at or before {from} (holiday calendar misconfigured?)"
    )]
    CalendarExhausted {
        from: TradingDate,
        lookback_days: u32,
    },
}

/// Source of market holiday dates for a given year.
pub trait HolidayProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Market closures falling in `year` (weekends need not be listed).
    fn holidays_for_year(&self, year: i32) -> Vec<NaiveDate>;
}

/// An explicit holiday list, independent of year.
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays {
    dates: Vec<NaiveDate>,
}

impl FixedHolidays {
    pub fn new(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            dates: dates.into_iter().collect(),
        }
    }
}

impl HolidayProvider for FixedHolidays {
    fn name(&self) -> &str {
        "fixed"
    }

    fn holidays_for_year(&self, year: i32) -> Vec<NaiveDate> {
        use chrono::Datelike;
        self.dates
            .iter()
            .copied()
            .filter(|d| d.year() == year)
            .collect()
    }
}

/// Weekend + holiday calendar for a single market.
#[derive(Debug, Clone)]
pub struct TradingCalendar {
    holidays: BTreeSet<NaiveDate>,
    /// `None` for a calendar built from an empty date list.
    years: Option<RangeInclusive<i32>>,
}

impl TradingCalendar {
    /// Precompute holidays for `anchor_year ± HOLIDAY_WINDOW_YEARS`.
    pub fn new(provider: &dyn HolidayProvider, anchor_year: i32) -> Self {
        let years = (anchor_year - HOLIDAY_WINDOW_YEARS)..=(anchor_year + HOLIDAY_WINDOW_YEARS);
        let holidays: BTreeSet<NaiveDate> = years
            .clone()
            .flat_map(|year| provider.holidays_for_year(year))
            .collect();

        tracing::debug!(
            provider = provider.name(),
            first_year = years.start(),
            last_year = years.end(),
            holidays = holidays.len(),
            "holiday calendar built"
        );

        Self {
            holidays,
            years: Some(years),
        }
    }

    /// A calendar whose only closures are weekends and the given dates.
    pub fn from_dates(dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        let holidays: BTreeSet<NaiveDate> = dates.into_iter().collect();
        let years = match (holidays.first(), holidays.last()) {
            (Some(first), Some(last)) => {
                use chrono::Datelike;
                Some(first.year()..=last.year())
            }
            _ => None,
        };
        Self { holidays, years }
    }

    /// Add ad hoc closures (typhoon days and the like) on top of the provider set.
    pub fn with_extra_holidays(mut self, dates: impl IntoIterator<Item = NaiveDate>) -> Self {
        self.holidays.extend(dates);
        self
    }

    /// Years the holiday set was built for, if any.
    pub fn covered_years(&self) -> Option<&RangeInclusive<i32>> {
        self.years.as_ref()
    }

    pub fn holiday_count(&self) -> usize {
        self.holidays.len()
    }

    pub fn is_holiday(&self, date: TradingDate) -> bool {
        self.holidays.contains(&date.as_naive())
    }

    pub fn is_weekend(date: TradingDate) -> bool {
        matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
    }

    /// Weekday that is not a listed holiday.
    pub fn is_trading_day(&self, date: TradingDate) -> bool {
        !Self::is_weekend(date) && !self.is_holiday(date)
    }

    /// Most recent trading day at or before `date`.
    ///
    /// Returns `date` itself when it is a trading day. Gives up after
    /// [`MAX_LOOKBACK_DAYS`] with [`CalendarError::CalendarExhausted`].
    pub fn find_last_trading_day(&self, date: TradingDate) -> Result<TradingDate, CalendarError> {
        let exhausted = CalendarError::CalendarExhausted {
            from: date,
            lookback_days: MAX_LOOKBACK_DAYS,
        };

        let mut candidate = date;
        for _ in 0..=MAX_LOOKBACK_DAYS {
            if self.is_trading_day(candidate) {
                return Ok(candidate);
            }
            candidate = match candidate.pred() {
                Some(prev) => prev,
                None => return Err(exhausted),
            };
        }
        Err(exhausted)
    }
}
