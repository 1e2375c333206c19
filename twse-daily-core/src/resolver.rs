//! Decides which trading date's dataset is currently due.
//!
//! Three rules, evaluated once per call:
//! - today is a trading day and the cutoff has passed → today
//! - today is a trading day before the cutoff → last trading day before today
//! - today is not a trading day → last trading day before today
//!
//! The exchange publishes the daily summary some time after the close, so
//! before the cutoff only yesterday's (or earlier) data can be relied upon.

use crate::calendar::{CalendarError, TradingCalendar};
use crate::domain::TradingDate;
use chrono::{DateTime, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hour (local exchange time) after which the day's summary is published.
pub const DEFAULT_CUTOFF_HOUR: u32 = 16;

pub fn default_cutoff() -> NaiveTime {
    NaiveTime::from_hms_opt(DEFAULT_CUTOFF_HOUR, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Which resolution rule fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionRule {
    /// Trading day, at or after the cutoff.
    PublishedToday,
    /// Trading day, before the cutoff.
    BeforeCutoff,
    /// Weekend or holiday.
    MarketClosed,
}

impl fmt::Display for ResolutionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResolutionRule::PublishedToday => "trading day, past cutoff",
            ResolutionRule::BeforeCutoff => "trading day, before cutoff",
            ResolutionRule::MarketClosed => "market closed today",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub target: TradingDate,
    pub rule: ResolutionRule,
}

#[derive(Debug, Clone, Copy)]
pub struct DateResolver {
    cutoff: NaiveTime,
}

impl Default for DateResolver {
    fn default() -> Self {
        Self::new(default_cutoff())
    }
}

impl DateResolver {
    pub fn new(cutoff: NaiveTime) -> Self {
        Self { cutoff }
    }

    pub fn cutoff(&self) -> NaiveTime {
        self.cutoff
    }

    /// Resolve the due trading date for `now`, interpreted in its own timezone.
    pub fn resolve<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        calendar: &TradingCalendar,
    ) -> Result<Resolution, CalendarError> {
        let today = TradingDate::new(now.date_naive());
        let time = now.time();

        let resolution = if calendar.is_trading_day(today) {
            if time >= self.cutoff {
                Resolution {
                    target: today,
                    rule: ResolutionRule::PublishedToday,
                }
            } else {
                let yesterday = today.pred().ok_or(CalendarError::CalendarExhausted {
                    from: today,
                    lookback_days: 0,
                })?;
                Resolution {
                    target: calendar.find_last_trading_day(yesterday)?,
                    rule: ResolutionRule::BeforeCutoff,
                }
            }
        } else {
            Resolution {
                target: calendar.find_last_trading_day(today)?,
                rule: ResolutionRule::MarketClosed,
            }
        };

        tracing::debug!(
            %today,
            %time,
            cutoff = %self.cutoff,
            target = %resolution.target,
            rule = ?resolution.rule,
            "resolved target date"
        );

        Ok(resolution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn taipei(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(8 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .unwrap()
    }

    fn date(y: i32, m: u32, d: u32) -> TradingDate {
        TradingDate::from_ymd(y, m, d).unwrap()
    }

    fn calendar() -> TradingCalendar {
        // Mid-Autumn Festival 2024
        TradingCalendar::from_dates([date(2024, 9, 17).as_naive()])
    }

    #[test]
    fn monday_morning_resolves_to_friday() {
        let r = DateResolver::default()
            .resolve(&taipei(2024, 9, 16, 10, 0), &calendar())
            .unwrap();
        assert_eq!(r.target, date(2024, 9, 13));
        assert_eq!(r.rule, ResolutionRule::BeforeCutoff);
    }

    #[test]
    fn monday_evening_resolves_to_monday() {
        let r = DateResolver::default()
            .resolve(&taipei(2024, 9, 16, 17, 0), &calendar())
            .unwrap();
        assert_eq!(r.target, date(2024, 9, 16));
        assert_eq!(r.rule, ResolutionRule::PublishedToday);
    }

    #[test]
    fn saturday_resolves_to_friday() {
        let r = DateResolver::default()
            .resolve(&taipei(2024, 9, 14, 12, 0), &calendar())
            .unwrap();
        assert_eq!(r.target, date(2024, 9, 13));
        assert_eq!(r.rule, ResolutionRule::MarketClosed);
    }

    #[test]
    fn cutoff_is_inclusive() {
        let r = DateResolver::default()
            .resolve(&taipei(2024, 9, 16, 16, 0), &calendar())
            .unwrap();
        assert_eq!(r.target, date(2024, 9, 16));
    }

    #[test]
    fn holiday_evening_resolves_to_previous_trading_day() {
        let r = DateResolver::default()
            .resolve(&taipei(2024, 9, 17, 18, 0), &calendar())
            .unwrap();
        assert_eq!(r.target, date(2024, 9, 16));
        assert_eq!(r.rule, ResolutionRule::MarketClosed);
    }

    #[test]
    fn morning_after_holiday_skips_it() {
        let r = DateResolver::default()
            .resolve(&taipei(2024, 9, 18, 9, 0), &calendar())
            .unwrap();
        assert_eq!(r.target, date(2024, 9, 16));
    }

    #[test]
    fn utc_timestamp_is_not_reinterpreted() {
        // 2024-09-16 09:00 UTC is 17:00 in Taipei, but the resolver works in
        // whatever zone the caller hands it.
        let utc = chrono::Utc.with_ymd_and_hms(2024, 9, 16, 9, 0, 0).unwrap();
        let r = DateResolver::default().resolve(&utc, &calendar()).unwrap();
        assert_eq!(r.target, date(2024, 9, 13));

        let local = utc.with_timezone(&chrono_tz::Asia::Taipei);
        let r = DateResolver::default().resolve(&local, &calendar()).unwrap();
        assert_eq!(r.target, date(2024, 9, 16));
    }
}
