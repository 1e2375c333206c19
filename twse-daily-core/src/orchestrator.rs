//! One pipeline invocation: resolve the due date, skip if already stored,
//! otherwise fetch, normalize and persist.
//!
//! Policy, in order:
//! 1. Target = explicit date if given, else the resolver's due date
//! 2. Dataset already stored (and not forced) → `AlreadyPresent`
//! 3. Target later than today → `AbortedFutureDate`
//! 4. Fetch + normalize; nothing usable → `FetchedEmpty`
//! 5. Save → `FetchedAndSaved`
//!
//! Steps 2 and 5 are not atomic; see [`crate::store`].

use crate::calendar::{CalendarError, TradingCalendar};
use crate::data::{normalize, MarketDataProvider};
use crate::domain::{FetchOutcome, FetchStatus, TradingDate};
use crate::resolver::DateResolver;
use crate::store::{DatasetStore, SaveOutcome, StoreError};
use chrono::{DateTime, TimeZone};
use thiserror::Error;

/// Hard faults. Provider failures never show up here.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Explicit target date; bypasses the resolver.
    pub date: Option<TradingDate>,
    /// Fetch even when a dataset for the target is already stored.
    pub force: bool,
}

pub struct FetchOrchestrator<'a> {
    calendar: &'a TradingCalendar,
    resolver: DateResolver,
    provider: &'a dyn MarketDataProvider,
    store: &'a dyn DatasetStore,
}

impl<'a> FetchOrchestrator<'a> {
    pub fn new(
        calendar: &'a TradingCalendar,
        resolver: DateResolver,
        provider: &'a dyn MarketDataProvider,
        store: &'a dyn DatasetStore,
    ) -> Self {
        Self {
            calendar,
            resolver,
            provider,
            store,
        }
    }

    /// Run once at wall-clock `now` (already in the exchange timezone).
    pub fn run<Tz: TimeZone>(
        &self,
        now: &DateTime<Tz>,
        opts: RunOptions,
    ) -> Result<FetchOutcome, FetchError> {
        let today = TradingDate::new(now.date_naive());

        let target = match opts.date {
            Some(date) => {
                tracing::info!(%date, "using explicit target date");
                date
            }
            None => {
                let resolution = self.resolver.resolve(now, self.calendar)?;
                tracing::info!(target = %resolution.target, rule = %resolution.rule, "target date resolved");
                resolution.target
            }
        };

        if !opts.force && self.store.exists(target)? {
            tracing::info!(%target, store = self.store.name(), "dataset already present; skipping fetch");
            return Ok(FetchOutcome::new(target, FetchStatus::AlreadyPresent));
        }

        if target > today {
            let fallback = self.calendar.find_last_trading_day(today)?;
            tracing::warn!(%target, %today, %fallback, "target date is in the future; aborting");
            return Ok(FetchOutcome::new(fallback, FetchStatus::AbortedFutureDate));
        }

        let report = self.provider.fetch(target);
        let provider_error = report.error.map(|e| e.to_string());
        let dataset = normalize(target, &report.table);

        if dataset.is_empty() {
            tracing::warn!(%target, provider = self.provider.name(), "no usable rows; nothing saved");
            let mut outcome = FetchOutcome::new(target, FetchStatus::FetchedEmpty);
            outcome.provider_error = provider_error;
            return Ok(outcome);
        }

        let rows = match self.store.save(&dataset)? {
            SaveOutcome::Written { rows, .. } => rows,
            SaveOutcome::Skipped => 0,
        };

        let mut outcome = FetchOutcome::new(target, FetchStatus::FetchedAndSaved);
        outcome.records = rows;
        outcome.provider_error = provider_error;
        Ok(outcome)
    }
}
