//! TWSE daily summary core: trading calendar, date resolution, provider access,
//! normalization and date-keyed persistence.
//!
//! The pipeline is driven by [`orchestrator::FetchOrchestrator`]; each stage is
//! usable on its own:
//! - [`calendar`] answers trading-day questions from an injected holiday set
//! - [`resolver`] maps wall-clock time to the trading date that is due
//! - [`data`] talks to the exchange and cleans its rows into records
//! - [`store`] persists one artifact per trading date

pub mod calendar;
pub mod config;
pub mod data;
pub mod domain;
pub mod orchestrator;
pub mod resolver;
pub mod store;

pub use calendar::{CalendarError, HolidayProvider, TradingCalendar};
pub use config::AppConfig;
pub use domain::{CanonicalRecord, Dataset, FetchOutcome, FetchStatus, TradingDate};
pub use orchestrator::{FetchError, FetchOrchestrator, RunOptions};
pub use resolver::DateResolver;
