//! Domain types for the daily market summary pipeline.

pub mod date;
pub mod outcome;
pub mod record;

pub use date::{DateParseError, TradingDate};
pub use outcome::{FetchOutcome, FetchStatus};
pub use record::{CanonicalRecord, Dataset, RawRow, RawTable};
