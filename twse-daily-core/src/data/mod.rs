//! Provider access and normalization.

pub mod normalize;
pub mod provider;
pub mod quote;
pub mod twse;

pub use normalize::{clean_numeric, is_listed_stock_code, normalize};
pub use provider::{DataError, FetchReport, MarketDataProvider};
pub use quote::{PriceLookup, PriceQuote};
pub use twse::{Envelope, TwseClient};
