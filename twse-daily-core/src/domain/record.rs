//! Raw provider rows and the canonical record they normalize into.

use super::date::TradingDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One security's row as published by the provider: field name → string cell.
pub type RawRow = HashMap<String, String>;

/// The provider's field list together with its rows.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub fields: Vec<String>,
    pub rows: Vec<RawRow>,
}

impl RawTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Zip a field list with positional rows. Cells beyond the field list are
    /// ignored; missing trailing cells are simply absent from the row.
    pub fn from_positional(fields: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let rows = rows
            .into_iter()
            .map(|cells| {
                fields
                    .iter()
                    .cloned()
                    .zip(cells)
                    .collect::<RawRow>()
            })
            .collect();
        Self { fields, rows }
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Normalized daily summary for one listed security.
///
/// `stock_id` is always exactly four ASCII digits. Numeric fields that the
/// provider left blank or unparsable are `NaN`; `volume` is the exception and
/// falls back to zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub trade_date: TradingDate,
    pub stock_id: String,
    pub stock_name: String,
    pub volume: u64,
    pub transactions: f64,
    pub trade_value: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub close_price: f64,
    /// Signed: negative when the provider marks a decline.
    pub price_change: f64,
}

impl PartialEq for CanonicalRecord {
    /// NaN fields compare equal to each other so stored datasets round-trip.
    fn eq(&self, other: &Self) -> bool {
        fn same(a: f64, b: f64) -> bool {
            (a.is_nan() && b.is_nan()) || a == b
        }
        self.trade_date == other.trade_date
            && self.stock_id == other.stock_id
            && self.stock_name == other.stock_name
            && self.volume == other.volume
            && same(self.transactions, other.transactions)
            && same(self.trade_value, other.trade_value)
            && same(self.open_price, other.open_price)
            && same(self.high_price, other.high_price)
            && same(self.low_price, other.low_price)
            && same(self.close_price, other.close_price)
            && same(self.price_change, other.price_change)
    }
}

/// All canonical records for a single trading date, in provider order.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub date: TradingDate,
    pub records: Vec<CanonicalRecord>,
}

impl Dataset {
    pub fn new(date: TradingDate, records: Vec<CanonicalRecord>) -> Self {
        Self { date, records }
    }

    pub fn empty(date: TradingDate) -> Self {
        Self {
            date,
            records: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// BLAKE3 over the serialized records, used for artifact sidecars.
    pub fn content_hash(&self) -> Result<String, serde_json::Error> {
        let bytes = serde_json::to_vec(&self.records)?;
        Ok(blake3::hash(&bytes).to_hex().to_string())
    }
}
