//! Raw provider rows → canonical records.
//!
//! Pipeline per row:
//! 1. clean the designated numeric fields (thousands separators, whitespace,
//!    placeholder tokens) and coerce to `f64`, unparsable → NaN
//! 2. stamp the trade date
//! 3. map the provider's field names onto the canonical record
//! 4. coerce volume to a non-negative integer, NaN → 0
//! 5. drop rows whose security code is not exactly four ASCII digits
//!
//! Index, ETF and warrant rows share the feed with ordinary shares; step 5 is
//! what filters them out.

use crate::domain::{CanonicalRecord, Dataset, RawRow, RawTable, TradingDate};

/// Provider field names for the closing-price table.
pub mod fields {
    pub const SECURITY_CODE: &str = "證券代號";
    pub const SECURITY_NAME: &str = "證券名稱";
    pub const VOLUME: &str = "成交股數";
    pub const TRANSACTIONS: &str = "成交筆數";
    pub const TRADE_VALUE: &str = "成交金額";
    pub const OPEN: &str = "開盤價";
    pub const HIGH: &str = "最高價";
    pub const LOW: &str = "最低價";
    pub const CLOSE: &str = "收盤價";
    pub const DIRECTION: &str = "漲跌(+/-)";
    pub const CHANGE: &str = "漲跌價差";
}

/// "Unchanged" placeholder, read as zero.
const UNCHANGED_TOKEN: &str = "--";

/// Strip separators and coerce a provider cell to `f64`.
///
/// `"--"` means unchanged and reads as `0.0`. Anything that still fails to
/// parse after cleaning (a bare `"-"`, blanks, stray text) is NaN.
pub fn clean_numeric(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();

    if cleaned == UNCHANGED_TOKEN {
        return 0.0;
    }
    cleaned.parse::<f64>().unwrap_or(f64::NAN)
}

/// Exactly four ASCII digits, no trimming.
pub fn is_listed_stock_code(code: &str) -> bool {
    code.len() == 4 && code.bytes().all(|b| b.is_ascii_digit())
}

/// NaN and negatives become zero; fractional shares are truncated.
fn volume_from(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value as u64
    }
}

/// The direction column carries markup such as `<p style= color:green>-</p>`;
/// only a minus sign flips the change.
fn is_decline(direction: Option<&String>) -> bool {
    direction.is_some_and(|d| d.contains('-'))
}

fn numeric(row: &RawRow, field: &str) -> f64 {
    row.get(field).map_or(f64::NAN, |v| clean_numeric(v))
}

fn normalize_row(date: TradingDate, row: &RawRow) -> Option<CanonicalRecord> {
    let stock_id = row.get(fields::SECURITY_CODE)?;
    if !is_listed_stock_code(stock_id) {
        return None;
    }

    let change = numeric(row, fields::CHANGE);
    let price_change = if is_decline(row.get(fields::DIRECTION)) {
        -change
    } else {
        change
    };

    Some(CanonicalRecord {
        trade_date: date,
        stock_id: stock_id.clone(),
        stock_name: row
            .get(fields::SECURITY_NAME)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        volume: volume_from(numeric(row, fields::VOLUME)),
        transactions: numeric(row, fields::TRANSACTIONS),
        trade_value: numeric(row, fields::TRADE_VALUE),
        open_price: numeric(row, fields::OPEN),
        high_price: numeric(row, fields::HIGH),
        low_price: numeric(row, fields::LOW),
        close_price: numeric(row, fields::CLOSE),
        price_change,
    })
}

/// Normalize a provider table into the dataset for `date`.
///
/// A table without the security code field cannot be keyed and yields an
/// empty dataset.
pub fn normalize(date: TradingDate, table: &RawTable) -> Dataset {
    if table.is_empty() {
        return Dataset::empty(date);
    }
    if !table.has_field(fields::SECURITY_CODE) {
        tracing::warn!(
            %date,
            fields = ?table.fields,
            "raw table has no security code field; discarding"
        );
        return Dataset::empty(date);
    }

    let records: Vec<CanonicalRecord> = table
        .rows
        .iter()
        .filter_map(|row| normalize_row(date, row))
        .collect();

    tracing::info!(
        %date,
        raw_rows = table.len(),
        kept = records.len(),
        dropped = table.len() - records.len(),
        "normalized daily summary"
    );

    Dataset::new(date, records)
}
