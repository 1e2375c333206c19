//! Taiwan Stock Exchange daily trading summary provider.
//!
//! One blocking GET against the `MI_INDEX` report returns every listed
//! security's closing summary for a date. The exchange has served two JSON
//! layouts for this report over time:
//!
//! - flat: top-level `fields9` / `data9`
//! - nested: a `tables` array where the closing-price table sits at a fixed index
//!
//! Both are decoded into [`Envelope`]; a body matching neither (the exchange
//! answers `{"stat": "很抱歉，沒有符合條件的資料!"}` on non-trading days) is a day
//! without data, not a failure.

use super::provider::{DataError, MarketDataProvider};
use crate::config::ProviderConfig;
use crate::domain::{RawTable, TradingDate};
use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Position of the per-security closing table in the nested layout.
pub const NESTED_TABLE_INDEX: usize = 8;

/// `stat` value the exchange sends with a populated report.
const STAT_OK: &str = "OK";

#[derive(Debug, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
}

/// The report body, in whichever layout the exchange used.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope {
    Nested {
        #[serde(default)]
        stat: Option<String>,
        tables: Vec<TableBlock>,
    },
    Flat {
        fields9: Vec<String>,
        data9: Vec<Vec<Value>>,
    },
    /// Any other JSON object, typically a "no data" notice. A body that
    /// lands here while carrying a table key had a table of the wrong shape.
    NoData {
        #[serde(default)]
        stat: Option<String>,
        #[serde(default)]
        tables: Option<Value>,
        #[serde(default)]
        fields9: Option<Value>,
    },
}

impl Envelope {
    pub fn parse(body: &str) -> Result<Self, DataError> {
        serde_json::from_str(body)
            .map_err(|e| DataError::ResponseFormatChanged(format!("invalid JSON body: {e}")))
    }

    /// Extract the per-security table.
    pub fn into_table(self) -> Result<RawTable, DataError> {
        match self {
            Envelope::Flat { fields9, data9 } => Ok(to_raw_table(fields9, data9)),
            Envelope::Nested { stat, mut tables } => {
                if tables.len() <= NESTED_TABLE_INDEX {
                    return if stat.as_deref() == Some(STAT_OK) {
                        Err(DataError::SchemaMismatch(format!(
                            "expected at least {} tables, got {}",
                            NESTED_TABLE_INDEX + 1,
                            tables.len()
                        )))
                    } else {
                        Ok(RawTable::empty())
                    };
                }
                let block = tables.swap_remove(NESTED_TABLE_INDEX);
                tracing::debug!(title = ?block.title, "using nested table");
                Ok(to_raw_table(block.fields, block.data))
            }
            Envelope::NoData {
                stat,
                tables,
                fields9,
            } => {
                if tables.is_some() || fields9.is_some() || stat.as_deref() == Some(STAT_OK) {
                    return Err(DataError::SchemaMismatch(format!(
                        "unrecognised report layout (stat {stat:?})"
                    )));
                }
                tracing::info!(stat = ?stat, "provider reported no data");
                Ok(RawTable::empty())
            }
        }
    }
}

fn cell_to_string(cell: Value) -> String {
    match cell {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn to_raw_table(fields: Vec<String>, data: Vec<Vec<Value>>) -> RawTable {
    let rows = data
        .into_iter()
        .map(|row| row.into_iter().map(cell_to_string).collect())
        .collect();
    RawTable::from_positional(fields, rows)
}

/// TWSE `MI_INDEX` client.
pub struct TwseClient {
    client: reqwest::blocking::Client,
    url: String,
    report_type: String,
}

impl TwseClient {
    pub fn new(config: &ProviderConfig) -> Result<Self, DataError> {
        let mut headers = HeaderMap::new();
        if let Some(referer) = &config.referer {
            let value = HeaderValue::from_str(referer)
                .map_err(|e| DataError::Other(format!("invalid referer header: {e}")))?;
            headers.insert(REFERER, value);
        }

        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: config.url.clone(),
            report_type: config.report_type.clone(),
        })
    }
}

fn classify(e: reqwest::Error) -> DataError {
    if e.is_timeout() {
        DataError::Timeout(e.to_string())
    } else if e.is_connect() || e.is_request() {
        DataError::NetworkUnreachable(e.to_string())
    } else if e.is_decode() || e.is_body() {
        DataError::ResponseFormatChanged(e.to_string())
    } else {
        DataError::Other(e.to_string())
    }
}

impl MarketDataProvider for TwseClient {
    fn name(&self) -> &str {
        "twse"
    }

    fn try_fetch(&self, date: TradingDate) -> Result<RawTable, DataError> {
        let ymd = date.yyyymmdd();
        tracing::info!(url = %self.url, date = %ymd, "requesting TWSE daily summary");

        let resp = self
            .client
            .get(&self.url)
            .query(&[
                ("response", "json"),
                ("date", ymd.as_str()),
                ("type", self.report_type.as_str()),
            ])
            .send()
            .map_err(classify)?;

        let status = resp.status();
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
            });
        }

        let body = resp.text().map_err(classify)?;
        Envelope::parse(&body)?.into_table()
    }
}
