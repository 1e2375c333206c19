//! Single-symbol price lookup.
//!
//! Reads `meta.regularMarketPrice` from Yahoo's v8 chart API. The lookup never
//! fails: any upstream problem is folded into [`PriceQuote::Error`] so callers
//! can hand the value straight to a JSON response.

use crate::config::QuoteConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Message used when the symbol is unknown or the source returned no price.
pub const NOT_FOUND_MESSAGE: &str = "symbol not found or price source unavailable";

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    regular_market_price: Option<f64>,
}

/// `{"symbol": ..., "price": ...}` or `{"error": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceQuote {
    Found { symbol: String, price: f64 },
    Error { error: String },
}

impl PriceQuote {
    fn error(msg: impl Into<String>) -> Self {
        PriceQuote::Error { error: msg.into() }
    }
}

pub struct PriceLookup {
    client: Option<reqwest::blocking::Client>,
    base_url: String,
}

impl PriceLookup {
    pub fn new(config: &QuoteConfig) -> Self {
        // A client that fails to build is reported per lookup, not at startup.
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| tracing::warn!(error = %e, "failed to build quote HTTP client"))
            .ok();

        Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        }
    }

    fn chart_url(&self, symbol: &str) -> String {
        format!("{}/{symbol}?interval=1d&range=1d", self.base_url)
    }

    /// Current price for `symbol`; the symbol is echoed upper-cased.
    pub fn lookup(&self, symbol: &str) -> PriceQuote {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return PriceQuote::error(NOT_FOUND_MESSAGE);
        }
        let Some(client) = &self.client else {
            return PriceQuote::error("price source unavailable: HTTP client not initialised");
        };

        let resp = match client.get(self.chart_url(&symbol)).send() {
            Ok(resp) => resp,
            Err(e) => return PriceQuote::error(e.to_string()),
        };
        // Yahoo answers unknown symbols with 404 and a chart.error body, so the
        // body is parsed regardless of status.
        let status = resp.status();
        let chart: ChartResponse = match resp.json() {
            Ok(chart) => chart,
            Err(e) if status.is_success() => return PriceQuote::error(e.to_string()),
            Err(_) => return PriceQuote::error(format!("HTTP {status}")),
        };

        parse_price(&symbol, chart)
    }
}

fn parse_price(symbol: &str, chart: ChartResponse) -> PriceQuote {
    if let Some(err) = chart.chart.error {
        tracing::debug!(symbol, code = %err.code, description = %err.description, "chart error");
        return PriceQuote::error(NOT_FOUND_MESSAGE);
    }

    let price = chart
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .and_then(|data| data.meta.regular_market_price);

    match price {
        Some(price) => PriceQuote::Found {
            symbol: symbol.to_string(),
            price,
        },
        None => PriceQuote::error(NOT_FOUND_MESSAGE),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> PriceQuote {
        parse_price("2330.TW", serde_json::from_str(body).unwrap())
    }

    #[test]
    fn price_from_meta() {
        let quote = parse(
            r#"{"chart": {"result": [{"meta": {"regularMarketPrice": 950.0}}], "error": null}}"#,
        );
        assert_eq!(
            quote,
            PriceQuote::Found {
                symbol: "2330.TW".into(),
                price: 950.0
            }
        );
    }

    #[test]
    fn missing_price_is_error() {
        let quote = parse(r#"{"chart": {"result": [{"meta": {}}], "error": null}}"#);
        assert_eq!(quote, PriceQuote::error(NOT_FOUND_MESSAGE));
    }

    #[test]
    fn chart_error_is_error() {
        let quote = parse(
            r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}}"#,
        );
        assert_eq!(quote, PriceQuote::error(NOT_FOUND_MESSAGE));
    }

    #[test]
    fn serializes_to_contract_shapes() {
        let found = PriceQuote::Found {
            symbol: "AAPL".into(),
            price: 1.5,
        };
        assert_eq!(
            serde_json::to_string(&found).unwrap(),
            r#"{"symbol":"AAPL","price":1.5}"#
        );
        assert_eq!(
            serde_json::to_string(&PriceQuote::error("boom")).unwrap(),
            r#"{"error":"boom"}"#
        );
    }
}
