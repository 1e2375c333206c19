//! HTTP-level tests for the TWSE client and the price lookup against a mock server.

use mockito::{Matcher, Server};
use twse_daily_core::config::{ProviderConfig, QuoteConfig};
use twse_daily_core::data::{normalize, DataError, MarketDataProvider, PriceLookup, PriceQuote, TwseClient};
use twse_daily_core::TradingDate;

const PATH: &str = "/rwd/zh/afterTrading/MI_INDEX";

fn date() -> TradingDate {
    TradingDate::from_ymd(2024, 9, 13).unwrap()
}

fn client_for(server: &Server) -> TwseClient {
    let config = ProviderConfig {
        url: format!("{}{PATH}", server.url()),
        timeout_secs: 5,
        ..ProviderConfig::default()
    };
    TwseClient::new(&config).unwrap()
}

fn daily_query() -> Matcher {
    Matcher::AllOf(vec![
        Matcher::UrlEncoded("response".into(), "json".into()),
        Matcher::UrlEncoded("date".into(), "20240913".into()),
        Matcher::UrlEncoded("type".into(), "ALLBUT0999".into()),
    ])
}

const FLAT_BODY: &str = r#"{
    "stat": "OK",
    "date": "20240913",
    "fields9": ["證券代號", "證券名稱", "成交股數", "成交筆數", "成交金額", "開盤價", "最高價", "最低價", "收盤價", "漲跌(+/-)", "漲跌價差"],
    "data9": [
        ["2330", "台積電", "25,432,109", "45,678", "24,123,456,789", "945.00", "955.00", "940.00", "950.00", "<p style= color:red>+</p>", "5.00"],
        ["TWA00", "加權指數", "--", "--", "--", "--", "--", "--", "--", " ", "--"]
    ]
}"#;

#[test]
fn flat_response_sends_expected_request() {
    let mut server = Server::new();
    let defaults = ProviderConfig::default();
    let mock = server
        .mock("GET", PATH)
        .match_query(daily_query())
        .match_header("user-agent", defaults.user_agent.as_str())
        .match_header("referer", defaults.referer.as_deref().unwrap())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(FLAT_BODY)
        .create();

    let report = client_for(&server).fetch(date());
    mock.assert();

    assert!(report.error.is_none());
    assert_eq!(report.table.len(), 2);

    let dataset = normalize(date(), &report.table);
    assert_eq!(dataset.len(), 1);
    assert_eq!(dataset.records[0].stock_id, "2330");
    assert_eq!(dataset.records[0].close_price, 950.0);
}

#[test]
fn nested_response_reads_table_nine() {
    let mut tables: Vec<String> = (0..8)
        .map(|i| format!(r#"{{"title": "summary {i}", "fields": ["指數"], "data": [["{i}"]]}}"#))
        .collect();
    tables.push(
        r#"{"title": "每日收盤行情(全部(不含權證、牛熊證))",
            "fields": ["證券代號", "證券名稱", "成交股數", "收盤價"],
            "data": [["2330", "台積電", "25,432,109", "950.00"], ["1101", "台泥", "8,765,432", "32.80"]]}"#
            .to_string(),
    );
    let body = format!(r#"{{"stat": "OK", "tables": [{}]}}"#, tables.join(","));

    let mut server = Server::new();
    let mock = server
        .mock("GET", PATH)
        .match_query(daily_query())
        .with_status(200)
        .with_body(body)
        .create();

    let report = client_for(&server).fetch(date());
    mock.assert();

    assert!(report.error.is_none());
    let dataset = normalize(date(), &report.table);
    assert_eq!(dataset.len(), 2);
    assert_eq!(dataset.records[1].volume, 8_765_432);
}

#[test]
fn closed_day_stat_is_empty_without_error() {
    let mut server = Server::new();
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"stat": "很抱歉，沒有符合條件的資料!"}"#)
        .create();

    let report = client_for(&server).fetch(date());
    assert!(report.error.is_none());
    assert!(report.table.is_empty());
}

#[test]
fn server_error_is_empty_with_reported_status() {
    let mut server = Server::new();
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("internal error")
        .create();

    let client = client_for(&server);
    assert!(matches!(
        client.try_fetch(date()),
        Err(DataError::HttpStatus { status: 500 })
    ));

    let report = client.fetch(date());
    assert!(report.table.is_empty());
    assert!(matches!(report.error, Some(DataError::HttpStatus { status: 500 })));
}

#[test]
fn malformed_json_is_empty_with_reported_error() {
    let mut server = Server::new();
    server
        .mock("GET", PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create();

    let report = client_for(&server).fetch(date());
    assert!(report.table.is_empty());
    assert!(matches!(report.error, Some(DataError::ResponseFormatChanged(_))));
}

#[test]
fn unreachable_host_is_reported() {
    // Nothing listens on port 9 locally.
    let config = ProviderConfig {
        url: "http://127.0.0.1:9/MI_INDEX".into(),
        timeout_secs: 2,
        ..ProviderConfig::default()
    };
    let report = TwseClient::new(&config).unwrap().fetch(date());
    assert!(report.table.is_empty());
    assert!(report.error.is_some());
}

// ── Price lookup ─────────────────────────────────────────────────────

fn lookup_for(server: &Server) -> PriceLookup {
    PriceLookup::new(&QuoteConfig {
        url: format!("{}/v8/finance/chart", server.url()),
        ..QuoteConfig::default()
    })
}

#[test]
fn price_lookup_reads_market_price() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v8/finance/chart/2330.TW")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"chart": {"result": [{"meta": {"symbol": "2330.TW", "regularMarketPrice": 950.0}}], "error": null}}"#)
        .create();

    let quote = lookup_for(&server).lookup("2330.tw");
    mock.assert();
    assert_eq!(
        quote,
        PriceQuote::Found {
            symbol: "2330.TW".into(),
            price: 950.0
        }
    );
}

#[test]
fn price_lookup_unknown_symbol_is_error_value() {
    let mut server = Server::new();
    server
        .mock("GET", "/v8/finance/chart/NOPE")
        .match_query(Matcher::Any)
        .with_status(404)
        .with_body(r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found, symbol may be delisted"}}}"#)
        .create();

    let quote = lookup_for(&server).lookup("nope");
    assert!(matches!(quote, PriceQuote::Error { .. }));
}
