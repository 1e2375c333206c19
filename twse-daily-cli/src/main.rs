//! twse-daily CLI: fetch and inspect TWSE daily closing summaries.
//!
//! Commands:
//! - `fetch`: run the pipeline once for the due (or given) trading date
//! - `resolve`: print the trading date currently due and why
//! - `status`: list persisted dates with row counts
//! - `show`: print persisted rows for one date
//! - `price`: look up a single symbol's current price as JSON

use anyhow::{Context, Result};
use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use twse_daily_core::calendar::TaiwanHolidays;
use twse_daily_core::data::{PriceLookup, TwseClient};
use twse_daily_core::domain::{CanonicalRecord, FetchStatus};
use twse_daily_core::store::{open_store, DatasetStore};
use twse_daily_core::{
    AppConfig, DateResolver, FetchOrchestrator, RunOptions, TradingCalendar, TradingDate,
};

/// Rows echoed after a successful fetch.
const SAMPLE_ROWS: usize = 3;

#[derive(Parser)]
#[command(
    name = "twse-daily",
    version,
    about = "Fetch and store TWSE daily closing summaries, one dataset per trading day"
)]
struct Cli {
    /// Path to a TOML config file. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override `storage.dir`.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Log filter (e.g. `debug`, `twse_daily_core=trace`). Falls back to RUST_LOG, then `info`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, normalize and store the due trading date's summary.
    Fetch {
        /// Trading date (YYYY-MM-DD) to fetch instead of the resolved one.
        #[arg(long)]
        date: Option<TradingDate>,

        /// Fetch even if the date is already stored.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Print the trading date currently due and the rule that selected it.
    Resolve,
    /// List stored dates and their row counts.
    Status,
    /// Print stored rows for a date.
    Show {
        /// Trading date (YYYY-MM-DD).
        date: TradingDate,

        /// Maximum rows to print.
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Look up the current price of a symbol (e.g. 2330.TW).
    Price {
        symbol: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = cli.data_dir {
        config.storage.dir = dir;
    }
    tracing::debug!(
        backend = ?config.storage.backend,
        dir = %config.storage.dir.display(),
        "configuration loaded"
    );

    match cli.command {
        Commands::Fetch { date, force } => run_fetch(&config, RunOptions { date, force }),
        Commands::Resolve => run_resolve(&config),
        Commands::Status => run_status(&config),
        Commands::Show { date, limit } => run_show(&config, date, limit),
        Commands::Price { symbol } => run_price(&config, &symbol),
    }
}

fn init_tracing(level: Option<&str>) {
    let env_filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false).compact())
        .init();
}

/// Current wall-clock time in the exchange timezone.
fn local_now(config: &AppConfig) -> Result<DateTime<Tz>> {
    let tz = config.schedule.tz()?;
    Ok(Utc::now().with_timezone(&tz))
}

fn build_calendar(config: &AppConfig, anchor_year: i32) -> TradingCalendar {
    TradingCalendar::new(&TaiwanHolidays::new(), anchor_year).with_extra_holidays(
        config
            .calendar
            .extra_holidays
            .iter()
            .map(TradingDate::as_naive),
    )
}

fn open_configured_store(config: &AppConfig) -> Box<dyn DatasetStore> {
    open_store(config.storage.backend, config.storage.dir.clone())
}

fn run_fetch(config: &AppConfig, opts: RunOptions) -> Result<()> {
    let now = local_now(config)?;
    let calendar = build_calendar(config, now.year());
    let resolver = DateResolver::new(config.schedule.cutoff_time()?);
    let provider = TwseClient::new(&config.provider)?;
    let store = open_configured_store(config);

    let outcome = FetchOrchestrator::new(&calendar, resolver, &provider, store.as_ref())
        .run(&now, opts)
        .context("fetch failed")?;

    if outcome.status == FetchStatus::FetchedAndSaved {
        let dataset = store.load(outcome.target_date)?;
        print_sample(&dataset.records[..dataset.len().min(SAMPLE_ROWS)]);
    }
    println!("{}", outcome.status_line());

    Ok(())
}

fn print_sample(records: &[CanonicalRecord]) {
    println!("{:<8} | {:<11} | {:>10}", "stock_id", "close_price", "volume");
    println!("{}", "-".repeat(35));
    for r in records {
        println!("{:<8} | {:<11.2} | {:>10}", r.stock_id, r.close_price, r.volume);
    }
}

fn run_resolve(config: &AppConfig) -> Result<()> {
    let now = local_now(config)?;
    let calendar = build_calendar(config, now.year());
    let resolver = DateResolver::new(config.schedule.cutoff_time()?);

    let resolution = resolver.resolve(&now, &calendar)?;
    println!(
        "{} ({}; now {} {})",
        resolution.target,
        resolution.rule,
        now.format("%Y-%m-%d %H:%M"),
        config.schedule.timezone
    );
    Ok(())
}

fn run_status(config: &AppConfig) -> Result<()> {
    let store = open_configured_store(config);
    let dates = store.list_dates()?;
    if dates.is_empty() {
        println!("No datasets stored in {}", config.storage.dir.display());
        return Ok(());
    }

    println!("{:<12} {:>8}  {}", "date", "rows", "artifact");
    for date in &dates {
        let rows = store.row_count(*date)?;
        println!(
            "{:<12} {:>8}  {}",
            date.to_string(),
            rows,
            store.artifact_path(*date).display()
        );
    }
    println!("{} datasets ({} backend)", dates.len(), store.name());
    Ok(())
}

fn run_show(config: &AppConfig, date: TradingDate, limit: usize) -> Result<()> {
    let store = open_configured_store(config);
    let dataset = store.load(date)?;

    println!(
        "{:<6} {:<12} {:>14} {:>10} {:>10} {:>10} {:>10} {:>8}",
        "id", "name", "volume", "open", "high", "low", "close", "change"
    );
    for r in dataset.records.iter().take(limit) {
        println!(
            "{:<6} {:<12} {:>14} {:>10.2} {:>10.2} {:>10.2} {:>10.2} {:>+8.2}",
            r.stock_id,
            r.stock_name,
            r.volume,
            r.open_price,
            r.high_price,
            r.low_price,
            r.close_price,
            r.price_change
        );
    }
    if dataset.len() > limit {
        println!("... {} more rows", dataset.len() - limit);
    }
    Ok(())
}

fn run_price(config: &AppConfig, symbol: &str) -> Result<()> {
    let quote = PriceLookup::new(&config.quote).lookup(symbol);
    println!("{}", serde_json::to_string(&quote)?);
    Ok(())
}
