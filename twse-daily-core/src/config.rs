//! TOML configuration.
//!
//! Every section and field has a default, so a missing file (or an empty one)
//! yields a working configuration pointed at the public TWSE endpoint.

use crate::domain::TradingDate;
use crate::resolver::DEFAULT_CUTOFF_HOUR;
use crate::store::StorageBackend;
use chrono::NaiveTime;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PROVIDER_URL: &str = "https://www.twse.com.tw/rwd/zh/afterTrading/MI_INDEX";
pub const DEFAULT_REFERER: &str = "https://www.twse.com.tw/zh/trading/historical/mi-index.html";
pub const DEFAULT_QUOTE_URL: &str = "https://query2.finance.yahoo.com/v8/finance/chart";
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("unknown timezone {0:?}")]
    UnknownTimezone(String),

    #[error("invalid cutoff {0:?}: expected HH:MM")]
    InvalidCutoff(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub url: String,
    /// Report selector sent as the `type` query parameter.
    pub report_type: String,
    pub user_agent: String,
    pub referer: Option<String>,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_PROVIDER_URL.to_string(),
            report_type: "ALLBUT0999".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            referer: Some(DEFAULT_REFERER.to_string()),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// IANA zone name.
    pub timezone: String,
    /// Local publication cutoff, `HH:MM`.
    pub cutoff: String,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Taipei".to_string(),
            cutoff: format!("{DEFAULT_CUTOFF_HOUR:02}:00"),
        }
    }
}

impl ScheduleConfig {
    pub fn tz(&self) -> Result<Tz, ConfigError> {
        self.timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(self.timezone.clone()))
    }

    pub fn cutoff_time(&self) -> Result<NaiveTime, ConfigError> {
        NaiveTime::parse_from_str(self.cutoff.trim(), "%H:%M")
            .map_err(|_| ConfigError::InvalidCutoff(self.cutoff.clone()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub dir: PathBuf,
    pub backend: StorageBackend,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("data"),
            backend: StorageBackend::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Closures not covered by the built-in holiday rules (typhoon days,
    /// ad-hoc make-up closures).
    pub extra_holidays: Vec<TradingDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    pub url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QUOTE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub provider: ProviderConfig,
    pub schedule: ScheduleConfig,
    pub storage: StorageConfig,
    pub calendar: CalendarConfig,
    pub quote: QuoteConfig,
}

impl AppConfig {
    /// Load from `path`, or defaults when `path` is `None`. The result is
    /// validated either way.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.schedule.tz()?;
        self.schedule.cutoff_time()?;
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be > 0".into()));
        }
        if self.quote.timeout_secs == 0 {
            return Err(ConfigError::Invalid("quote.timeout_secs must be > 0".into()));
        }
        if self.provider.url.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.url is empty".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_is_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.provider.report_type, "ALLBUT0999");
        assert_eq!(config.storage.backend, StorageBackend::Parquet);
        config.validate().unwrap();
    }

    #[test]
    fn default_schedule_is_taipei_at_four() {
        let schedule = ScheduleConfig::default();
        assert_eq!(schedule.tz().unwrap(), chrono_tz::Asia::Taipei);
        assert_eq!(
            schedule.cutoff_time().unwrap(),
            NaiveTime::from_hms_opt(16, 0, 0).unwrap()
        );
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [storage]
            backend = "sqlite"

            [calendar]
            extra_holidays = ["2024-07-24", "2024-07-25"]
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert_eq!(config.storage.dir, PathBuf::from("data"));
        assert_eq!(
            config.calendar.extra_holidays,
            vec![
                TradingDate::from_ymd(2024, 7, 24).unwrap(),
                TradingDate::from_ymd(2024, 7, 25).unwrap(),
            ]
        );
        assert_eq!(config.provider.url, DEFAULT_PROVIDER_URL);
    }

    #[test]
    fn rejects_unknown_timezone() {
        let config = AppConfig::from_toml("[schedule]\ntimezone = \"Mars/Olympus\"").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownTimezone(_))));
    }

    #[test]
    fn rejects_bad_cutoff() {
        let config = AppConfig::from_toml("[schedule]\ncutoff = \"4pm\"").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::InvalidCutoff(_))));
    }

    #[test]
    fn rejects_zero_timeout() {
        let config = AppConfig::from_toml("[provider]\ntimeout_secs = 0").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn unknown_backend_fails_to_parse() {
        assert!(AppConfig::from_toml("[storage]\nbackend = \"csv\"").is_err());
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("twse.toml");
        std::fs::write(&path, "[provider]\ntimeout_secs = 5\n").unwrap();
        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.provider.timeout_secs, 5);
    }

    #[test]
    fn load_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = AppConfig::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
