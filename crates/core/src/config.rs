use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Provider name under which the GoldAPI key is stored.
pub const GOLDAPI_KEY_NAME: &str = "goldapi";

/// Provider name under which the ExchangeRate-API key is stored.
pub const EXCHANGE_RATE_KEY_NAME: &str = "exchangerate_api";

/// Runtime configuration, read from the environment (and an optional `.env` file).
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Directory holding the per-user database files.
    pub data_dir: PathBuf,

    /// API keys by provider name (`goldapi`, `exchangerate_api`).
    pub api_keys: HashMap<String, String>,

    /// SQLite busy timeout applied to every connection.
    pub db_timeout: Duration,

    /// How many times a locked-database write is attempted before giving up.
    pub lock_retries: u32,

    /// Pause between two attempts on a locked database.
    pub lock_retry_delay: Duration,

    /// Maximum number of outbound price requests per calendar day.
    pub max_api_calls_per_day: u32,

    /// Capital gains tax percentage suggested for a sale.
    pub default_cgt_pct: f64,

    /// Withholding tax percentage suggested for a dividend.
    pub default_dividend_tax_pct: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("db"),
            api_keys: HashMap::new(),
            db_timeout: Duration::from_secs(10),
            lock_retries: 5,
            lock_retry_delay: Duration::from_millis(1000),
            max_api_calls_per_day: 200,
            default_cgt_pct: 15.0,
            default_dividend_tax_pct: 15.0,
        }
    }
}

impl AppConfig {
    /// Build the configuration from environment variables.
    /// A `.env` file in the working directory is loaded first when present.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let mut api_keys = HashMap::new();
        if let Some(key) = non_empty_var("GOLDAPI_KEY") {
            api_keys.insert(GOLDAPI_KEY_NAME.to_string(), key);
        }
        if let Some(key) = non_empty_var("EXCHANGE_RATE_API_KEY") {
            api_keys.insert(EXCHANGE_RATE_KEY_NAME.to_string(), key);
        }

        Self {
            data_dir: non_empty_var("WEALTHWISE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            api_keys,
            db_timeout: Duration::from_secs(parse_var(
                "WEALTHWISE_DB_TIMEOUT_SECS",
                defaults.db_timeout.as_secs(),
            )),
            lock_retries: parse_var("WEALTHWISE_LOCK_RETRIES", defaults.lock_retries),
            lock_retry_delay: Duration::from_millis(parse_var(
                "WEALTHWISE_LOCK_RETRY_DELAY_MS",
                defaults.lock_retry_delay.as_millis() as u64,
            )),
            max_api_calls_per_day: parse_var(
                "WEALTHWISE_MAX_API_CALLS",
                defaults.max_api_calls_per_day,
            ),
            default_cgt_pct: parse_var("WEALTHWISE_DEFAULT_CGT_PCT", defaults.default_cgt_pct),
            default_dividend_tax_pct: parse_var(
                "WEALTHWISE_DEFAULT_DIVIDEND_TAX_PCT",
                defaults.default_dividend_tax_pct,
            ),
        }
    }

    /// Same configuration rooted at a different data directory.
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    /// Path of the database file for `username`.
    ///
    /// `<data_dir>/<username lowercased>_portfolio.db`, or `portfolio.db` in the
    /// working directory when no username is given.
    pub fn db_path_for(&self, username: Option<&str>) -> PathBuf {
        match username.map(str::trim).filter(|u| !u.is_empty()) {
            Some(user) => self
                .data_dir
                .join(format!("{}_portfolio.db", user.to_lowercase())),
            None => Path::new("portfolio.db").to_path_buf(),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    match non_empty_var(name) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            log::warn!("Ignoring unparseable {name}={raw}");
            default
        }),
        None => default,
    }
}
