use serde::{Deserialize, Serialize};

/// One row of the `stock_prices` cache.
///
/// Holds a single close per stock plus the close it replaced (`buffer_price`),
/// so a failed refresh can still fall back two levels deep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockPriceRecord {
    pub stock: String,
    pub previous_close: Option<f64>,
    /// ISO date of the last successful refresh
    pub last_updated: Option<String>,
    /// Timestamp of the last attempt to reach a provider, successful or not
    pub last_attempt_time: Option<String>,
    pub buffer_price: Option<f64>,
}

impl StockPriceRecord {
    pub fn empty(stock: &str) -> Self {
        Self {
            stock: stock.to_string(),
            previous_close: None,
            last_updated: None,
            last_attempt_time: None,
            buffer_price: None,
        }
    }

    pub fn is_fresh(&self, today: &str) -> bool {
        self.previous_close.is_some() && self.last_updated.as_deref() == Some(today)
    }
}

/// Where a returned price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceSource {
    /// Already refreshed today; no network call made
    Cache,
    /// Fetched from a provider just now
    Provider,
    /// Provider unavailable; older cached close returned
    StaleCache,
    /// Provider unavailable and no close cached; buffer price returned
    Buffer,
}

impl std::fmt::Display for PriceSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PriceSource::Cache => write!(f, "cache"),
            PriceSource::Provider => write!(f, "provider"),
            PriceSource::StaleCache => write!(f, "stale cache"),
            PriceSource::Buffer => write!(f, "buffer"),
        }
    }
}

/// A stock price together with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub price: f64,
    pub source: PriceSource,
}

/// A stored exchange rate (`exchange_rates` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub base_currency: String,
    pub target_currency: String,
    pub rate: f64,
    /// `YYYY-MM-DD HH:MM:SS`
    pub last_updated: String,
}

impl ExchangeRate {
    pub fn updated_on(&self, today: &str) -> bool {
        self.last_updated.starts_with(today)
    }
}

/// Outcome of a bulk refresh (stocks or metals).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefreshReport {
    /// Symbols whose price was fetched from a provider
    pub refreshed: Vec<String>,
    /// Symbols already current today, left untouched
    pub skipped: Vec<String>,
    /// Symbols that could not be refreshed, with the reason
    pub failed: Vec<(String, String)>,
}

impl RefreshReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}
