use thiserror::Error;

/// Unified error type for the entire wealthwise-core library.
/// Every public function returns `Result<T, CoreError>`.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Storage / File ──────────────────────────────────────────────
    #[error("Database error: {0}")]
    Database(String),

    #[error("Database is locked (gave up after {attempts} attempts)")]
    DatabaseLocked { attempts: u32 },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Deserialization error: {0}")]
    Deserialization(String),

    #[error("File I/O error: {0}")]
    FileIO(String),

    // ── API / Network ───────────────────────────────────────────────
    #[error("API error ({provider}): {message}")]
    Api {
        provider: String,
        message: String,
    },

    #[error("Network error: {0}")]
    Network(String),

    #[error("No provider available for asset type: {0}")]
    NoProvider(String),

    // ── Business Logic ──────────────────────────────────────────────
    #[error("Validation failed: {0}")]
    ValidationError(String),

    #[error("Trade not found: {0}")]
    TradeNotFound(String),

    #[error("Dividend not found for warrant {0}")]
    DividendNotFound(String),

    #[error("Warrant number {0} already exists")]
    DuplicateWarrant(String),

    #[error("Cannot sell {requested} shares of {stock}: only {available} available")]
    InsufficientShares {
        stock: String,
        requested: i64,
        available: i64,
    },

    #[error("Price not available for {symbol} in {currency} on {date}")]
    PriceNotAvailable {
        symbol: String,
        currency: String,
        date: String,
    },

    #[error("Exchange rate not available for {base} to {target}")]
    RateNotAvailable { base: String, target: String },
}

impl CoreError {
    /// True for errors caused by SQLite lock contention that are worth retrying.
    pub fn is_lock_contention(&self) -> bool {
        match self {
            CoreError::Database(msg) => {
                let lower = msg.to_lowercase();
                // SQLITE_BUSY reads "database is locked", SQLITE_LOCKED "database table is locked"
                lower.contains("is locked") || lower.contains("database is busy")
            }
            _ => false,
        }
    }
}

// ── Conversion helpers (From impls) ─────────────────────────────────

impl From<rusqlite::Error> for CoreError {
    fn from(e: rusqlite::Error) -> Self {
        CoreError::Database(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::FileIO(e.to_string())
    }
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Deserialization(e.to_string())
    }
}

impl From<reqwest::Error> for CoreError {
    fn from(e: reqwest::Error) -> Self {
        // Strip query parameters and path-embedded keys from URLs so API
        // keys never end up in logs.
        let msg = e.to_string();
        let sanitized = if let Some(idx) = msg.find('?') {
            format!("{}?<query redacted>", &msg[..idx])
        } else {
            msg
        };
        CoreError::Network(redact_path_key(&sanitized))
    }
}

/// ExchangeRate-API puts the key in the path (`/v6/<key>/pair/...`).
fn redact_path_key(msg: &str) -> String {
    match msg.find("/v6/") {
        Some(start) => {
            let key_start = start + 4;
            let key_end = msg[key_start..]
                .find('/')
                .map(|i| key_start + i)
                .unwrap_or(msg.len());
            format!("{}<key>{}", &msg[..key_start], &msg[key_end..])
        }
        None => msg.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_exchange_rate_key() {
        let msg = "error sending request for url (https://v6.exchangerate-api.com/v6/SECRET/pair/USD/PKR)";
        let out = redact_path_key(msg);
        assert!(!out.contains("SECRET"));
        assert!(out.contains("/v6/<key>/pair/USD/PKR"));
    }

    #[test]
    fn leaves_other_urls_alone() {
        let msg = "error sending request for url (https://api.frankfurter.dev/v1/latest)";
        assert_eq!(redact_path_key(msg), msg);
    }

    #[test]
    fn lock_contention_detection() {
        assert!(CoreError::Database("database is locked".into()).is_lock_contention());
        assert!(!CoreError::Database("no such table: trades".into()).is_lock_contention());
        assert!(!CoreError::ValidationError("database is locked".into()).is_lock_contention());
    }
}
