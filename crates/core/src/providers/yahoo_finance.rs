use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;

use crate::errors::CoreError;
use crate::models::asset::AssetType;
use super::traits::PriceProvider;

const PROVIDER: &str = "Yahoo Finance";

/// Suffix Yahoo Finance uses for Karachi-listed equities.
pub const PSX_SUFFIX: &str = ".KA";

/// Yahoo Finance as a fallback source for PSX closes.
///
/// - **Free**: No API key required (unofficial public API).
/// - **Symbols**: PSX tickers are queried as `<SYMBOL>.KA`.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio).
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Convert a `chrono::NaiveDate` to `time::OffsetDateTime` (midnight UTC).
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let month = time::Month::try_from(date.month() as u8).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid month in {date}: {e}"),
        })?;

        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Invalid date {date}: {e}"),
            })?
            .with_hms(0, 0, 0)
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Invalid time for {date}: {e}"),
            })?
            .assume_utc();
        Ok(odt)
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

/// Map a PSX ticker to its Yahoo Finance symbol (`HUBC` → `HUBC.KA`).
pub fn yahoo_symbol(symbol: &str) -> String {
    let upper = symbol.trim().to_uppercase();
    if upper.ends_with(PSX_SUFFIX) {
        upper
    } else {
        format!("{upper}{PSX_SUFFIX}")
    }
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_asset_types(&self) -> Vec<AssetType> {
        vec![AssetType::Stock]
    }

    async fn get_current_price(&self, symbol: &str, _currency: &str) -> Result<f64, CoreError> {
        let ticker = yahoo_symbol(symbol);
        let resp = self
            .connector
            .get_latest_quotes(&ticker, "1d")
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch latest quote for {ticker}: {e}"),
            })?;

        let quote = resp.last_quote().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No quote data for {ticker}: {e}"),
        })?;

        Ok(quote.close)
    }

    async fn get_historical_price(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        let ticker = yahoo_symbol(symbol);
        // Look back a few days so weekends and holidays still resolve
        let start = Self::to_offset_datetime(date - chrono::Duration::days(5))?;
        let end = Self::to_offset_datetime(date + chrono::Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(&ticker, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {ticker} on {date}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {ticker}: {e}"),
        })?;

        quotes
            .iter()
            .filter(|q| {
                Self::timestamp_to_naive_date(q.timestamp as i64).is_some_and(|d| d <= date)
            })
            .max_by_key(|q| q.timestamp)
            .map(|q| q.close)
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.to_string(),
                currency: currency.to_string(),
                date: date.to_string(),
            })
    }
}
