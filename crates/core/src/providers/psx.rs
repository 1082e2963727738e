use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::asset::AssetType;
use super::traits::PriceProvider;

const BASE_URL: &str = "https://dps.psx.com.pk/timeseries/eod";
const PROVIDER: &str = "PSX";

/// Pakistan Stock Exchange data portal, end-of-day time series.
///
/// - **Free**: No API key.
/// - **Coverage**: every PSX-listed symbol, prices in PKR.
/// - **Response**: `{"status":1,"data":[[unix_ts, close, volume, open], ...]}`
pub struct PsxProvider {
    client: Client,
}

impl PsxProvider {
    pub fn new() -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }

    async fn fetch_closes(&self, symbol: &str) -> Result<Vec<EodClose>, CoreError> {
        let symbol = symbol.trim().to_uppercase();
        let url = format!("{BASE_URL}/{symbol}");
        let body = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_eod(&body, &symbol)
    }
}

impl Default for PsxProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── PSX response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct EodResponse {
    status: i64,
    #[serde(default)]
    data: Vec<Vec<serde_json::Value>>,
    #[serde(default)]
    message: Option<String>,
}

/// One trading day from the EOD series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EodClose {
    pub timestamp: i64,
    pub close: f64,
}

impl EodClose {
    pub fn date(&self) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(self.timestamp, 0).map(|dt| dt.date_naive())
    }
}

/// Parse an EOD body into closes sorted oldest first. Malformed rows are skipped.
pub fn parse_eod(body: &str, symbol: &str) -> Result<Vec<EodClose>, CoreError> {
    let resp: EodResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Failed to parse EOD data for {symbol}: {e}"),
    })?;

    if resp.status != 1 {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!(
                "Request for {symbol} failed: {}",
                resp.message.unwrap_or_else(|| format!("status {}", resp.status))
            ),
        });
    }

    let mut closes: Vec<EodClose> = resp
        .data
        .iter()
        .filter_map(|row| {
            let timestamp = row.first()?.as_i64()?;
            let close = row.get(1)?.as_f64()?;
            Some(EodClose { timestamp, close })
        })
        .collect();
    closes.sort_by_key(|c| c.timestamp);

    if closes.is_empty() {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No EOD data for {symbol}"),
        });
    }
    Ok(closes)
}

/// Close of the most recent trading day.
pub fn latest_close(closes: &[EodClose]) -> Option<f64> {
    closes.last().map(|c| c.close)
}

/// Close of the last trading day on or before `date`.
pub fn close_on_or_before(closes: &[EodClose], date: NaiveDate) -> Option<f64> {
    closes
        .iter()
        .rev()
        .find(|c| c.date().is_some_and(|d| d <= date))
        .map(|c| c.close)
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PriceProvider for PsxProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_asset_types(&self) -> Vec<AssetType> {
        vec![AssetType::Stock]
    }

    async fn get_current_price(&self, symbol: &str, currency: &str) -> Result<f64, CoreError> {
        let closes = self.fetch_closes(symbol).await?;
        latest_close(&closes).ok_or_else(|| CoreError::PriceNotAvailable {
            symbol: symbol.to_string(),
            currency: currency.to_string(),
            date: "latest".to_string(),
        })
    }

    async fn get_historical_price(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        let closes = self.fetch_closes(symbol).await?;
        close_on_or_before(&closes, date).ok_or_else(|| CoreError::PriceNotAvailable {
            symbol: symbol.to_string(),
            currency: currency.to_string(),
            date: date.to_string(),
        })
    }
}
