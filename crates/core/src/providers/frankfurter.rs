use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::asset::AssetType;
use super::traits::PriceProvider;

const BASE_URL: &str = "https://api.frankfurter.dev/v1";

/// Frankfurter API provider for fiat exchange rates, used when
/// ExchangeRate-API is not configured or fails.
///
/// - **Free**: No API key.
/// - **Source**: European Central Bank reference rates.
/// - **Coverage**: ~30 currencies. PKR is not among them, so a USD→PKR
///   request ends in an API error and the caller falls back to stored rates.
pub struct FrankfurterProvider {
    client: Client,
}

impl FrankfurterProvider {
    pub fn new() -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
        }
    }
}

impl Default for FrankfurterProvider {
    fn default() -> Self {
        Self::new()
    }
}

// ── Frankfurter API response types ──────────────────────────────────

#[derive(Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

/// Extract `target` from a rates response body (`/latest` or `/<date>`).
pub fn parse_latest_rate(body: &str, base: &str, target: &str) -> Result<f64, CoreError> {
    let resp: RatesResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: "Frankfurter".into(),
        message: format!("Failed to parse response for {base}/{target}: {e}"),
    })?;

    resp.rates.get(target).copied().ok_or_else(|| CoreError::Api {
        provider: "Frankfurter".into(),
        message: format!("No rate found for {base} → {target}"),
    })
}

/// Endpoint for a `base` → `target` rate, latest or on `date`.
pub fn rate_url(base: &str, target: &str, date: Option<NaiveDate>) -> String {
    let day = match date {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => "latest".to_string(),
    };
    format!("{BASE_URL}/{day}?base={base}&symbols={target}")
}

impl FrankfurterProvider {
    async fn fetch_rate(
        &self,
        symbol: &str,
        currency: &str,
        date: Option<NaiveDate>,
    ) -> Result<f64, CoreError> {
        let base = symbol.to_uppercase();
        let target = currency.to_uppercase();
        if base == target {
            return Ok(1.0);
        }

        let url = rate_url(&base, &target, date);
        let body = self.client.get(&url).send().await?.text().await?;
        parse_latest_rate(&body, &base, &target)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PriceProvider for FrankfurterProvider {
    fn name(&self) -> &str {
        "Frankfurter"
    }

    fn supported_asset_types(&self) -> Vec<AssetType> {
        vec![AssetType::Fiat]
    }

    async fn get_current_price(&self, symbol: &str, currency: &str) -> Result<f64, CoreError> {
        self.fetch_rate(symbol, currency, None).await
    }

    /// ECB publishes no rates on weekends; Frankfurter answers with the
    /// previous business day.
    async fn get_historical_price(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        self.fetch_rate(symbol, currency, Some(date)).await
    }
}
