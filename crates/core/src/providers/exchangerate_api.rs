use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::asset::AssetType;
use super::traits::PriceProvider;

const BASE_URL: &str = "https://v6.exchangerate-api.com/v6";
const PROVIDER: &str = "ExchangeRate-API";

/// ExchangeRate-API provider for fiat conversion rates.
///
/// - **Requires**: API key (configured as "exchangerate_api"), part of the URL path.
/// - **Coverage**: 160+ currencies including PKR.
/// - **Endpoint**: `/pair/{BASE}/{TARGET}`
///
/// The free plan has no historical data; `get_historical_price` returns the
/// latest rate only when asked for today.
pub struct ExchangeRateApiProvider {
    client: Client,
    api_key: String,
}

impl ExchangeRateApiProvider {
    pub fn new(api_key: String) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }
}

// ── ExchangeRate-API response types ─────────────────────────────────

#[derive(Deserialize)]
struct PairResponse {
    result: String,
    conversion_rate: Option<f64>,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
}

/// Extract the conversion rate from a `/pair` response body.
pub fn parse_pair_rate(body: &str, base: &str, target: &str) -> Result<f64, CoreError> {
    let resp: PairResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Failed to parse rate for {base}/{target}: {e}"),
    })?;

    if resp.result != "success" {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!(
                "{base}/{target}: {}",
                resp.error_type.unwrap_or_else(|| resp.result.clone())
            ),
        });
    }

    resp.conversion_rate.ok_or_else(|| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("No rate found for {base} → {target}"),
    })
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PriceProvider for ExchangeRateApiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_asset_types(&self) -> Vec<AssetType> {
        vec![AssetType::Fiat]
    }

    async fn get_current_price(&self, symbol: &str, currency: &str) -> Result<f64, CoreError> {
        let base = symbol.trim().to_uppercase();
        let target = currency.trim().to_uppercase();

        if base == target {
            return Ok(1.0);
        }

        let url = format!("{BASE_URL}/{}/pair/{base}/{target}", self.api_key);
        // Error statuses still carry a JSON body with the error type
        let body = self.client.get(&url).send().await?.text().await?;
        parse_pair_rate(&body, &base, &target)
    }

    async fn get_historical_price(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        if date == chrono::Utc::now().date_naive() {
            return self.get_current_price(symbol, currency).await;
        }
        Err(CoreError::PriceNotAvailable {
            symbol: symbol.to_string(),
            currency: currency.to_string(),
            date: date.to_string(),
        })
    }
}
