use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::asset::AssetType;
use crate::models::metal::Metal;
use super::traits::PriceProvider;

const BASE_URL: &str = "https://www.goldapi.io/api";
const PROVIDER: &str = "GoldAPI";

/// GoldAPI provider for precious metal spot prices.
///
/// - **Requires**: API key (configured as "goldapi"), sent as `x-access-token`.
/// - **Coverage**: Gold (XAU), Silver (XAG), Platinum (XPT), Palladium (XPD).
/// - **Returns**: price per gram of 24K metal in the requested currency.
pub struct GoldApiProvider {
    client: Client,
    api_key: String,
}

impl GoldApiProvider {
    pub fn new(api_key: String) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(30));
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            api_key,
        }
    }

    async fn fetch(&self, symbol: &str, currency: &str, date: Option<NaiveDate>) -> Result<f64, CoreError> {
        let metal = Metal::from_symbol(symbol).ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Unknown metal symbol: {symbol}. Supported: XAU, XAG, XPT, XPD"),
        })?;
        let currency = currency.trim().to_uppercase();
        let mut url = format!("{BASE_URL}/{}/{currency}", metal.symbol());
        if let Some(date) = date {
            url.push_str(&date.format("/%Y%m%d").to_string());
        }

        let body = self
            .client
            .get(&url)
            .header("x-access-token", &self.api_key)
            .header("Content-Type", "application/json")
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        parse_gram_price(&body, metal.symbol())
    }
}

// ── GoldAPI response types ──────────────────────────────────────────

#[derive(Deserialize)]
struct MetalResponse {
    price_gram_24k: Option<f64>,
    error: Option<String>,
}

/// Extract the 24K price per gram from a GoldAPI response body.
pub fn parse_gram_price(body: &str, symbol: &str) -> Result<f64, CoreError> {
    let resp: MetalResponse = serde_json::from_str(body).map_err(|e| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Failed to parse price for {symbol}: {e}"),
    })?;

    if let Some(error) = resp.error {
        return Err(CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("{symbol}: {error}"),
        });
    }

    resp.price_gram_24k.ok_or_else(|| CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("Response for {symbol} has no price_gram_24k"),
    })
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PriceProvider for GoldApiProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    fn supported_asset_types(&self) -> Vec<AssetType> {
        vec![AssetType::Metal]
    }

    async fn get_current_price(&self, symbol: &str, currency: &str) -> Result<f64, CoreError> {
        self.fetch(symbol, currency, None).await
    }

    async fn get_historical_price(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        self.fetch(symbol, currency, Some(date)).await
    }
}
