use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::asset::AssetType;

/// Common interface of every external price source.
///
/// Stock sources (PSX, Yahoo Finance), metal sources (GoldAPI) and exchange
/// rate sources (ExchangeRate-API, Frankfurter) all implement it, so the
/// services only ever talk to `dyn PriceProvider` and can be tested with mocks.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Which asset types this provider can handle.
    fn supported_asset_types(&self) -> Vec<AssetType>;

    /// Latest price of `symbol` quoted in `currency`.
    ///
    /// For stocks `currency` is informational (PSX quotes are PKR); for metals it
    /// is the quote currency per gram; for fiat `symbol` is the base currency.
    async fn get_current_price(&self, symbol: &str, currency: &str) -> Result<f64, CoreError>;

    /// Price of `symbol` in `currency` on `date` (closest trading day).
    async fn get_historical_price(
        &self,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError>;
}
