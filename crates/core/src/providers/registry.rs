use std::collections::HashMap;

use crate::models::asset::AssetType;

use crate::config::{EXCHANGE_RATE_KEY_NAME, GOLDAPI_KEY_NAME};

use super::exchangerate_api::ExchangeRateApiProvider;
use super::frankfurter::FrankfurterProvider;
use super::goldapi::GoldApiProvider;
use super::psx::PsxProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooFinanceProvider;
use super::traits::PriceProvider;

/// Registry of all available price providers.
///
/// Routes requests by `AssetType`; providers of the same type are tried in
/// registration order.
pub struct PriceProviderRegistry {
    providers: Vec<Box<dyn PriceProvider>>,
}

impl PriceProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with all default providers pre-configured.
    pub fn new_with_defaults(api_keys: &HashMap<String, String>) -> Self {
        let mut registry = Self::new();

        // PSX data portal: stocks, no API key needed (primary)
        registry.register(Box::new(PsxProvider::new()));

        // Yahoo Finance: stocks as <SYMBOL>.KA, no API key needed (fallback)
        // Not available on WASM (uses native reqwest/tokio connectors)
        #[cfg(not(target_arch = "wasm32"))]
        {
            match YahooFinanceProvider::new() {
                Ok(yahoo) => registry.register(Box::new(yahoo)),
                Err(e) => log::warn!("Yahoo Finance unavailable: {e}"),
            }
        }

        // GoldAPI: precious metals, requires API key
        match api_keys.get(GOLDAPI_KEY_NAME) {
            Some(key) => registry.register(Box::new(GoldApiProvider::new(key.clone()))),
            None => log::debug!("No GoldAPI key configured; metal prices cannot be refreshed"),
        }

        // ExchangeRate-API: forex including PKR, requires API key (primary)
        if let Some(key) = api_keys.get(EXCHANGE_RATE_KEY_NAME) {
            registry.register(Box::new(ExchangeRateApiProvider::new(key.clone())));
        }

        // Frankfurter: forex, no API key needed (fallback)
        registry.register(Box::new(FrankfurterProvider::new()));

        registry
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Register a new price provider.
    pub fn register(&mut self, provider: Box<dyn PriceProvider>) {
        self.providers.push(provider);
    }

    /// Find the first provider that supports the given asset type.
    pub fn get_provider_for(&self, asset_type: &AssetType) -> Option<&dyn PriceProvider> {
        self.providers
            .iter()
            .find(|p| p.supported_asset_types().contains(asset_type))
            .map(|p| p.as_ref())
    }

    /// Return ALL providers that support the given asset type, ordered by registration priority.
    /// Used for fallback: if the first provider fails, try the next one.
    pub fn get_providers_for(&self, asset_type: &AssetType) -> Vec<&dyn PriceProvider> {
        self.providers
            .iter()
            .filter(|p| p.supported_asset_types().contains(asset_type))
            .map(|p| p.as_ref())
            .collect()
    }
}

impl Default for PriceProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
