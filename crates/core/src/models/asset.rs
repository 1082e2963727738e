use serde::{Deserialize, Serialize};

/// The category of a priced instrument.
/// Determines which price providers are asked for market data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AssetType {
    /// PSX-listed equities: PSX data portal, Yahoo Finance fallback
    Stock,
    /// Precious metals (XAU, XAG, XPT, XPD): GoldAPI
    Metal,
    /// Fiat currency pairs (USD → PKR): ExchangeRate-API, Frankfurter
    Fiat,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Stock => write!(f, "Stock"),
            AssetType::Metal => write!(f, "Metal"),
            AssetType::Fiat => write!(f, "Fiat"),
        }
    }
}
