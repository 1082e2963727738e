use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Precious metals tracked by the portfolio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Metal {
    Gold,
    Silver,
    Platinum,
    Palladium,
}

impl Metal {
    pub const ALL: [Metal; 4] = [Metal::Gold, Metal::Silver, Metal::Platinum, Metal::Palladium];

    /// ISO 4217 commodity code used by price APIs.
    pub fn symbol(&self) -> &'static str {
        match self {
            Metal::Gold => "XAU",
            Metal::Silver => "XAG",
            Metal::Platinum => "XPT",
            Metal::Palladium => "XPD",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metal::Gold => "Gold",
            Metal::Silver => "Silver",
            Metal::Platinum => "Platinum",
            Metal::Palladium => "Palladium",
        }
    }

    pub fn from_symbol(symbol: &str) -> Option<Self> {
        let upper = symbol.trim().to_uppercase();
        Self::ALL.into_iter().find(|m| m.symbol() == upper)
    }
}

impl std::fmt::Display for Metal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Metal {
    type Err = CoreError;

    /// Accepts either the name ("gold") or the symbol ("XAU").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(trimmed))
            .or_else(|| Self::from_symbol(trimmed))
            .ok_or_else(|| {
                CoreError::ValidationError(format!(
                    "Unknown metal '{s}'. Supported: Gold, Silver, Platinum, Palladium"
                ))
            })
    }
}

/// Allowed purity grades, in karats.
pub const KARATS: [u8; 8] = [24, 22, 21, 20, 18, 16, 14, 10];

/// A purity grade. Only the values in [`KARATS`] can be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Karat(u8);

impl Karat {
    pub const PURE: Karat = Karat(24);

    pub fn new(value: u8) -> Result<Self, CoreError> {
        if KARATS.contains(&value) {
            Ok(Self(value))
        } else {
            Err(CoreError::ValidationError(format!(
                "Invalid karat {value}. Allowed: 24, 22, 21, 20, 18, 16, 14, 10"
            )))
        }
    }

    pub fn value(&self) -> u8 {
        self.0
    }

    /// Fraction of pure metal (24K = 1.0).
    pub fn purity(&self) -> f64 {
        f64::from(self.0) / 24.0
    }

    pub fn all() -> impl Iterator<Item = Karat> {
        KARATS.into_iter().map(Karat)
    }
}

impl std::fmt::Display for Karat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}K", self.0)
    }
}

/// Currency a metal purchase price was entered in. Prices are stored in PKR.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceCurrency {
    Pkr,
    Usd,
}

impl PriceCurrency {
    pub fn code(&self) -> &'static str {
        match self {
            PriceCurrency::Pkr => "PKR",
            PriceCurrency::Usd => "USD",
        }
    }
}

impl std::str::FromStr for PriceCurrency {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "PKR" => Ok(PriceCurrency::Pkr),
            "USD" => Ok(PriceCurrency::Usd),
            other => Err(CoreError::ValidationError(format!(
                "Unsupported currency '{other}'. Use PKR or USD"
            ))),
        }
    }
}

/// A metal purchase as entered, before currency conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalTradeInput {
    pub date: NaiveDate,
    pub metal: Metal,
    /// Grams
    pub weight: f64,
    pub karat: Option<Karat>,
    pub price_per_gram: f64,
    pub currency: PriceCurrency,
}

impl MetalTradeInput {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.weight.is_finite() || self.weight <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Weight must be greater than 0, got {}",
                self.weight
            )));
        }
        if !self.price_per_gram.is_finite() || self.price_per_gram <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Purchase price must be greater than 0, got {}",
                self.price_per_gram
            )));
        }
        Ok(())
    }
}

/// A stored row of the `metal_trades` table. Prices are PKR per gram.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalTrade {
    pub id: i64,
    pub date: String,
    pub metal: String,
    pub weight: f64,
    pub karat: Option<u8>,
    pub purchase_price: f64,
    pub total_cost: f64,
}

/// Latest stored prices for one metal (`metal_prices` row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalPrices {
    /// Metal symbol (XAU, XAG, ...)
    pub metal: String,
    /// PKR per gram, by karat, in [`KARATS`] order
    pub price_gram: Vec<(u8, f64)>,
    pub price_usd_gram_24k: Option<f64>,
    pub last_updated: Option<String>,
}

impl MetalPrices {
    /// Derive every karat price from the 24K price.
    pub fn from_24k(metal: Metal, pkr_gram_24k: f64, usd_gram_24k: f64, last_updated: String) -> Self {
        let price_gram = Karat::all()
            .map(|k| (k.value(), pkr_gram_24k * k.purity()))
            .collect();
        Self {
            metal: metal.symbol().to_string(),
            price_gram,
            price_usd_gram_24k: Some(usd_gram_24k),
            last_updated: Some(last_updated),
        }
    }

    pub fn price_for(&self, karat: Karat) -> Option<f64> {
        self.price_gram
            .iter()
            .find(|(k, _)| *k == karat.value())
            .map(|(_, p)| *p)
    }
}

/// Metal trades grouped by (metal, karat) with their current valuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetalHolding {
    pub metal: String,
    pub karat: Option<u8>,
    pub total_weight: f64,
    pub total_cost: f64,
    /// PKR per gram from the latest stored prices, if any
    pub current_price: Option<f64>,
    pub current_value: Option<f64>,
    pub gain_loss: Option<f64>,
}
