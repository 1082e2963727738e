use std::collections::BTreeMap;

use crate::dates::{format_date, round2};
use crate::errors::CoreError;
use crate::models::metal::{
    Karat, Metal, MetalHolding, MetalPrices, MetalTrade, MetalTradeInput, PriceCurrency,
};
use crate::storage::{Database, MetalRepository};
use super::currency_service::CurrencyService;

/// Metal purchases and their valuation against stored metal prices.
pub struct MetalService;

impl MetalService {
    pub fn new() -> Self {
        Self
    }

    /// Store a purchase. USD prices are converted to PKR with the stored USD→PKR rate.
    pub fn record_metal_trade(
        &self,
        db: &Database,
        currency_service: &CurrencyService,
        input: &MetalTradeInput,
    ) -> Result<MetalTrade, CoreError> {
        input.validate()?;

        let price_pkr = match input.currency {
            PriceCurrency::Pkr => input.price_per_gram,
            PriceCurrency::Usd => {
                let converted = currency_service.convert_currency(
                    db,
                    input.price_per_gram,
                    PriceCurrency::Usd.code(),
                    PriceCurrency::Pkr.code(),
                )?;
                log::info!(
                    "Converted purchase price {} USD = {converted:.2} PKR",
                    input.price_per_gram
                );
                converted
            }
        };

        let mut trade = MetalTrade {
            id: 0,
            date: format_date(input.date),
            metal: input.metal.name().to_string(),
            weight: input.weight,
            karat: input.karat.map(|k| k.value()),
            purchase_price: price_pkr,
            total_cost: round2(input.weight * price_pkr),
        };
        trade.id = db.transaction(|tx| MetalRepository::insert_trade(tx, &trade))?;

        log::info!(
            "Recorded {} g of {} at {:.2} PKR/g",
            trade.weight,
            trade.metal,
            trade.purchase_price
        );
        Ok(trade)
    }

    /// All metal purchases, newest first.
    pub fn list_metal_trades(&self, db: &Database) -> Result<Vec<MetalTrade>, CoreError> {
        db.with_connection(MetalRepository::list_trades)
    }

    /// Purchases grouped by (metal, karat), valued at the latest stored prices.
    pub fn metal_holdings(&self, db: &Database) -> Result<Vec<MetalHolding>, CoreError> {
        let (trades, prices) = db.with_connection(|conn| {
            Ok((
                MetalRepository::list_trades(conn)?,
                MetalRepository::list_prices(conn)?,
            ))
        })?;
        Ok(holdings_from(&trades, &prices))
    }
}

impl Default for MetalService {
    fn default() -> Self {
        Self::new()
    }
}

/// Group purchases and value each group. Groups without a stored price have no value.
pub fn holdings_from(trades: &[MetalTrade], prices: &[MetalPrices]) -> Vec<MetalHolding> {
    let mut groups: BTreeMap<(String, Option<u8>), (f64, f64)> = BTreeMap::new();
    for trade in trades {
        let entry = groups
            .entry((trade.metal.clone(), trade.karat))
            .or_insert((0.0, 0.0));
        entry.0 += trade.weight;
        entry.1 += trade.total_cost;
    }

    groups
        .into_iter()
        .map(|((metal, karat), (total_weight, total_cost))| {
            let current_price = metal
                .parse::<Metal>()
                .ok()
                .and_then(|m| prices.iter().find(|p| p.metal == m.symbol()))
                .and_then(|p| {
                    let karat = karat.and_then(|k| Karat::new(k).ok()).unwrap_or(Karat::PURE);
                    p.price_for(karat)
                });
            let current_value = current_price.map(|p| round2(p * total_weight));
            MetalHolding {
                metal,
                karat,
                total_weight,
                total_cost: round2(total_cost),
                current_price,
                current_value,
                gain_loss: current_value.map(|v| round2(v - total_cost)),
            }
        })
        .collect()
}
