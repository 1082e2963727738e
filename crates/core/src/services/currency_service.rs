use chrono::NaiveDateTime;

use crate::dates::{format_date, format_timestamp, round2};
use crate::errors::CoreError;
use crate::models::asset::AssetType;
use crate::models::price::ExchangeRate;
use crate::storage::{Database, PriceRepository};
use super::price_service::PriceService;

/// Rates used when neither a provider nor the database can supply one.
pub const DEFAULT_RATES: &[(&str, &str, f64)] = &[("USD", "PKR", 278.50)];

/// Static fallback rate for `base` → `target`, if one is defined.
pub fn default_rate(base: &str, target: &str) -> Option<f64> {
    DEFAULT_RATES
        .iter()
        .find(|(b, t, _)| b.eq_ignore_ascii_case(base) && t.eq_ignore_ascii_case(target))
        .map(|(_, _, rate)| *rate)
}

/// Exchange rates between fiat currencies, backed by the `exchange_rates` table.
///
/// Lookup order for [`exchange_rate`](Self::exchange_rate):
/// 1. a rate stored today;
/// 2. the fiat providers (ExchangeRate-API, then Frankfurter), storing the result;
/// 3. the last stored rate, however old;
/// 4. [`DEFAULT_RATES`].
pub struct CurrencyService;

impl CurrencyService {
    pub fn new() -> Self {
        Self
    }

    pub async fn exchange_rate(
        &self,
        price_service: &PriceService,
        db: &Database,
        base: &str,
        target: &str,
        now: NaiveDateTime,
    ) -> Result<f64, CoreError> {
        let base = base.trim().to_uppercase();
        let target = target.trim().to_uppercase();
        if base == target {
            return Ok(1.0);
        }

        let stored = db.with_connection(|conn| PriceRepository::get_exchange_rate(conn, &base, &target))?;
        if let Some(rate) = &stored {
            if rate.updated_on(&format_date(now.date())) {
                return Ok(rate.rate);
            }
        }

        match price_service
            .fetch_price(&base, &target, None, &AssetType::Fiat)
            .await
        {
            Ok(rate) => {
                let record = ExchangeRate {
                    base_currency: base.clone(),
                    target_currency: target.clone(),
                    rate,
                    last_updated: format_timestamp(now),
                };
                db.transaction(|tx| PriceRepository::save_exchange_rate(tx, &record))?;
                log::info!("Fetched {base} to {target} exchange rate: {rate}");
                Ok(rate)
            }
            Err(e) => {
                log::error!("Failed to fetch {base} to {target} exchange rate: {e}");
                if let Some(rate) = stored {
                    log::warn!("Using cached rate for {base} to {target}: {}", rate.rate);
                    return Ok(rate.rate);
                }
                match default_rate(&base, &target) {
                    Some(rate) => {
                        log::warn!("Using default rate for {base} to {target}: {rate}");
                        Ok(rate)
                    }
                    None => Err(CoreError::RateNotAvailable { base, target }),
                }
            }
        }
    }

    pub async fn usd_to_pkr_rate(
        &self,
        price_service: &PriceService,
        db: &Database,
        now: NaiveDateTime,
    ) -> Result<f64, CoreError> {
        self.exchange_rate(price_service, db, "USD", "PKR", now).await
    }

    /// Stored rate for `base` → `target`, else the static default. No network access.
    pub fn stored_rate(&self, db: &Database, base: &str, target: &str) -> Result<Option<f64>, CoreError> {
        let base = base.trim().to_uppercase();
        let target = target.trim().to_uppercase();
        if base == target {
            return Ok(Some(1.0));
        }
        let stored = db.with_connection(|conn| PriceRepository::get_exchange_rate(conn, &base, &target))?;
        Ok(stored
            .map(|r| r.rate)
            .or_else(|| default_rate(&base, &target)))
    }

    /// Convert `amount` using the stored (or default) rate, rounded to 2 decimals.
    pub fn convert_currency(
        &self,
        db: &Database,
        amount: f64,
        from: &str,
        to: &str,
    ) -> Result<f64, CoreError> {
        if from.trim().eq_ignore_ascii_case(to.trim()) {
            return Ok(amount);
        }
        match self.stored_rate(db, from, to)? {
            Some(rate) => Ok(round2(amount * rate)),
            None => Err(CoreError::RateNotAvailable {
                base: from.trim().to_uppercase(),
                target: to.trim().to_uppercase(),
            }),
        }
    }
}

impl Default for CurrencyService {
    fn default() -> Self {
        Self::new()
    }
}
