use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;

use crate::dates::{format_date, format_timestamp, round2};
use crate::errors::CoreError;
use crate::models::asset::AssetType;
use crate::models::metal::{Metal, MetalPrices};
use crate::models::price::{PriceSource, RefreshReport, StockPriceRecord, StockQuote};
use crate::providers::registry::PriceProviderRegistry;
use crate::storage::{Database, MetalRepository, PriceRepository};
use super::currency_service::CurrencyService;

/// Default number of outbound stock price requests allowed per day.
pub const DEFAULT_DAILY_CALL_LIMIT: u32 = 200;

/// Fetches prices from the provider registry and keeps the SQLite caches current.
///
/// Stock prices are cached per stock and day:
/// - **Refreshed today**: served from `stock_prices`, no network call.
/// - **Stale or missing**: one request per day-budget unit, PSX first then Yahoo Finance.
/// - **Provider failure**: the stale close, then the buffer price, then an error.
///
/// **Note on precision**: prices are `f64`; stored closes are rounded to 2 decimals.
pub struct PriceService {
    registry: PriceProviderRegistry,
    daily_call_limit: u32,
}

impl PriceService {
    pub fn new(registry: PriceProviderRegistry) -> Self {
        Self {
            registry,
            daily_call_limit: DEFAULT_DAILY_CALL_LIMIT,
        }
    }

    /// Cap the number of provider requests made for stock prices per day.
    pub fn with_daily_call_limit(mut self, limit: u32) -> Self {
        self.daily_call_limit = limit;
        self
    }

    pub fn daily_call_limit(&self) -> u32 {
        self.daily_call_limit
    }

    /// Check if at least one provider is available for a given asset type.
    pub fn has_provider_for(&self, asset_type: &AssetType) -> bool {
        self.registry.get_provider_for(asset_type).is_some()
    }

    /// Get the names of all providers available for a given asset type.
    pub fn get_provider_names(&self, asset_type: &AssetType) -> Vec<String> {
        self.registry
            .get_providers_for(asset_type)
            .iter()
            .map(|p| p.name().to_string())
            .collect()
    }

    // ── Stocks ──────────────────────────────────────────────────────

    /// Current price of a PSX stock, using the cache and fallbacks described on [`PriceService`].
    pub async fn get_stock_price(
        &self,
        db: &Database,
        symbol: &str,
        now: NaiveDateTime,
    ) -> Result<StockQuote, CoreError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CoreError::ValidationError("Stock symbol is required".into()));
        }
        let today = format_date(now.date());

        let cached = db.with_connection(|conn| PriceRepository::get_stock_price(conn, &symbol))?;
        if let Some(record) = &cached {
            if record.is_fresh(&today) {
                if let Some(price) = record.previous_close {
                    log::debug!("Returning cached price for {symbol}: {price}");
                    return Ok(StockQuote {
                        symbol,
                        price,
                        source: PriceSource::Cache,
                    });
                }
            }
        }

        let fetched = if self.reserve_api_call(db, &symbol, now)? {
            self.fetch_price(&symbol, "PKR", None, &AssetType::Stock).await
        } else {
            Err(self.budget_exhausted())
        };

        match fetched {
            Ok(price) => {
                let price = round2(price);
                db.transaction(|tx| PriceRepository::save_stock_price(tx, &symbol, price, &today))?;
                log::info!("Updated price for {symbol}: {price}");
                Ok(StockQuote {
                    symbol,
                    price,
                    source: PriceSource::Provider,
                })
            }
            Err(e) => {
                log::error!("Failed to fetch price for {symbol}: {e}");
                let record = cached.unwrap_or_else(|| StockPriceRecord::empty(&symbol));
                if let Some(price) = record.previous_close {
                    log::warn!("Using last cached price for {symbol}: {price}");
                    return Ok(StockQuote {
                        symbol,
                        price,
                        source: PriceSource::StaleCache,
                    });
                }
                if let Some(price) = record.buffer_price {
                    log::warn!("Using buffer price for {symbol}: {price}");
                    return Ok(StockQuote {
                        symbol,
                        price,
                        source: PriceSource::Buffer,
                    });
                }
                Err(CoreError::PriceNotAvailable {
                    symbol,
                    currency: "PKR".into(),
                    date: today,
                })
            }
        }
    }

    /// Refresh every symbol in `symbols`, continuing past failures.
    pub async fn refresh_stock_prices(
        &self,
        db: &Database,
        symbols: &[String],
        now: NaiveDateTime,
    ) -> RefreshReport {
        let mut report = RefreshReport::default();
        for symbol in symbols {
            match self.get_stock_price(db, symbol, now).await {
                Ok(quote) => match quote.source {
                    PriceSource::Provider => report.refreshed.push(quote.symbol),
                    PriceSource::Cache => report.skipped.push(quote.symbol),
                    PriceSource::StaleCache | PriceSource::Buffer => report.failed.push((
                        quote.symbol,
                        format!("provider unavailable, kept {} price {}", quote.source, quote.price),
                    )),
                },
                Err(e) => report.failed.push((symbol.trim().to_uppercase(), e.to_string())),
            }
        }
        report
    }

    /// Check today's request budget and, when there is room, count one request
    /// and stamp the attempt time on the stock's cache row.
    fn reserve_api_call(
        &self,
        db: &Database,
        symbol: &str,
        now: NaiveDateTime,
    ) -> Result<bool, CoreError> {
        let timestamp = format_timestamp(now);
        db.transaction(|tx| {
            if !self.take_budget_unit(tx, now.date())? {
                return Ok(false);
            }
            PriceRepository::record_attempt(tx, symbol, &timestamp)?;
            Ok(true)
        })
    }

    fn take_budget_unit(&self, conn: &Connection, day: NaiveDate) -> Result<bool, CoreError> {
        let today = format_date(day);
        let limit = self.daily_call_limit;
        let calls = PriceRepository::api_calls_on(conn, &today)?;
        if calls >= limit {
            log::warn!("API call limit reached for today ({calls}/{limit})");
            return Ok(false);
        }
        PriceRepository::increment_api_calls(conn, &today)?;
        Ok(true)
    }

    fn budget_exhausted(&self) -> CoreError {
        CoreError::Api {
            provider: "budget".into(),
            message: format!("Daily limit of {} price requests reached", self.daily_call_limit),
        }
    }

    // ── History ─────────────────────────────────────────────────────

    /// Price of `symbol` in `currency` on `date`, straight from the providers.
    ///
    /// Stocks resolve to the close of the last trading day on or before
    /// `date` and use one unit of the daily request budget. Nothing is
    /// cached and no fallback applies: a provider failure is returned as is.
    pub async fn historical_price(
        &self,
        db: &Database,
        symbol: &str,
        currency: &str,
        date: NaiveDate,
        asset_type: &AssetType,
        now: NaiveDateTime,
    ) -> Result<f64, CoreError> {
        let symbol = symbol.trim().to_uppercase();
        let currency = currency.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CoreError::ValidationError("Symbol is required".into()));
        }
        if date > now.date() {
            return Err(CoreError::ValidationError(format!(
                "Date {} is in the future",
                format_date(date)
            )));
        }
        if *asset_type == AssetType::Fiat && symbol == currency {
            return Ok(1.0);
        }

        if *asset_type == AssetType::Stock {
            let reserved = db.transaction(|tx| self.take_budget_unit(tx, now.date()))?;
            if !reserved {
                return Err(self.budget_exhausted());
            }
        }

        let price = self
            .fetch_price(&symbol, &currency, Some(date), asset_type)
            .await?;
        log::debug!("{symbol} in {currency} on {}: {price}", format_date(date));
        Ok(match asset_type {
            AssetType::Stock => round2(price),
            _ => price,
        })
    }

    // ── Metals ──────────────────────────────────────────────────────

    /// Refresh the stored prices of every metal.
    ///
    /// Metals already updated today are skipped unless `force` is set. Each
    /// metal is fetched in USD per gram (24K), converted to PKR with the
    /// current USD→PKR rate, and stored with every karat price derived from it.
    pub async fn refresh_metal_prices(
        &self,
        db: &Database,
        currency_service: &CurrencyService,
        force: bool,
        now: NaiveDateTime,
    ) -> Result<RefreshReport, CoreError> {
        let today = format_date(now.date());
        let mut report = RefreshReport::default();

        let stored = db.with_connection(MetalRepository::list_prices)?;
        let pending: Vec<Metal> = Metal::ALL
            .into_iter()
            .filter(|metal| {
                let fresh = stored.iter().any(|p| {
                    p.metal == metal.symbol()
                        && p.last_updated.as_deref().is_some_and(|ts| ts.starts_with(&today))
                });
                if fresh && !force {
                    report.skipped.push(metal.symbol().to_string());
                }
                force || !fresh
            })
            .collect();

        if pending.is_empty() {
            log::info!("Metal prices already up to date for {today}");
            return Ok(report);
        }

        // without a metal provider there is nothing to convert
        if !self.has_provider_for(&AssetType::Metal) {
            let err = CoreError::NoProvider(AssetType::Metal.to_string());
            log::warn!("Skipping metal refresh: {err}");
            for metal in pending {
                report.failed.push((metal.symbol().to_string(), err.to_string()));
            }
            return Ok(report);
        }

        let usd_pkr = currency_service.usd_to_pkr_rate(self, db, now).await?;

        for metal in pending {
            match self
                .fetch_price(metal.symbol(), "USD", None, &AssetType::Metal)
                .await
            {
                Ok(usd_gram) => {
                    let prices =
                        MetalPrices::from_24k(metal, usd_gram * usd_pkr, usd_gram, format_timestamp(now));
                    db.transaction(|tx| MetalRepository::upsert_prices(tx, &prices))?;
                    log::info!(
                        "Updated {} price: {:.2} PKR/g (24K)",
                        metal.name(),
                        usd_gram * usd_pkr
                    );
                    report.refreshed.push(metal.symbol().to_string());
                }
                Err(e) => {
                    log::error!("Failed to fetch {} price: {e}", metal.name());
                    report.failed.push((metal.symbol().to_string(), e.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// Every stored metal price row.
    pub fn latest_metal_prices(&self, db: &Database) -> Result<Vec<MetalPrices>, CoreError> {
        db.with_connection(MetalRepository::list_prices)
    }

    // ── Providers ───────────────────────────────────────────────────

    /// Fetch a single price from API providers with automatic fallback.
    ///
    /// Tries providers in registration order. A price that is not finite or
    /// not positive counts as a failure of that provider. `date = None` asks
    /// for the latest price.
    pub async fn fetch_price(
        &self,
        symbol: &str,
        currency: &str,
        date: Option<NaiveDate>,
        asset_type: &AssetType,
    ) -> Result<f64, CoreError> {
        let providers = self.registry.get_providers_for(asset_type);
        if providers.is_empty() {
            return Err(CoreError::NoProvider(asset_type.to_string()));
        }

        let mut last_error = None;

        for provider in &providers {
            let result = match date {
                None => provider.get_current_price(symbol, currency).await,
                Some(date) => provider.get_historical_price(symbol, currency, date).await,
            };

            match result {
                Ok(price) if price.is_finite() && price > 0.0 => return Ok(price),
                Ok(price) => {
                    log::warn!("{} returned an invalid price for {symbol}: {price}", provider.name());
                    last_error = Some(CoreError::Api {
                        provider: provider.name().to_string(),
                        message: format!(
                            "Invalid price returned for {symbol}: {price} (must be finite and positive)"
                        ),
                    });
                }
                Err(e) => {
                    log::warn!("{} failed for {symbol}: {e}", provider.name());
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(asset_type.to_string())))
    }
}
