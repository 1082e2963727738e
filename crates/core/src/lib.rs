pub mod config;
pub mod dates;
pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod storage;

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use config::AppConfig;
use models::{
    asset::AssetType,
    dividend::{Dividend, DividendInput},
    metal::{Metal, MetalHolding, MetalPrices, MetalTrade, MetalTradeInput},
    price::{RefreshReport, StockQuote},
    report::{
        AllocationSlice, DividendPoint, DividendSummary, PortfolioPerformance, PortfolioSummary,
        Position, RealizedPl,
    },
    sell::{SaleQuote, SaleReceipt, SellTrade, StockAvailability},
    trade::{Trade, TradeInput},
};
use providers::registry::PriceProviderRegistry;
use services::{
    currency_service::CurrencyService, dividend_service::DividendService,
    metal_service::MetalService, price_service::PriceService, report_service::ReportService,
    sell_service::SellService, trade_service::TradeService,
};
use storage::Database;

use errors::CoreError;

/// Main entry point of the portfolio library.
///
/// Bound to one user's database; every call opens its own connection, so a
/// `WealthWise` value can live for the whole session without holding locks.
#[must_use]
pub struct WealthWise {
    db: Database,
    config: AppConfig,
    trade_service: TradeService,
    sell_service: SellService,
    dividend_service: DividendService,
    metal_service: MetalService,
    report_service: ReportService,
    price_service: PriceService,
    currency_service: CurrencyService,
}

impl std::fmt::Debug for WealthWise {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WealthWise")
            .field("database", &self.db.path())
            .field("daily_call_limit", &self.price_service.daily_call_limit())
            .finish()
    }
}

impl WealthWise {
    /// Open (creating if needed) the database of `username` with the default providers.
    pub fn open(config: AppConfig, username: &str) -> Result<Self, CoreError> {
        let db = Database::open_for_user(username, &config)?;
        let registry = PriceProviderRegistry::new_with_defaults(&config.api_keys);
        Ok(Self::build(db, config, registry))
    }

    /// Open the database at an explicit path with the default providers.
    pub fn open_at(path: impl AsRef<Path>, config: AppConfig) -> Result<Self, CoreError> {
        let db = Database::open(path, &config)?;
        let registry = PriceProviderRegistry::new_with_defaults(&config.api_keys);
        Ok(Self::build(db, config, registry))
    }

    /// Open the database at `path` with a caller-supplied provider registry.
    pub fn open_with_registry(
        path: impl AsRef<Path>,
        config: AppConfig,
        registry: PriceProviderRegistry,
    ) -> Result<Self, CoreError> {
        let db = Database::open(path, &config)?;
        Ok(Self::build(db, config, registry))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    // ── Buy Trades ──────────────────────────────────────────────────

    /// Record every trade of one broker memo in a single transaction.
    pub fn record_trades(&self, memo: &str, trades: &[TradeInput]) -> Result<Vec<i64>, CoreError> {
        self.trade_service.record_trades(&self.db, memo, trades)
    }

    pub fn list_trades(&self) -> Result<Vec<Trade>, CoreError> {
        self.trade_service.list_trades(&self.db)
    }

    pub fn trades_for_memo(&self, memo: &str) -> Result<Vec<Trade>, CoreError> {
        self.trade_service.trades_for_memo(&self.db, memo)
    }

    pub fn delete_trade(&self, memo: &str, stock: &str) -> Result<usize, CoreError> {
        self.trade_service.delete_trade(&self.db, memo, stock)
    }

    // ── Sales ───────────────────────────────────────────────────────

    pub fn available_stocks(&self) -> Result<Vec<StockAvailability>, CoreError> {
        self.sell_service.available_stocks(&self.db)
    }

    pub fn quote_sale(
        &self,
        stock: &str,
        quantity: i64,
        rate: f64,
        cgt_percentage: f64,
    ) -> Result<SaleQuote, CoreError> {
        self.sell_service
            .quote_sale(&self.db, stock, quantity, rate, cgt_percentage)
    }

    /// Sell shares now.
    pub fn sell_stock(
        &self,
        stock: &str,
        quantity: i64,
        rate: f64,
        cgt_percentage: f64,
    ) -> Result<SaleReceipt, CoreError> {
        self.sell_stock_at(stock, quantity, rate, cgt_percentage, dates::now())
    }

    /// Sell shares with an explicit sale time (drives the sale date and memo).
    pub fn sell_stock_at(
        &self,
        stock: &str,
        quantity: i64,
        rate: f64,
        cgt_percentage: f64,
        now: NaiveDateTime,
    ) -> Result<SaleReceipt, CoreError> {
        self.sell_service
            .sell_stock(&self.db, stock, quantity, rate, cgt_percentage, now)
    }

    pub fn list_sales(&self) -> Result<Vec<SellTrade>, CoreError> {
        self.sell_service.list_sales(&self.db)
    }

    // ── Dividends ───────────────────────────────────────────────────

    pub fn record_dividend(&self, input: &DividendInput) -> Result<Dividend, CoreError> {
        self.dividend_service.record_dividend(&self.db, input)
    }

    pub fn list_dividends(&self) -> Result<Vec<Dividend>, CoreError> {
        self.dividend_service.list_dividends(&self.db)
    }

    pub fn delete_dividend(&self, warrant_no: &str) -> Result<usize, CoreError> {
        self.dividend_service.delete_dividend(&self.db, warrant_no)
    }

    // ── Metals ──────────────────────────────────────────────────────

    pub fn record_metal_trade(&self, input: &MetalTradeInput) -> Result<MetalTrade, CoreError> {
        self.metal_service
            .record_metal_trade(&self.db, &self.currency_service, input)
    }

    pub fn list_metal_trades(&self) -> Result<Vec<MetalTrade>, CoreError> {
        self.metal_service.list_metal_trades(&self.db)
    }

    pub fn metal_holdings(&self) -> Result<Vec<MetalHolding>, CoreError> {
        self.metal_service.metal_holdings(&self.db)
    }

    // ── Reports ─────────────────────────────────────────────────────

    pub fn positions(&self) -> Result<Vec<Position>, CoreError> {
        self.report_service.positions(&self.db)
    }

    pub fn distribution(&self) -> Result<Vec<AllocationSlice>, CoreError> {
        self.report_service.distribution(&self.db)
    }

    pub fn realized_pl(&self) -> Result<Vec<RealizedPl>, CoreError> {
        self.report_service.realized_pl(&self.db)
    }

    pub fn dividend_income(&self) -> Result<Vec<DividendSummary>, CoreError> {
        self.report_service.dividend_income(&self.db)
    }

    pub fn dividend_timeline(&self) -> Result<Vec<DividendPoint>, CoreError> {
        self.report_service.dividend_timeline(&self.db)
    }

    pub fn performance(&self) -> Result<PortfolioPerformance, CoreError> {
        self.report_service.performance(&self.db)
    }

    pub fn portfolio_summary(&self) -> Result<PortfolioSummary, CoreError> {
        self.report_service.portfolio_summary(&self.db)
    }

    // ── Prices ──────────────────────────────────────────────────────

    /// Current price of a PSX stock (cache, providers, then stale/buffer fallback).
    pub async fn get_stock_price(&self, symbol: &str) -> Result<StockQuote, CoreError> {
        self.get_stock_price_at(symbol, dates::now()).await
    }

    pub async fn get_stock_price_at(
        &self,
        symbol: &str,
        now: NaiveDateTime,
    ) -> Result<StockQuote, CoreError> {
        self.price_service.get_stock_price(&self.db, symbol, now).await
    }

    /// Refresh the price of every stock still held.
    pub async fn refresh_stock_prices(&self) -> Result<RefreshReport, CoreError> {
        self.refresh_stock_prices_at(dates::now()).await
    }

    pub async fn refresh_stock_prices_at(
        &self,
        now: NaiveDateTime,
    ) -> Result<RefreshReport, CoreError> {
        let held: Vec<String> = self
            .available_stocks()?
            .into_iter()
            .map(|a| a.stock)
            .collect();
        let report = self
            .price_service
            .refresh_stock_prices(&self.db, &held, now)
            .await;
        log::info!(
            "Stock price refresh: {} refreshed, {} cached, {} failed",
            report.refreshed.len(),
            report.skipped.len(),
            report.failed.len()
        );
        Ok(report)
    }

    pub async fn refresh_metal_prices(&self, force: bool) -> Result<RefreshReport, CoreError> {
        self.refresh_metal_prices_at(force, dates::now()).await
    }

    pub async fn refresh_metal_prices_at(
        &self,
        force: bool,
        now: NaiveDateTime,
    ) -> Result<RefreshReport, CoreError> {
        self.price_service
            .refresh_metal_prices(&self.db, &self.currency_service, force, now)
            .await
    }

    pub fn latest_metal_prices(&self) -> Result<Vec<MetalPrices>, CoreError> {
        self.price_service.latest_metal_prices(&self.db)
    }

    // ── Historical Prices ───────────────────────────────────────────

    /// Closing price of a PSX stock on `date`, or the last trading day before it.
    pub async fn stock_price_on(&self, symbol: &str, date: NaiveDate) -> Result<f64, CoreError> {
        self.stock_price_on_at(symbol, date, dates::now()).await
    }

    pub async fn stock_price_on_at(
        &self,
        symbol: &str,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<f64, CoreError> {
        self.price_service
            .historical_price(&self.db, symbol, "PKR", date, &AssetType::Stock, now)
            .await
    }

    /// USD price per gram (24K) of `metal` on `date`.
    pub async fn metal_price_on(&self, metal: Metal, date: NaiveDate) -> Result<f64, CoreError> {
        self.metal_price_on_at(metal, date, dates::now()).await
    }

    pub async fn metal_price_on_at(
        &self,
        metal: Metal,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<f64, CoreError> {
        self.price_service
            .historical_price(&self.db, metal.symbol(), "USD", date, &AssetType::Metal, now)
            .await
    }

    /// Exchange rate on a past date. Not stored, and no default rate applies.
    pub async fn exchange_rate_on(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
    ) -> Result<f64, CoreError> {
        self.exchange_rate_on_at(base, target, date, dates::now()).await
    }

    pub async fn exchange_rate_on_at(
        &self,
        base: &str,
        target: &str,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<f64, CoreError> {
        self.price_service
            .historical_price(&self.db, base, target, date, &AssetType::Fiat, now)
            .await
    }

    // ── Currency ────────────────────────────────────────────────────

    pub async fn exchange_rate(&self, base: &str, target: &str) -> Result<f64, CoreError> {
        self.exchange_rate_at(base, target, dates::now()).await
    }

    pub async fn exchange_rate_at(
        &self,
        base: &str,
        target: &str,
        now: NaiveDateTime,
    ) -> Result<f64, CoreError> {
        self.currency_service
            .exchange_rate(&self.price_service, &self.db, base, target, now)
            .await
    }

    pub async fn usd_to_pkr_rate(&self) -> Result<f64, CoreError> {
        self.currency_service
            .usd_to_pkr_rate(&self.price_service, &self.db, dates::now())
            .await
    }

    /// Convert with the stored (or default) rate; never touches the network.
    pub fn convert_currency(&self, amount: f64, from: &str, to: &str) -> Result<f64, CoreError> {
        self.currency_service
            .convert_currency(&self.db, amount, from, to)
    }

    // ── Export ──────────────────────────────────────────────────────

    /// Export all buy trades as a JSON string.
    pub fn export_trades_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.list_trades()?)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize trades to JSON: {e}")))
    }

    /// Export all buy trades as a CSV string.
    /// Columns: date, memo_number, stock, quantity, rate, commission, cdc_charges, sales_tax, total_amount, type
    pub fn export_trades_to_csv(&self) -> Result<String, CoreError> {
        let mut csv = String::from(
            "date,memo_number,stock,quantity,rate,commission,cdc_charges,sales_tax,total_amount,type\n",
        );
        for trade in self.list_trades()? {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                csv_field(&trade.date),
                csv_field(&trade.memo_number),
                csv_field(&trade.stock),
                trade.quantity,
                trade.rate,
                trade.commission,
                trade.cdc_charges,
                trade.sales_tax,
                trade.total_amount,
                csv_field(&trade.trade_type),
            ));
        }
        Ok(csv)
    }

    /// Export all dividends as a JSON string.
    pub fn export_dividends_to_json(&self) -> Result<String, CoreError> {
        serde_json::to_string_pretty(&self.list_dividends()?).map_err(|e| {
            CoreError::Serialization(format!("Failed to serialize dividends to JSON: {e}"))
        })
    }

    // ── Provider Availability ───────────────────────────────────────

    /// Check if at least one price provider is available for a given asset type.
    #[must_use]
    pub fn is_provider_available(&self, asset_type: &AssetType) -> bool {
        self.price_service.has_provider_for(asset_type)
    }

    /// Get the names of available providers for a given asset type.
    #[must_use]
    pub fn get_provider_names(&self, asset_type: &AssetType) -> Vec<String> {
        self.price_service.get_provider_names(asset_type)
    }

    // ── Internal ────────────────────────────────────────────────────

    fn build(db: Database, config: AppConfig, registry: PriceProviderRegistry) -> Self {
        let price_service =
            PriceService::new(registry).with_daily_call_limit(config.max_api_calls_per_day);

        Self {
            db,
            config,
            trade_service: TradeService::new(),
            sell_service: SellService::new(),
            dividend_service: DividendService::new(),
            metal_service: MetalService::new(),
            report_service: ReportService::new(),
            price_service,
            currency_service: CurrencyService::new(),
        }
    }
}

/// Quote a CSV field containing a comma, quote or newline.
fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
