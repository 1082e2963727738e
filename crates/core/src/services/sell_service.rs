use chrono::NaiveDateTime;
use rusqlite::Connection;

use crate::dates::format_date;
use crate::errors::CoreError;
use crate::models::sell::{SaleQuote, SaleReceipt, SellTrade, StockAvailability};
use crate::models::trade::clean_stock_name;
use crate::storage::{Database, SellRepository, TradeRepository};

/// Sells shares out of the current holdings.
pub struct SellService;

impl SellService {
    pub fn new() -> Self {
        Self
    }

    /// Stocks with shares left to sell, ordered by name.
    pub fn available_stocks(&self, db: &Database) -> Result<Vec<StockAvailability>, CoreError> {
        db.with_connection(available_in)
    }

    /// Preview the amounts of a sale without storing anything.
    pub fn quote_sale(
        &self,
        db: &Database,
        stock: &str,
        quantity: i64,
        rate: f64,
        cgt_percentage: f64,
    ) -> Result<SaleQuote, CoreError> {
        validate_sale(quantity, rate, cgt_percentage)?;
        let available = self.require_available(db, stock, quantity)?;
        Ok(SaleQuote::new(quantity, rate, cgt_percentage, available.avg_buy_price))
    }

    /// Sell `quantity` shares of `stock` at `rate`, withholding `cgt_percentage`.
    ///
    /// The sale is dated `now` and gets memo `S<YYYYMMDDHHMMSS>`, with a `-N`
    /// suffix when another sale already holds that memo.
    pub fn sell_stock(
        &self,
        db: &Database,
        stock: &str,
        quantity: i64,
        rate: f64,
        cgt_percentage: f64,
        now: NaiveDateTime,
    ) -> Result<SaleReceipt, CoreError> {
        validate_sale(quantity, rate, cgt_percentage)?;
        let stock = clean_stock_name(stock);
        let sell_date = format_date(now.date());
        let base_memo = now.format("S%Y%m%d%H%M%S").to_string();

        let receipt = db.transaction(|tx| {
            let available = find_available(tx, &stock, quantity)?;
            let quote = SaleQuote::new(quantity, rate, cgt_percentage, available.avg_buy_price);
            let memo = unique_memo(tx, &base_memo)?;
            let sale = SellRepository::insert(tx, &sell_date, &stock, &memo, &quote)?;
            let remaining_shares = available.available_qty - quantity;
            Ok(SaleReceipt {
                sale,
                quote,
                avg_buy_price: available.avg_buy_price,
                remaining_shares,
                remaining_value: remaining_shares as f64 * available.avg_buy_price,
            })
        })?;

        log::info!(
            "Sold {quantity} shares of {stock} at {rate} (memo {}), {} remaining",
            receipt.sale.memo_number,
            receipt.remaining_shares
        );
        Ok(receipt)
    }

    /// All sales, newest first.
    pub fn list_sales(&self, db: &Database) -> Result<Vec<SellTrade>, CoreError> {
        db.with_connection(SellRepository::list)
    }

    fn require_available(
        &self,
        db: &Database,
        stock: &str,
        quantity: i64,
    ) -> Result<StockAvailability, CoreError> {
        let stock = clean_stock_name(stock);
        db.with_connection(|conn| find_available(conn, &stock, quantity))
    }
}

impl Default for SellService {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_sale(quantity: i64, rate: f64, cgt_percentage: f64) -> Result<(), CoreError> {
    if quantity < 1 {
        return Err(CoreError::ValidationError(format!(
            "Quantity must be at least 1, got {quantity}"
        )));
    }
    if !rate.is_finite() || rate <= 0.0 {
        return Err(CoreError::ValidationError(format!(
            "Sale rate must be greater than 0, got {rate}"
        )));
    }
    if !(0.0..=100.0).contains(&cgt_percentage) {
        return Err(CoreError::ValidationError(format!(
            "CGT percentage must be between 0 and 100, got {cgt_percentage}"
        )));
    }
    Ok(())
}

fn available_in(conn: &Connection) -> Result<Vec<StockAvailability>, CoreError> {
    let sold = SellRepository::sold_totals(conn)?;
    let available = TradeRepository::buy_totals(conn)?
        .into_iter()
        .filter_map(|buys| {
            let sold_qty = sold.get(&buys.stock).map(|s| s.quantity).unwrap_or(0);
            let available_qty = buys.quantity - sold_qty;
            (available_qty > 0).then(|| StockAvailability {
                avg_buy_price: buys.avg_price(),
                total_investment: buys.investment,
                stock: buys.stock,
                available_qty,
            })
        })
        .collect();
    Ok(available)
}

fn find_available(
    conn: &Connection,
    stock: &str,
    quantity: i64,
) -> Result<StockAvailability, CoreError> {
    let available = available_in(conn)?
        .into_iter()
        .find(|a| a.stock == stock)
        .ok_or_else(|| CoreError::InsufficientShares {
            stock: stock.to_string(),
            requested: quantity,
            available: 0,
        })?;
    if quantity > available.available_qty {
        return Err(CoreError::InsufficientShares {
            stock: stock.to_string(),
            requested: quantity,
            available: available.available_qty,
        });
    }
    Ok(available)
}

fn unique_memo(conn: &Connection, base: &str) -> Result<String, CoreError> {
    if !SellRepository::memo_exists(conn, base)? {
        return Ok(base.to_string());
    }
    let mut n = 1;
    loop {
        let candidate = format!("{base}-{n}");
        if !SellRepository::memo_exists(conn, &candidate)? {
            return Ok(candidate);
        }
        n += 1;
    }
}
