use rusqlite::{params, Connection, Row};

use crate::dates::format_date;
use crate::errors::CoreError;
use crate::models::trade::{clean_stock_name, Trade, TradeInput, TradeType};

/// Aggregate of all buy trades for one stock.
#[derive(Debug, Clone, PartialEq)]
pub struct BuyTotals {
    pub stock: String,
    pub quantity: i64,
    /// Σ(quantity × rate), charges excluded
    pub cost_basis: f64,
    /// Σ total_amount, charges included
    pub investment: f64,
}

impl BuyTotals {
    /// Average price paid per share, excluding charges.
    pub fn avg_price(&self) -> f64 {
        if self.quantity > 0 {
            self.cost_basis / self.quantity as f64
        } else {
            0.0
        }
    }

    /// Average cost per share, including charges.
    pub fn avg_cost(&self) -> f64 {
        if self.quantity > 0 {
            self.investment / self.quantity as f64
        } else {
            0.0
        }
    }
}

/// Access to the `trades` and `memos` tables.
pub struct TradeRepository;

impl TradeRepository {
    pub fn insert(conn: &Connection, memo: &str, trade: &TradeInput) -> Result<i64, CoreError> {
        conn.execute(
            "INSERT INTO trades (date, memo_number, stock, quantity, rate, comm_amount,
                                 cdc_charges, sales_tax, total_amount, type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                format_date(trade.date),
                memo,
                clean_stock_name(&trade.stock),
                trade.quantity,
                trade.rate,
                trade.commission,
                trade.cdc_charges,
                trade.sales_tax,
                trade.total_amount(),
                TradeType::Buy.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn record_memo(conn: &Connection, memo: &str) -> Result<(), CoreError> {
        conn.execute("INSERT INTO memos (memo_number) VALUES (?1)", [memo])?;
        Ok(())
    }

    /// All trades, newest first.
    pub fn list(conn: &Connection) -> Result<Vec<Trade>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT rowid, date, memo_number, stock, quantity, rate, comm_amount,
                    cdc_charges, sales_tax, total_amount, type
             FROM trades
             ORDER BY date DESC, rowid DESC",
        )?;
        let trades = stmt
            .query_map([], trade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    pub fn list_for_memo(conn: &Connection, memo: &str) -> Result<Vec<Trade>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT rowid, date, memo_number, stock, quantity, rate, comm_amount,
                    cdc_charges, sales_tax, total_amount, type
             FROM trades
             WHERE memo_number = ?1
             ORDER BY rowid",
        )?;
        let trades = stmt
            .query_map([memo], trade_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    /// Delete the trades of `stock` under `memo`. Returns the number of rows removed.
    pub fn delete(conn: &Connection, memo: &str, stock: &str) -> Result<usize, CoreError> {
        let deleted = conn.execute(
            "DELETE FROM trades WHERE memo_number = ?1 AND stock = ?2",
            params![memo, stock],
        )?;
        Ok(deleted)
    }

    pub fn count_for_memo(conn: &Connection, memo: &str) -> Result<i64, CoreError> {
        let count = conn.query_row(
            "SELECT COUNT(*) FROM trades WHERE memo_number = ?1",
            [memo],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn delete_memo(conn: &Connection, memo: &str) -> Result<(), CoreError> {
        conn.execute("DELETE FROM memos WHERE memo_number = ?1", [memo])?;
        Ok(())
    }

    pub fn memo_exists(conn: &Connection, memo: &str) -> Result<bool, CoreError> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM memos WHERE memo_number = ?1)",
            [memo],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Buy totals per stock, ordered by stock name.
    pub fn buy_totals(conn: &Connection) -> Result<Vec<BuyTotals>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT stock,
                    SUM(quantity),
                    SUM(quantity * rate),
                    SUM(total_amount)
             FROM trades
             WHERE type = ?1
             GROUP BY stock
             ORDER BY stock",
        )?;
        let totals = stmt
            .query_map([TradeType::Buy.as_str()], |row| {
                Ok(BuyTotals {
                    stock: row.get(0)?,
                    quantity: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                    cost_basis: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    investment: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(totals)
    }
}

fn trade_from_row(row: &Row<'_>) -> rusqlite::Result<Trade> {
    Ok(Trade {
        id: row.get(0)?,
        date: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        memo_number: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        stock: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
        quantity: row.get::<_, Option<i64>>(4)?.unwrap_or(0),
        rate: row.get::<_, Option<f64>>(5)?.unwrap_or(0.0),
        commission: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
        cdc_charges: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
        sales_tax: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
        total_amount: row.get::<_, Option<f64>>(9)?.unwrap_or(0.0),
        trade_type: row.get::<_, Option<String>>(10)?.unwrap_or_default(),
    })
}
