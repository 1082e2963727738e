use std::collections::HashMap;

use rusqlite::{params, Connection, Row};

use crate::errors::CoreError;
use crate::models::sell::{SaleQuote, SellTrade};

/// Aggregate of all sales of one stock.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SoldTotals {
    pub quantity: i64,
    pub sale_amount: f64,
    pub cgt_amount: f64,
}

/// Access to the `sell_trades` table.
pub struct SellRepository;

impl SellRepository {
    pub fn insert(
        conn: &Connection,
        sell_date: &str,
        stock: &str,
        memo_number: &str,
        quote: &SaleQuote,
    ) -> Result<SellTrade, CoreError> {
        conn.execute(
            "INSERT INTO sell_trades (sell_date, stock, quantity, rate, sale_amount,
                                      cgt_percentage, cgt_amount, net_amount, memo_number)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                sell_date,
                stock,
                quote.quantity,
                quote.rate,
                quote.sale_amount,
                quote.cgt_percentage,
                quote.cgt_amount,
                quote.net_amount,
                memo_number,
            ],
        )?;
        Ok(SellTrade {
            sell_id: conn.last_insert_rowid(),
            sell_date: sell_date.to_string(),
            stock: stock.to_string(),
            quantity: quote.quantity,
            rate: quote.rate,
            sale_amount: quote.sale_amount,
            cgt_percentage: quote.cgt_percentage,
            cgt_amount: quote.cgt_amount,
            net_amount: quote.net_amount,
            memo_number: memo_number.to_string(),
        })
    }

    pub fn memo_exists(conn: &Connection, memo: &str) -> Result<bool, CoreError> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sell_trades WHERE memo_number = ?1)",
            [memo],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// All sales, newest first.
    pub fn list(conn: &Connection) -> Result<Vec<SellTrade>, CoreError> {
        Self::query(
            conn,
            "SELECT sell_id, sell_date, stock, quantity, rate, sale_amount,
                    cgt_percentage, cgt_amount, net_amount, memo_number
             FROM sell_trades
             ORDER BY sell_date DESC, sell_id DESC",
        )
    }

    /// All sales in the order they happened.
    pub fn list_chronological(conn: &Connection) -> Result<Vec<SellTrade>, CoreError> {
        Self::query(
            conn,
            "SELECT sell_id, sell_date, stock, quantity, rate, sale_amount,
                    cgt_percentage, cgt_amount, net_amount, memo_number
             FROM sell_trades
             ORDER BY sell_date, sell_id",
        )
    }

    /// Sold quantity and amounts keyed by stock.
    pub fn sold_totals(conn: &Connection) -> Result<HashMap<String, SoldTotals>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT stock, SUM(quantity), SUM(sale_amount), SUM(cgt_amount)
             FROM sell_trades
             GROUP BY stock",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    SoldTotals {
                        quantity: row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                        sale_amount: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                        cgt_amount: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    },
                ))
            })?
            .collect::<Result<HashMap<_, _>, _>>()?;
        Ok(rows)
    }

    fn query(conn: &Connection, sql: &str) -> Result<Vec<SellTrade>, CoreError> {
        let mut stmt = conn.prepare(sql)?;
        let sales = stmt
            .query_map([], sale_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sales)
    }
}

fn sale_from_row(row: &Row<'_>) -> rusqlite::Result<SellTrade> {
    Ok(SellTrade {
        sell_id: row.get(0)?,
        sell_date: row.get(1)?,
        stock: row.get(2)?,
        quantity: row.get(3)?,
        rate: row.get(4)?,
        sale_amount: row.get(5)?,
        cgt_percentage: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
        cgt_amount: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
        net_amount: row.get(8)?,
        memo_number: row.get::<_, Option<String>>(9)?.unwrap_or_default(),
    })
}
