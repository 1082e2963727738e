use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension, Row};

use crate::errors::CoreError;
use crate::models::metal::{MetalPrices, MetalTrade, KARATS};

/// Access to the `metal_trades` and `metal_prices` tables.
pub struct MetalRepository;

impl MetalRepository {
    /// Store a purchase. The `id` field of `trade` is ignored; the new id is returned.
    pub fn insert_trade(conn: &Connection, trade: &MetalTrade) -> Result<i64, CoreError> {
        conn.execute(
            "INSERT INTO metal_trades (date, metal, weight, karat, purchase_price, total_cost)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                trade.date,
                trade.metal,
                trade.weight,
                trade.karat,
                trade.purchase_price,
                trade.total_cost,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// All metal purchases, newest first.
    pub fn list_trades(conn: &Connection) -> Result<Vec<MetalTrade>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT id, date, metal, weight, karat, purchase_price, total_cost
             FROM metal_trades
             ORDER BY date DESC, id DESC",
        )?;
        let trades = stmt
            .query_map([], |row| {
                Ok(MetalTrade {
                    id: row.get(0)?,
                    date: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    metal: row.get(2)?,
                    weight: row.get(3)?,
                    karat: row.get(4)?,
                    purchase_price: row.get(5)?,
                    total_cost: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(trades)
    }

    /// Insert or replace the stored prices for one metal.
    pub fn upsert_prices(conn: &Connection, prices: &MetalPrices) -> Result<(), CoreError> {
        let karat_columns: Vec<String> = KARATS.iter().map(|k| price_column(*k)).collect();
        let placeholders: Vec<String> = (1..=KARATS.len() + 3).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO metal_prices (metal, {}, price_usd_gram_24k, last_updated)
             VALUES ({})",
            karat_columns.join(", "),
            placeholders.join(", ")
        );

        let mut values: Vec<Value> = Vec::with_capacity(KARATS.len() + 3);
        values.push(Value::Text(prices.metal.clone()));
        for karat in KARATS {
            let price = prices
                .price_gram
                .iter()
                .find(|(k, _)| *k == karat)
                .map(|(_, p)| *p);
            values.push(price.map(Value::Real).unwrap_or(Value::Null));
        }
        values.push(prices.price_usd_gram_24k.map(Value::Real).unwrap_or(Value::Null));
        values.push(
            prices
                .last_updated
                .clone()
                .map(Value::Text)
                .unwrap_or(Value::Null),
        );

        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// Every stored metal price row, by symbol.
    pub fn list_prices(conn: &Connection) -> Result<Vec<MetalPrices>, CoreError> {
        let sql = format!("{} ORDER BY metal", select_prices_sql());
        let mut stmt = conn.prepare(&sql)?;
        let prices = stmt
            .query_map([], prices_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(prices)
    }

    pub fn prices_for(conn: &Connection, symbol: &str) -> Result<Option<MetalPrices>, CoreError> {
        let sql = format!("{} WHERE metal = ?1", select_prices_sql());
        let prices = conn
            .query_row(&sql, [symbol], prices_from_row)
            .optional()?;
        Ok(prices)
    }
}

fn price_column(karat: u8) -> String {
    format!("price_gram_{karat}k")
}

fn select_prices_sql() -> String {
    let karat_columns: Vec<String> = KARATS.iter().map(|k| price_column(*k)).collect();
    format!(
        "SELECT metal, {}, price_usd_gram_24k, last_updated FROM metal_prices",
        karat_columns.join(", ")
    )
}

fn prices_from_row(row: &Row<'_>) -> rusqlite::Result<MetalPrices> {
    let mut price_gram = Vec::with_capacity(KARATS.len());
    for (i, karat) in KARATS.iter().enumerate() {
        if let Some(price) = row.get::<_, Option<f64>>(i + 1)? {
            price_gram.push((*karat, price));
        }
    }
    Ok(MetalPrices {
        metal: row.get(0)?,
        price_gram,
        price_usd_gram_24k: row.get(KARATS.len() + 1)?,
        last_updated: row.get(KARATS.len() + 2)?,
    })
}
