use rusqlite::{params, Connection, OptionalExtension};

use crate::errors::CoreError;
use crate::models::price::{ExchangeRate, StockPriceRecord};

/// Access to the price caches: `stock_prices`, `api_calls` and `exchange_rates`.
pub struct PriceRepository;

impl PriceRepository {
    // ── Stock prices ────────────────────────────────────────────────

    pub fn get_stock_price(
        conn: &Connection,
        stock: &str,
    ) -> Result<Option<StockPriceRecord>, CoreError> {
        let record = conn
            .query_row(
                "SELECT stock, previous_close, last_updated, last_attempt_time, buffer_price
                 FROM stock_prices WHERE stock = ?1",
                [stock],
                |row| {
                    Ok(StockPriceRecord {
                        stock: row.get(0)?,
                        previous_close: row.get(1)?,
                        last_updated: row.get(2)?,
                        last_attempt_time: row.get(3)?,
                        buffer_price: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(record)
    }

    /// Remember when a provider was last asked for `stock`, creating the row if needed.
    pub fn record_attempt(conn: &Connection, stock: &str, timestamp: &str) -> Result<(), CoreError> {
        conn.execute(
            "INSERT INTO stock_prices (stock, last_attempt_time) VALUES (?1, ?2)
             ON CONFLICT(stock) DO UPDATE SET last_attempt_time = excluded.last_attempt_time",
            params![stock, timestamp],
        )?;
        Ok(())
    }

    /// Store a fresh close. The close it replaces moves into `buffer_price`;
    /// when there was none, the buffer starts out equal to the new close.
    pub fn save_stock_price(
        conn: &Connection,
        stock: &str,
        close: f64,
        today: &str,
    ) -> Result<(), CoreError> {
        conn.execute(
            "INSERT INTO stock_prices (stock, previous_close, buffer_price, last_updated)
             VALUES (?1, ?2, ?2, ?3)
             ON CONFLICT(stock) DO UPDATE SET
                 buffer_price = COALESCE(stock_prices.previous_close, excluded.buffer_price),
                 previous_close = excluded.previous_close,
                 last_updated = excluded.last_updated",
            params![stock, close, today],
        )?;
        Ok(())
    }

    // ── API call budget ─────────────────────────────────────────────

    pub fn api_calls_on(conn: &Connection, date: &str) -> Result<u32, CoreError> {
        let calls: Option<u32> = conn
            .query_row("SELECT calls FROM api_calls WHERE date = ?1", [date], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(calls.unwrap_or(0))
    }

    pub fn increment_api_calls(conn: &Connection, date: &str) -> Result<(), CoreError> {
        conn.execute(
            "INSERT INTO api_calls (date, calls) VALUES (?1, 1)
             ON CONFLICT(date) DO UPDATE SET calls = calls + 1",
            [date],
        )?;
        Ok(())
    }

    // ── Exchange rates ──────────────────────────────────────────────

    pub fn get_exchange_rate(
        conn: &Connection,
        base: &str,
        target: &str,
    ) -> Result<Option<ExchangeRate>, CoreError> {
        let rate = conn
            .query_row(
                "SELECT base_currency, target_currency, rate, last_updated
                 FROM exchange_rates
                 WHERE base_currency = ?1 AND target_currency = ?2",
                params![base, target],
                |row| {
                    Ok(ExchangeRate {
                        base_currency: row.get(0)?,
                        target_currency: row.get(1)?,
                        rate: row.get(2)?,
                        last_updated: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    })
                },
            )
            .optional()?;
        Ok(rate)
    }

    pub fn save_exchange_rate(conn: &Connection, rate: &ExchangeRate) -> Result<(), CoreError> {
        conn.execute(
            "INSERT OR REPLACE INTO exchange_rates (base_currency, target_currency, rate, last_updated)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                rate.base_currency,
                rate.target_currency,
                rate.rate,
                rate.last_updated,
            ],
        )?;
        Ok(())
    }
}
