use rusqlite::{params, Connection};

use crate::dates::format_date;
use crate::errors::CoreError;
use crate::models::dividend::{Dividend, DividendInput};
use crate::models::report::{DividendPoint, DividendSummary};

/// Access to the `warrants` and `dividends` tables.
pub struct DividendRepository;

impl DividendRepository {
    pub fn warrant_exists(conn: &Connection, warrant_no: &str) -> Result<bool, CoreError> {
        let exists = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM warrants WHERE warrant_no = ?1)",
            [warrant_no],
            |row| row.get(0),
        )?;
        Ok(exists)
    }

    /// Insert the warrant (if new) and its dividend row. Returns the dividend id.
    pub fn insert(conn: &Connection, input: &DividendInput) -> Result<i64, CoreError> {
        let warrant_no = input.warrant_no.trim();
        conn.execute(
            "INSERT OR IGNORE INTO warrants (warrant_no) VALUES (?1)",
            [warrant_no],
        )?;
        conn.execute(
            "INSERT INTO dividends (warrant_no, payment_date, stock_name, rate_per_security,
                                    number_of_securities, amount_of_dividend, tax_deducted, amount_paid)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                warrant_no,
                format_date(input.payment_date),
                input.stock_name.trim(),
                input.rate_per_security,
                input.number_of_securities,
                input.amount_of_dividend(),
                input.tax_deducted(),
                input.amount_paid(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Dividends joined with their warrants, newest payment first.
    pub fn list(conn: &Connection) -> Result<Vec<Dividend>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT d.id, w.warrant_no, d.payment_date, d.stock_name, d.rate_per_security,
                    d.number_of_securities, d.amount_of_dividend, d.tax_deducted, d.amount_paid
             FROM dividends d
             JOIN warrants w ON d.warrant_no = w.warrant_no
             ORDER BY d.payment_date DESC, d.id DESC",
        )?;
        let dividends = stmt
            .query_map([], |row| {
                Ok(Dividend {
                    id: row.get(0)?,
                    warrant_no: row.get(1)?,
                    payment_date: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
                    stock_name: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
                    rate_per_security: row.get::<_, Option<f64>>(4)?.unwrap_or(0.0),
                    number_of_securities: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
                    amount_of_dividend: row.get::<_, Option<f64>>(6)?.unwrap_or(0.0),
                    tax_deducted: row.get::<_, Option<f64>>(7)?.unwrap_or(0.0),
                    amount_paid: row.get::<_, Option<f64>>(8)?.unwrap_or(0.0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(dividends)
    }

    /// Delete the dividend rows and the warrant. Returns the number of dividend rows removed.
    pub fn delete(conn: &Connection, warrant_no: &str) -> Result<usize, CoreError> {
        let deleted = conn.execute("DELETE FROM dividends WHERE warrant_no = ?1", [warrant_no])?;
        let warrants = conn.execute("DELETE FROM warrants WHERE warrant_no = ?1", [warrant_no])?;
        Ok(deleted.max(warrants))
    }

    /// Per-stock dividend totals, largest net income first.
    pub fn summaries(conn: &Connection) -> Result<Vec<DividendSummary>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT stock_name,
                    SUM(amount_of_dividend),
                    SUM(tax_deducted),
                    SUM(amount_paid),
                    COUNT(*)
             FROM dividends
             GROUP BY stock_name
             ORDER BY SUM(amount_paid) DESC, stock_name",
        )?;
        let summaries = stmt
            .query_map([], |row| {
                Ok(DividendSummary {
                    stock: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    total_dividend: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                    total_tax: row.get::<_, Option<f64>>(2)?.unwrap_or(0.0),
                    net_amount: row.get::<_, Option<f64>>(3)?.unwrap_or(0.0),
                    num_payments: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(summaries)
    }

    /// Net dividend per payment date, oldest first.
    pub fn timeline(conn: &Connection) -> Result<Vec<DividendPoint>, CoreError> {
        let mut stmt = conn.prepare(
            "SELECT payment_date, SUM(amount_paid)
             FROM dividends
             GROUP BY payment_date
             ORDER BY payment_date",
        )?;
        let points = stmt
            .query_map([], |row| {
                Ok(DividendPoint {
                    date: row.get::<_, Option<String>>(0)?.unwrap_or_default(),
                    net_dividend: row.get::<_, Option<f64>>(1)?.unwrap_or(0.0),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(points)
    }
}
