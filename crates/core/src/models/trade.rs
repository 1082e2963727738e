use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Memo number used when the broker memo is left blank.
pub const UNKNOWN_MEMO: &str = "UNKNOWN";

/// Direction stored in the `type` column of `trades`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeType {
    Buy,
}

impl TradeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeType::Buy => "Buy",
        }
    }
}

impl std::fmt::Display for TradeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One buy trade as entered from a broker memo, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeInput {
    pub date: NaiveDate,
    pub stock: String,
    pub quantity: i64,
    /// Price per share (Rs.)
    pub rate: f64,
    /// Broker commission (Rs.)
    pub commission: f64,
    pub cdc_charges: f64,
    pub sales_tax: f64,
}

impl TradeInput {
    pub fn new(date: NaiveDate, stock: impl Into<String>, quantity: i64, rate: f64) -> Self {
        Self {
            date,
            stock: stock.into(),
            quantity,
            rate,
            commission: 0.0,
            cdc_charges: 0.0,
            sales_tax: 0.0,
        }
    }

    /// Attach the broker charges printed on the memo.
    pub fn with_charges(mut self, commission: f64, cdc_charges: f64, sales_tax: f64) -> Self {
        self.commission = commission;
        self.cdc_charges = cdc_charges;
        self.sales_tax = sales_tax;
        self
    }

    pub fn stock_value(&self) -> f64 {
        self.rate * self.quantity as f64
    }

    pub fn total_charges(&self) -> f64 {
        self.commission + self.cdc_charges + self.sales_tax
    }

    pub fn total_amount(&self) -> f64 {
        self.stock_value() + self.total_charges()
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        if clean_stock_name(&self.stock).is_empty() {
            return Err(CoreError::ValidationError("Stock name is required".into()));
        }
        if self.quantity < 1 {
            return Err(CoreError::ValidationError(format!(
                "Number of shares must be at least 1, got {}",
                self.quantity
            )));
        }
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Rate per share must be greater than 0, got {}",
                self.rate
            )));
        }
        for (label, value) in [
            ("Commission", self.commission),
            ("CDC charges", self.cdc_charges),
            ("Sales tax", self.sales_tax),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "{label} must not be negative, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// A stored row of the `trades` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// SQLite rowid
    pub id: i64,
    /// ISO date (`YYYY-MM-DD`) for rows written by this crate
    pub date: String,
    pub memo_number: String,
    pub stock: String,
    pub quantity: i64,
    pub rate: f64,
    pub commission: f64,
    pub cdc_charges: f64,
    pub sales_tax: f64,
    pub total_amount: f64,
    pub trade_type: String,
}

/// Strip the broker's "Ready" market suffix (e.g. "HUBC Ready") and surrounding whitespace.
pub fn clean_stock_name(name: &str) -> String {
    match name.find("Ready") {
        Some(idx) => name[..idx].trim().to_string(),
        None => name.trim().to_string(),
    }
}

/// Blank memo numbers are stored as [`UNKNOWN_MEMO`].
pub fn memo_or_unknown(memo: &str) -> String {
    let trimmed = memo.trim();
    if trimmed.is_empty() {
        UNKNOWN_MEMO.to_string()
    } else {
        trimmed.to_string()
    }
}
