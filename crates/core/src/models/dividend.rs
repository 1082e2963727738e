use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// A dividend warrant as entered, before it is stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendInput {
    pub warrant_no: String,
    pub payment_date: NaiveDate,
    pub stock_name: String,
    pub rate_per_security: f64,
    pub number_of_securities: i64,
    /// Withholding tax in percent (0..=100)
    pub tax_pct: f64,
}

impl DividendInput {
    pub fn amount_of_dividend(&self) -> f64 {
        self.rate_per_security * self.number_of_securities as f64
    }

    pub fn tax_deducted(&self) -> f64 {
        self.amount_of_dividend() * (self.tax_pct / 100.0)
    }

    pub fn amount_paid(&self) -> f64 {
        self.amount_of_dividend() - self.tax_deducted()
    }

    /// Collect every input problem instead of stopping at the first one.
    pub fn validation_errors(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if self.warrant_no.trim().is_empty() {
            errors.push("Warrant number is required".to_string());
        }
        if self.stock_name.trim().is_empty() {
            errors.push("Stock name is required".to_string());
        }
        if !self.rate_per_security.is_finite() || self.rate_per_security <= 0.0 {
            errors.push("Rate per security must be greater than 0".to_string());
        }
        if self.number_of_securities <= 0 {
            errors.push("Number of securities must be greater than 0".to_string());
        }
        if !(0.0..=100.0).contains(&self.tax_pct) {
            errors.push(format!("Tax rate must be between 0 and 100, got {}", self.tax_pct));
        }
        errors
    }

    pub fn validate(&self) -> Result<(), CoreError> {
        let errors = self.validation_errors();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CoreError::ValidationError(errors.join("; ")))
        }
    }
}

/// A stored dividend joined with its warrant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dividend {
    pub id: i64,
    pub warrant_no: String,
    pub payment_date: String,
    pub stock_name: String,
    pub rate_per_security: f64,
    pub number_of_securities: i64,
    pub amount_of_dividend: f64,
    pub tax_deducted: f64,
    pub amount_paid: f64,
}
