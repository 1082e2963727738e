use crate::dates::format_date;
use crate::errors::CoreError;
use crate::models::dividend::{Dividend, DividendInput};
use crate::storage::{Database, DividendRepository};

/// Records and removes dividend warrants.
pub struct DividendService;

impl DividendService {
    pub fn new() -> Self {
        Self
    }

    /// Validate and store a dividend with its warrant in one transaction.
    pub fn record_dividend(&self, db: &Database, input: &DividendInput) -> Result<Dividend, CoreError> {
        input.validate()?;
        let warrant_no = input.warrant_no.trim().to_string();

        let id = db.transaction(|tx| {
            if DividendRepository::warrant_exists(tx, &warrant_no)? {
                return Err(CoreError::DuplicateWarrant(warrant_no.clone()));
            }
            DividendRepository::insert(tx, input)
        })?;

        log::info!(
            "Recorded dividend warrant {warrant_no} for {}: {:.2} paid",
            input.stock_name.trim(),
            input.amount_paid()
        );
        Ok(Dividend {
            id,
            warrant_no,
            payment_date: format_date(input.payment_date),
            stock_name: input.stock_name.trim().to_string(),
            rate_per_security: input.rate_per_security,
            number_of_securities: input.number_of_securities,
            amount_of_dividend: input.amount_of_dividend(),
            tax_deducted: input.tax_deducted(),
            amount_paid: input.amount_paid(),
        })
    }

    /// All dividends, newest payment first.
    pub fn list_dividends(&self, db: &Database) -> Result<Vec<Dividend>, CoreError> {
        db.with_connection(DividendRepository::list)
    }

    pub fn delete_dividend(&self, db: &Database, warrant_no: &str) -> Result<usize, CoreError> {
        let warrant_no = warrant_no.trim();
        let deleted = db.transaction(|tx| {
            let deleted = DividendRepository::delete(tx, warrant_no)?;
            if deleted == 0 {
                return Err(CoreError::DividendNotFound(warrant_no.to_string()));
            }
            Ok(deleted)
        })?;
        log::info!("Deleted dividend warrant {warrant_no}");
        Ok(deleted)
    }
}

impl Default for DividendService {
    fn default() -> Self {
        Self::new()
    }
}
