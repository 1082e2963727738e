use crate::errors::CoreError;
use crate::models::trade::{clean_stock_name, memo_or_unknown, Trade, TradeInput};
use crate::storage::{Database, TradeRepository};

/// Records, lists and deletes buy trades.
pub struct TradeService;

impl TradeService {
    pub fn new() -> Self {
        Self
    }

    /// Store every trade of one broker memo, all or nothing.
    ///
    /// A blank memo is stored as `UNKNOWN`. Returns the row ids of the new trades.
    pub fn record_trades(
        &self,
        db: &Database,
        memo: &str,
        trades: &[TradeInput],
    ) -> Result<Vec<i64>, CoreError> {
        if trades.is_empty() {
            return Err(CoreError::ValidationError(
                "At least one trade is required".into(),
            ));
        }
        for (i, trade) in trades.iter().enumerate() {
            trade.validate().map_err(|e| match e {
                CoreError::ValidationError(msg) => {
                    CoreError::ValidationError(format!("Trade {}: {msg}", i + 1))
                }
                other => other,
            })?;
        }

        let memo = memo_or_unknown(memo);
        let ids = db.transaction(|tx| {
            let ids = trades
                .iter()
                .map(|trade| TradeRepository::insert(tx, &memo, trade))
                .collect::<Result<Vec<_>, _>>()?;
            if !TradeRepository::memo_exists(tx, &memo)? {
                TradeRepository::record_memo(tx, &memo)?;
            }
            Ok(ids)
        })?;

        log::info!("Recorded {} trade(s) under memo {memo}", ids.len());
        Ok(ids)
    }

    /// All buy trades, newest first.
    pub fn list_trades(&self, db: &Database) -> Result<Vec<Trade>, CoreError> {
        db.with_connection(TradeRepository::list)
    }

    pub fn trades_for_memo(&self, db: &Database, memo: &str) -> Result<Vec<Trade>, CoreError> {
        let memo = memo_or_unknown(memo);
        db.with_connection(|conn| TradeRepository::list_for_memo(conn, &memo))
    }

    /// Delete the trades of `stock` under `memo`; the memo itself goes once it is empty.
    pub fn delete_trade(&self, db: &Database, memo: &str, stock: &str) -> Result<usize, CoreError> {
        let memo = memo_or_unknown(memo);
        let stock = clean_stock_name(stock);

        let deleted = db.transaction(|tx| {
            let deleted = TradeRepository::delete(tx, &memo, &stock)?;
            if deleted == 0 {
                return Err(CoreError::TradeNotFound(format!("{stock} under memo {memo}")));
            }
            if TradeRepository::count_for_memo(tx, &memo)? == 0 {
                TradeRepository::delete_memo(tx, &memo)?;
                log::info!("Memo {memo} removed (no trades left)");
            }
            Ok(deleted)
        })?;

        log::info!("Deleted {deleted} trade(s) of {stock} under memo {memo}");
        Ok(deleted)
    }
}

impl Default for TradeService {
    fn default() -> Self {
        Self::new()
    }
}
