use serde::{Deserialize, Serialize};

/// A stock that can be sold: bought quantity minus everything already sold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockAvailability {
    pub stock: String,
    pub available_qty: i64,
    /// Σ(quantity × rate) / Σ quantity over buy trades (charges excluded)
    pub avg_buy_price: f64,
    /// Σ total_amount over buy trades (charges included)
    pub total_investment: f64,
}

/// Amounts for a prospective sale, shown before it is confirmed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleQuote {
    pub quantity: i64,
    pub rate: f64,
    pub cgt_percentage: f64,
    pub sale_amount: f64,
    pub cgt_amount: f64,
    pub net_amount: f64,
    pub profit_per_share: f64,
    pub total_profit: f64,
    /// Profit per share relative to the average buy price, in percent.
    pub profit_pct: f64,
}

impl SaleQuote {
    pub fn new(quantity: i64, rate: f64, cgt_percentage: f64, avg_buy_price: f64) -> Self {
        let sale_amount = quantity as f64 * rate;
        let cgt_amount = (cgt_percentage / 100.0) * sale_amount;
        let profit_per_share = rate - avg_buy_price;
        let profit_pct = if avg_buy_price > 0.0 {
            profit_per_share / avg_buy_price * 100.0
        } else {
            0.0
        };
        Self {
            quantity,
            rate,
            cgt_percentage,
            sale_amount,
            cgt_amount,
            net_amount: sale_amount - cgt_amount,
            profit_per_share,
            total_profit: profit_per_share * quantity as f64,
            profit_pct,
        }
    }

    pub fn is_profit(&self) -> bool {
        self.profit_per_share > 0.0
    }
}

/// A stored row of the `sell_trades` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellTrade {
    pub sell_id: i64,
    pub sell_date: String,
    pub stock: String,
    pub quantity: i64,
    pub rate: f64,
    pub sale_amount: f64,
    pub cgt_percentage: f64,
    pub cgt_amount: f64,
    pub net_amount: f64,
    pub memo_number: String,
}

/// Result of a confirmed sale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleReceipt {
    pub sale: SellTrade,
    pub quote: SaleQuote,
    pub avg_buy_price: f64,
    pub remaining_shares: i64,
    /// Remaining shares valued at the average buy price.
    pub remaining_value: f64,
}
