use serde::{Deserialize, Serialize};

/// A currently held stock position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub stock: String,
    pub total_bought: i64,
    pub total_sold: i64,
    pub remaining: i64,
    /// Σ(quantity × rate) / Σ quantity over buys
    pub avg_buy_price: f64,
    /// remaining × avg_buy_price
    pub current_value: f64,
    /// Σ total_amount over buys (charges included)
    pub total_investment: f64,
    pub total_sales: f64,
    pub total_tax: f64,
    /// Last cached close, if the stock has ever been priced
    pub market_price: Option<f64>,
    pub market_value: Option<f64>,
    pub unrealized_pl: Option<f64>,
}

/// Share of the portfolio held in one stock, by share count.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationSlice {
    pub stock: String,
    pub shares: i64,
    pub percentage: f64,
}

/// Realized profit/loss for one stock, aggregated over all its sales.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RealizedPl {
    pub stock: String,
    pub total_sold: i64,
    pub total_buy_value: f64,
    pub total_sell_value: f64,
    pub total_tax: f64,
    pub net_pl: f64,
}

/// Dividend income for one stock.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendSummary {
    pub stock: String,
    pub total_dividend: f64,
    pub total_tax: f64,
    pub net_amount: f64,
    pub num_payments: i64,
}

/// One point on the dividend income timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendPoint {
    pub date: String,
    pub net_dividend: f64,
}

/// Overall performance: realized trading result plus dividend income.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioPerformance {
    pub total_realized_pl: f64,
    pub total_tax_paid: f64,
    pub net_dividend_income: f64,
    pub total_return: f64,
}

/// Everything the summary page shows, in one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSummary {
    pub positions: Vec<Position>,
    pub distribution: Vec<AllocationSlice>,
    /// Σ current_value over positions
    pub portfolio_value: f64,
    /// Σ total_investment over positions
    pub total_investment: f64,
    pub realized_pl: Vec<RealizedPl>,
    pub dividends: Vec<DividendSummary>,
    pub performance: PortfolioPerformance,
}
