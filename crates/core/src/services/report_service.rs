use std::collections::{BTreeMap, HashMap};

use crate::errors::CoreError;
use crate::models::report::{
    AllocationSlice, DividendPoint, DividendSummary, PortfolioPerformance, PortfolioSummary,
    Position, RealizedPl,
};
use crate::models::sell::SellTrade;
use crate::storage::{BuyTotals, Database, DividendRepository, PriceRepository, SellRepository, SoldTotals, TradeRepository};

/// Computes portfolio reports: positions, allocation, realized P/L and dividend income.
///
/// Reads only from the database. Market prices come from the stock price
/// cache as last refreshed; nothing here triggers a network call.
pub struct ReportService;

impl ReportService {
    pub fn new() -> Self {
        Self
    }

    /// Stocks with shares remaining, ordered by name.
    pub fn positions(&self, db: &Database) -> Result<Vec<Position>, CoreError> {
        db.with_connection(|conn| {
            let buys = TradeRepository::buy_totals(conn)?;
            let sold = SellRepository::sold_totals(conn)?;
            let mut market = HashMap::new();
            for b in &buys {
                // the cache is keyed by the uppercased ticker
                let symbol = b.stock.trim().to_uppercase();
                if let Some(price) = PriceRepository::get_stock_price(conn, &symbol)?
                    .and_then(|r| r.previous_close.or(r.buffer_price))
                {
                    market.insert(b.stock.clone(), price);
                }
            }
            Ok(build_positions(&buys, &sold, &market))
        })
    }

    pub fn distribution(&self, db: &Database) -> Result<Vec<AllocationSlice>, CoreError> {
        Ok(distribution_of(&self.positions(db)?))
    }

    /// Realized profit/loss per stock over all recorded sales.
    pub fn realized_pl(&self, db: &Database) -> Result<Vec<RealizedPl>, CoreError> {
        db.with_connection(|conn| {
            let sales = SellRepository::list_chronological(conn)?;
            let buys = TradeRepository::buy_totals(conn)?;
            Ok(realized_pl_from(&sales, &buys))
        })
    }

    pub fn dividend_income(&self, db: &Database) -> Result<Vec<DividendSummary>, CoreError> {
        db.with_connection(DividendRepository::summaries)
    }

    pub fn dividend_timeline(&self, db: &Database) -> Result<Vec<DividendPoint>, CoreError> {
        db.with_connection(DividendRepository::timeline)
    }

    pub fn performance(&self, db: &Database) -> Result<PortfolioPerformance, CoreError> {
        Ok(performance_of(&self.realized_pl(db)?, &self.dividend_income(db)?))
    }

    /// Everything the summary view needs, read in one pass.
    pub fn portfolio_summary(&self, db: &Database) -> Result<PortfolioSummary, CoreError> {
        let positions = self.positions(db)?;
        let realized_pl = self.realized_pl(db)?;
        let dividends = self.dividend_income(db)?;

        Ok(PortfolioSummary {
            distribution: distribution_of(&positions),
            portfolio_value: positions.iter().map(|p| p.current_value).sum(),
            total_investment: positions.iter().map(|p| p.total_investment).sum(),
            performance: performance_of(&realized_pl, &dividends),
            positions,
            realized_pl,
            dividends,
        })
    }
}

impl Default for ReportService {
    fn default() -> Self {
        Self::new()
    }
}

/// Combine buy and sell totals into positions; stocks fully sold are left out.
pub fn build_positions(
    buys: &[BuyTotals],
    sold: &HashMap<String, SoldTotals>,
    market: &HashMap<String, f64>,
) -> Vec<Position> {
    let mut positions: Vec<Position> = buys
        .iter()
        .filter_map(|b| {
            let sold = sold.get(&b.stock).cloned().unwrap_or_default();
            let remaining = b.quantity - sold.quantity;
            if remaining <= 0 {
                return None;
            }
            let avg_buy_price = b.avg_price();
            let current_value = remaining as f64 * avg_buy_price;
            let market_price = market.get(&b.stock).copied();
            let market_value = market_price.map(|p| p * remaining as f64);
            Some(Position {
                stock: b.stock.clone(),
                total_bought: b.quantity,
                total_sold: sold.quantity,
                remaining,
                avg_buy_price,
                current_value,
                total_investment: b.investment,
                total_sales: sold.sale_amount,
                total_tax: sold.cgt_amount,
                market_price,
                market_value,
                unrealized_pl: market_value.map(|v| v - current_value),
            })
        })
        .collect();
    positions.sort_by(|a, b| a.stock.cmp(&b.stock));
    positions
}

/// Share of each position in the total remaining share count.
pub fn distribution_of(positions: &[Position]) -> Vec<AllocationSlice> {
    let total: i64 = positions.iter().map(|p| p.remaining).sum();
    positions
        .iter()
        .map(|p| AllocationSlice {
            stock: p.stock.clone(),
            shares: p.remaining,
            percentage: if total > 0 {
                p.remaining as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect()
}

/// Realized P/L per stock. Each sale is costed at the average buy cost
/// (charges included); sales of stocks with no buys are ignored.
pub fn realized_pl_from(sales: &[SellTrade], buys: &[BuyTotals]) -> Vec<RealizedPl> {
    let buys: HashMap<&str, &BuyTotals> = buys.iter().map(|b| (b.stock.as_str(), b)).collect();
    let mut per_stock: BTreeMap<String, RealizedPl> = BTreeMap::new();

    for sale in sales {
        let Some(bought) = buys.get(sale.stock.as_str()) else {
            continue;
        };
        if bought.quantity <= 0 {
            continue;
        }
        let buy_value = bought.avg_cost() * sale.quantity as f64;
        let pl = sale.sale_amount - buy_value - sale.cgt_amount;

        let entry = per_stock
            .entry(sale.stock.clone())
            .or_insert_with(|| RealizedPl {
                stock: sale.stock.clone(),
                ..RealizedPl::default()
            });
        entry.total_sold += sale.quantity;
        entry.total_buy_value += buy_value;
        entry.total_sell_value += sale.sale_amount;
        entry.total_tax += sale.cgt_amount;
        entry.net_pl += pl;
    }

    per_stock.into_values().collect()
}

pub fn performance_of(realized: &[RealizedPl], dividends: &[DividendSummary]) -> PortfolioPerformance {
    let total_realized_pl: f64 = realized.iter().map(|r| r.net_pl).sum();
    let total_tax_paid: f64 = realized.iter().map(|r| r.total_tax).sum::<f64>()
        + dividends.iter().map(|d| d.total_tax).sum::<f64>();
    let net_dividend_income: f64 = dividends.iter().map(|d| d.net_amount).sum();
    PortfolioPerformance {
        total_realized_pl,
        total_tax_paid,
        net_dividend_income,
        total_return: total_realized_pl + net_dividend_income,
    }
}
