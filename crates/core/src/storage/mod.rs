mod database;
mod dividends;
mod metals;
pub mod migrations;
mod prices;
mod sells;
mod trades;

pub use database::Database;
pub use dividends::DividendRepository;
pub use metals::MetalRepository;
pub use prices::PriceRepository;
pub use sells::{SellRepository, SoldTotals};
pub use trades::{BuyTotals, TradeRepository};
