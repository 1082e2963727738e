pub mod asset;
pub mod dividend;
pub mod metal;
pub mod price;
pub mod report;
pub mod sell;
pub mod trade;
