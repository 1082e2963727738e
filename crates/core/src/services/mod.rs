pub mod currency_service;
pub mod dividend_service;
pub mod metal_service;
pub mod price_service;
pub mod report_service;
pub mod sell_service;
pub mod trade_service;
