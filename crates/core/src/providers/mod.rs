pub mod registry;
pub mod traits;

// API provider implementations
pub mod exchangerate_api;
pub mod frankfurter;
pub mod goldapi;
pub mod psx;
#[cfg(not(target_arch = "wasm32"))]
pub mod yahoo_finance;
