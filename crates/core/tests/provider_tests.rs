// ═══════════════════════════════════════════════════════════════════
// Provider Tests: registry routing and response parsing (no network)
// ═══════════════════════════════════════════════════════════════════

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;

use wealthwise_core::errors::CoreError;
use wealthwise_core::models::asset::AssetType;
use wealthwise_core::providers::exchangerate_api::parse_pair_rate;
use wealthwise_core::providers::frankfurter::{parse_latest_rate, rate_url, FrankfurterProvider};
use wealthwise_core::providers::goldapi::parse_gram_price;
use wealthwise_core::providers::psx::{close_on_or_before, latest_close, parse_eod};
use wealthwise_core::providers::registry::PriceProviderRegistry;
use wealthwise_core::providers::traits::PriceProvider;
use wealthwise_core::providers::yahoo_finance::yahoo_symbol;

struct Named {
    name: &'static str,
    types: Vec<AssetType>,
}

#[async_trait]
impl PriceProvider for Named {
    fn name(&self) -> &str {
        self.name
    }

    fn supported_asset_types(&self) -> Vec<AssetType> {
        self.types.clone()
    }

    async fn get_current_price(&self, _symbol: &str, _currency: &str) -> Result<f64, CoreError> {
        Ok(1.0)
    }

    async fn get_historical_price(
        &self,
        _symbol: &str,
        _currency: &str,
        _date: NaiveDate,
    ) -> Result<f64, CoreError> {
        Ok(1.0)
    }
}

fn names(registry: &PriceProviderRegistry, asset_type: AssetType) -> Vec<String> {
    registry
        .get_providers_for(&asset_type)
        .iter()
        .map(|p| p.name().to_string())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════
// Registry
// ═══════════════════════════════════════════════════════════════════

mod registry {
    use super::*;

    #[test]
    fn empty_registry_has_no_providers() {
        let registry = PriceProviderRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.get_provider_for(&AssetType::Stock).is_none());
        assert!(registry.get_providers_for(&AssetType::Fiat).is_empty());
    }

    #[test]
    fn routes_by_asset_type_in_registration_order() {
        let mut registry = PriceProviderRegistry::new();
        registry.register(Box::new(Named { name: "first", types: vec![AssetType::Stock] }));
        registry.register(Box::new(Named {
            name: "both",
            types: vec![AssetType::Stock, AssetType::Metal],
        }));
        registry.register(Box::new(Named { name: "fx", types: vec![AssetType::Fiat] }));

        assert_eq!(registry.len(), 3);
        assert_eq!(names(&registry, AssetType::Stock), vec!["first", "both"]);
        assert_eq!(names(&registry, AssetType::Metal), vec!["both"]);
        assert_eq!(registry.get_provider_for(&AssetType::Fiat).unwrap().name(), "fx");
    }

    #[test]
    fn defaults_without_keys() {
        let registry = PriceProviderRegistry::new_with_defaults(&HashMap::new());
        let stocks = names(&registry, AssetType::Stock);
        assert_eq!(stocks[0], "PSX");
        assert!(stocks.iter().all(|n| n == "PSX" || n == "Yahoo Finance"));
        assert!(names(&registry, AssetType::Metal).is_empty());
        assert_eq!(names(&registry, AssetType::Fiat), vec!["Frankfurter"]);
    }

    #[test]
    fn keyed_providers_are_added_when_configured() {
        let mut keys = HashMap::new();
        keys.insert("goldapi".to_string(), "goldapi-key".to_string());
        keys.insert("exchangerate_api".to_string(), "fx-key".to_string());
        let registry = PriceProviderRegistry::new_with_defaults(&keys);

        assert_eq!(names(&registry, AssetType::Metal), vec!["GoldAPI"]);
        assert_eq!(
            names(&registry, AssetType::Fiat),
            vec!["ExchangeRate-API", "Frankfurter"]
        );
    }
}

// ═══════════════════════════════════════════════════════════════════
// PSX
// ═══════════════════════════════════════════════════════════════════

mod psx {
    use super::*;

    // 2024-01-02, 2024-01-03, 2024-01-05 (00:00 UTC), deliberately unsorted
    const BODY: &str = r#"{"status":1,"message":"","data":[
        [1704412800, 112.5, 1000, 110.0],
        [1704153600, 100.0, 500, 99.0],
        ["bad", 1.0],
        [1704240000, 105.25, 800, 101.0]
    ]}"#;

    #[test]
    fn closes_are_sorted_and_bad_rows_skipped() {
        let closes = parse_eod(BODY, "HUBC").unwrap();
        assert_eq!(closes.len(), 3);
        assert_eq!(latest_close(&closes), Some(112.5));
        assert_eq!(closes[0].date(), NaiveDate::from_ymd_opt(2024, 1, 2));
    }

    #[test]
    fn historical_close_uses_last_trading_day() {
        let closes = parse_eod(BODY, "HUBC").unwrap();
        let thu = NaiveDate::from_ymd_opt(2024, 1, 4).unwrap();
        assert_eq!(close_on_or_before(&closes, thu), Some(105.25));
        let before = NaiveDate::from_ymd_opt(2023, 12, 29).unwrap();
        assert_eq!(close_on_or_before(&closes, before), None);
    }

    #[test]
    fn failed_status_carries_message() {
        let err = parse_eod(r#"{"status":0,"message":"Invalid symbol"}"#, "XXXX").unwrap_err();
        match err {
            CoreError::Api { provider, message } => {
                assert_eq!(provider, "PSX");
                assert!(message.contains("Invalid symbol"));
            }
            other => panic!("expected Api error, got {other:?}"),
        }
    }

    #[test]
    fn garbage_body_is_api_error() {
        assert!(matches!(
            parse_eod("<html>down</html>", "HUBC"),
            Err(CoreError::Api { .. })
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════
// GoldAPI
// ═══════════════════════════════════════════════════════════════════

mod goldapi {
    use super::*;

    #[test]
    fn reads_24k_gram_price() {
        let body = r#"{"metal":"XAU","currency":"USD","price":2650.4,"price_gram_24k":85.2134,"price_gram_22k":78.11}"#;
        assert_eq!(parse_gram_price(body, "XAU").unwrap(), 85.2134);
    }

    #[test]
    fn error_field_wins() {
        let body = r#"{"error":"Invalid API Key"}"#;
        let err = parse_gram_price(body, "XAU").unwrap_err();
        assert!(err.to_string().contains("Invalid API Key"));
    }

    #[test]
    fn missing_price_is_error() {
        assert!(parse_gram_price(r#"{"metal":"XAG"}"#, "XAG").is_err());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Exchange rates
// ═══════════════════════════════════════════════════════════════════

mod fx {
    use super::*;

    #[test]
    fn pair_rate_on_success() {
        let body = r#"{"result":"success","base_code":"USD","target_code":"PKR","conversion_rate":278.9}"#;
        assert_eq!(parse_pair_rate(body, "USD", "PKR").unwrap(), 278.9);
    }

    #[test]
    fn pair_error_type_is_reported() {
        let body = r#"{"result":"error","error-type":"invalid-key"}"#;
        let err = parse_pair_rate(body, "USD", "PKR").unwrap_err();
        assert!(err.to_string().contains("invalid-key"));
    }

    #[test]
    fn frankfurter_rate_lookup() {
        let body = r#"{"amount":1.0,"base":"USD","date":"2024-01-05","rates":{"EUR":0.91,"GBP":0.78}}"#;
        assert_eq!(parse_latest_rate(body, "USD", "EUR").unwrap(), 0.91);
        assert!(parse_latest_rate(body, "USD", "PKR").is_err());
    }

    #[test]
    fn frankfurter_dated_and_latest_urls() {
        let latest = rate_url("USD", "EUR", None);
        assert!(latest.ends_with("/latest?base=USD&symbols=EUR"));
        let dated = rate_url("USD", "EUR", NaiveDate::from_ymd_opt(2024, 1, 5));
        assert!(dated.ends_with("/2024-01-05?base=USD&symbols=EUR"));
    }

    #[test]
    fn frankfurter_dated_body_parses_like_latest() {
        // weekend requests come back stamped with the previous business day
        let body = r#"{"amount":1.0,"base":"USD","date":"2024-01-05","rates":{"EUR":0.9134}}"#;
        assert_eq!(parse_latest_rate(body, "USD", "EUR").unwrap(), 0.9134);
    }

    #[tokio::test]
    async fn frankfurter_same_currency_needs_no_request() {
        let provider = FrankfurterProvider::new();
        assert_eq!(provider.get_current_price("PKR", "PKR").await.unwrap(), 1.0);
        let date = NaiveDate::from_ymd_opt(2024, 1, 6).unwrap();
        assert_eq!(provider.get_historical_price("pkr", "PKR", date).await.unwrap(), 1.0);
    }
}

mod yahoo {
    use super::*;

    #[test]
    fn psx_suffix_added_once() {
        assert_eq!(yahoo_symbol("hubc"), "HUBC.KA");
        assert_eq!(yahoo_symbol("HUBC.KA"), "HUBC.KA");
    }
}
