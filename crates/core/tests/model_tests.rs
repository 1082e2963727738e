// ═══════════════════════════════════════════════════════════════════
// Model Tests: trades, sales, dividends, metals, prices, dates
// ═══════════════════════════════════════════════════════════════════

use chrono::NaiveDate;

use wealthwise_core::dates::{normalize_date, parse_date, round2};
use wealthwise_core::errors::CoreError;
use wealthwise_core::models::asset::AssetType;
use wealthwise_core::models::dividend::DividendInput;
use wealthwise_core::models::metal::{Karat, Metal, MetalPrices, PriceCurrency, KARATS};
use wealthwise_core::models::price::{ExchangeRate, PriceSource, RefreshReport, StockPriceRecord};
use wealthwise_core::models::sell::SaleQuote;
use wealthwise_core::models::trade::{clean_stock_name, memo_or_unknown, TradeInput, UNKNOWN_MEMO};

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-6
}

// ═══════════════════════════════════════════════════════════════════
// AssetType
// ═══════════════════════════════════════════════════════════════════

mod asset_type {
    use super::*;

    #[test]
    fn serde_roundtrip() {
        for t in [AssetType::Stock, AssetType::Metal, AssetType::Fiat] {
            let json = serde_json::to_string(&t).unwrap();
            let back: AssetType = serde_json::from_str(&json).unwrap();
            assert_eq!(t, back);
        }
    }

    #[test]
    fn display_is_not_empty() {
        assert!(!AssetType::Stock.to_string().is_empty());
        assert_ne!(AssetType::Metal.to_string(), AssetType::Fiat.to_string());
    }
}

// ═══════════════════════════════════════════════════════════════════
// TradeInput
// ═══════════════════════════════════════════════════════════════════

mod trade_input {
    use super::*;

    #[test]
    fn totals_include_all_charges() {
        let t = TradeInput::new(d(2024, 5, 2), "HUBC", 500, 120.5).with_charges(150.0, 25.0, 24.0);
        assert!(close(t.stock_value(), 60_250.0));
        assert!(close(t.total_charges(), 199.0));
        assert!(close(t.total_amount(), 60_449.0));
    }

    #[test]
    fn charges_default_to_zero() {
        let t = TradeInput::new(d(2024, 5, 2), "OGDC", 10, 100.0);
        assert!(close(t.total_charges(), 0.0));
        assert!(close(t.total_amount(), 1000.0));
    }

    #[test]
    fn valid_trade_passes() {
        let t = TradeInput::new(d(2024, 5, 2), "HUBC Ready", 1, 0.01);
        assert!(t.validate().is_ok());
    }

    #[test]
    fn zero_quantity_rejected() {
        let t = TradeInput::new(d(2024, 5, 2), "HUBC", 0, 100.0);
        assert!(matches!(t.validate(), Err(CoreError::ValidationError(_))));
    }

    #[test]
    fn non_positive_rate_rejected() {
        let t = TradeInput::new(d(2024, 5, 2), "HUBC", 10, 0.0);
        assert!(matches!(t.validate(), Err(CoreError::ValidationError(_))));
        let t = TradeInput::new(d(2024, 5, 2), "HUBC", 10, f64::NAN);
        assert!(t.validate().is_err());
    }

    #[test]
    fn blank_stock_rejected() {
        let t = TradeInput::new(d(2024, 5, 2), "  Ready", 10, 10.0);
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("Stock name"));
    }

    #[test]
    fn negative_charge_rejected() {
        let t = TradeInput::new(d(2024, 5, 2), "HUBC", 10, 10.0).with_charges(1.0, -0.5, 0.0);
        let err = t.validate().unwrap_err();
        assert!(err.to_string().contains("CDC charges"));
    }
}

mod stock_names {
    use super::*;

    #[test]
    fn ready_suffix_is_dropped() {
        assert_eq!(clean_stock_name("HUBC Ready"), "HUBC");
        assert_eq!(clean_stock_name("  MEBL ReadyT+2 "), "MEBL");
        assert_eq!(clean_stock_name("ENGRO"), "ENGRO");
    }

    #[test]
    fn blank_memo_becomes_unknown() {
        assert_eq!(memo_or_unknown(""), UNKNOWN_MEMO);
        assert_eq!(memo_or_unknown("   "), UNKNOWN_MEMO);
        assert_eq!(memo_or_unknown(" 10234 "), "10234");
    }
}

// ═══════════════════════════════════════════════════════════════════
// SaleQuote
// ═══════════════════════════════════════════════════════════════════

mod sale_quote {
    use super::*;

    #[test]
    fn amounts_and_profit() {
        let q = SaleQuote::new(100, 150.0, 15.0, 120.0);
        assert!(close(q.sale_amount, 15_000.0));
        assert!(close(q.cgt_amount, 2_250.0));
        assert!(close(q.net_amount, 12_750.0));
        assert!(close(q.profit_per_share, 30.0));
        assert!(close(q.total_profit, 3_000.0));
        assert!(close(q.profit_pct, 25.0));
        assert!(q.is_profit());
    }

    #[test]
    fn loss_is_negative() {
        let q = SaleQuote::new(10, 80.0, 0.0, 100.0);
        assert!(close(q.cgt_amount, 0.0));
        assert!(close(q.profit_pct, -20.0));
        assert!(!q.is_profit());
    }

    #[test]
    fn zero_average_gives_zero_percent() {
        let q = SaleQuote::new(10, 80.0, 10.0, 0.0);
        assert!(close(q.profit_pct, 0.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// DividendInput
// ═══════════════════════════════════════════════════════════════════

mod dividend_input {
    use super::*;

    fn input() -> DividendInput {
        DividendInput {
            warrant_no: "W-1001".into(),
            payment_date: d(2024, 9, 30),
            stock_name: "HUBC".into(),
            rate_per_security: 4.0,
            number_of_securities: 500,
            tax_pct: 15.0,
        }
    }

    #[test]
    fn derived_amounts() {
        let i = input();
        assert!(close(i.amount_of_dividend(), 2000.0));
        assert!(close(i.tax_deducted(), 300.0));
        assert!(close(i.amount_paid(), 1700.0));
    }

    #[test]
    fn valid_input_has_no_errors() {
        assert!(input().validation_errors().is_empty());
        assert!(input().validate().is_ok());
    }

    #[test]
    fn every_problem_is_reported() {
        let i = DividendInput {
            warrant_no: " ".into(),
            stock_name: String::new(),
            rate_per_security: 0.0,
            number_of_securities: 0,
            tax_pct: 101.0,
            ..input()
        };
        assert_eq!(i.validation_errors().len(), 5);
        match i.validate() {
            Err(CoreError::ValidationError(msg)) => {
                assert!(msg.contains("Warrant number is required"));
                assert!(msg.contains("; "));
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn tax_bounds_are_inclusive() {
        let zero = DividendInput { tax_pct: 0.0, ..input() };
        let full = DividendInput { tax_pct: 100.0, ..input() };
        assert!(zero.validate().is_ok());
        assert!(full.validate().is_ok());
        assert!(close(full.amount_paid(), 0.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Metals
// ═══════════════════════════════════════════════════════════════════

mod metal {
    use super::*;

    #[test]
    fn symbols_and_names() {
        assert_eq!(Metal::Gold.symbol(), "XAU");
        assert_eq!(Metal::Silver.symbol(), "XAG");
        assert_eq!(Metal::Platinum.symbol(), "XPT");
        assert_eq!(Metal::Palladium.symbol(), "XPD");
        assert_eq!(Metal::Gold.to_string(), "Gold");
    }

    #[test]
    fn parses_name_or_symbol() {
        assert_eq!("gold".parse::<Metal>().unwrap(), Metal::Gold);
        assert_eq!("XAG".parse::<Metal>().unwrap(), Metal::Silver);
        assert_eq!(" xpd ".parse::<Metal>().unwrap(), Metal::Palladium);
        assert!("copper".parse::<Metal>().is_err());
    }

    #[test]
    fn from_symbol_rejects_names() {
        assert_eq!(Metal::from_symbol("xpt"), Some(Metal::Platinum));
        assert_eq!(Metal::from_symbol("Gold"), None);
    }

    #[test]
    fn karats_are_restricted() {
        for k in KARATS {
            assert!(Karat::new(k).is_ok());
        }
        assert!(Karat::new(23).is_err());
        assert!(Karat::new(0).is_err());
    }

    #[test]
    fn purity_and_display() {
        let k = Karat::new(18).unwrap();
        assert!(close(k.purity(), 0.75));
        assert_eq!(k.to_string(), "18K");
        assert!(close(Karat::PURE.purity(), 1.0));
    }

    #[test]
    fn currency_parsing() {
        assert_eq!("pkr".parse::<PriceCurrency>().unwrap(), PriceCurrency::Pkr);
        assert_eq!("USD".parse::<PriceCurrency>().unwrap().code(), "USD");
        assert!("EUR".parse::<PriceCurrency>().is_err());
    }

    #[test]
    fn prices_derived_from_24k() {
        let p = MetalPrices::from_24k(Metal::Gold, 24_000.0, 86.0, "2024-10-01 10:00:00".into());
        assert_eq!(p.metal, "XAU");
        assert_eq!(p.price_gram.len(), KARATS.len());
        assert!(close(p.price_for(Karat::PURE).unwrap(), 24_000.0));
        assert!(close(p.price_for(Karat::new(22).unwrap()).unwrap(), 22_000.0));
        assert!(close(p.price_for(Karat::new(10).unwrap()).unwrap(), 10_000.0));
        assert_eq!(p.price_usd_gram_24k, Some(86.0));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Price records
// ═══════════════════════════════════════════════════════════════════

mod price_records {
    use super::*;

    #[test]
    fn fresh_only_when_updated_today_with_price() {
        let mut r = StockPriceRecord::empty("HUBC");
        assert!(!r.is_fresh("2024-10-01"));
        r.last_updated = Some("2024-10-01".into());
        assert!(!r.is_fresh("2024-10-01"));
        r.previous_close = Some(101.5);
        assert!(r.is_fresh("2024-10-01"));
        assert!(!r.is_fresh("2024-10-02"));
    }

    #[test]
    fn exchange_rate_updated_on_compares_day() {
        let rate = ExchangeRate {
            base_currency: "USD".into(),
            target_currency: "PKR".into(),
            rate: 280.1,
            last_updated: "2024-10-01 09:15:00".into(),
        };
        assert!(rate.updated_on("2024-10-01"));
        assert!(!rate.updated_on("2024-10-02"));
    }

    #[test]
    fn price_source_display() {
        assert_eq!(PriceSource::Cache.to_string(), "cache");
        assert_eq!(PriceSource::Buffer.to_string(), "buffer");
    }

    #[test]
    fn report_complete_without_failures() {
        let mut report = RefreshReport::default();
        report.refreshed.push("HUBC".into());
        assert!(report.is_complete());
        report.failed.push(("OGDC".into(), "timeout".into()));
        assert!(!report.is_complete());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Dates
// ═══════════════════════════════════════════════════════════════════

mod dates {
    use super::*;

    #[test]
    fn normalizes_common_formats() {
        assert_eq!(normalize_date("2025-03-12"), "2025-03-12");
        assert_eq!(normalize_date("March 12, 2025"), "2025-03-12");
        assert_eq!(normalize_date("12 March 2025"), "2025-03-12");
        assert_eq!(normalize_date("Mar 12, 2025"), "2025-03-12");
        assert_eq!(normalize_date("2025/03/12"), "2025-03-12");
        assert_eq!(normalize_date("20250312"), "2025-03-12");
        assert_eq!(normalize_date("2025-03-12T08:30:00"), "2025-03-12");
    }

    #[test]
    fn day_first_wins_when_ambiguous() {
        assert_eq!(normalize_date("03/04/2025"), "2025-04-03");
        // 13 cannot be a month, so the month-first pattern is used
        assert_eq!(normalize_date("04/13/2025"), "2025-04-13");
    }

    #[test]
    fn unparseable_is_returned_unchanged() {
        assert_eq!(normalize_date(""), "");
        assert_eq!(normalize_date("next tuesday"), "next tuesday");
        assert_eq!(parse_date("next tuesday"), None);
    }

    #[test]
    fn rounding_to_cents() {
        assert!(close(round2(1.005 * 1000.0), 1005.0));
        assert!(close(round2(278.456), 278.46));
        assert!(close(round2(-1.234), -1.23));
    }
}
