// ═══════════════════════════════════════════════════════════════════
// Storage Tests: schema, migrations, repositories, locking
// ═══════════════════════════════════════════════════════════════════

use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::Connection;
use tempfile::TempDir;

use wealthwise_core::config::AppConfig;
use wealthwise_core::errors::CoreError;
use wealthwise_core::models::dividend::DividendInput;
use wealthwise_core::models::metal::{Metal, MetalPrices, MetalTrade};
use wealthwise_core::models::price::ExchangeRate;
use wealthwise_core::models::sell::SaleQuote;
use wealthwise_core::models::trade::TradeInput;
use wealthwise_core::storage::migrations::table_columns;
use wealthwise_core::storage::{
    Database, DividendRepository, MetalRepository, PriceRepository, SellRepository,
    TradeRepository,
};

fn fast_config(dir: &TempDir) -> AppConfig {
    let _ = env_logger::builder().is_test(true).try_init();
    AppConfig {
        db_timeout: Duration::from_millis(50),
        lock_retries: 2,
        lock_retry_delay: Duration::from_millis(10),
        ..AppConfig::default()
    }
    .with_data_dir(dir.path())
}

fn open_db() -> (TempDir, Database) {
    let dir = TempDir::new().unwrap();
    let config = fast_config(&dir);
    let db = Database::open(dir.path().join("test_portfolio.db"), &config).unwrap();
    (dir, db)
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

// ═══════════════════════════════════════════════════════════════════
// Opening and migrations
// ═══════════════════════════════════════════════════════════════════

mod schema {
    use super::*;

    #[test]
    fn open_creates_every_table() {
        let (_dir, db) = open_db();
        let tables: Vec<String> = db
            .with_connection(|conn| {
                let mut stmt =
                    conn.prepare("SELECT name FROM sqlite_master WHERE type = 'table'")?;
                let names = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(names)
            })
            .unwrap();
        for table in [
            "trades",
            "memos",
            "warrants",
            "dividends",
            "sell_trades",
            "stock_prices",
            "api_calls",
            "metal_trades",
            "metal_prices",
            "exchange_rates",
        ] {
            assert!(tables.iter().any(|t| t == table), "missing table {table}");
        }
    }

    #[test]
    fn open_creates_missing_parent_directory() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("users").join("a_portfolio.db");
        let db = Database::open(&path, &fast_config(&dir)).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), path.as_path());
    }

    #[test]
    fn open_for_user_uses_lowercase_file_name() {
        let dir = TempDir::new().unwrap();
        let db = Database::open_for_user("Alice", &fast_config(&dir)).unwrap();
        assert_eq!(db.path(), dir.path().join("alice_portfolio.db").as_path());
    }

    #[test]
    fn reopening_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("p.db");
        let config = fast_config(&dir);
        Database::open(&path, &config).unwrap();
        let db = Database::open(&path, &config).unwrap();
        let cols = db
            .with_connection(|conn| table_columns(conn, "stock_prices"))
            .unwrap();
        assert_eq!(cols.iter().filter(|c| *c == "buffer_price").count(), 1);
    }

    #[test]
    fn late_columns_are_added_to_old_databases() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE stock_prices (stock TEXT PRIMARY KEY, previous_close REAL, last_updated TEXT);
                 INSERT INTO stock_prices VALUES ('HUBC', 101.0, '2024-01-02');
                 CREATE TABLE metal_prices (metal TEXT PRIMARY KEY, price_gram_24k REAL, last_updated TEXT);",
            )
            .unwrap();
        }

        let db = Database::open(&path, &fast_config(&dir)).unwrap();
        let stock_cols = db
            .with_connection(|conn| table_columns(conn, "stock_prices"))
            .unwrap();
        assert!(stock_cols.contains(&"last_attempt_time".to_string()));
        assert!(stock_cols.contains(&"buffer_price".to_string()));
        let metal_cols = db
            .with_connection(|conn| table_columns(conn, "metal_prices"))
            .unwrap();
        assert!(metal_cols.contains(&"price_usd_gram_24k".to_string()));

        let record = db
            .with_connection(|conn| PriceRepository::get_stock_price(conn, "HUBC"))
            .unwrap()
            .unwrap();
        assert_eq!(record.previous_close, Some(101.0));
        assert_eq!(record.buffer_price, None);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Transactions
// ═══════════════════════════════════════════════════════════════════

mod transactions {
    use super::*;

    #[test]
    fn error_rolls_back_every_statement() {
        let (_dir, db) = open_db();
        let trade = TradeInput::new(d(2024, 1, 5), "HUBC", 10, 100.0);
        let result: Result<(), CoreError> = db.transaction(|tx| {
            TradeRepository::insert(tx, "M1", &trade)?;
            TradeRepository::record_memo(tx, "M1")?;
            Err(CoreError::ValidationError("boom".into()))
        });
        assert!(result.is_err());
        let trades = db.with_connection(TradeRepository::list).unwrap();
        assert!(trades.is_empty());
        assert!(!db
            .with_connection(|conn| TradeRepository::memo_exists(conn, "M1"))
            .unwrap());
    }

    #[test]
    fn locked_database_gives_up_after_retries() {
        let (_dir, db) = open_db();
        let holder = Connection::open(db.path()).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();

        let mut calls = 0;
        let result = db.transaction(|tx| {
            calls += 1;
            PriceRepository::increment_api_calls(tx, "2024-01-05")
        });
        match result {
            Err(CoreError::DatabaseLocked { attempts }) => assert_eq!(attempts, 2),
            other => panic!("expected DatabaseLocked, got {other:?}"),
        }
        // BEGIN IMMEDIATE fails before the closure ever runs
        assert_eq!(calls, 0);

        holder.execute_batch("ROLLBACK").unwrap();
        db.transaction(|tx| PriceRepository::increment_api_calls(tx, "2024-01-05"))
            .unwrap();
    }

    #[test]
    fn retry_succeeds_once_lock_is_released() {
        let dir = TempDir::new().unwrap();
        let config = AppConfig {
            db_timeout: Duration::from_millis(20),
            lock_retries: 20,
            lock_retry_delay: Duration::from_millis(50),
            ..fast_config(&dir)
        };
        let db = Database::open(dir.path().join("test_portfolio.db"), &config).unwrap();

        let holder = Connection::open(db.path()).unwrap();
        holder.execute_batch("BEGIN EXCLUSIVE").unwrap();
        let release = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(150));
            holder.execute_batch("ROLLBACK").unwrap();
        });

        let started = std::time::Instant::now();
        let mut calls = 0;
        db.transaction(|tx| {
            calls += 1;
            PriceRepository::increment_api_calls(tx, "2024-01-05")
        })
        .unwrap();
        release.join().unwrap();

        assert!(started.elapsed() >= Duration::from_millis(100));
        assert_eq!(calls, 1);
        let used = db
            .with_connection(|conn| PriceRepository::api_calls_on(conn, "2024-01-05"))
            .unwrap();
        assert_eq!(used, 1);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Trades and memos
// ═══════════════════════════════════════════════════════════════════

mod trades {
    use super::*;

    #[test]
    fn insert_cleans_name_and_stores_total() {
        let (_dir, db) = open_db();
        let trade =
            TradeInput::new(d(2024, 2, 1), "HUBC Ready", 100, 120.0).with_charges(50.0, 10.0, 8.0);
        let id = db
            .transaction(|tx| TradeRepository::insert(tx, "M-77", &trade))
            .unwrap();
        assert!(id > 0);

        let stored = db.with_connection(TradeRepository::list).unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, id);
        assert_eq!(stored[0].stock, "HUBC");
        assert_eq!(stored[0].date, "2024-02-01");
        assert_eq!(stored[0].trade_type, "Buy");
        assert!((stored[0].total_amount - 12_068.0).abs() < 1e-9);
    }

    #[test]
    fn list_is_newest_first() {
        let (_dir, db) = open_db();
        db.transaction(|tx| {
            TradeRepository::insert(tx, "A", &TradeInput::new(d(2024, 1, 1), "OGDC", 1, 1.0))?;
            TradeRepository::insert(tx, "B", &TradeInput::new(d(2024, 3, 1), "PPL", 1, 1.0))?;
            TradeRepository::insert(tx, "C", &TradeInput::new(d(2024, 2, 1), "MARI", 1, 1.0))
        })
        .unwrap();
        let stocks: Vec<String> = db
            .with_connection(TradeRepository::list)
            .unwrap()
            .into_iter()
            .map(|t| t.stock)
            .collect();
        assert_eq!(stocks, vec!["PPL", "MARI", "OGDC"]);
    }

    #[test]
    fn buy_totals_group_by_stock() {
        let (_dir, db) = open_db();
        db.transaction(|tx| {
            TradeRepository::insert(
                tx,
                "A",
                &TradeInput::new(d(2024, 1, 1), "HUBC", 100, 100.0).with_charges(100.0, 0.0, 0.0),
            )?;
            TradeRepository::insert(tx, "B", &TradeInput::new(d(2024, 1, 2), "HUBC", 100, 120.0))?;
            TradeRepository::insert(tx, "B", &TradeInput::new(d(2024, 1, 2), "ENGRO", 10, 300.0))
        })
        .unwrap();

        let totals = db.with_connection(TradeRepository::buy_totals).unwrap();
        assert_eq!(totals.len(), 2);
        assert_eq!(totals[0].stock, "ENGRO");
        let hubc = &totals[1];
        assert_eq!(hubc.quantity, 200);
        assert!((hubc.avg_price() - 110.0).abs() < 1e-9);
        assert!((hubc.avg_cost() - 110.5).abs() < 1e-9);
    }

    #[test]
    fn delete_and_memo_bookkeeping() {
        let (_dir, db) = open_db();
        db.transaction(|tx| {
            TradeRepository::record_memo(tx, "M1")?;
            TradeRepository::insert(tx, "M1", &TradeInput::new(d(2024, 1, 1), "HUBC", 1, 1.0))?;
            TradeRepository::insert(tx, "M1", &TradeInput::new(d(2024, 1, 1), "PSO", 1, 1.0))
        })
        .unwrap();

        let removed = db
            .transaction(|tx| TradeRepository::delete(tx, "M1", "HUBC"))
            .unwrap();
        assert_eq!(removed, 1);
        let left = db
            .with_connection(|conn| TradeRepository::count_for_memo(conn, "M1"))
            .unwrap();
        assert_eq!(left, 1);

        db.transaction(|tx| TradeRepository::delete_memo(tx, "M1")).unwrap();
        assert!(!db
            .with_connection(|conn| TradeRepository::memo_exists(conn, "M1"))
            .unwrap());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Sales
// ═══════════════════════════════════════════════════════════════════

mod sells {
    use super::*;

    #[test]
    fn insert_and_totals() {
        let (_dir, db) = open_db();
        let quote = SaleQuote::new(40, 150.0, 10.0, 100.0);
        let sale = db
            .transaction(|tx| SellRepository::insert(tx, "2024-05-01", "HUBC", "S1", &quote))
            .unwrap();
        assert!(sale.sell_id > 0);
        assert!((sale.net_amount - 5_400.0).abs() < 1e-9);

        db.transaction(|tx| {
            SellRepository::insert(tx, "2024-05-02", "HUBC", "S2", &SaleQuote::new(10, 160.0, 0.0, 100.0))
        })
        .unwrap();

        let totals = db.with_connection(SellRepository::sold_totals).unwrap();
        let hubc = &totals["HUBC"];
        assert_eq!(hubc.quantity, 50);
        assert!((hubc.sale_amount - 7_600.0).abs() < 1e-9);
        assert!((hubc.cgt_amount - 600.0).abs() < 1e-9);

        let newest = db.with_connection(SellRepository::list).unwrap();
        assert_eq!(newest[0].memo_number, "S2");
        let oldest = db.with_connection(SellRepository::list_chronological).unwrap();
        assert_eq!(oldest[0].memo_number, "S1");
    }

    #[test]
    fn duplicate_memo_is_rejected() {
        let (_dir, db) = open_db();
        let quote = SaleQuote::new(1, 10.0, 0.0, 5.0);
        db.transaction(|tx| SellRepository::insert(tx, "2024-05-01", "HUBC", "S1", &quote))
            .unwrap();
        assert!(db
            .with_connection(|conn| SellRepository::memo_exists(conn, "S1"))
            .unwrap());
        let dup = db.transaction(|tx| SellRepository::insert(tx, "2024-05-01", "HUBC", "S1", &quote));
        assert!(matches!(dup, Err(CoreError::Database(_))));
    }
}

// ═══════════════════════════════════════════════════════════════════
// Dividends
// ═══════════════════════════════════════════════════════════════════

mod dividends {
    use super::*;

    fn warrant(no: &str, stock: &str, date: NaiveDate, rate: f64) -> DividendInput {
        DividendInput {
            warrant_no: no.into(),
            payment_date: date,
            stock_name: stock.into(),
            rate_per_security: rate,
            number_of_securities: 100,
            tax_pct: 15.0,
        }
    }

    #[test]
    fn delete_removes_warrant_and_dividend() {
        let (_dir, db) = open_db();
        db.transaction(|tx| DividendRepository::insert(tx, &warrant("W1", "HUBC", d(2024, 3, 1), 5.0)))
            .unwrap();
        assert!(db
            .with_connection(|conn| DividendRepository::warrant_exists(conn, "W1"))
            .unwrap());

        let removed = db
            .transaction(|tx| DividendRepository::delete(tx, "W1"))
            .unwrap();
        assert_eq!(removed, 1);
        assert!(db.with_connection(DividendRepository::list).unwrap().is_empty());
        assert!(!db
            .with_connection(|conn| DividendRepository::warrant_exists(conn, "W1"))
            .unwrap());
    }

    #[test]
    fn summaries_and_timeline() {
        let (_dir, db) = open_db();
        db.transaction(|tx| {
            DividendRepository::insert(tx, &warrant("W1", "HUBC", d(2024, 3, 1), 5.0))?;
            DividendRepository::insert(tx, &warrant("W2", "HUBC", d(2024, 6, 1), 5.0))?;
            DividendRepository::insert(tx, &warrant("W3", "OGDC", d(2024, 3, 1), 2.0))
        })
        .unwrap();

        let summaries = db.with_connection(DividendRepository::summaries).unwrap();
        assert_eq!(summaries[0].stock, "HUBC");
        assert_eq!(summaries[0].num_payments, 2);
        assert!((summaries[0].net_amount - 850.0).abs() < 1e-9);

        let timeline = db.with_connection(DividendRepository::timeline).unwrap();
        assert_eq!(timeline.len(), 2);
        assert_eq!(timeline[0].date, "2024-03-01");
        assert!((timeline[0].net_dividend - 595.0).abs() < 1e-9);
    }
}

// ═══════════════════════════════════════════════════════════════════
// Price caches
// ═══════════════════════════════════════════════════════════════════

mod prices {
    use super::*;

    #[test]
    fn first_save_seeds_buffer_with_same_close() {
        let (_dir, db) = open_db();
        db.transaction(|tx| PriceRepository::save_stock_price(tx, "HUBC", 100.0, "2024-01-02"))
            .unwrap();
        let r = db
            .with_connection(|conn| PriceRepository::get_stock_price(conn, "HUBC"))
            .unwrap()
            .unwrap();
        assert_eq!(r.previous_close, Some(100.0));
        assert_eq!(r.buffer_price, Some(100.0));
        assert_eq!(r.last_updated.as_deref(), Some("2024-01-02"));
    }

    #[test]
    fn later_save_moves_old_close_to_buffer() {
        let (_dir, db) = open_db();
        db.transaction(|tx| {
            PriceRepository::save_stock_price(tx, "HUBC", 100.0, "2024-01-02")?;
            PriceRepository::save_stock_price(tx, "HUBC", 104.5, "2024-01-03")
        })
        .unwrap();
        let r = db
            .with_connection(|conn| PriceRepository::get_stock_price(conn, "HUBC"))
            .unwrap()
            .unwrap();
        assert_eq!(r.previous_close, Some(104.5));
        assert_eq!(r.buffer_price, Some(100.0));
        assert_eq!(r.last_updated.as_deref(), Some("2024-01-03"));
    }

    #[test]
    fn attempt_only_row_has_no_prices() {
        let (_dir, db) = open_db();
        db.transaction(|tx| PriceRepository::record_attempt(tx, "PSO", "2024-01-02 09:00:00"))
            .unwrap();
        let r = db
            .with_connection(|conn| PriceRepository::get_stock_price(conn, "PSO"))
            .unwrap()
            .unwrap();
        assert_eq!(r.previous_close, None);
        assert_eq!(r.buffer_price, None);
        assert_eq!(r.last_attempt_time.as_deref(), Some("2024-01-02 09:00:00"));

        db.transaction(|tx| PriceRepository::save_stock_price(tx, "PSO", 300.0, "2024-01-02"))
            .unwrap();
        let r = db
            .with_connection(|conn| PriceRepository::get_stock_price(conn, "PSO"))
            .unwrap()
            .unwrap();
        assert_eq!(r.buffer_price, Some(300.0));
        assert_eq!(r.last_attempt_time.as_deref(), Some("2024-01-02 09:00:00"));
    }

    #[test]
    fn unknown_stock_has_no_record() {
        let (_dir, db) = open_db();
        let r = db
            .with_connection(|conn| PriceRepository::get_stock_price(conn, "NOPE"))
            .unwrap();
        assert!(r.is_none());
    }

    #[test]
    fn api_calls_are_counted_per_day() {
        let (_dir, db) = open_db();
        db.transaction(|tx| {
            PriceRepository::increment_api_calls(tx, "2024-01-02")?;
            PriceRepository::increment_api_calls(tx, "2024-01-02")?;
            PriceRepository::increment_api_calls(tx, "2024-01-03")
        })
        .unwrap();
        let (a, b, c) = db
            .with_connection(|conn| {
                Ok((
                    PriceRepository::api_calls_on(conn, "2024-01-02")?,
                    PriceRepository::api_calls_on(conn, "2024-01-03")?,
                    PriceRepository::api_calls_on(conn, "2024-01-04")?,
                ))
            })
            .unwrap();
        assert_eq!((a, b, c), (2, 1, 0));
    }

    #[test]
    fn exchange_rate_is_replaced() {
        let (_dir, db) = open_db();
        let mut rate = ExchangeRate {
            base_currency: "USD".into(),
            target_currency: "PKR".into(),
            rate: 278.0,
            last_updated: "2024-01-02 10:00:00".into(),
        };
        db.transaction(|tx| PriceRepository::save_exchange_rate(tx, &rate))
            .unwrap();
        rate.rate = 281.25;
        rate.last_updated = "2024-01-03 10:00:00".into();
        db.transaction(|tx| PriceRepository::save_exchange_rate(tx, &rate))
            .unwrap();

        let stored = db
            .with_connection(|conn| PriceRepository::get_exchange_rate(conn, "USD", "PKR"))
            .unwrap();
        assert_eq!(stored, Some(rate));
        let missing = db
            .with_connection(|conn| PriceRepository::get_exchange_rate(conn, "PKR", "USD"))
            .unwrap();
        assert!(missing.is_none());
    }
}

// ═══════════════════════════════════════════════════════════════════
// Metals
// ═══════════════════════════════════════════════════════════════════

mod metals {
    use super::*;

    #[test]
    fn prices_upsert_and_read_back() {
        let (_dir, db) = open_db();
        let gold = MetalPrices::from_24k(Metal::Gold, 24_000.0, 86.0, "2024-01-02 10:00:00".into());
        let silver = MetalPrices::from_24k(Metal::Silver, 240.0, 0.86, "2024-01-02 10:00:00".into());
        db.transaction(|tx| {
            MetalRepository::upsert_prices(tx, &gold)?;
            MetalRepository::upsert_prices(tx, &silver)
        })
        .unwrap();

        let all = db.with_connection(MetalRepository::list_prices).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].metal, "XAG");
        assert_eq!(all[1], gold);

        let updated = MetalPrices::from_24k(Metal::Gold, 25_000.0, 88.0, "2024-01-03 10:00:00".into());
        db.transaction(|tx| MetalRepository::upsert_prices(tx, &updated))
            .unwrap();
        let stored = db
            .with_connection(|conn| MetalRepository::prices_for(conn, "XAU"))
            .unwrap();
        assert_eq!(stored, Some(updated));
        assert!(db
            .with_connection(|conn| MetalRepository::prices_for(conn, "XPT"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn invalid_karat_violates_check() {
        let (_dir, db) = open_db();
        let trade = MetalTrade {
            id: 0,
            date: "2024-01-02".into(),
            metal: "Gold".into(),
            weight: 10.0,
            karat: Some(23),
            purchase_price: 20_000.0,
            total_cost: 200_000.0,
        };
        let result = db.transaction(|tx| MetalRepository::insert_trade(tx, &trade));
        assert!(matches!(result, Err(CoreError::Database(_))));

        let ok = MetalTrade { karat: Some(22), ..trade };
        let id = db
            .transaction(|tx| MetalRepository::insert_trade(tx, &ok))
            .unwrap();
        let listed = db.with_connection(MetalRepository::list_trades).unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
        assert_eq!(listed[0].karat, Some(22));
    }
}
