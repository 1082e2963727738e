use rusqlite::Connection;

use crate::errors::CoreError;

/// Create every table and patch up databases written by older versions.
pub fn apply_migrations(conn: &Connection) -> Result<(), CoreError> {
    conn.execute_batch(FULL_SCHEMA)?;
    add_missing_columns(conn)?;
    log::debug!("Database schema is up to date");
    Ok(())
}

/// Columns that were added after the first release.
const LATE_COLUMNS: &[(&str, &str, &str)] = &[
    ("stock_prices", "last_attempt_time", "TEXT"),
    ("stock_prices", "buffer_price", "REAL"),
    ("metal_prices", "price_usd_gram_24k", "REAL"),
];

fn add_missing_columns(conn: &Connection) -> Result<(), CoreError> {
    for (table, column, sql_type) in LATE_COLUMNS {
        let columns = table_columns(conn, table)?;
        if !columns.iter().any(|c| c == column) {
            conn.execute(
                &format!("ALTER TABLE {table} ADD COLUMN {column} {sql_type}"),
                [],
            )?;
            log::info!("[MIGRATION] Added {column} column to {table}");
        }
    }
    Ok(())
}

pub fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, CoreError> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}

const FULL_SCHEMA: &str = r#"
PRAGMA journal_mode=WAL;

-- Buy trades, grouped by broker memo
CREATE TABLE IF NOT EXISTS trades (
    date          TEXT,
    memo_number   TEXT,
    stock         TEXT,
    quantity      INTEGER,
    rate          REAL,
    comm_amount   REAL,
    cdc_charges   REAL,
    sales_tax     REAL,
    total_amount  REAL,
    type          TEXT
);

CREATE TABLE IF NOT EXISTS memos (
    memo_number  TEXT,
    created_at   TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS warrants (
    warrant_no  TEXT PRIMARY KEY,
    created_at  TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

CREATE TABLE IF NOT EXISTS dividends (
    id                    INTEGER PRIMARY KEY AUTOINCREMENT,
    warrant_no            TEXT,
    payment_date          TEXT,
    stock_name            TEXT,
    rate_per_security     REAL,
    number_of_securities  INTEGER,
    amount_of_dividend    REAL,
    tax_deducted          REAL,
    amount_paid           REAL,
    FOREIGN KEY (warrant_no) REFERENCES warrants(warrant_no) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS sell_trades (
    sell_id         INTEGER PRIMARY KEY AUTOINCREMENT,
    sell_date       TEXT NOT NULL,
    stock           TEXT NOT NULL,
    quantity        INTEGER NOT NULL CHECK (quantity > 0),
    rate            REAL NOT NULL CHECK (rate > 0),
    sale_amount     REAL NOT NULL,
    cgt_percentage  REAL DEFAULT 0,
    cgt_amount      REAL DEFAULT 0,
    net_amount      REAL NOT NULL,
    memo_number     TEXT UNIQUE,
    created_at      TIMESTAMP DEFAULT CURRENT_TIMESTAMP
);

-- Single-row-per-stock price cache with one level of buffer
CREATE TABLE IF NOT EXISTS stock_prices (
    stock              TEXT PRIMARY KEY,
    previous_close     REAL,
    last_updated       TEXT,
    last_attempt_time  TEXT,
    buffer_price       REAL
);

-- Outbound price requests per day
CREATE TABLE IF NOT EXISTS api_calls (
    date   TEXT PRIMARY KEY,
    calls  INTEGER DEFAULT 0
);

CREATE TABLE IF NOT EXISTS metal_trades (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    date            TEXT,
    metal           TEXT NOT NULL,
    weight          REAL NOT NULL CHECK (weight > 0),
    karat           INTEGER DEFAULT NULL CHECK (karat IS NULL OR karat IN (10, 14, 16, 18, 20, 21, 22, 24)),
    purchase_price  REAL NOT NULL CHECK (purchase_price > 0),
    total_cost      REAL NOT NULL CHECK (total_cost > 0)
);

-- PKR per gram by karat, plus the USD 24K reference price
CREATE TABLE IF NOT EXISTS metal_prices (
    metal               TEXT PRIMARY KEY,
    price_gram_24k      REAL,
    price_gram_22k      REAL,
    price_gram_21k      REAL,
    price_gram_20k      REAL,
    price_gram_18k      REAL,
    price_gram_16k      REAL,
    price_gram_14k      REAL,
    price_gram_10k      REAL,
    price_usd_gram_24k  REAL,
    last_updated        TEXT
);

CREATE TABLE IF NOT EXISTS exchange_rates (
    base_currency    TEXT,
    target_currency  TEXT,
    rate             REAL,
    last_updated     TEXT,
    PRIMARY KEY (base_currency, target_currency)
);

CREATE INDEX IF NOT EXISTS idx_trades_stock ON trades(stock);
CREATE INDEX IF NOT EXISTS idx_trades_memo ON trades(memo_number);
CREATE INDEX IF NOT EXISTS idx_sell_trades_stock ON sell_trades(stock);
"#;
