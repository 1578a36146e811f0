//! Database schema definitions
//!
//! Session rows live in a fixed table; product rows go to one table per
//! subcategory, created on first write.

use crate::config::validate_table_name;
use crate::sink::traits::SinkError;

/// SQL schema for the session ledger
pub const SCHEMA_SQL: &str = r#"
-- One row per completed run
CREATE TABLE IF NOT EXISTS scrape_sessions (
    session_id TEXT PRIMARY KEY,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    duration_seconds REAL NOT NULL,
    config_hash TEXT,
    total_products INTEGER NOT NULL,
    total_locations INTEGER NOT NULL,
    success INTEGER NOT NULL,
    errors TEXT NOT NULL
);
"#;

/// Column list of every product table, in insert order
pub const PRODUCT_COLUMNS: &[&str] = &[
    "session_id",
    "region",
    "location",
    "subcategory",
    "product_name",
    "brand",
    "strain_type",
    "thc_percent",
    "size_raw",
    "grams",
    "price",
    "price_per_gram",
    "product_url",
    "scraped_at",
];

/// Initializes the session ledger
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}

/// DDL for a subcategory's product table
pub fn product_table_sql(table: &str) -> Result<String, SinkError> {
    validate_table_name(table).map_err(|_| SinkError::InvalidTable(table.to_string()))?;

    Ok(format!(
        r#"
CREATE TABLE IF NOT EXISTS "{table}" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    region TEXT NOT NULL,
    location TEXT NOT NULL,
    subcategory TEXT NOT NULL,
    product_name TEXT NOT NULL,
    brand TEXT,
    strain_type TEXT,
    thc_percent REAL,
    size_raw TEXT,
    grams REAL,
    price REAL,
    price_per_gram REAL,
    product_url TEXT,
    scraped_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS "idx_{table}_session" ON "{table}"(session_id);
"#
    ))
}

/// Parameterized insert statement for a product table
pub fn product_insert_sql(table: &str) -> Result<String, SinkError> {
    validate_table_name(table).map_err(|_| SinkError::InvalidTable(table.to_string()))?;

    let placeholders = (1..=PRODUCT_COLUMNS.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");

    Ok(format!(
        r#"INSERT INTO "{table}" ({}) VALUES ({placeholders})"#,
        PRODUCT_COLUMNS.join(", ")
    ))
}
