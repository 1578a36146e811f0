//! Sink module for delivering records downstream
//!
//! This module handles:
//! - The `Sink` trait every destination implements
//! - A SQLite sink with one table per subcategory and a session ledger
//! - `SinkWriter`, which retries writes and serializes them per table

mod schema;
mod sqlite;
mod traits;
mod writer;

pub use schema::{product_insert_sql, product_table_sql, PRODUCT_COLUMNS};
pub use sqlite::SqliteSink;
pub use traits::{Sink, SinkError, SinkResult};
pub use writer::SinkWriter;

use std::path::Path;

/// Opens (or creates) the SQLite sink at `path`
pub fn open_sink(path: &Path) -> SinkResult<SqliteSink> {
    SqliteSink::new(path)
}
