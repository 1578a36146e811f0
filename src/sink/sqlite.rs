//! SQLite sink implementation
//!
//! Writes run on the blocking pool; the connection is shared behind a mutex
//! so one sink can serve every category task.

use crate::model::{ProductRecord, ScrapingSession};
use crate::sink::schema::{initialize_schema, product_insert_sql, product_table_sql};
use crate::sink::traits::{Sink, SinkError, SinkResult};
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// SQLite-backed sink
#[derive(Clone)]
pub struct SqliteSink {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteSink {
    /// Opens or creates the database at `path`
    pub fn new(path: &Path) -> SinkResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> SinkResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Number of rows in `table` written by `session_id`
    pub fn count_rows(&self, table: &str, session_id: &str) -> SinkResult<usize> {
        // Reuse the DDL validation so the name is safe to interpolate
        product_table_sql(table)?;
        let conn = self.conn.lock().map_err(|_| SinkError::Poisoned)?;
        let count: i64 = conn.query_row(
            &format!(r#"SELECT COUNT(*) FROM "{table}" WHERE session_id = ?1"#),
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// Number of sessions recorded
    pub fn session_count(&self) -> SinkResult<usize> {
        let conn = self.conn.lock().map_err(|_| SinkError::Poisoned)?;
        let count: i64 =
            conn.query_row("SELECT COUNT(*) FROM scrape_sessions", [], |row| row.get(0))?;
        Ok(count as usize)
    }
}

fn insert_products(
    conn: &mut Connection,
    table: &str,
    session_id: &str,
    records: &[ProductRecord],
) -> SinkResult<usize> {
    conn.execute_batch(&product_table_sql(table)?)?;
    let insert = product_insert_sql(table)?;

    let tx = conn.transaction()?;
    {
        let mut stmt = tx.prepare(&insert)?;
        for record in records {
            stmt.execute(params![
                session_id,
                record.region,
                record.location,
                record.subcategory,
                record.product_name,
                record.brand,
                record.strain_type.as_column(),
                record.thc_percent,
                record.size_raw,
                record.grams,
                record.price,
                record.price_per_gram,
                record.product_url,
                record.scraped_at.to_rfc3339(),
            ])?;
        }
    }
    tx.commit()?;

    Ok(records.len())
}

fn insert_session(conn: &Connection, session: &ScrapingSession) -> SinkResult<()> {
    conn.execute(
        "INSERT OR REPLACE INTO scrape_sessions
            (session_id, started_at, finished_at, duration_seconds, config_hash,
             total_products, total_locations, success, errors)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            session.session_id,
            session.started_at.to_rfc3339(),
            session.finished_at.map(|t| t.to_rfc3339()),
            session.duration_seconds,
            session.config_hash,
            session.total_products as i64,
            session.total_locations as i64,
            session.success,
            session.errors.join("\n"),
        ],
    )?;
    Ok(())
}

#[async_trait]
impl Sink for SqliteSink {
    async fn write(
        &self,
        table: &str,
        session_id: &str,
        records: &[ProductRecord],
    ) -> SinkResult<usize> {
        let conn = Arc::clone(&self.conn);
        let table = table.to_string();
        let session_id = session_id.to_string();
        let records = records.to_vec();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|_| SinkError::Poisoned)?;
            insert_products(&mut conn, &table, &session_id, &records)
        })
        .await
        .map_err(|e| SinkError::Task(e.to_string()))?
    }

    async fn record_session(&self, session: &ScrapingSession) -> SinkResult<()> {
        let conn = Arc::clone(&self.conn);
        let session = session.clone();

        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| SinkError::Poisoned)?;
            insert_session(&conn, &session)
        })
        .await
        .map_err(|e| SinkError::Task(e.to_string()))?
    }
}
