//! Retrying, per-table serialized writes
//!
//! `SinkWriter` is the only path from category results to a sink. Each write
//! is retried with the shared backoff policy, and writes addressed to the
//! same table never overlap.

use crate::config::ScraperConfig;
use crate::model::{PersistStatus, ProductRecord, ScrapingSession};
use crate::net::RetryPolicy;
use crate::sink::traits::{Sink, SinkResult};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Total write attempts per table
const WRITE_ATTEMPTS: u32 = 3;

pub struct SinkWriter {
    sink: Arc<dyn Sink>,
    retry: RetryPolicy,
    tables: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl SinkWriter {
    pub fn new(sink: Arc<dyn Sink>, retry: RetryPolicy) -> Self {
        Self {
            sink,
            retry,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Three attempts with the configured base backoff
    pub fn from_config(sink: Arc<dyn Sink>, config: &ScraperConfig) -> Self {
        Self::new(
            sink,
            RetryPolicy::new(
                WRITE_ATTEMPTS - 1,
                Duration::from_millis(config.retry_base_delay_ms),
            ),
        )
    }

    fn table_lock(&self, table: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        Arc::clone(tables.entry(table.to_string()).or_default())
    }

    /// Appends `records` to `table` and reports how it went
    pub async fn persist(
        &self,
        table: &str,
        session_id: &str,
        records: &[ProductRecord],
    ) -> PersistStatus {
        let lock = self.table_lock(table);
        let _guard = lock.lock().await;

        let operation = format!("write {table}");
        let result = self
            .retry
            .run(&operation, || self.sink.write(table, session_id, records))
            .await;

        match result {
            Ok(rows) => {
                tracing::info!(table, rows, "Persisted records");
                PersistStatus::Written {
                    table: table.to_string(),
                    rows,
                }
            }
            Err(e) => {
                tracing::error!(table, error = %e, "Failed to persist records");
                PersistStatus::Failed {
                    table: table.to_string(),
                    error: e.to_string(),
                }
            }
        }
    }

    /// Records the session summary row
    pub async fn record_session(&self, session: &ScrapingSession) -> SinkResult<()> {
        self.retry
            .run("record session", || self.sink.record_session(session))
            .await
    }
}
