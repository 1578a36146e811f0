//! Sink trait and error types
//!
//! A sink is the downstream analytical store. It receives one append-only
//! bulk write per completed category, addressed by table name, plus one
//! summary row per session.

use crate::model::{ProductRecord, ScrapingSession};
use crate::net::Retryable;
use async_trait::async_trait;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur while writing to a sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("Sink connection lock poisoned")]
    Poisoned,

    #[error("Sink task failed: {0}")]
    Task(String),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: Box<SinkError>,
    },
}

impl Retryable for SinkError {
    /// Busy or locked databases, I/O faults and failed blocking tasks may
    /// clear on a fresh attempt. Constraint, schema and type errors will not.
    fn is_transient(&self) -> bool {
        match self {
            Self::Sqlite(rusqlite::Error::SqliteFailure(failure, _)) => matches!(
                failure.code,
                ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked | ErrorCode::SystemIoFailure
            ),
            Self::Task(_) => true,
            _ => false,
        }
    }

    fn exhausted(self, operation: &str, attempts: u32) -> Self {
        Self::Exhausted {
            operation: operation.to_string(),
            attempts,
            last: Box::new(self),
        }
    }
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Destination for extracted records
///
/// Implementations must be shareable across category tasks; writes to the
/// same table are serialized by `SinkWriter`, not by the implementation.
#[async_trait]
pub trait Sink: Send + Sync {
    /// Appends `records` to `table`, tagging each row with `session_id`
    ///
    /// Returns the number of rows written.
    async fn write(
        &self,
        table: &str,
        session_id: &str,
        records: &[ProductRecord],
    ) -> SinkResult<usize>;

    /// Records the outcome of a finished session
    async fn record_session(&self, session: &ScrapingSession) -> SinkResult<()>;
}
