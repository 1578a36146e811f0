//! Leaf-Ledger: a polite retail price harvester
//!
//! This crate discovers the locations of a multi-location retail site, loads
//! each location's category listings, extracts normalized price observations
//! and delivers them to an analytical store, one table per subcategory.

pub mod config;
pub mod model;
pub mod net;
pub mod orchestrator;
pub mod output;
pub mod scrape;
pub mod sink;

use thiserror::Error;

/// Main error type for Leaf-Ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Network error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Sink error: {0}")]
    Sink(#[from] sink::SinkError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("Location discovery failed: {0}")]
    Discovery(String),

    #[error("Only {found} products extracted for {category}, expected at least {minimum}")]
    DataQuality {
        category: String,
        found: usize,
        minimum: usize,
    },

    #[error("Location {location} exceeded its {seconds}s budget")]
    LocationTimeout { location: String, seconds: u64 },

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: model::CategoryPhase,
        to: model::CategoryPhase,
    },

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Errors raised by a single network operation
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("Connection failed for {url}: {message}")]
    Connect { url: String, message: String },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: String,
        attempts: u32,
        last: Box<FetchError>,
    },
}

impl FetchError {
    /// Returns true if retrying the same request may succeed
    ///
    /// Timeouts, connection failures (including resets mid-request), HTTP 5xx
    /// and HTTP 429 are transient.
    /// Everything else (404, malformed URLs, exhausted retries) fails fast.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::Connect { .. } => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429,
            Self::Http { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
            }
            Self::InvalidUrl(_) | Self::Exhausted { .. } => false,
        }
    }
}

/// Result type alias for Leaf-Ledger operations
pub type Result<T> = std::result::Result<T, LedgerError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for network operations
pub type FetchResult<T> = std::result::Result<T, FetchError>;

// Re-export commonly used types
pub use config::Config;
pub use model::{CategoryResult, LocationRecord, ProductRecord, ScrapingSession, StrainType};
pub use orchestrator::{run_categories, Orchestrator, RunOptions};
