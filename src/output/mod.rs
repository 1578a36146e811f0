//! Output module for session summaries and exports
//!
//! This module handles:
//! - Generating a markdown summary of a scraping session
//! - Printing session statistics to the console
//! - Exporting the full session as JSON

mod markdown;
pub mod stats;

pub use markdown::{format_markdown_summary, generate_markdown_summary};
pub use stats::{print_session, SessionStatistics};

use crate::model::ScrapingSession;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while writing outputs
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Writes the whole session, products included, as pretty-printed JSON
pub fn write_json(session: &ScrapingSession, output_path: &Path) -> OutputResult<()> {
    let file = BufWriter::new(File::create(output_path)?);
    serde_json::to_writer_pretty(file, session)?;
    Ok(())
}
