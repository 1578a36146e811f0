//! Markdown summary generation
//!
//! This module generates a human-readable markdown summary of one scraping
//! session: run metadata, one row per category, and the per-location
//! breakdown with any errors.

use crate::model::{PersistStatus, ScrapingSession};
use crate::output::stats::SessionStatistics;
use crate::output::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of `session` to `output_path`
pub fn generate_markdown_summary(session: &ScrapingSession, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(session);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a scraping session as markdown
pub fn format_markdown_summary(session: &ScrapingSession) -> String {
    let stats = SessionStatistics::from_session(session);
    let mut md = String::new();

    md.push_str("# Leaf-Ledger Session Summary\n\n");

    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Session ID**: {}\n", session.session_id));
    md.push_str(&format!("- **Started**: {}\n", session.started_at.to_rfc3339()));
    if let Some(finished) = &session.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds ({:.2} minutes)\n",
        session.duration_seconds,
        session.duration_seconds / 60.0
    ));
    md.push_str(&format!(
        "- **Status**: {}\n",
        if session.success { "success" } else { "failed" }
    ));
    if let Some(hash) = &session.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Total Products**: {}\n", session.total_products));
    md.push_str(&format!("- **Locations Scraped**: {}\n", session.total_locations));
    md.push_str(&format!("- **Failed Locations**: {}\n", stats.failed_locations));
    md.push_str(&format!(
        "- **Priced Products**: {} ({:.1}%)\n",
        stats.priced_products,
        stats.priced_rate()
    ));
    if let Some(avg) = stats.average_price_per_gram {
        md.push_str(&format!("- **Average Price per Gram**: ${:.2}\n", avg));
    }
    md.push('\n');

    md.push_str("## Categories\n\n");
    md.push_str("| Category | Products | Locations | Status | Persisted | Duration |\n");
    md.push_str("|----------|----------|-----------|--------|-----------|----------|\n");
    for result in session.results.values() {
        let persisted = match &result.persisted {
            PersistStatus::Skipped => "-".to_string(),
            PersistStatus::Written { table, rows } => format!("{} rows to {}", rows, table),
            PersistStatus::Failed { table, .. } => format!("failed ({})", table),
        };
        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {:.1}s |\n",
            result.subcategory,
            result.total_products,
            result.location_count,
            if result.success { "ok" } else { "failed" },
            persisted,
            result.duration_seconds
        ));
    }
    md.push('\n');

    for result in session.results.values() {
        if result.locations.is_empty() {
            continue;
        }

        md.push_str(&format!("### {}\n\n", result.subcategory));
        md.push_str("| Location | Products | Skipped | Error |\n");
        md.push_str("|----------|----------|---------|-------|\n");
        for location in &result.locations {
            md.push_str(&format!(
                "| {} | {} | {} | {} |\n",
                location.name,
                location.products,
                location.skipped,
                location.error.as_deref().unwrap_or("")
            ));
        }
        md.push('\n');
    }

    let unpersisted = session.unpersisted_categories();
    if !unpersisted.is_empty() {
        md.push_str("## Not Persisted\n\n");
        md.push_str("These categories were scraped but their rows could not be written:\n\n");
        for category in unpersisted {
            md.push_str(&format!("- {}\n", category));
        }
        md.push('\n');
    }

    if !session.errors.is_empty() {
        md.push_str("## Errors\n\n");
        for error in &session.errors {
            md.push_str(&format!("- {}\n", error));
        }
        md.push('\n');
    }

    md
}
