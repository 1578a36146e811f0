//! Per-category results and the session aggregate

use crate::model::record::{LocationRecord, ProductRecord};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};

/// How one location's scrape settled
#[derive(Debug, Clone, Serialize)]
pub struct LocationOutcome {
    pub location: LocationRecord,

    /// Products kept after per-location deduplication
    pub products: Vec<ProductRecord>,

    /// Cards that could not be extracted, with the reason
    pub skipped: Vec<String>,

    /// Set when the location failed (retries exhausted, timeout)
    pub error: Option<String>,
}

impl LocationOutcome {
    pub fn succeeded(location: LocationRecord, products: Vec<ProductRecord>, skipped: Vec<String>) -> Self {
        Self {
            location,
            products,
            skipped,
            error: None,
        }
    }

    pub fn failed(location: LocationRecord, error: String) -> Self {
        Self {
            location,
            products: Vec::new(),
            skipped: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Compact per-location line kept in the category result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationSummary {
    pub name: String,
    pub products: usize,
    pub skipped: usize,
    pub error: Option<String>,
}

impl From<&LocationOutcome> for LocationSummary {
    fn from(outcome: &LocationOutcome) -> Self {
        Self {
            name: outcome.location.name.clone(),
            products: outcome.products.len(),
            skipped: outcome.skipped.len(),
            error: outcome.error.clone(),
        }
    }
}

/// Whether a category's rows reached the sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PersistStatus {
    /// Not written (persistence disabled, category failed, or nothing to write)
    Skipped,
    Written { table: String, rows: usize },
    Failed { table: String, error: String },
}

/// Result of one category task
#[derive(Debug, Clone, Serialize)]
pub struct CategoryResult {
    pub subcategory: String,
    pub products: Vec<ProductRecord>,

    /// Locations scraped without error
    pub location_count: usize,
    pub total_products: usize,
    pub success: bool,
    pub error_message: Option<String>,
    pub locations: Vec<LocationSummary>,
    pub persisted: PersistStatus,
    pub duration_seconds: f64,
}

impl CategoryResult {
    /// A category that failed before any location was scraped
    pub fn failed(subcategory: &str, error: String) -> Self {
        Self {
            subcategory: subcategory.to_string(),
            products: Vec::new(),
            location_count: 0,
            total_products: 0,
            success: false,
            error_message: Some(error),
            locations: Vec::new(),
            persisted: PersistStatus::Skipped,
            duration_seconds: 0.0,
        }
    }

    /// Number of locations whose scrape failed
    pub fn failed_locations(&self) -> usize {
        self.locations.iter().filter(|l| l.error.is_some()).count()
    }
}

/// The aggregate result of one multi-category run
#[derive(Debug, Clone, Serialize)]
pub struct ScrapingSession {
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub duration_seconds: f64,
    pub results: BTreeMap<String, CategoryResult>,
    pub total_products: usize,

    /// Distinct locations scraped successfully across all categories
    pub total_locations: usize,
    pub success: bool,
    pub errors: Vec<String>,
    pub config_hash: Option<String>,
}

impl ScrapingSession {
    /// Opens a session with a fresh unique identifier
    pub fn start() -> Self {
        Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            started_at: Utc::now(),
            finished_at: None,
            duration_seconds: 0.0,
            results: BTreeMap::new(),
            total_products: 0,
            total_locations: 0,
            success: true,
            errors: Vec::new(),
            config_hash: None,
        }
    }

    /// Adds a settled category result
    pub fn add_result(&mut self, result: CategoryResult) {
        self.total_products += result.total_products;

        if !result.success {
            self.success = false;
            if let Some(message) = &result.error_message {
                self.errors.push(format!("{}: {}", result.subcategory, message));
            }
        }

        if let PersistStatus::Failed { table, error } = &result.persisted {
            self.errors.push(format!(
                "{}: write to {} failed: {}",
                result.subcategory, table, error
            ));
        }

        self.results.insert(result.subcategory.clone(), result);
    }

    /// Stamps completion time and counts distinct locations
    pub fn finalize(&mut self) {
        let finished = Utc::now();
        self.duration_seconds = (finished - self.started_at).num_milliseconds() as f64 / 1000.0;
        self.finished_at = Some(finished);

        let locations: HashSet<&str> = self
            .results
            .values()
            .flat_map(|r| r.locations.iter())
            .filter(|l| l.error.is_none())
            .map(|l| l.name.as_str())
            .collect();
        self.total_locations = locations.len();
    }

    /// Categories whose rows could not be persisted
    pub fn unpersisted_categories(&self) -> Vec<&str> {
        self.results
            .values()
            .filter(|r| matches!(r.persisted, PersistStatus::Failed { .. }))
            .map(|r| r.subcategory.as_str())
            .collect()
    }
}
