//! One category task
//!
//! Walks `Pending → Discovering → Scraping(i/N) → Aggregating → Done`.
//! Discovery runs once; locations are then scraped under the location
//! concurrency bound, each in its own browsing context. A failed location is
//! recorded in the result and never fails the category by itself.

use crate::config::{CategoryConfig, Config, OrchestratorConfig, ScraperConfig, SiteConfig};
use crate::model::{
    CategoryPhase, CategoryResult, LocationOutcome, LocationRecord, LocationSummary,
    PersistStatus, PhaseTracker, ProductRecord,
};
use crate::net::{BrowsingContext, ContextFactory};
use crate::scrape::{discover_locations, Deduplicator, LocationScraper};
use crate::LedgerError;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use url::Url;

/// Everything one category task needs, owned so it can be spawned
pub struct CategoryTask {
    site: SiteConfig,
    scraper: ScraperConfig,
    limits: OrchestratorConfig,
    category: CategoryConfig,
    factory: Arc<dyn ContextFactory>,
    max_locations: Option<usize>,
}

impl CategoryTask {
    pub fn new(
        config: &Config,
        category: CategoryConfig,
        factory: Arc<dyn ContextFactory>,
        max_locations: Option<usize>,
    ) -> Self {
        Self {
            site: config.site.clone(),
            scraper: config.scraper.clone(),
            limits: config.orchestrator.clone(),
            category,
            factory,
            max_locations,
        }
    }

    pub fn label(&self) -> &str {
        &self.category.label
    }

    pub fn table(&self) -> &str {
        &self.category.table
    }

    /// Runs the category to completion; failures are reported in the result
    pub async fn run(self) -> CategoryResult {
        let started = Instant::now();
        let label = self.category.label.clone();
        let mut tracker = PhaseTracker::new(&label);

        step(&mut tracker, CategoryPhase::Discovering);
        let (scraper, locations) = match self.prepare().await {
            Ok(prepared) => prepared,
            Err(e) => {
                tracing::error!(category = %label, error = %e, "Category failed during discovery");
                step(&mut tracker, CategoryPhase::Done { success: false });
                let mut result = CategoryResult::failed(&label, e.to_string());
                result.duration_seconds = started.elapsed().as_secs_f64();
                return result;
            }
        };

        let total = locations.len();
        tracing::info!(category = %label, locations = total, url = %scraper.listing_url(), "Scraping locations");
        step(&mut tracker, CategoryPhase::Scraping { completed: 0, total });

        let outcomes = self.scrape_all(scraper, locations, &mut tracker).await;

        step(&mut tracker, CategoryPhase::Aggregating);
        let mut result = aggregate(&label, outcomes, self.limits.min_expected_products);
        result.duration_seconds = started.elapsed().as_secs_f64();

        step(&mut tracker, CategoryPhase::Done { success: result.success });
        tracing::info!(
            category = %label,
            products = result.total_products,
            locations = result.location_count,
            failed_locations = result.failed_locations(),
            success = result.success,
            "Category finished"
        );
        result
    }

    /// Builds the location scraper and discovers the locations to visit
    async fn prepare(&self) -> Result<(LocationScraper, Vec<LocationRecord>), LedgerError> {
        let base_url = Url::parse(&self.site.base_url)?;
        let scraper = LocationScraper::new(self.scraper.clone(), &base_url, &self.category)?;

        let mut ctx = BrowsingContext::open(self.factory.as_ref(), &self.scraper)?;
        let mut locations = discover_locations(&mut ctx, &self.site).await?;

        if let Some(cap) = self.max_locations {
            locations.truncate(cap);
        }
        Ok((scraper, locations))
    }

    async fn scrape_all(
        &self,
        scraper: LocationScraper,
        locations: Vec<LocationRecord>,
        tracker: &mut PhaseTracker,
    ) -> Vec<LocationOutcome> {
        let scraper = Arc::new(scraper);
        let limit = self.limits.max_concurrent_locations.max(1);

        let mut pending = stream::iter(locations.into_iter().enumerate())
            .map(|(index, location)| {
                let scraper = Arc::clone(&scraper);
                let factory = Arc::clone(&self.factory);
                async move { (index, scraper.scrape(factory.as_ref(), location).await) }
            })
            .buffer_unordered(limit);

        let mut settled = Vec::new();
        while let Some((index, outcome)) = pending.next().await {
            if let Err(e) = tracker.location_settled() {
                tracing::warn!(error = %e, "Unexpected phase transition");
            }
            settled.push((index, outcome));
        }

        settled.sort_by_key(|(index, _)| *index);
        settled.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

fn step(tracker: &mut PhaseTracker, next: CategoryPhase) {
    if let Err(e) = tracker.advance(next) {
        tracing::warn!(error = %e, "Unexpected phase transition");
    }
}

/// Merges per-location outcomes into the category result
///
/// Products are concatenated in location order and passed through the
/// deduplicator once more. The category succeeds only when the merged
/// total reaches `min_expected_products`.
pub fn aggregate(
    subcategory: &str,
    outcomes: Vec<LocationOutcome>,
    min_expected_products: usize,
) -> CategoryResult {
    let locations: Vec<LocationSummary> = outcomes.iter().map(LocationSummary::from).collect();
    let location_count = outcomes.iter().filter(|o| o.is_success()).count();

    let mut dedup = Deduplicator::new();
    let products: Vec<ProductRecord> = outcomes
        .into_iter()
        .flat_map(|outcome| outcome.products)
        .filter(|record| dedup.admit(record))
        .collect();
    let total_products = products.len();

    let error_message = (total_products < min_expected_products).then(|| {
        LedgerError::DataQuality {
            category: subcategory.to_string(),
            found: total_products,
            minimum: min_expected_products,
        }
        .to_string()
    });

    CategoryResult {
        subcategory: subcategory.to_string(),
        products,
        location_count,
        total_products,
        success: error_message.is_none(),
        error_message,
        locations,
        persisted: PersistStatus::Skipped,
        duration_seconds: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ProductFields;

    fn location(name: &str) -> LocationRecord {
        LocationRecord {
            name: name.to_string(),
            region_tag: "FL".to_string(),
            source_url: format!("https://example.com/dispensaries/{name}"),
        }
    }

    fn outcome(name: &str, products: &[&str]) -> LocationOutcome {
        let loc = location(name);
        let records = products
            .iter()
            .map(|slug| {
                ProductRecord::new(
                    &loc,
                    "Whole Flower",
                    ProductFields {
                        product_name: slug.to_string(),
                        product_url: Some(format!("https://example.com/product/{slug}")),
                        ..Default::default()
                    },
                )
            })
            .collect();
        LocationOutcome::succeeded(loc, records, Vec::new())
    }

    #[test]
    fn test_aggregate_sums_locations() {
        let outcomes = vec![
            outcome("tampa", &["a", "b", "c"]),
            outcome("miami", &["a", "b"]),
            LocationOutcome::failed(location("orlando"), "timeout".to_string()),
        ];
        let result = aggregate("Whole Flower", outcomes, 5);

        assert_eq!(result.total_products, 5);
        assert_eq!(result.location_count, 2);
        assert_eq!(result.failed_locations(), 1);
        let summed: usize = result.locations.iter().map(|l| l.products).sum();
        assert_eq!(summed, result.total_products);
        assert!(result.success);
        assert_eq!(result.products[0].location, "tampa");
        assert_eq!(result.products[3].location, "miami");
    }

    #[test]
    fn test_below_minimum_is_data_quality_failure() {
        let result = aggregate("Pre-Rolls", vec![outcome("tampa", &["a"])], 100);

        assert!(!result.success);
        assert_eq!(result.total_products, 1);
        assert!(result.error_message.unwrap().contains("expected at least 100"));
    }

    #[test]
    fn test_zero_location_failure_keeps_category_alive() {
        let result = aggregate(
            "Ground & Shake",
            vec![LocationOutcome::failed(location("tampa"), "HTTP 503".to_string())],
            0,
        );
        assert!(result.success);
        assert_eq!(result.location_count, 0);
        assert_eq!(result.locations[0].error.as_deref(), Some("HTTP 503"));
    }
}
