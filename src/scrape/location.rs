//! Per-location pipeline
//!
//! For one location: open a fresh browsing context, visit the location page
//! and follow its "Shop At This Store" affordance, load and expand the
//! category listing, extract records and deduplicate them. The whole
//! pipeline runs under the per-location time budget; a location that fails
//! or runs out of time is reported as a failed outcome, never as an error.

use crate::config::{CategoryConfig, ScraperConfig};
use crate::model::{LocationOutcome, LocationRecord, ProductRecord};
use crate::net::{BrowsingContext, ContextFactory, RequestKind};
use crate::scrape::dedup::Deduplicator;
use crate::scrape::extract::RecordExtractor;
use crate::scrape::loader::PageLoader;
use crate::scrape::markup::find_affordance;
use crate::LedgerError;
use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;
use std::time::Duration;
use url::Url;

static SHOP_HERE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bshop\s+at\s+this\s+store\b").expect("valid regex"));

/// Scrapes one category at one location at a time
#[derive(Debug, Clone)]
pub struct LocationScraper {
    scraper: ScraperConfig,
    listing_url: Url,
    subcategory: String,
}

impl LocationScraper {
    pub fn new(
        scraper: ScraperConfig,
        base_url: &Url,
        category: &CategoryConfig,
    ) -> Result<Self, LedgerError> {
        Ok(Self {
            listing_url: base_url.join(&category.path)?,
            subcategory: category.label.clone(),
            scraper,
        })
    }

    pub fn listing_url(&self) -> &Url {
        &self.listing_url
    }

    /// Scrapes `location` in its own browsing context
    pub async fn scrape(&self, factory: &dyn ContextFactory, location: LocationRecord) -> LocationOutcome {
        let budget = Duration::from_secs(self.scraper.location_timeout_secs);

        let result = match tokio::time::timeout(budget, self.run(factory, &location)).await {
            Ok(result) => result,
            Err(_) => Err(LedgerError::LocationTimeout {
                location: location.name.clone(),
                seconds: budget.as_secs(),
            }),
        };

        match result {
            Ok((products, skipped)) => {
                tracing::info!(
                    category = %self.subcategory,
                    location = %location.name,
                    products = products.len(),
                    skipped = skipped.len(),
                    "Location scraped"
                );
                LocationOutcome::succeeded(location, products, skipped)
            }
            Err(e) => {
                tracing::warn!(
                    category = %self.subcategory,
                    location = %location.name,
                    error = %e,
                    "Location failed"
                );
                LocationOutcome::failed(location, e.to_string())
            }
        }
    }

    async fn run(
        &self,
        factory: &dyn ContextFactory,
        location: &LocationRecord,
    ) -> Result<(Vec<ProductRecord>, Vec<String>), LedgerError> {
        let mut ctx = BrowsingContext::open(factory, &self.scraper)?;

        select_store(&mut ctx, location).await?;

        let listing = PageLoader::from_config(&self.scraper)
            .load(&mut ctx, &self.listing_url)
            .await?;

        let extraction = RecordExtractor::new(location, &self.subcategory)
            .extract(&mut ctx, &listing)
            .await;

        let mut dedup = Deduplicator::new();
        let products = dedup.filter(extraction.records);

        tracing::debug!(
            location = %location.name,
            expansions = listing.expansions(),
            detail_fetches = extraction.detail_fetches,
            duplicates = dedup.dropped(),
            requests = ctx.requests(),
            "Listing extracted"
        );

        Ok((products, extraction.skipped))
    }
}

/// Visits the location page and follows its store selection affordance
///
/// The selection lives in the context's cookies, so the category listing
/// fetched afterwards shows this store's inventory.
async fn select_store(ctx: &mut BrowsingContext, location: &LocationRecord) -> Result<(), LedgerError> {
    let url = Url::parse(&location.source_url)?;
    let page = ctx.fetch(RequestKind::Navigate, &url).await?;

    let selection = {
        let document = Html::parse_document(&page.body);
        find_affordance(&document, &SHOP_HERE_RE, &page.final_url)
    };

    match selection {
        Some(target) => {
            ctx.fetch(RequestKind::Navigate, &target).await?;
            tracing::debug!(location = %location.name, url = %target, "Store selected");
        }
        None => {
            tracing::debug!(location = %location.name, "No store selection affordance");
        }
    }
    Ok(())
}
