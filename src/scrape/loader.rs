//! Listing expansion
//!
//! A category listing shows a first batch of products and a "Load More"
//! affordance that links to the next batch. `PageLoader` follows that
//! affordance until it disappears, until two consecutive expansions add no
//! new products, or until the configured bound is reached. The result keeps
//! every fetched batch in order, so extraction sees the products in the same
//! order the fully expanded page would show them.

use crate::config::ScraperConfig;
use crate::net::{BrowsingContext, RequestKind};
use crate::scrape::markup::{find_affordance, resolve_link, selector};
use crate::FetchError;
use regex::Regex;
use scraper::Html;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

static LOAD_MORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bload\s+more\b").expect("valid regex"));

/// Expansions in a row that may add nothing before loading stops
const IDLE_EXPANSION_LIMIT: u32 = 2;

/// One fetched batch of listing markup
#[derive(Debug, Clone)]
pub struct ListingFragment {
    /// URL the batch was served from; relative links resolve against it
    pub url: Url,
    pub html: String,
}

/// A fully expanded listing: the initial page followed by each loaded batch
#[derive(Debug, Clone)]
pub struct ListingDocument {
    pub fragments: Vec<ListingFragment>,

    /// Distinct product links seen across all batches
    pub product_links: usize,
}

impl ListingDocument {
    /// Number of "load more" steps that were followed
    pub fn expansions(&self) -> usize {
        self.fragments.len().saturating_sub(1)
    }
}

/// What one batch of markup offers
struct BatchScan {
    product_links: Vec<String>,
    next: Option<Url>,
}

fn scan_batch(html: &str, url: &Url) -> BatchScan {
    let document = Html::parse_document(html);

    let product_links = selector("a[href*='/product/']")
        .map(|links| {
            document
                .select(&links)
                .filter_map(|a| a.value().attr("href"))
                .filter_map(|href| resolve_link(href, url))
                .map(|u| u.to_string())
                .collect()
        })
        .unwrap_or_default();

    BatchScan {
        product_links,
        next: find_affordance(&document, &LOAD_MORE_RE, url),
    }
}

/// Loads and expands category listings
#[derive(Debug, Clone, Copy)]
pub struct PageLoader {
    max_load_more: u32,
}

impl PageLoader {
    pub fn new(max_load_more: u32) -> Self {
        Self { max_load_more }
    }

    pub fn from_config(config: &ScraperConfig) -> Self {
        Self::new(config.max_load_more)
    }

    /// Navigates to `url` and follows "load more" until the listing is complete
    ///
    /// Every request goes through `ctx`, so each is paced, bounded by the
    /// page timeout and retried on transient failures. A randomized settle
    /// pause separates consecutive expansions.
    pub async fn load(
        &self,
        ctx: &mut BrowsingContext,
        url: &Url,
    ) -> Result<ListingDocument, FetchError> {
        let page = ctx.fetch(RequestKind::Navigate, url).await?;
        let scan = scan_batch(&page.body, &page.final_url);

        let mut seen: HashSet<String> = scan.product_links.into_iter().collect();
        let mut visited: HashSet<Url> = HashSet::from([url.clone(), page.final_url.clone()]);
        let mut fragments = vec![ListingFragment {
            url: page.final_url,
            html: page.body,
        }];
        let mut next = scan.next;
        let mut idle = 0;
        let mut expansions = 0;

        while let Some(target) = next.take() {
            if expansions >= self.max_load_more {
                tracing::debug!(url = %url, expansions, "Load-more bound reached");
                break;
            }
            if !visited.insert(target.clone()) {
                tracing::debug!(url = %target, "Load-more points at an already loaded batch");
                break;
            }

            ctx.settle().await;
            let page = ctx.fetch(RequestKind::Expand, &target).await?;
            expansions += 1;

            let scan = scan_batch(&page.body, &page.final_url);
            let added = scan
                .product_links
                .into_iter()
                .filter(|link| seen.insert(link.clone()))
                .count();
            idle = if added == 0 { idle + 1 } else { 0 };

            fragments.push(ListingFragment {
                url: page.final_url,
                html: page.body,
            });

            if idle >= IDLE_EXPANSION_LIMIT {
                tracing::debug!(url = %url, expansions, "Expansions stopped adding products");
                break;
            }
            next = scan.next;
        }

        tracing::debug!(
            url = %url,
            expansions,
            products = seen.len(),
            "Listing loaded"
        );

        Ok(ListingDocument {
            fragments,
            product_links: seen.len(),
        })
    }
}
