//! Location discovery
//!
//! Reads the locations index once and keeps the anchors that point at a
//! location page and pass the region filter. An unreachable index, or one
//! with no matching locations, is a discovery failure for the whole category.

use crate::config::SiteConfig;
use crate::model::LocationRecord;
use crate::net::{BrowsingContext, RequestKind};
use crate::scrape::markup::{element_text, resolve_link, selector};
use crate::LedgerError;
use scraper::Html;
use std::collections::HashSet;
use url::Url;

/// Decides whether a location belongs to the target region
///
/// The anchor text is checked for the region code in three shapes: after a
/// comma (", FL"), as the final token (" FL") or surrounded by spaces
/// (" FL "). The link target is the fallback: `/<region-slug>`, `-<code>-`,
/// or a trailing `/<code>` or `-<code>`.
#[derive(Debug, Clone)]
pub struct RegionFilter {
    code: String,
    slug: Option<String>,
}

impl RegionFilter {
    pub fn new(code: &str, slug: Option<&str>) -> Self {
        Self {
            code: code.trim().to_uppercase(),
            slug: slug
                .map(|s| s.trim().trim_matches('/').to_lowercase())
                .filter(|s| !s.is_empty()),
        }
    }

    pub fn from_config(site: &SiteConfig) -> Self {
        Self::new(&site.region, site.region_slug.as_deref())
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn matches(&self, text: &str, href: &str) -> bool {
        self.matches_text(text) || self.matches_href(href)
    }

    pub fn matches_text(&self, text: &str) -> bool {
        let text = text.split_whitespace().collect::<Vec<_>>().join(" ").to_uppercase();
        let code = &self.code;

        text.contains(&format!(", {code}"))
            || text.ends_with(&format!(" {code}"))
            || text.contains(&format!(" {code} "))
    }

    pub fn matches_href(&self, href: &str) -> bool {
        let href = href.trim().to_lowercase();
        let code = self.code.to_lowercase();

        if let Some(slug) = &self.slug {
            if href.contains(&format!("/{slug}")) {
                return true;
            }
        }

        href.contains(&format!("-{code}-"))
            || href.ends_with(&format!("/{code}"))
            || href.ends_with(&format!("-{code}"))
    }
}

/// Extracts matching locations from the locations index markup
///
/// Only anchors whose resolved path sits under `locations_path` are
/// considered. Results are unique by link target and then by display name,
/// in document order.
pub fn parse_locations(
    html: &str,
    page_url: &Url,
    locations_path: &str,
    filter: &RegionFilter,
) -> Vec<LocationRecord> {
    let document = Html::parse_document(html);
    let Some(anchors) = selector("a[href]") else {
        return Vec::new();
    };

    let prefix = format!("{}/", locations_path.trim_end_matches('/'));
    let mut seen_urls = HashSet::new();
    let mut seen_names = HashSet::new();
    let mut locations = Vec::new();

    for anchor in document.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let Some(mut target) = resolve_link(href, page_url) else {
            continue;
        };
        target.set_fragment(None);

        if target.host_str() != page_url.host_str() || !target.path().starts_with(&prefix) {
            continue;
        }

        let name = element_text(anchor);
        if name.is_empty() || !filter.matches(&name, target.path()) {
            continue;
        }

        if !seen_urls.insert(target.to_string()) || !seen_names.insert(name.clone()) {
            continue;
        }

        locations.push(LocationRecord {
            name,
            region_tag: filter.code().to_string(),
            source_url: target.to_string(),
        });
    }

    locations
}

/// Fetches the locations index and returns the locations in the region
pub async fn discover_locations(
    ctx: &mut BrowsingContext,
    site: &SiteConfig,
) -> Result<Vec<LocationRecord>, LedgerError> {
    let base_url = Url::parse(&site.base_url)?;
    let index_url = base_url.join(&site.locations_path)?;
    let filter = RegionFilter::from_config(site);

    let page = ctx
        .fetch(RequestKind::Navigate, &index_url)
        .await
        .map_err(|e| LedgerError::Discovery(format!("{index_url} unreachable: {e}")))?;

    let locations = parse_locations(&page.body, &page.final_url, &site.locations_path, &filter);
    if locations.is_empty() {
        return Err(LedgerError::Discovery(format!(
            "no locations in region {} found at {}",
            filter.code(),
            index_url
        )));
    }

    tracing::info!(
        url = %index_url,
        region = filter.code(),
        count = locations.len(),
        "Discovered locations"
    );
    Ok(locations)
}
