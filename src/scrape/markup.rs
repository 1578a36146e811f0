//! Shared HTML helpers
//!
//! Link resolution, whitespace normalization and affordance lookup used by
//! discovery, the page loader and the extractor. All functions here are
//! synchronous; parsed documents never live across an await point.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Parses a CSS selector, returning `None` for selectors scraper rejects
pub fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Collapses runs of whitespace into single spaces and trims the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Visible text of an element, whitespace-normalized
pub fn element_text(element: ElementRef<'_>) -> String {
    normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "))
}

/// Resolves an href against `base_url`
///
/// Returns `None` for links that cannot lead to another page:
/// - javascript:, mailto:, tel: and data: schemes
/// - fragment-only links
/// - anything that does not resolve to HTTP(S)
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

/// Finds the first link or button whose visible text matches `label`
///
/// Buttons carry their target in `data-href`; anchors in `href`. Elements
/// without a resolvable target are ignored.
pub fn find_affordance(document: &Html, label: &Regex, base_url: &Url) -> Option<Url> {
    let candidates = selector("a, button")?;

    document.select(&candidates).find_map(|element| {
        if !label.is_match(&element_text(element)) {
            return None;
        }
        let attrs = element.value();
        attrs
            .attr("href")
            .or_else(|| attrs.attr("data-href"))
            .and_then(|href| resolve_link(href, base_url))
    })
}
