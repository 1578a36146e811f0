//! Scraping pipeline for one category at one location
//!
//! This module contains:
//! - Location discovery with the region filter
//! - Listing expansion ("load more")
//! - Card and detail-page field extraction
//! - First-seen-wins deduplication
//! - The per-location pipeline tying them together

mod dedup;
mod discovery;
mod extract;
mod fields;
mod loader;
mod location;
mod markup;

pub use dedup::{dedup_records, Deduplicator};
pub use discovery::{discover_locations, parse_locations, RegionFilter};
pub use extract::{
    parse_cards, parse_detail, resolve_brand, resolve_price, CardDraft, DetailFields,
    Extraction, ExtractionError, FieldSource, RecordExtractor,
};
pub use fields::{
    grams_for_size, parse_price, parse_size, parse_strain, parse_thc, price_candidates,
    PriceProbe,
};
pub use loader::{ListingDocument, ListingFragment, PageLoader};
pub use location::LocationScraper;
pub use markup::{normalize_whitespace, resolve_link};
