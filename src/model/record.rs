//! Location and product records
//!
//! These are the immutable values that flow through the pipeline: a
//! `LocationRecord` per discovered store and a `ProductRecord` per price
//! observation extracted from one of its listings.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// One retail location that passed the region filter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LocationRecord {
    /// Display name, whitespace-normalized
    pub name: String,

    /// Region code the location was matched against, e.g. "FL"
    pub region_tag: String,

    /// Absolute URL of the location's page
    pub source_url: String,
}

/// Strain classification parsed from card text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StrainType {
    Indica,
    Sativa,
    Hybrid,
    Unknown,
}

impl StrainType {
    /// Returns the stored column value (`None` for unknown)
    pub fn as_column(&self) -> Option<&'static str> {
        match self {
            Self::Indica => Some("Indica"),
            Self::Sativa => Some("Sativa"),
            Self::Hybrid => Some("Hybrid"),
            Self::Unknown => None,
        }
    }
}

impl fmt::Display for StrainType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_column().unwrap_or("unknown"))
    }
}

/// One price observation for one product at one location
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductRecord {
    pub region: String,
    pub location: String,
    pub subcategory: String,
    pub product_name: String,
    pub brand: Option<String>,
    pub strain_type: StrainType,
    pub thc_percent: Option<f64>,
    pub size_raw: Option<String>,
    pub grams: Option<f64>,
    pub price: Option<f64>,
    pub price_per_gram: Option<f64>,
    pub product_url: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Field values gathered for one product before the record is sealed
#[derive(Debug, Clone, Default)]
pub struct ProductFields {
    pub product_name: String,
    pub brand: Option<String>,
    pub strain_type: Option<StrainType>,
    pub thc_percent: Option<f64>,
    pub size_raw: Option<String>,
    pub grams: Option<f64>,
    pub price: Option<f64>,
    pub product_url: Option<String>,
}

impl ProductRecord {
    /// Seals extracted fields into a record for `location` and `subcategory`
    ///
    /// Out-of-range values are dropped rather than rejected: THC outside
    /// 0..=100, negative prices and non-positive weights all become `None`.
    /// `price_per_gram` is derived only when both price and a positive
    /// weight are present.
    pub fn new(location: &LocationRecord, subcategory: &str, fields: ProductFields) -> Self {
        let thc_percent = fields.thc_percent.filter(|v| (0.0..=100.0).contains(v));
        let price = fields.price.filter(|p| *p >= 0.0);
        let grams = fields.grams.filter(|g| *g > 0.0);
        let price_per_gram = match (price, grams) {
            (Some(p), Some(g)) => Some(p / g),
            _ => None,
        };

        Self {
            region: location.region_tag.clone(),
            location: location.name.clone(),
            subcategory: subcategory.to_string(),
            product_name: fields.product_name,
            brand: fields.brand.filter(|b| !b.trim().is_empty()),
            strain_type: fields.strain_type.unwrap_or(StrainType::Unknown),
            thc_percent,
            size_raw: fields.size_raw,
            grams,
            price,
            price_per_gram,
            product_url: fields.product_url,
            scraped_at: Utc::now(),
        }
    }

    /// Identity used to suppress duplicate observations within a run
    pub fn dedup_key(&self) -> DedupKey {
        let slug = match &self.product_url {
            Some(url) => product_slug(url),
            None => slugify(&self.product_name),
        };

        DedupKey {
            location: self.location.clone(),
            product_slug: slug,
            size_raw: self.size_raw.clone(),
            subcategory: self.subcategory.clone(),
        }
    }
}

/// Composite identity `(location, productSlug, sizeRaw, subcategory)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub location: String,
    pub product_slug: String,
    pub size_raw: Option<String>,
    pub subcategory: String,
}

/// Extracts the product slug from a product link
///
/// Takes the segment after `/product/`, dropping query and fragment. Links
/// without that marker fall back to their full text, trimmed of slashes.
pub fn product_slug(href: &str) -> String {
    let tail = match href.split_once("/product/") {
        Some((_, rest)) => rest,
        None => href,
    };

    let tail = tail.split(|c: char| c == '?' || c == '#').next().unwrap_or_default();
    tail.trim_matches('/').to_string()
}

/// Deterministic slug for a product name when no link is known
fn slugify(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}
