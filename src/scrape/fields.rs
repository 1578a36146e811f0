//! Text-level field parsers
//!
//! Each parser takes already-extracted visible text and returns the
//! normalized value, or `None` when the text carries no usable value.
//! None of them fail: an unparseable field is simply absent.

use crate::model::StrainType;
use crate::scrape::markup::normalize_whitespace;
use regex::Regex;
use std::sync::LazyLock;

static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\s*([0-9]+(?:\.[0-9]{2})?)").expect("valid regex"));

static SIZE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b([0-9]+(?:\.[0-9]+)?)\s?(g|oz)\b").expect("valid regex"));

static THC_RANGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\bTHCA?\b[^0-9]*([0-9]+(?:\.[0-9]+)?)\s*%?\s*(?:-|–|—|to)\s*([0-9]+(?:\.[0-9]+)?)\s*%",
    )
    .expect("valid regex")
});

static THC_SINGLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bTHCA?\b[^0-9%]*([0-9]+(?:\.[0-9]+)?)\s*%").expect("valid regex")
});

static THC_TRAILING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)([0-9]+(?:\.[0-9]+)?)\s*%\s*THCA?\b").expect("valid regex")
});

static BRAND_LINE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Brand\s*[:\-]\s*([^\n\r]+)").expect("valid regex"));

/// Size token to grams; anything else leaves grams unset
const SIZE_TABLE: &[(&str, f64)] = &[
    ("0.5g", 0.5),
    ("1g", 1.0),
    ("2g", 2.0),
    ("3.5g", 3.5),
    ("7g", 7.0),
    ("10g", 10.0),
    ("14g", 14.0),
    ("28g", 28.0),
];

/// Result of looking for a price in one region of markup
#[derive(Debug, Clone, PartialEq)]
pub enum PriceProbe {
    /// Exactly one distinct value
    Clear(f64),

    /// Several distinct values with no way to pick a primary one
    Ambiguous(Vec<f64>),

    Missing,
}

impl PriceProbe {
    /// Classifies candidate prices in document order
    pub fn from_candidates(candidates: &[f64]) -> Self {
        let mut distinct: Vec<f64> = Vec::new();
        for value in candidates {
            if !distinct.iter().any(|seen| same_amount(*seen, *value)) {
                distinct.push(*value);
            }
        }

        match distinct.len() {
            0 => Self::Missing,
            1 => Self::Clear(distinct[0]),
            _ => Self::Ambiguous(distinct),
        }
    }

    /// Lowest candidate, used when no clear primary exists
    pub fn lowest(&self) -> Option<f64> {
        match self {
            Self::Clear(value) => Some(*value),
            Self::Ambiguous(values) => values.iter().copied().reduce(f64::min),
            Self::Missing => None,
        }
    }
}

fn same_amount(a: f64, b: f64) -> bool {
    (a * 100.0).round() == (b * 100.0).round()
}

/// Every currency amount in `text`, in order
pub fn price_candidates(text: &str) -> Vec<f64> {
    PRICE_RE
        .captures_iter(text)
        .filter_map(|caps| caps.get(1)?.as_str().parse().ok())
        .collect()
}

/// First currency amount in `text`
pub fn parse_price(text: &str) -> Option<f64> {
    price_candidates(text).into_iter().next()
}

/// First size token in `text`, lowercased with no inner space ("3.5g")
pub fn parse_size(text: &str) -> Option<String> {
    let caps = SIZE_RE.captures(text)?;
    Some(format!(
        "{}{}",
        caps.get(1)?.as_str(),
        caps.get(2)?.as_str().to_lowercase()
    ))
}

/// Maps a size token through the fixed size table
pub fn grams_for_size(size: &str) -> Option<f64> {
    let size = size.trim().to_lowercase();
    SIZE_TABLE
        .iter()
        .find(|(token, _)| *token == size)
        .map(|(_, grams)| *grams)
}

/// THC percentage; a labelled range yields its midpoint
pub fn parse_thc(text: &str) -> Option<f64> {
    if let Some(caps) = THC_RANGE_RE.captures(text) {
        let low: f64 = caps.get(1)?.as_str().parse().ok()?;
        let high: f64 = caps.get(2)?.as_str().parse().ok()?;
        return Some((low + high) / 2.0);
    }

    THC_SINGLE_RE
        .captures(text)
        .or_else(|| THC_TRAILING_RE.captures(text))
        .and_then(|caps| caps.get(1)?.as_str().parse().ok())
}

/// Strain keyword, checked in the order Indica, Sativa, Hybrid
pub fn parse_strain(text: &str) -> StrainType {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .collect();
    let has = |keyword: &str| words.iter().any(|w| w == keyword);

    if has("indica") {
        StrainType::Indica
    } else if has("sativa") {
        StrainType::Sativa
    } else if has("hybrid") {
        StrainType::Hybrid
    } else {
        StrainType::Unknown
    }
}

/// Cleans a brand candidate; blank or label-only text yields `None`
pub fn clean_brand(text: &str) -> Option<String> {
    let text = normalize_whitespace(text);
    let text = match text.split_once(':') {
        Some((label, rest)) if label.trim().eq_ignore_ascii_case("brand") => rest.trim().to_string(),
        _ => text,
    };

    (!text.is_empty() && text.chars().count() <= 80).then_some(text)
}

/// Value of a `Brand: ...` line anywhere in `text`
pub fn brand_from_text(text: &str) -> Option<String> {
    let caps = BRAND_LINE_RE.captures(text)?;
    clean_brand(caps.get(1)?.as_str())
}
