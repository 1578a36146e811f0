//! Record extraction
//!
//! Extraction runs in two stages. The card stage parses every product card of
//! the expanded listing into a draft. The detail stage fetches a product's
//! detail page, at most once per product link, when the card left the price
//! missing or ambiguous or the brand blank. Each field records where its
//! value came from as a `FieldSource`.
//!
//! A card that cannot be parsed is skipped and its error recorded; it never
//! aborts the rest of the page.

use crate::model::{LocationRecord, ProductFields, ProductRecord, StrainType};
use crate::net::{BrowsingContext, RequestKind};
use crate::scrape::fields::{
    brand_from_text, clean_brand, grams_for_size, parse_size, parse_strain, parse_thc,
    price_candidates, PriceProbe,
};
use crate::scrape::loader::ListingDocument;
use crate::scrape::markup::{element_text, normalize_whitespace, resolve_link, selector};
use scraper::{ElementRef, Html};
use std::collections::HashMap;
use thiserror::Error;
use url::Url;

const PRICE_REGION: &str = ".price, [class*='price']";
const CARD_BRAND_REGION: &str = ".ProductCard_brand, .brand, .c-product-card__brand, \
     [class*='Brand'], [data-testid*='brand']";
const BREADCRUMB_LINKS: &str = "nav a, .breadcrumb a, [class*='breadcrumb'] a";
const DETAIL_BRAND_REGION: &str = "[data-brand], [itemprop='brand'], [class*='brand']";

/// Breadcrumb labels that name a section rather than a brand
const GENERIC_CRUMBS: &[&str] = &[
    "home",
    "flower",
    "pre-rolls",
    "minis",
    "ground & shake",
    "products",
    "shop",
];

/// Price-bearing elements considered per region
const MAX_PRICE_ELEMENTS: usize = 4;

/// Why one card was skipped
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("product link {href} has no name")]
    MissingName { href: String },

    #[error("product {name} has an unusable link {href:?}")]
    InvalidLink { name: String, href: String },
}

/// Where a field's value came from
#[derive(Debug, Clone, PartialEq)]
pub enum FieldSource<T> {
    Card(T),
    Detail(T),
    NotFound,
}

impl<T> FieldSource<T> {
    pub fn value(self) -> Option<T> {
        match self {
            Self::Card(v) | Self::Detail(v) => Some(v),
            Self::NotFound => None,
        }
    }

    pub fn from_detail(&self) -> bool {
        matches!(self, Self::Detail(_))
    }
}

/// Fields parsed from one listing card
#[derive(Debug, Clone)]
pub struct CardDraft {
    pub name: String,
    pub url: Url,
    pub price: PriceProbe,
    pub brand: Option<String>,
    pub size_raw: Option<String>,
    pub thc_percent: Option<f64>,
    pub strain_type: StrainType,
}

impl CardDraft {
    /// True when the card alone cannot settle price or brand
    pub fn needs_detail(&self) -> bool {
        !matches!(self.price, PriceProbe::Clear(_)) || self.brand.is_none()
    }
}

/// Fields parsed from a product detail page
#[derive(Debug, Clone, PartialEq)]
pub struct DetailFields {
    pub price: PriceProbe,
    pub brand: Option<String>,
}

/// Parses every product card in one batch of listing markup, in DOM order
///
/// Product cards are found through their name link: an anchor pointing at
/// `/product/` that does not wrap an image. The card itself is the nearest
/// enclosing `article`, `li` or `div`.
pub fn parse_cards(html: &str, page_url: &Url) -> Vec<Result<CardDraft, ExtractionError>> {
    let document = Html::parse_document(html);
    let (Some(links), Some(images)) = (selector("a[href*='/product/']"), selector("img")) else {
        return Vec::new();
    };

    document
        .select(&links)
        .filter(|link| link.select(&images).next().is_none())
        .map(|link| parse_card(link, page_url))
        .collect()
}

fn parse_card(link: ElementRef<'_>, page_url: &Url) -> Result<CardDraft, ExtractionError> {
    let href = link.value().attr("href").unwrap_or_default();
    let name = element_text(link);
    if name.is_empty() {
        return Err(ExtractionError::MissingName {
            href: href.to_string(),
        });
    }

    let url = resolve_link(href, page_url).ok_or_else(|| ExtractionError::InvalidLink {
        name: name.clone(),
        href: href.to_string(),
    })?;

    let card = enclosing_card(link).unwrap_or(link);
    let card_text = element_text(card);
    let size_raw = parse_size(&card_text);

    Ok(CardDraft {
        price: probe_price(card),
        brand: card_brand(card),
        thc_percent: parse_thc(&card_text),
        strain_type: parse_strain(&card_text),
        size_raw,
        name,
        url,
    })
}

fn enclosing_card(link: ElementRef<'_>) -> Option<ElementRef<'_>> {
    link.ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "article" | "li" | "div"))
}

/// Price candidates from price-bearing elements, else from all region text
fn probe_price(region: ElementRef<'_>) -> PriceProbe {
    let priced: Vec<String> = selector(PRICE_REGION)
        .map(|sel| {
            region
                .select(&sel)
                .map(element_text)
                .filter(|text| text.contains('$'))
                .take(MAX_PRICE_ELEMENTS)
                .collect()
        })
        .unwrap_or_default();

    let text = if priced.is_empty() {
        element_text(region)
    } else {
        priced.join(" ")
    };
    PriceProbe::from_candidates(&price_candidates(&text))
}

fn card_brand(card: ElementRef<'_>) -> Option<String> {
    let sel = selector(CARD_BRAND_REGION)?;
    let element = card.select(&sel).next()?;
    clean_brand(&element_text(element))
}

/// Parses price and brand from a product detail page
///
/// The brand cascade is: breadcrumb trail, a "Brand:" labelled element,
/// brand-tagged elements, then a "Brand: ..." line anywhere in the body.
pub fn parse_detail(html: &str) -> DetailFields {
    let document = Html::parse_document(html);
    let root = document.root_element();

    DetailFields {
        price: probe_price(root),
        brand: breadcrumb_brand(&document)
            .or_else(|| labelled_brand(&document))
            .or_else(|| tagged_brand(&document))
            .or_else(|| {
                let body = root.text().collect::<Vec<_>>().join("\n");
                brand_from_text(&body)
            }),
    }
}

fn breadcrumb_brand(document: &Html) -> Option<String> {
    let sel = selector(BREADCRUMB_LINKS)?;
    document
        .select(&sel)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .take(5)
        .find(|text| {
            let lower = text.to_lowercase();
            !GENERIC_CRUMBS.contains(&lower.as_str()) && (1..=40).contains(&text.chars().count())
        })
}

/// Innermost element whose own text reads "Brand: <value>"
fn labelled_brand(document: &Html) -> Option<String> {
    let sel = selector("body *")?;
    let is_label = |el: &ElementRef<'_>| {
        let text = element_text(*el);
        let lower = text.to_lowercase();
        lower.starts_with("brand") && lower["brand".len()..].trim_start().starts_with(':')
    };

    document
        .select(&sel)
        .filter(|el| is_label(el))
        .find(|el| !el.children().filter_map(ElementRef::wrap).any(|child| is_label(&child)))
        .and_then(|el| clean_brand(&element_text(el)))
}

fn tagged_brand(document: &Html) -> Option<String> {
    let sel = selector(DETAIL_BRAND_REGION)?;
    let element = document.select(&sel).next()?;
    clean_brand(&element_text(element)).or_else(|| {
        element
            .value()
            .attr("data-brand")
            .and_then(|b| clean_brand(&normalize_whitespace(b)))
    })
}

/// Settles the price from card and, if fetched, detail evidence
///
/// A clear card price wins. Otherwise the detail page decides (its lowest
/// candidate when it is ambiguous too). Without detail evidence the card's
/// lowest candidate is used.
pub fn resolve_price(card: &PriceProbe, detail: Option<&PriceProbe>) -> FieldSource<f64> {
    if let PriceProbe::Clear(price) = card {
        return FieldSource::Card(*price);
    }

    if let Some(price) = detail.and_then(PriceProbe::lowest) {
        return FieldSource::Detail(price);
    }

    match card.lowest() {
        Some(price) => FieldSource::Card(price),
        None => FieldSource::NotFound,
    }
}

/// Settles the brand: card first, then the detail page
pub fn resolve_brand(card: Option<&str>, detail: Option<&str>) -> FieldSource<String> {
    match (card, detail) {
        (Some(brand), _) => FieldSource::Card(brand.to_string()),
        (None, Some(brand)) => FieldSource::Detail(brand.to_string()),
        (None, None) => FieldSource::NotFound,
    }
}

/// Products extracted from one listing, plus the cards that were skipped
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<ProductRecord>,
    pub skipped: Vec<String>,
    pub detail_fetches: usize,
}

/// Turns an expanded listing into product records for one location
pub struct RecordExtractor<'a> {
    location: &'a LocationRecord,
    subcategory: &'a str,
}

impl<'a> RecordExtractor<'a> {
    pub fn new(location: &'a LocationRecord, subcategory: &'a str) -> Self {
        Self {
            location,
            subcategory,
        }
    }

    pub async fn extract(&self, ctx: &mut BrowsingContext, listing: &ListingDocument) -> Extraction {
        let mut extraction = Extraction::default();
        let mut drafts = Vec::new();

        for fragment in &listing.fragments {
            for card in parse_cards(&fragment.html, &fragment.url) {
                match card {
                    Ok(draft) => drafts.push(draft),
                    Err(e) => {
                        tracing::debug!(location = %self.location.name, error = %e, "Skipping card");
                        extraction.skipped.push(e.to_string());
                    }
                }
            }
        }

        let mut details: HashMap<String, Option<DetailFields>> = HashMap::new();

        for draft in drafts {
            let detail = if draft.needs_detail() {
                let key = draft.url.to_string();
                if !details.contains_key(&key) {
                    let fetched = self.fetch_detail(ctx, &draft.url).await;
                    extraction.detail_fetches += 1;
                    details.insert(key.clone(), fetched);
                }
                details.get(&key).and_then(Option::as_ref)
            } else {
                None
            };

            let price = resolve_price(&draft.price, detail.map(|d| &d.price));
            let brand = resolve_brand(
                draft.brand.as_deref(),
                detail.and_then(|d| d.brand.as_deref()),
            );
            if price.from_detail() || brand.from_detail() {
                tracing::trace!(product = %draft.name, "Filled fields from detail page");
            }

            let grams = draft.size_raw.as_deref().and_then(grams_for_size);
            let fields = ProductFields {
                product_name: draft.name,
                brand: brand.value(),
                strain_type: Some(draft.strain_type),
                thc_percent: draft.thc_percent,
                size_raw: draft.size_raw,
                grams,
                price: price.value(),
                product_url: Some(draft.url.to_string()),
            };
            extraction
                .records
                .push(ProductRecord::new(self.location, self.subcategory, fields));
        }

        extraction
    }

    /// Detail fetch failures are not card failures; the card values stand
    async fn fetch_detail(&self, ctx: &mut BrowsingContext, url: &Url) -> Option<DetailFields> {
        match ctx.fetch(RequestKind::Detail, url).await {
            Ok(page) => Some(parse_detail(&page.body)),
            Err(e) => {
                tracing::warn!(
                    location = %self.location.name,
                    url = %url,
                    error = %e,
                    "Detail page unavailable, keeping card values"
                );
                None
            }
        }
    }
}
