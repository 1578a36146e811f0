//! Session statistics
//!
//! Figures derived from a finished `ScrapingSession` and a console printout
//! of them.

use crate::model::{PersistStatus, ScrapingSession};

/// Statistics summary of one session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStatistics {
    /// Products across all categories
    pub total_products: usize,

    /// Products carrying a price
    pub priced_products: usize,

    /// Products whose brand is known
    pub branded_products: usize,

    /// Location scrapes that failed, summed over categories
    pub failed_locations: usize,

    /// Mean of the known price-per-gram values
    pub average_price_per_gram: Option<f64>,

    /// Categories whose rows reached the sink
    pub persisted_categories: usize,
}

impl SessionStatistics {
    pub fn from_session(session: &ScrapingSession) -> Self {
        let products = session.results.values().flat_map(|r| r.products.iter());

        let mut priced_products = 0;
        let mut branded_products = 0;
        let mut ppg_sum = 0.0;
        let mut ppg_count = 0usize;
        for product in products {
            if product.price.is_some() {
                priced_products += 1;
            }
            if product.brand.is_some() {
                branded_products += 1;
            }
            if let Some(ppg) = product.price_per_gram {
                ppg_sum += ppg;
                ppg_count += 1;
            }
        }

        Self {
            total_products: session.total_products,
            priced_products,
            branded_products,
            failed_locations: session.results.values().map(|r| r.failed_locations()).sum(),
            average_price_per_gram: (ppg_count > 0).then(|| ppg_sum / ppg_count as f64),
            persisted_categories: session
                .results
                .values()
                .filter(|r| matches!(r.persisted, PersistStatus::Written { .. }))
                .count(),
        }
    }

    /// Share of products with a price, in percent
    pub fn priced_rate(&self) -> f64 {
        if self.total_products == 0 {
            0.0
        } else {
            (self.priced_products as f64 / self.total_products as f64) * 100.0
        }
    }
}

/// Prints session statistics to stdout in a formatted manner
pub fn print_session(session: &ScrapingSession) {
    let stats = SessionStatistics::from_session(session);

    println!("=== Session {} ===\n", session.session_id);

    println!("Overview:");
    println!("  Total products: {}", session.total_products);
    println!("  Locations scraped: {}", session.total_locations);
    println!("  Failed location scrapes: {}", stats.failed_locations);
    println!(
        "  Priced products: {} ({:.1}%)",
        stats.priced_products,
        stats.priced_rate()
    );
    println!("  Branded products: {}", stats.branded_products);
    if let Some(avg) = stats.average_price_per_gram {
        println!("  Average price per gram: ${:.2}", avg);
    }
    println!("  Duration: {:.1}s", session.duration_seconds);
    println!();

    println!("Categories:");
    for result in session.results.values() {
        let status = if result.success { "ok" } else { "FAILED" };
        println!(
            "  {}: {} products from {} locations [{}]",
            result.subcategory, result.total_products, result.location_count, status
        );
        match &result.persisted {
            PersistStatus::Written { table, rows } => println!("    -> {} rows to {}", rows, table),
            PersistStatus::Failed { table, error } => {
                println!("    -> write to {} failed: {}", table, error)
            }
            PersistStatus::Skipped => {}
        }
    }
    println!();

    let unpersisted = session.unpersisted_categories();
    if !unpersisted.is_empty() {
        println!("Not persisted: {}", unpersisted.join(", "));
        println!();
    }

    if !session.errors.is_empty() {
        println!("Errors ({}):", session.errors.len());
        for error in &session.errors {
            println!("  - {}", error);
        }
        println!();
    }

    println!(
        "Result: {} ({} of {} categories persisted)",
        if session.success { "success" } else { "failed" },
        stats.persisted_categories,
        session.results.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CategoryResult, LocationRecord, ProductFields, ProductRecord};

    fn product(price: Option<f64>, grams: Option<f64>, brand: Option<&str>) -> ProductRecord {
        let location = LocationRecord {
            name: "Tampa, FL".to_string(),
            region_tag: "FL".to_string(),
            source_url: "https://example.com/dispensaries/tampa".to_string(),
        };
        ProductRecord::new(
            &location,
            "Whole Flower",
            ProductFields {
                product_name: "Gelato".to_string(),
                price,
                grams,
                brand: brand.map(str::to_string),
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_statistics_from_session() {
        let mut result = CategoryResult::failed("Whole Flower", String::new());
        result.products = vec![
            product(Some(35.0), Some(3.5), Some("Muse")),
            product(Some(20.0), Some(1.0), None),
            product(None, Some(3.5), Some("Modern Flower")),
        ];
        result.total_products = 3;
        result.success = true;
        result.error_message = None;

        let mut session = ScrapingSession::start();
        session.add_result(result);
        session.finalize();

        let stats = SessionStatistics::from_session(&session);
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.priced_products, 2);
        assert_eq!(stats.branded_products, 2);
        assert_eq!(stats.average_price_per_gram, Some(15.0));
        assert!((stats.priced_rate() - 66.666).abs() < 0.01);
        assert_eq!(stats.persisted_categories, 0);
    }

    #[test]
    fn test_empty_session() {
        let stats = SessionStatistics::from_session(&ScrapingSession::start());
        assert_eq!(stats.priced_rate(), 0.0);
        assert_eq!(stats.average_price_per_gram, None);
    }
}
