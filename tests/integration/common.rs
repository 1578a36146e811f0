//! Shared fixtures: a fast configuration and site markup builders

use leaf_ledger::config::Config;
use leaf_ledger::net::HttpContextFactory;
use leaf_ledger::Orchestrator;
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a configuration for `base_url` with no pacing and millisecond backoff
pub fn test_config(base_url: &str) -> Config {
    let mut config = Config::for_site(base_url);
    config.scraper.min_delay_ms = 0;
    config.scraper.max_delay_ms = 0;
    config.scraper.retry_base_delay_ms = 1;
    config.scraper.max_retries = 2;
    config.scraper.page_timeout_ms = 10_000;
    config.scraper.location_timeout_secs = 30;
    config.orchestrator.min_expected_products = 1;
    config
}

/// Orchestrator over real HTTP contexts, without a sink
pub fn orchestrator(config: Config) -> Orchestrator {
    let factory = Arc::new(HttpContextFactory::new(config.scraper.clone()));
    Orchestrator::new(config, factory)
}

/// Serves `body` as HTML for GET `route`
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .mount(server)
        .await;
}

/// Serves a bare status code for GET `route`
pub async fn mount_status(server: &MockServer, route: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub fn html(body: &str) -> String {
    format!("<html><head><title>Shop</title></head><body>{body}</body></html>")
}

/// Locations index with the given (slug, display name) anchors
pub fn locations_index(stores: &[(&str, &str)]) -> String {
    let anchors: String = stores
        .iter()
        .map(|(slug, name)| format!(r#"<li><a href="/dispensaries/{slug}">{name}</a></li>"#))
        .collect();
    html(&format!(
        r#"<nav><a href="/">Home</a><a href="/about">About</a></nav><ul>{anchors}</ul>"#
    ))
}

/// Location page whose "Shop At This Store" button selects the store
pub fn store_page(slug: &str) -> String {
    html(&format!(
        r#"<h1>{slug}</h1><a class="btn" href="/dispensaries/{slug}/select">Shop At This Store</a>"#
    ))
}

/// Mounts the index plus a location page and selection target per store
pub async fn mount_stores(server: &MockServer, stores: &[(&str, &str)]) {
    mount_page(server, "/dispensaries", locations_index(stores)).await;
    for (slug, _) in stores {
        mount_page(server, &format!("/dispensaries/{slug}"), store_page(slug)).await;
        mount_page(server, &format!("/dispensaries/{slug}/select"), html("ok")).await;
    }
}

/// A fully populated product card
pub fn card(slug: &str, name: &str, brand: &str, price: &str) -> String {
    format!(
        r#"<div class="product-card">
            <a href="/product/{slug}"><img src="/img/{slug}.png" alt=""></a>
            <a href="/product/{slug}">{name}</a>
            <span class="brand">{brand}</span>
            <span class="price">{price}</span>
            <span class="meta">3.5g | Hybrid | THC: 22.5%</span>
        </div>"#
    )
}

pub fn listing(cards: &[String]) -> String {
    html(&format!(r#"<div class="grid">{}</div>"#, cards.concat()))
}
