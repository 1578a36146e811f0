//! Failure isolation: retries, timeouts and discovery errors

use crate::common::*;
use leaf_ledger::RunOptions;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const WHOLE_FLOWER: &str = "/category/flower/whole-flower";

fn whole_flower_only() -> RunOptions {
    RunOptions {
        categories: Some(vec!["Whole Flower".to_string()]),
        persist: false,
        ..RunOptions::default()
    }
}

#[tokio::test]
async fn test_exhausted_location_does_not_affect_sibling() {
    let server = MockServer::start().await;

    // Miami's page always fails; 2 retries means 3 attempts
    Mock::given(method("GET"))
        .and(path("/dispensaries/miami"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;
    mount_stores(&server, &[("tampa", "Tampa, FL"), ("miami", "Miami, FL")]).await;
    mount_page(
        &server,
        WHOLE_FLOWER,
        listing(&[
            card("gelato-35", "Gelato", "Muse", "$35.00"),
            card("runtz-35", "Runtz", "Modern Flower", "$40.00"),
        ]),
    )
    .await;

    let session = orchestrator(test_config(&server.uri()))
        .run(&whole_flower_only())
        .await
        .unwrap();

    let result = &session.results["Whole Flower"];
    assert!(result.success);
    assert_eq!(result.location_count, 1);
    assert_eq!(result.total_products, 2);
    assert_eq!(result.failed_locations(), 1);

    let miami = result.locations.iter().find(|l| l.name == "Miami, FL").unwrap();
    assert_eq!(miami.products, 0);
    assert!(miami.error.as_deref().unwrap().contains("after 3 attempts"));
    assert!(result.products.iter().all(|p| p.location == "Tampa, FL"));
}

#[tokio::test]
async fn test_page_timeout_is_retried_per_request() {
    let server = MockServer::start().await;

    // Every attempt outlasts the page timeout; 2 retries means 3 attempts
    Mock::given(method("GET"))
        .and(path("/dispensaries/miami"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(store_page("miami"))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(3)
        .mount(&server)
        .await;
    mount_stores(&server, &[("tampa", "Tampa, FL"), ("miami", "Miami, FL")]).await;
    mount_page(
        &server,
        WHOLE_FLOWER,
        listing(&[card("gelato-35", "Gelato", "Muse", "$35.00")]),
    )
    .await;

    let mut config = test_config(&server.uri());
    config.scraper.page_timeout_ms = 200;

    let session = orchestrator(config).run(&whole_flower_only()).await.unwrap();

    let result = &session.results["Whole Flower"];
    assert_eq!(result.location_count, 1);
    let miami = result.locations.iter().find(|l| l.name == "Miami, FL").unwrap();
    let error = miami.error.as_deref().unwrap();
    assert!(error.contains("after 3 attempts"), "unexpected error: {error}");
    assert!(error.contains("Request timeout"), "unexpected error: {error}");
}

#[tokio::test]
async fn test_slow_location_is_abandoned_after_its_budget() {
    let server = MockServer::start().await;
    mount_stores(&server, &[("tampa", "Tampa, FL")]).await;
    Mock::given(method("GET"))
        .and(path(WHOLE_FLOWER))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(listing(&[card("gelato-35", "Gelato", "Muse", "$35.00")]))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let mut config = test_config(&server.uri());
    config.scraper.location_timeout_secs = 1;

    let session = orchestrator(config).run(&whole_flower_only()).await.unwrap();

    let result = &session.results["Whole Flower"];
    assert_eq!(result.location_count, 0);
    assert_eq!(result.total_products, 0);
    assert!(!result.success);
    assert!(result.locations[0]
        .error
        .as_deref()
        .unwrap()
        .contains("exceeded its 1s budget"));
}

#[tokio::test]
async fn test_unreachable_index_fails_category_only() {
    let server = MockServer::start().await;
    mount_status(&server, "/dispensaries", 503).await;

    let session = orchestrator(test_config(&server.uri()))
        .run(&whole_flower_only())
        .await
        .unwrap();

    let result = &session.results["Whole Flower"];
    assert!(!result.success);
    assert!(result
        .error_message
        .as_deref()
        .unwrap()
        .starts_with("Location discovery failed"));
    assert!(!session.success);
    assert_eq!(session.errors.len(), 1);
}

#[tokio::test]
async fn test_index_without_regional_locations_fails_discovery() {
    let server = MockServer::start().await;
    mount_stores(&server, &[("atlanta", "Atlanta, GA")]).await;

    let session = orchestrator(test_config(&server.uri()))
        .run(&whole_flower_only())
        .await
        .unwrap();

    let result = &session.results["Whole Flower"];
    assert!(!result.success);
    assert!(result.error_message.as_deref().unwrap().contains("no locations in region FL"));
    assert!(result.locations.is_empty());
}

#[tokio::test]
async fn test_below_minimum_marks_category_failed() {
    let server = MockServer::start().await;
    mount_stores(&server, &[("tampa", "Tampa, FL")]).await;
    mount_page(
        &server,
        WHOLE_FLOWER,
        listing(&[card("gelato-35", "Gelato", "Muse", "$35.00")]),
    )
    .await;

    let mut config = test_config(&server.uri());
    config.orchestrator.min_expected_products = 100;

    let session = orchestrator(config).run(&whole_flower_only()).await.unwrap();

    let result = &session.results["Whole Flower"];
    assert!(!result.success);
    assert_eq!(result.total_products, 1);
    assert_eq!(
        result.error_message.as_deref(),
        Some("Only 1 products extracted for Whole Flower, expected at least 100")
    );
}

#[tokio::test]
async fn test_unknown_category_is_rejected() {
    let server = MockServer::start().await;

    let result = orchestrator(test_config(&server.uri()))
        .run(&RunOptions {
            categories: Some(vec!["Edibles".to_string()]),
            ..RunOptions::default()
        })
        .await;

    assert!(result.is_err());
    assert!(server.received_requests().await.unwrap().is_empty());
}
