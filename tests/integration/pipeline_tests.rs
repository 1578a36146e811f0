//! End-to-end runs against a mock site

use crate::common::*;
use leaf_ledger::model::StrainType;
use leaf_ledger::RunOptions;
use wiremock::matchers::{method, path, query_param};
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
async fn test_full_run_two_regional_locations() {
    let server = MockServer::start().await;
    mount_stores(
        &server,
        &[
            ("tampa", "Tampa, FL"),
            ("miami", "Miami, FL"),
            ("atlanta", "Atlanta, GA"),
        ],
    )
    .await;

    let cards = vec![
        card("gelato-35", "Gelato", "Muse", "$35.00"),
        card("runtz-35", "Runtz", "Modern Flower", "$40.00"),
        card("zkittlez-35", "Zkittlez", "Cookies", "$45.00"),
        card("mac-35", "MAC", "Bluebird", "$30.00"),
        card("gelato-35", "Gelato", "Muse", "$35.00"),
    ];
    mount_page(&server, WHOLE_FLOWER, listing(&cards)).await;

    let session = orchestrator(test_config(&server.uri()))
        .run(&whole_flower_only())
        .await
        .expect("run completes");

    let result = &session.results["Whole Flower"];
    assert!(result.success, "unexpected failure: {:?}", result.error_message);
    assert_eq!(result.location_count, 2);
    assert_eq!(result.total_products, 8);
    assert_eq!(result.failed_locations(), 0);
    assert_eq!(session.total_products, 8);
    assert_eq!(session.total_locations, 2);
    assert!(session.success);

    // The out-of-region store is never visited
    let requests = server.received_requests().await.unwrap();
    assert!(requests.iter().all(|r| !r.url.path().contains("atlanta")));

    let gelato = result
        .products
        .iter()
        .find(|p| p.product_name == "Gelato" && p.location == "Tampa, FL")
        .expect("gelato observed in Tampa");
    assert_eq!(gelato.region, "FL");
    assert_eq!(gelato.subcategory, "Whole Flower");
    assert_eq!(gelato.brand.as_deref(), Some("Muse"));
    assert_eq!(gelato.price, Some(35.0));
    assert_eq!(gelato.size_raw.as_deref(), Some("3.5g"));
    assert_eq!(gelato.grams, Some(3.5));
    assert_eq!(gelato.price_per_gram, Some(10.0));
    assert_eq!(gelato.thc_percent, Some(22.5));
    assert_eq!(gelato.strain_type, StrainType::Hybrid);
    assert!(gelato.product_url.as_deref().unwrap().ends_with("/product/gelato-35"));
}

#[tokio::test]
async fn test_load_more_batches_are_followed() {
    let server = MockServer::start().await;
    mount_stores(&server, &[("tampa", "Tampa, FL")]).await;

    // Registered first so it wins over the bare listing route
    Mock::given(method("GET"))
        .and(path(WHOLE_FLOWER))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_string(listing(&[
            card("mac-35", "MAC", "Bluebird", "$30.00"),
            card("runtz-35", "Runtz", "Modern Flower", "$40.00"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let first_batch = html(&format!(
        r#"<div class="grid">{}{}</div><button data-href="{}?page=2">Load More</button>"#,
        card("gelato-35", "Gelato", "Muse", "$35.00"),
        card("zkittlez-35", "Zkittlez", "Cookies", "$45.00"),
        WHOLE_FLOWER
    ));
    mount_page(&server, WHOLE_FLOWER, first_batch).await;

    let session = orchestrator(test_config(&server.uri()))
        .run(&whole_flower_only())
        .await
        .unwrap();

    let result = &session.results["Whole Flower"];
    let names: Vec<_> = result.products.iter().map(|p| p.product_name.as_str()).collect();
    assert_eq!(names, vec!["Gelato", "Zkittlez", "MAC", "Runtz"]);
}

#[tokio::test]
async fn test_detail_page_fills_ambiguous_price_and_missing_brand() {
    let server = MockServer::start().await;
    mount_stores(&server, &[("tampa", "Tampa, FL")]).await;

    let sale_card = r#"<div class="product-card">
            <a href="/product/runtz-35">Runtz</a>
            <span class="price">$40.00</span><span class="price">$30.00</span>
            <span>3.5g Indica</span>
        </div>"#;
    let bare_card = r#"<div class="product-card">
            <a href="/product/mystery-1">Mystery</a><span>1g</span>
        </div>"#;
    mount_page(
        &server,
        WHOLE_FLOWER,
        listing(&[sale_card.to_string(), sale_card.to_string(), bare_card.to_string()]),
    )
    .await;

    Mock::given(method("GET"))
        .and(path("/product/runtz-35"))
        .respond_with(ResponseTemplate::new(200).set_body_string(html(
            r#"<nav class="breadcrumb"><a href="/">Home</a><a href="/brands/jungle-boys">Jungle Boys</a></nav>
               <h1>Runtz</h1><div class="price">$30.00</div>"#,
        )))
        .expect(1)
        .mount(&server)
        .await;
    mount_status(&server, "/product/mystery-1", 404).await;

    let session = orchestrator(test_config(&server.uri()))
        .run(&whole_flower_only())
        .await
        .unwrap();

    let result = &session.results["Whole Flower"];
    assert_eq!(result.total_products, 2);

    let runtz = &result.products[0];
    assert_eq!(runtz.price, Some(30.0));
    assert_eq!(runtz.brand.as_deref(), Some("Jungle Boys"));
    assert_eq!(runtz.strain_type, StrainType::Indica);

    // A missing detail page leaves the card's values in place
    let mystery = &result.products[1];
    assert_eq!(mystery.price, None);
    assert_eq!(mystery.brand, None);
    assert_eq!(mystery.grams, Some(1.0));
    assert_eq!(mystery.price_per_gram, None);
}

#[tokio::test]
async fn test_categories_sum_consistently() {
    let server = MockServer::start().await;
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
    mount_page(
        &server,
        "/category/flower/pre-rolls",
        listing(&[card("gelato-pr", "Gelato Pre-Roll", "Muse", "$12.00")]),
    )
    .await;
    mount_page(
        &server,
        "/category/flower/ground-shake",
        listing(&[
            card("shake-7", "House Shake", "Trulieve", "$25.00"),
            card("shake-14", "House Shake XL", "Trulieve", "$45.00"),
            card("shake-28", "House Shake XXL", "Trulieve", "$80.00"),
        ]),
    )
    .await;

    let mut config = test_config(&server.uri());
    config.orchestrator.max_concurrent_categories = 2;
    config.orchestrator.max_concurrent_locations = 2;

    let session = orchestrator(config)
        .run(&RunOptions {
            persist: false,
            ..RunOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(session.results.len(), 3);
    assert_eq!(session.results["Whole Flower"].total_products, 4);
    assert_eq!(session.results["Pre-Rolls"].total_products, 2);
    assert_eq!(session.results["Ground & Shake"].total_products, 6);

    let summed: usize = session.results.values().map(|r| r.total_products).sum();
    assert_eq!(session.total_products, summed);
    assert_eq!(session.total_locations, 2);

    for result in session.results.values() {
        let per_location: usize = result.locations.iter().map(|l| l.products).sum();
        assert_eq!(per_location, result.total_products);
        assert_eq!(result.products.len(), result.total_products);
        assert!(result.products.iter().all(|p| p.subcategory == result.subcategory));
    }
}

#[tokio::test]
async fn test_max_locations_caps_each_category() {
    let server = MockServer::start().await;
    mount_stores(&server, &[("tampa", "Tampa, FL"), ("miami", "Miami, FL")]).await;
    mount_page(
        &server,
        WHOLE_FLOWER,
        listing(&[card("gelato-35", "Gelato", "Muse", "$35.00")]),
    )
    .await;

    let session = orchestrator(test_config(&server.uri()))
        .run(&RunOptions {
            max_locations: Some(1),
            ..whole_flower_only()
        })
        .await
        .unwrap();

    let result = &session.results["Whole Flower"];
    assert_eq!(result.locations.len(), 1);
    assert_eq!(result.locations[0].name, "Tampa, FL");
    assert_eq!(result.total_products, 1);
}
