//! Persistence of category results to SQLite

use crate::common::*;
use leaf_ledger::model::PersistStatus;
use leaf_ledger::sink::SqliteSink;
use leaf_ledger::{run_categories, RunOptions};
use std::sync::Arc;
use wiremock::MockServer;

async fn mount_site(server: &MockServer) {
    mount_stores(server, &[("tampa", "Tampa, FL"), ("miami", "Miami, FL")]).await;
    mount_page(
        server,
        "/category/flower/whole-flower",
        listing(&[
            card("gelato-35", "Gelato", "Muse", "$35.00"),
            card("runtz-35", "Runtz", "Modern Flower", "$40.00"),
        ]),
    )
    .await;
    // Pre-Rolls has no listing; Ground & Shake has one product per store
    mount_page(
        server,
        "/category/flower/ground-shake",
        listing(&[card("shake-7", "House Shake", "Trulieve", "$25.00")]),
    )
    .await;
}

#[tokio::test]
async fn test_successful_categories_are_written_with_session() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("ledger.db");
    let sink = Arc::new(SqliteSink::new(&db_path).unwrap());

    let mut config = test_config(&server.uri());
    config.orchestrator.min_expected_products = 2;

    let session = orchestrator(config)
        .with_sink(sink.clone())
        .with_config_hash("abc123".to_string())
        .run(&RunOptions::default())
        .await
        .unwrap();

    let flower = &session.results["Whole Flower"];
    assert_eq!(
        flower.persisted,
        PersistStatus::Written {
            table: "TL_Scrape_WHOLE_FLOWER".to_string(),
            rows: 4
        }
    );
    assert_eq!(
        sink.count_rows("TL_Scrape_WHOLE_FLOWER", &session.session_id).unwrap(),
        4
    );

    // Failed categories are reported but never written
    assert!(!session.results["Pre-Rolls"].success);
    assert_eq!(session.results["Pre-Rolls"].persisted, PersistStatus::Skipped);
    assert!(session.results["Ground & Shake"].success);
    assert_eq!(
        sink.count_rows("TL_Scrape_Ground_Shake", &session.session_id).unwrap(),
        2
    );

    drop(sink);
    let conn = rusqlite::Connection::open(&db_path).unwrap();
    let (hash, total, success): (Option<String>, i64, bool) = conn
        .query_row(
            "SELECT config_hash, total_products, success FROM scrape_sessions WHERE session_id = ?1",
            [&session.session_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .unwrap();
    assert_eq!(hash.as_deref(), Some("abc123"));
    assert_eq!(total, session.total_products as i64);
    assert!(!success);

    let price: f64 = conn
        .query_row(
            r#"SELECT price FROM "TL_Scrape_WHOLE_FLOWER" WHERE product_name = 'Runtz' LIMIT 1"#,
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(price, 40.0);
}

#[tokio::test]
async fn test_run_categories_uses_configured_database() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("configured.db");

    let mut config = test_config(&server.uri());
    config.output.database_path = db_path.to_string_lossy().into_owned();

    let session = run_categories(
        config,
        RunOptions {
            categories: Some(vec!["Whole Flower".to_string()]),
            ..RunOptions::default()
        },
    )
    .await
    .unwrap();

    assert!(session.success);
    let sink = SqliteSink::new(&db_path).unwrap();
    assert_eq!(
        sink.count_rows("TL_Scrape_WHOLE_FLOWER", &session.session_id).unwrap(),
        4
    );
    assert_eq!(sink.session_count().unwrap(), 1);
}

#[tokio::test]
async fn test_no_persist_leaves_database_untouched() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("unused.db");
    let sink = Arc::new(SqliteSink::new(&db_path).unwrap());

    let session = orchestrator(test_config(&server.uri()))
        .with_sink(sink.clone())
        .run(&RunOptions {
            categories: Some(vec!["Whole Flower".to_string()]),
            persist: false,
            ..RunOptions::default()
        })
        .await
        .unwrap();

    assert_eq!(session.results["Whole Flower"].persisted, PersistStatus::Skipped);
    assert_eq!(sink.session_count().unwrap(), 0);
}
