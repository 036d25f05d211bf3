//! E2E tests for catalog ingestion through the API.

mod helpers;

use std::sync::Arc;

use axum::http::StatusCode;
use serde_json::json;

use helpers::TestHarness;
use iq_api::config::ApiConfig;
use iq_engine::Catalog;

/// Dry run reports the plan and leaves the index untouched.
#[tokio::test]
async fn e2e_dry_run_stores_nothing() {
    let h = TestHarness::new();

    let (status, report) = h.ingest(json!({"dry_run": true})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["status"], "success");
    assert_eq!(report["dry_run"], true);
    assert_eq!(report["intents"], 19);
    assert!(report["vectors"].as_u64().unwrap() > 19);
    assert!(report["message"].as_str().unwrap().contains("dry run"));
    assert!(h.intent_points().await.is_empty());
}

/// Forced re-ingestion produces the same point ids and removes nothing.
#[tokio::test]
async fn e2e_reingestion_is_idempotent() {
    let h = TestHarness::new();

    let (status, first) = h.ingest(json!({"force": true})).await;
    assert_eq!(status, StatusCode::OK);
    let ids = h.intent_points().await;
    assert_eq!(ids.len() as u64, first["vectors"].as_u64().unwrap());

    let (status, second) = h.ingest(json!({"force": true})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["vectors"], first["vectors"]);
    assert_eq!(second["removed"], 0);
    assert_eq!(h.intent_points().await, ids);
    assert_ne!(second["run_id"], first["run_id"]);
}

/// An unforced run over an up-to-date collection is skipped.
#[tokio::test]
async fn e2e_unforced_run_skips() {
    let h = TestHarness::new();
    h.ingest(json!({"force": true})).await;

    let (status, report) = h.ingest(json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["vectors"], 0);
    assert!(report["message"].as_str().unwrap().contains("already ingested"));
}

/// Shrinking the catalog deletes the points of intents that were dropped.
#[tokio::test]
async fn e2e_stale_points_removed() {
    let full = TestHarness::new();
    let (_, full_report) = full.ingest(json!({"force": true})).await;
    let full_vectors = full_report["vectors"].as_u64().unwrap();

    let subset = Catalog::new(
        Catalog::builtin()
            .intents()
            .iter()
            .filter(|i| i.id == 101 || i.id == 503)
            .cloned()
            .collect(),
    )
    .unwrap();
    let small = TestHarness::with_catalog(ApiConfig::default(), subset, Arc::clone(&full.index));

    let (status, report) = small.ingest(json!({"force": true})).await;
    assert_eq!(status, StatusCode::OK);
    let small_vectors = report["vectors"].as_u64().unwrap();
    assert_eq!(report["intents"], 2);
    assert_eq!(report["removed"].as_u64().unwrap(), full_vectors - small_vectors);
    assert_eq!(small.intent_points().await.len() as u64, small_vectors);

    // Only the remaining intents can win now.
    let (status, json) = small.classify("delete user 501").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["decision"]["final_intent_id"], 503);
    let (status, _) = small.classify("add a new customer").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// An embedder outage during ingestion is a server error and stores nothing.
#[tokio::test]
async fn e2e_ingest_embedder_outage() {
    let h = TestHarness::new();
    h.embedder.set_failing(true);

    let (status, json) = h.ingest(json!({"force": true})).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["status"], 500);
    assert!(h.intent_points().await.is_empty());
}

/// The catalog listing reflects what ingestion will store.
#[tokio::test]
async fn e2e_catalog_listing() {
    let h = TestHarness::new();

    let (status, list) = h.get("/api/intents").await;
    assert_eq!(status, StatusCode::OK);
    let listed: u64 = list
        .as_array()
        .unwrap()
        .iter()
        .map(|i| i["reference_texts"].as_u64().unwrap())
        .sum();

    let (_, report) = h.ingest(json!({"dry_run": true})).await;
    assert!(report["vectors"].as_u64().unwrap() <= listed);

    let (status, intent) = h.get("/api/intents/503").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(intent["operation"], "DELETE_RECORD");
    assert_eq!(intent["category"], "WRITE");
}
