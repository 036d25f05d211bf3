//! Shared test harness for E2E integration tests.
//!
//! Wires the API router over a `HashingEmbedder` and a `MemoryIndex` that
//! the test keeps handles to, so it can inspect stored points and inject
//! upstream faults.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use iq_api::config::ApiConfig;
use iq_api::routes::build_router;
use iq_api::state::{AppState, sample_tables};
use iq_engine::mock::{HashingEmbedder, MemoryIndex};
use iq_engine::{Catalog, SqlGenerator};

/// Embedding width used by the harness. Wide enough that the built-in
/// catalog's vocabulary rarely collides.
pub const DIMENSION: usize = 1024;

pub struct TestHarness {
    pub state: AppState,
    pub router: Router,
    pub config: ApiConfig,
    pub embedder: Arc<HashingEmbedder>,
    pub index: Arc<MemoryIndex>,
}

impl TestHarness {
    /// Built-in catalog, nothing ingested.
    pub fn new() -> Self {
        Self::with_config(ApiConfig::default())
    }

    pub fn with_config(config: ApiConfig) -> Self {
        Self::with_catalog(config, Catalog::builtin(), Arc::new(MemoryIndex::new()))
    }

    /// Harness over an existing index, e.g. to re-ingest a changed catalog.
    pub fn with_catalog(config: ApiConfig, catalog: Catalog, index: Arc<MemoryIndex>) -> Self {
        let embedder = Arc::new(HashingEmbedder::new(DIMENSION));
        let state = AppState::new(embedder.clone(), index.clone(), catalog, &config);
        let router = build_router(state.clone(), &config.cors_origins);
        Self {
            state,
            router,
            config,
            embedder,
            index,
        }
    }

    /// Built-in catalog ingested through the API and sample tables stored.
    pub async fn ingested() -> Self {
        Self::ingested_with_config(ApiConfig::default()).await
    }

    pub async fn ingested_with_config(config: ApiConfig) -> Self {
        let h = Self::with_config(config);
        let (status, report) = h.ingest(json!({"force": true})).await;
        assert_eq!(status, StatusCode::OK, "ingestion failed: {report}");
        let (status, _) = h
            .post("/api/schema/ingest", json!({ "tables": sample_tables() }))
            .await;
        assert_eq!(status, StatusCode::OK);
        h
    }

    /// Register a generation provider and rebuild the router.
    pub fn with_generator(mut self, generator: Arc<dyn SqlGenerator>) -> Self {
        self.state = self.state.with_generator(generator);
        self.router = build_router(self.state.clone(), &self.config.cors_origins);
        self
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
        )
        .await
    }

    /// POST /api/classify-intent.
    pub async fn classify(&self, query: &str) -> (StatusCode, Value) {
        self.post("/api/classify-intent", json!({ "query": query })).await
    }

    /// POST /api/intents/ingest.
    pub async fn ingest(&self, options: Value) -> (StatusCode, Value) {
        self.post("/api/intents/ingest", options).await
    }

    /// Points currently stored for the intent catalog.
    pub async fn intent_points(&self) -> Vec<String> {
        let mut ids = self.index.point_ids(&self.config.index.collection).await;
        ids.sort();
        ids
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}
