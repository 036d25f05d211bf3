//! API route definitions and router builder.

pub mod classify;
pub mod generate;
pub mod health;
pub mod intents;
pub mod schema;

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// CORS policy: any origin when `origins` is empty, otherwise exactly those.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(allowed))
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState, cors_origins: &[String]) -> Router {
    let api = Router::new()
        // Classification
        .route("/classify-intent", post(classify::classify_intent))
        // Intent catalog
        .route("/intents", get(intents::list_intents))
        .route("/intents/{id}", get(intents::get_intent))
        .route("/intents/ingest", post(intents::ingest_intents))
        // Database schema
        .route("/schema/ingest", post(schema::ingest_schema))
        .route("/schema/retrieval", post(schema::retrieve_schema))
        // SQL generation
        .route("/generate-sql", post(generate::generate_sql));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer(cors_origins))
        .with_state(state)
}
