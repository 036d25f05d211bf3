//! Database schema endpoints.

use axum::Json;
use axum::extract::State;

use iq_protocol::api::{SchemaIngestReport, SchemaIngestRequest, SchemaRetrievalRequest};
use iq_protocol::schema::SchemaContext;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /api/schema/ingest — embed table and column nodes.
pub async fn ingest_schema(
    State(state): State<AppState>,
    Json(req): Json<SchemaIngestRequest>,
) -> ApiResult<Json<SchemaIngestReport>> {
    if req.tables.is_empty() {
        return Err(ApiError::BadRequest("tables must not be empty".into()));
    }
    if req.tables.iter().any(|t| t.table_name.trim().is_empty()) {
        return Err(ApiError::BadRequest("table_name must not be empty".into()));
    }

    let report = state.schema.ingest(&req.tables).await?;
    Ok(Json(report))
}

/// POST /api/schema/retrieval — relevant tables for a question.
pub async fn retrieve_schema(
    State(state): State<AppState>,
    Json(req): Json<SchemaRetrievalRequest>,
) -> ApiResult<Json<SchemaContext>> {
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }
    if req.top_k == 0 {
        return Err(ApiError::BadRequest("top_k must be positive".into()));
    }

    Ok(Json(state.schema.retrieve(&req.query, req.top_k).await))
}
