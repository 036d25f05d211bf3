//! Intent catalog endpoints.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};

use iq_protocol::Intent;
use iq_protocol::api::{IngestReport, IngestRequest, IngestStatus, IntentSummary};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// GET /api/intents — list the catalog.
pub async fn list_intents(State(state): State<AppState>) -> Json<Vec<IntentSummary>> {
    Json(state.catalog.intents().iter().map(IntentSummary::from).collect())
}

/// GET /api/intents/{id} — full intent definition.
pub async fn get_intent(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> ApiResult<Json<Intent>> {
    state
        .catalog
        .get(id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("intent {id} not found")))
}

/// POST /api/intents/ingest — load the catalog into the vector index.
///
/// An empty body means `{force: false, dry_run: false}`. One run at a
/// time; a concurrent request gets 409.
pub async fn ingest_intents(
    State(state): State<AppState>,
    body: Bytes,
) -> ApiResult<Json<IngestReport>> {
    let options: IngestRequest = if body.is_empty() {
        IngestRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::BadRequest(format!("invalid ingest request: {e}")))?
    };

    let Ok(_guard) = state.ingest_lock.try_lock() else {
        return Err(ApiError::Conflict("catalog ingestion already running".into()));
    };

    let report = state.ingestor.ingest(&state.catalog, &options).await;
    match report.status {
        IngestStatus::Success => Ok(Json(report)),
        IngestStatus::Error => Err(ApiError::Internal(report.message)),
    }
}
