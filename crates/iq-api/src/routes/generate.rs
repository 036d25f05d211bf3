//! SQL generation endpoint.

use axum::Json;
use axum::extract::State;

use iq_protocol::api::{GenerateSqlRequest, GenerateSqlResponse};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /api/generate-sql — natural language to SQL via a named provider.
pub async fn generate_sql(
    State(state): State<AppState>,
    Json(req): Json<GenerateSqlRequest>,
) -> ApiResult<Json<GenerateSqlResponse>> {
    if req.query.trim().is_empty() {
        return Err(ApiError::BadRequest("query must not be empty".into()));
    }

    let response = state.agent.generate(&req.query, &req.provider).await?;
    tracing::info!(
        provider = %response.provider,
        intent = response.meta.intent,
        tables = response.meta.schema_tables.len(),
        "SQL generated"
    );
    Ok(Json(response))
}
