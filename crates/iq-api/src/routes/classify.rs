//! Intent classification endpoint.

use axum::Json;
use axum::extract::State;

use iq_protocol::SearchHit;
use iq_protocol::api::{ClassifyRequest, ClassifyResponse, IntentMatch};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// POST /api/classify-intent — rank reference-text matches and decide.
///
/// Zero hits (including a failed search) is reported as 404.
pub async fn classify_intent(
    State(state): State<AppState>,
    Json(req): Json<ClassifyRequest>,
) -> ApiResult<Json<ClassifyResponse>> {
    let classification = state.classifier.classify(&req.query).await;

    if classification.hits.is_empty() {
        return Err(ApiError::NotFound(format!(
            "no matching intent for query '{}'",
            req.query
        )));
    }

    let allowed: Vec<String> = classification
        .allowed
        .iter()
        .map(|t| t.as_str().to_string())
        .collect();

    let matches = classification
        .hits
        .iter()
        .take(state.match_limit)
        .map(|hit| to_match(hit, &allowed))
        .collect();

    Ok(Json(ClassifyResponse {
        query: req.query,
        matches,
        decision: classification.result,
    }))
}

fn to_match(hit: &SearchHit, allowed: &[String]) -> IntentMatch {
    let p = &hit.payload;
    IntentMatch {
        intent_id: p
            .intent_id
            .map(|id| id.to_string())
            .unwrap_or_else(|| "unknown".into()),
        confidence: (f64::from(hit.score) * 10_000.0).round() / 10_000.0,
        allowed_operations: allowed.to_vec(),
        category: p.category.map(|c| c.as_str().to_string()),
        source: Some(p.source.as_str().to_string()),
        text: p.text.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iq_protocol::{Category, HitPayload, SourceKind};

    #[test]
    fn match_rounds_score_and_renders_missing_id() {
        let hit = SearchHit {
            id: "p".into(),
            score: 0.123456,
            payload: HitPayload {
                intent_id: None,
                source: SourceKind::Keyword,
                operation: None,
                category: Some(Category::Read),
                complexity: None,
                text: Some("list".into()),
            },
        };
        let m = to_match(&hit, &["SELECT_BASIC".to_string()]);
        assert_eq!(m.intent_id, "unknown");
        assert!((m.confidence - 0.1235).abs() < 1e-9);
        assert_eq!(m.category.as_deref(), Some("READ"));
        assert_eq!(m.source.as_deref(), Some("keyword"));
        assert_eq!(m.allowed_operations, vec!["SELECT_BASIC"]);
    }
}
