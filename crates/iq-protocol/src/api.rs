//! HTTP request and response bodies shared by the server and its clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classification::ClassificationResult;
use crate::intent::Intent;
use crate::operations::{Category, Operation};
use crate::schema::TableSchema;

/// Body of `POST /api/classify-intent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyRequest {
    pub query: String,
}

/// One ranked reference-text match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentMatch {
    /// Owning intent id rendered as a string ("unknown" if the payload had none).
    pub intent_id: String,
    /// Similarity score of this hit, rounded to 4 decimals.
    pub confidence: f64,
    /// Rule-gate tags the search was restricted to.
    pub allowed_operations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifyResponse {
    pub query: String,
    pub matches: Vec<IntentMatch>,
    /// Voted and gated decision over the same hits.
    pub decision: ClassificationResult,
}

/// Catalog listing entry (`GET /api/intents`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSummary {
    pub id: u32,
    pub operation: Operation,
    pub category: Category,
    pub complexity: u8,
    pub sql_pattern: String,
    pub text: String,
    pub reference_texts: usize,
}

impl From<&Intent> for IntentSummary {
    fn from(intent: &Intent) -> Self {
        Self {
            id: intent.id,
            operation: intent.operation,
            category: intent.category,
            complexity: intent.complexity,
            sql_pattern: intent.sql_pattern.clone(),
            text: intent.text.clone(),
            reference_texts: intent.variant_count(),
        }
    }
}

/// Body of `POST /api/intents/ingest`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Re-ingest even when the collection already holds exactly the points
    /// and payloads the catalog would write. Unforced runs skip that case.
    #[serde(default)]
    pub force: bool,
    /// Plan the ingestion without embedding or storing anything.
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Success,
    Error,
}

/// Outcome of a catalog ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestReport {
    pub run_id: Uuid,
    pub status: IngestStatus,
    pub dry_run: bool,
    /// Intents processed.
    pub intents: usize,
    /// Vectors stored (or planned, in dry-run mode).
    pub vectors: usize,
    /// Stale points deleted because they no longer belong to the catalog.
    pub removed: usize,
    pub message: String,
    pub finished_at: DateTime<Utc>,
}

/// Body of `POST /api/schema/ingest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaIngestRequest {
    pub tables: Vec<TableSchema>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaIngestReport {
    pub tables: usize,
    pub vectors: usize,
}

/// Body of `POST /api/schema/retrieval`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaRetrievalRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_top_k() -> usize {
    15
}

/// Body of `POST /api/generate-sql`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSqlRequest {
    pub query: String,
    /// Registered generator name.
    #[serde(default = "default_provider")]
    pub provider: String,
}

fn default_provider() -> String {
    "ollama".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateSqlResponse {
    pub status: String,
    pub user_query: String,
    pub generated_sql: String,
    pub provider: String,
    pub meta: GenerationMeta,
}

/// Context used for a generation, returned for debugging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationMeta {
    pub schema_tables: Vec<String>,
    pub intents_found: usize,
    /// Classified intent, if the decision passed the confidence gate.
    pub intent: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_omits_absent_optionals() {
        let m = IntentMatch {
            intent_id: "unknown".into(),
            confidence: 0.5,
            allowed_operations: vec!["SELECT_BASIC".into()],
            category: None,
            source: None,
            text: None,
        };
        let json = serde_json::to_value(&m).unwrap();
        assert!(json.get("category").is_none());
        assert_eq!(json["intent_id"], "unknown");
    }

    #[test]
    fn ingest_request_defaults() {
        let req: IngestRequest = serde_json::from_str("{}").unwrap();
        assert!(!req.dry_run);
        assert!(!req.force);
    }

    #[test]
    fn retrieval_and_generation_defaults() {
        let req: SchemaRetrievalRequest = serde_json::from_str(r#"{"query": "users"}"#).unwrap();
        assert_eq!(req.top_k, 15);

        let req: GenerateSqlRequest = serde_json::from_str(r#"{"query": "users"}"#).unwrap();
        assert_eq!(req.provider, "ollama");
    }

    #[test]
    fn ingest_status_serialization() {
        assert_eq!(
            serde_json::to_string(&IngestStatus::Success).unwrap(),
            r#""success""#
        );
    }
}
