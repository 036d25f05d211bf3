use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::intent::SourceKind;
use crate::operations::{Category, Operation};

/// Typed view of a stored point payload, as read back from the index.
///
/// Every field is optional except `source`, which falls back to
/// [`SourceKind::Unknown`]; the voting stage decides what to do with
/// incomplete hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HitPayload {
    pub intent_id: Option<u32>,
    pub source: SourceKind,
    pub operation: Option<Operation>,
    pub category: Option<Category>,
    pub complexity: Option<u8>,
    pub text: Option<String>,
}

impl HitPayload {
    /// Validate a raw JSON payload. Returns `None` if it is not an object.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = value.as_object()?;

        let intent_id = obj
            .get("intent_id")
            .and_then(Value::as_u64)
            .and_then(|id| u32::try_from(id).ok());
        let source = obj
            .get("source")
            .and_then(Value::as_str)
            .map(SourceKind::parse)
            .unwrap_or(SourceKind::Unknown);
        let operation = obj
            .get("operation")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        let category = obj
            .get("category")
            .and_then(|v| serde_json::from_value(v.clone()).ok());
        let complexity = obj
            .get("complexity")
            .and_then(Value::as_u64)
            .and_then(|c| u8::try_from(c).ok());
        let text = obj.get("text").and_then(Value::as_str).map(String::from);

        Some(Self {
            intent_id,
            source,
            operation,
            category,
            complexity,
            text,
        })
    }
}

/// One ranked result of a similarity search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    /// Point id in the vector index.
    pub id: String,
    /// Cosine similarity.
    pub score: f32,
    pub payload: HitPayload,
}

/// Final output of the classification pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ClassificationResult {
    /// Winning intent, or `None` when nothing matched or the winner was
    /// rejected by the confidence gate.
    pub final_intent_id: Option<u32>,
    /// Winner's share of the total vote weight, rounded to 4 decimals.
    pub confidence: f64,
    /// Aggregated weighted score per intent id.
    #[serde(default)]
    pub intent_scores: BTreeMap<u32, f64>,
}

impl ClassificationResult {
    /// The "no intent" outcome.
    pub fn none() -> Self {
        Self::default()
    }
}
