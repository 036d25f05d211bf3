//! Vector index abstraction.
//!
//! `VectorIndex` trait covering the operations the engine needs. Two impls:
//! - `QdrantIndex`: Qdrant REST API, lives in `iq-api`
//! - `MemoryIndex`: brute-force cosine over an in-process map, in `mock.rs`
//!
//! Payloads cross this boundary as raw JSON; typed validation happens in
//! the search stage.

use async_trait::async_trait;
use md5::{Digest, Md5};
use serde_json::Value;
use uuid::Uuid;

use crate::error::EngineResult;

/// A vector with its id and payload, ready to upsert.
#[derive(Debug, Clone, PartialEq)]
pub struct Point {
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: Value,
}

/// A search result.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPoint {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// A stored point returned by scrolling (no vector, no score).
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPoint {
    pub id: String,
    pub payload: Value,
}

/// Conjunction of payload conditions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    pub must: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Payload field equals any of `values`. Array fields match when any
    /// element does.
    MatchAny { key: String, values: Vec<Value> },
    /// Payload field equals `value`.
    MatchValue { key: String, value: Value },
}

impl Filter {
    pub fn any_of(key: impl Into<String>, values: Vec<Value>) -> Self {
        Self::default().and_any_of(key, values)
    }

    pub fn value(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::default().and_value(key, value)
    }

    pub fn and_any_of(mut self, key: impl Into<String>, values: Vec<Value>) -> Self {
        self.must.push(Condition::MatchAny {
            key: key.into(),
            values,
        });
        self
    }

    pub fn and_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.must.push(Condition::MatchValue {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Evaluate the filter against a payload.
    pub fn matches(&self, payload: &Value) -> bool {
        self.must.iter().all(|c| c.matches(payload))
    }
}

impl Condition {
    fn matches(&self, payload: &Value) -> bool {
        match self {
            Condition::MatchAny { key, values } => {
                field_matches(payload.get(key), |v| values.contains(v))
            }
            Condition::MatchValue { key, value } => field_matches(payload.get(key), |v| v == value),
        }
    }
}

fn field_matches(field: Option<&Value>, pred: impl Fn(&Value) -> bool) -> bool {
    match field {
        Some(Value::Array(items)) => items.iter().any(&pred),
        Some(v) => pred(v),
        None => false,
    }
}

/// Similarity search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub vector: Vec<f32>,
    pub limit: usize,
    pub filter: Option<Filter>,
}

/// Vector store used for reference texts and schema fragments.
///
/// Implementations are shared across concurrent requests.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Create the collection (cosine distance) if it does not exist.
    async fn ensure_collection(&self, collection: &str, vector_size: usize) -> EngineResult<()>;

    /// Insert or overwrite points by id.
    async fn upsert(&self, collection: &str, points: Vec<Point>) -> EngineResult<()>;

    /// Best-first similarity search, payloads included.
    async fn search(&self, collection: &str, query: &SearchQuery)
    -> EngineResult<Vec<ScoredPoint>>;

    /// List stored points matching `filter`, up to `limit`.
    async fn scroll(
        &self,
        collection: &str,
        filter: Option<&Filter>,
        limit: usize,
    ) -> EngineResult<Vec<StoredPoint>>;

    /// Delete points by id. Unknown ids are ignored.
    async fn delete(&self, collection: &str, ids: &[String]) -> EngineResult<()>;

    /// Backend name (for logging).
    fn backend_name(&self) -> &str;
}

/// Stable point id: MD5 of `raw`, rendered as a hyphenated UUID.
///
/// The hex digits are exactly the MD5 hex digest of `raw`.
pub fn deterministic_id(raw: &str) -> String {
    let digest = Md5::digest(raw.as_bytes());
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest);
    Uuid::from_bytes(bytes).to_string()
}
