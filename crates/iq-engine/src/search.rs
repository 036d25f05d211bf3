//! Embedding search: embeds the query and retrieves the nearest reference
//! texts, optionally restricted to the rule gate's allowed tags.
//!
//! Upstream faults never escape this stage: embedder and index errors are
//! logged and turned into an empty hit list.

use std::collections::BTreeSet;
use std::sync::Arc;

use iq_protocol::{HitPayload, RuleTag, SearchHit};
use serde_json::Value;

use crate::embedder::{Embedder, normalize};
use crate::error::EngineResult;
use crate::index::{Filter, SearchQuery, VectorIndex};

/// Payload field matched against the allowed tags.
pub const RULE_TAGS_FIELD: &str = "rule_tags";

/// Nearest-neighbor retrieval over the intent collection.
#[derive(Clone)]
pub struct EmbeddingSearch {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl EmbeddingSearch {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            collection: collection.into(),
        }
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Up to `limit` hits, best-first. Empty on any upstream fault.
    pub async fn search(
        &self,
        query: &str,
        allowed: Option<&BTreeSet<RuleTag>>,
        limit: usize,
    ) -> Vec<SearchHit> {
        match self.try_search(query, allowed, limit).await {
            Ok(hits) => {
                tracing::debug!(count = hits.len(), limit, "embedding search");
                hits
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    collection = %self.collection,
                    "embedding search failed, returning no hits"
                );
                Vec::new()
            }
        }
    }

    async fn try_search(
        &self,
        query: &str,
        allowed: Option<&BTreeSet<RuleTag>>,
        limit: usize,
    ) -> EngineResult<Vec<SearchHit>> {
        let vector = self.embedder.embed(&normalize(query)).await?;

        let filter = allowed.map(|tags| {
            Filter::any_of(
                RULE_TAGS_FIELD,
                tags.iter().map(|t| Value::from(t.as_str())).collect(),
            )
        });

        let points = self
            .index
            .search(
                &self.collection,
                &SearchQuery {
                    vector,
                    limit,
                    filter,
                },
            )
            .await?;

        let hits = points
            .into_iter()
            .take(limit)
            .filter_map(|p| match HitPayload::from_value(&p.payload) {
                Some(payload) => Some(SearchHit {
                    id: p.id,
                    score: p.score,
                    payload,
                }),
                None => {
                    tracing::warn!(point_id = %p.id, "dropping hit with non-object payload");
                    None
                }
            })
            .collect();

        Ok(hits)
    }
}
