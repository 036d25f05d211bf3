//! Classification pipeline.
//!
//! `Start → RuleGated → Searched → Voted → Gated → Done`, strictly linear.
//! Every stage recovers its own faults, so `classify` is infallible: the
//! worst outcome is an empty hit list and no intent.

use std::collections::BTreeSet;
use std::sync::Arc;

use iq_protocol::{ClassificationResult, RuleTag, SearchHit};
use serde::{Deserialize, Serialize};

use crate::embedder::Embedder;
use crate::gate::{ConfidenceGate, DEFAULT_THRESHOLD};
use crate::index::VectorIndex;
use crate::rule_gate::RuleGate;
use crate::search::EmbeddingSearch;
use crate::voting::{SourceWeights, vote};

/// Tuning knobs for the classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Minimum confidence for a winner to be accepted.
    #[serde(default = "default_threshold")]
    pub confidence_threshold: f64,

    /// Hits retrieved per classification.
    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    /// Hits reported per match listing.
    #[serde(default = "default_match_limit")]
    pub match_limit: usize,

    /// Apply the keyword rule gate as a search filter.
    #[serde(default = "default_rule_gate")]
    pub rule_gate: bool,

    #[serde(default)]
    pub weights: SourceWeights,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

fn default_search_limit() -> usize {
    10
}

fn default_match_limit() -> usize {
    5
}

fn default_rule_gate() -> bool {
    true
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: default_threshold(),
            search_limit: default_search_limit(),
            match_limit: default_match_limit(),
            rule_gate: default_rule_gate(),
            weights: SourceWeights::default(),
        }
    }
}

/// Pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Start,
    RuleGated,
    Searched,
    Voted,
    Gated,
    Done,
}

/// Everything one classification produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub query: String,
    /// Tags the search was restricted to (all tags when the gate is off).
    pub allowed: BTreeSet<RuleTag>,
    /// Best-first hits.
    pub hits: Vec<SearchHit>,
    /// Arg-max of the vote, before the confidence gate.
    pub top_intent: Option<u32>,
    /// Gated decision.
    pub result: ClassificationResult,
    /// Stages visited.
    pub trace: Vec<Stage>,
}

impl Classification {
    pub fn stage(&self) -> Stage {
        self.trace.last().copied().unwrap_or(Stage::Start)
    }
}

/// Rule gate + embedding search + voting + confidence gate.
#[derive(Clone)]
pub struct IntentClassifier {
    rule_gate: Option<Arc<RuleGate>>,
    search: EmbeddingSearch,
    weights: SourceWeights,
    gate: ConfidenceGate,
    search_limit: usize,
}

impl IntentClassifier {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        collection: impl Into<String>,
        config: &ClassifierConfig,
    ) -> Self {
        Self {
            rule_gate: config.rule_gate.then(|| Arc::new(RuleGate::new())),
            search: EmbeddingSearch::new(embedder, index, collection),
            weights: config.weights,
            gate: ConfidenceGate::new(config.confidence_threshold),
            search_limit: config.search_limit,
        }
    }

    pub fn search(&self) -> &EmbeddingSearch {
        &self.search
    }

    pub async fn classify(&self, query: &str) -> Classification {
        let mut trace = vec![Stage::Start];

        let (allowed, filter) = match &self.rule_gate {
            Some(gate) => {
                let tags = gate.allowed_tags(query);
                (tags.clone(), Some(tags))
            }
            None => (all_tags(), None),
        };
        trace.push(Stage::RuleGated);

        let hits = self
            .search
            .search(query, filter.as_ref(), self.search_limit)
            .await;
        trace.push(Stage::Searched);

        let voted = vote(&hits, &self.weights);
        let top_intent = voted.final_intent_id;
        trace.push(Stage::Voted);

        let result = self.gate.apply(voted);
        trace.push(Stage::Gated);
        trace.push(Stage::Done);

        tracing::info!(
            query,
            hits = hits.len(),
            top_intent,
            final_intent = result.final_intent_id,
            confidence = result.confidence,
            "classification complete"
        );

        Classification {
            query: query.to_string(),
            allowed,
            hits,
            top_intent,
            result,
            trace,
        }
    }
}

fn all_tags() -> BTreeSet<RuleTag> {
    BTreeSet::from([
        RuleTag::Insert,
        RuleTag::Update,
        RuleTag::Delete,
        RuleTag::SelectWhere,
        RuleTag::SelectAggregate,
        RuleTag::SelectBasic,
    ])
}
