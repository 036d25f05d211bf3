//! Weighted voting over search hits.
//!
//! Each hit contributes `score × weight(source)` to its intent. The intent
//! with the largest aggregate wins and its confidence is its share of the
//! total, so many moderately similar hits can outvote a single strong one.
//! Exact ties go to the intent whose first hit ranked earliest.

use std::collections::{BTreeMap, HashMap};

use iq_protocol::{ClassificationResult, SearchHit, SourceKind};
use serde::{Deserialize, Serialize};

/// Trust multiplier per reference-text source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceWeights {
    #[serde(default = "default_description")]
    pub description: f64,
    #[serde(default = "default_example")]
    pub example: f64,
    #[serde(default = "default_paraphrase")]
    pub paraphrase: f64,
    #[serde(default = "default_keyword")]
    pub keyword: f64,
    /// Applied when the stored `source` is missing or unrecognized.
    #[serde(default = "default_unknown")]
    pub unknown: f64,
}

fn default_description() -> f64 {
    1.0
}
fn default_example() -> f64 {
    0.9
}
fn default_paraphrase() -> f64 {
    0.7
}
fn default_keyword() -> f64 {
    0.4
}
fn default_unknown() -> f64 {
    0.5
}

impl Default for SourceWeights {
    fn default() -> Self {
        Self {
            description: default_description(),
            example: default_example(),
            paraphrase: default_paraphrase(),
            keyword: default_keyword(),
            unknown: default_unknown(),
        }
    }
}

impl SourceWeights {
    pub fn weight(&self, source: SourceKind) -> f64 {
        match source {
            SourceKind::Description => self.description,
            SourceKind::Example => self.example,
            SourceKind::Paraphrase => self.paraphrase,
            SourceKind::Keyword => self.keyword,
            SourceKind::Unknown => self.unknown,
        }
    }
}

/// Aggregate hits into a single decision.
///
/// Hits without an intent id are skipped. Negative similarity scores and
/// negative or NaN weights count as zero so the confidence stays within
/// `[0, 1]`.
pub fn vote(hits: &[SearchHit], weights: &SourceWeights) -> ClassificationResult {
    // Insertion-ordered accumulation; the order drives the tie-break.
    let mut order: Vec<(u32, f64)> = Vec::new();
    let mut slot: HashMap<u32, usize> = HashMap::new();

    for hit in hits {
        let Some(intent_id) = hit.payload.intent_id else {
            tracing::debug!(point_id = %hit.id, "skipping hit without intent_id");
            continue;
        };
        let contribution =
            f64::from(hit.score).max(0.0) * weights.weight(hit.payload.source).max(0.0);
        match slot.get(&intent_id) {
            Some(&i) => order[i].1 += contribution,
            None => {
                slot.insert(intent_id, order.len());
                order.push((intent_id, contribution));
            }
        }
    }

    let Some(&(mut winner, mut best)) = order.first() else {
        tracing::info!("no votes, no intent");
        return ClassificationResult::none();
    };
    for &(intent_id, score) in &order[1..] {
        if score > best {
            winner = intent_id;
            best = score;
        }
    }

    let total: f64 = order.iter().map(|(_, s)| s).sum();
    let confidence = if total > 0.0 {
        round4(best / total)
    } else {
        0.0
    };
    let intent_scores: BTreeMap<u32, f64> = order.into_iter().collect();

    tracing::info!(
        winner,
        confidence,
        scores = ?intent_scores,
        "voting complete"
    );

    ClassificationResult {
        final_intent_id: Some(winner),
        confidence,
        intent_scores,
    }
}

fn round4(x: f64) -> f64 {
    (x * 10_000.0).round() / 10_000.0
}
