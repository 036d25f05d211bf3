use serde::{Deserialize, Serialize};

use crate::operations::{Category, Operation, RuleTag};

/// Catalog entry describing one canonical SQL operation shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    /// Unique catalog identifier (e.g. 101, 220, 503).
    pub id: u32,
    /// Coarse SQL operation tag.
    pub operation: Operation,
    pub category: Category,
    /// Informational 1-5 rating; not used for classification.
    pub complexity: u8,
    /// SQL skeleton, e.g. `SELECT * FROM table WHERE condition`.
    #[serde(default)]
    pub sql_pattern: String,
    /// Canonical description.
    pub text: String,
    #[serde(default)]
    pub examples: Vec<String>,
    #[serde(default)]
    pub paraphrases: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Intent {
    /// All textual variants in ingestion order: description, examples,
    /// paraphrases, keywords.
    pub fn variants(&self) -> impl Iterator<Item = (SourceKind, &str)> {
        std::iter::once((SourceKind::Description, self.text.as_str()))
            .chain(self.examples.iter().map(|t| (SourceKind::Example, t.as_str())))
            .chain(
                self.paraphrases
                    .iter()
                    .map(|t| (SourceKind::Paraphrase, t.as_str())),
            )
            .chain(self.keywords.iter().map(|t| (SourceKind::Keyword, t.as_str())))
    }

    /// Number of reference texts this intent contributes to the index.
    pub fn variant_count(&self) -> usize {
        1 + self.examples.len() + self.paraphrases.len() + self.keywords.len()
    }
}

/// Where a reference text came from; determines its trust weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Description,
    Example,
    Paraphrase,
    Keyword,
    /// Missing or unrecognized `source` field in a stored payload.
    Unknown,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Description => "description",
            SourceKind::Example => "example",
            SourceKind::Paraphrase => "paraphrase",
            SourceKind::Keyword => "keyword",
            SourceKind::Unknown => "unknown",
        }
    }

    /// Lenient parse used when reading payloads back from the index.
    pub fn parse(s: &str) -> Self {
        match s {
            "description" => SourceKind::Description,
            "example" => SourceKind::Example,
            "paraphrase" => SourceKind::Paraphrase,
            "keyword" => SourceKind::Keyword,
            _ => SourceKind::Unknown,
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload written alongside every reference-text vector.
///
/// Denormalizes the catalog fields so classification never needs a
/// secondary catalog lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentPointPayload {
    pub intent_id: u32,
    pub operation: Operation,
    pub category: Category,
    pub complexity: u8,
    pub source: SourceKind,
    pub text: String,
    /// Rule-gate tags admitting this point (see [`Operation::rule_tags`]).
    pub rule_tags: Vec<RuleTag>,
}

impl IntentPointPayload {
    pub fn new(intent: &Intent, source: SourceKind, text: &str) -> Self {
        Self {
            intent_id: intent.id,
            operation: intent.operation,
            category: intent.category,
            complexity: intent.complexity,
            source,
            text: text.to_string(),
            rule_tags: intent.operation.rule_tags(),
        }
    }
}
