//! Keyword rule gate: narrows the search space before vector search.
//!
//! Lowercases the query and substring-tests fixed keyword groups. Every
//! matched group contributes its tag; with no match the gate falls back to
//! `SELECT_BASIC`, so the result is never empty. The tag set is used as an
//! "any of" filter on the `rule_tags` payload field.

use std::collections::BTreeSet;

use iq_protocol::RuleTag;

const GROUPS: &[(&[&str], RuleTag)] = &[
    (&["insert", "add", "create"], RuleTag::Insert),
    (&["update", "modify", "change"], RuleTag::Update),
    (&["delete", "remove"], RuleTag::Delete),
    (&["where", "filter"], RuleTag::SelectWhere),
    (&["count", "sum", "avg", "average"], RuleTag::SelectAggregate),
];

/// Stateless keyword classifier producing the allowed rule tags.
pub struct RuleGate;

impl RuleGate {
    pub fn new() -> Self {
        Self
    }

    /// Tags allowed for `query`. Never empty.
    pub fn allowed_tags(&self, query: &str) -> BTreeSet<RuleTag> {
        let lower = query.to_lowercase();

        let mut tags: BTreeSet<RuleTag> = GROUPS
            .iter()
            .filter(|(patterns, _)| matches_any(&lower, patterns))
            .map(|(_, tag)| *tag)
            .collect();

        if tags.is_empty() {
            tags.insert(RuleTag::SelectBasic);
        }

        tracing::debug!(
            tags = ?tags.iter().map(RuleTag::as_str).collect::<Vec<_>>(),
            "rule gate"
        );
        tags
    }
}

impl Default for RuleGate {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}
