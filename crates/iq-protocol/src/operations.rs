use serde::{Deserialize, Serialize};

/// Coarse SQL operation shape that a catalog intent represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation {
    SelectBasic,
    SelectDistinct,
    SelectWhere,
    SelectOrderBy,
    SelectTopN,
    SelectFilterSortLimit,
    AggregateGlobal,
    AggregateFiltered,
    GroupByBasic,
    GroupByFiltered,
    GroupByHaving,
    GroupByOrdered,
    JoinBasic,
    JoinAggregate,
    SubqueryFilter,
    SubqueryComparison,
    InsertRecord,
    UpdateRecord,
    DeleteRecord,
}

impl Operation {
    /// Every operation, in catalog order.
    pub const ALL: [Operation; 19] = [
        Operation::SelectBasic,
        Operation::SelectDistinct,
        Operation::SelectWhere,
        Operation::SelectOrderBy,
        Operation::SelectTopN,
        Operation::SelectFilterSortLimit,
        Operation::AggregateGlobal,
        Operation::AggregateFiltered,
        Operation::GroupByBasic,
        Operation::GroupByFiltered,
        Operation::GroupByHaving,
        Operation::GroupByOrdered,
        Operation::JoinBasic,
        Operation::JoinAggregate,
        Operation::SubqueryFilter,
        Operation::SubqueryComparison,
        Operation::InsertRecord,
        Operation::UpdateRecord,
        Operation::DeleteRecord,
    ];

    /// Wire name, identical to the serde representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SelectBasic => "SELECT_BASIC",
            Operation::SelectDistinct => "SELECT_DISTINCT",
            Operation::SelectWhere => "SELECT_WHERE",
            Operation::SelectOrderBy => "SELECT_ORDER_BY",
            Operation::SelectTopN => "SELECT_TOP_N",
            Operation::SelectFilterSortLimit => "SELECT_FILTER_SORT_LIMIT",
            Operation::AggregateGlobal => "AGGREGATE_GLOBAL",
            Operation::AggregateFiltered => "AGGREGATE_FILTERED",
            Operation::GroupByBasic => "GROUP_BY_BASIC",
            Operation::GroupByFiltered => "GROUP_BY_FILTERED",
            Operation::GroupByHaving => "GROUP_BY_HAVING",
            Operation::GroupByOrdered => "GROUP_BY_ORDERED",
            Operation::JoinBasic => "JOIN_BASIC",
            Operation::JoinAggregate => "JOIN_AGGREGATE",
            Operation::SubqueryFilter => "SUBQUERY_FILTER",
            Operation::SubqueryComparison => "SUBQUERY_COMPARISON",
            Operation::InsertRecord => "INSERT_RECORD",
            Operation::UpdateRecord => "UPDATE_RECORD",
            Operation::DeleteRecord => "DELETE_RECORD",
        }
    }

    /// True for the three mutating operations.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Operation::InsertRecord | Operation::UpdateRecord | Operation::DeleteRecord
        )
    }

    /// Whether the SQL shape restricts rows or groups with a predicate.
    fn filters(&self) -> bool {
        matches!(
            self,
            Operation::SelectWhere
                | Operation::SelectFilterSortLimit
                | Operation::AggregateFiltered
                | Operation::GroupByFiltered
                | Operation::GroupByHaving
                | Operation::SubqueryFilter
                | Operation::SubqueryComparison
        )
    }

    /// Whether the SQL shape computes an aggregate.
    fn aggregates(&self) -> bool {
        matches!(
            self,
            Operation::AggregateGlobal
                | Operation::AggregateFiltered
                | Operation::GroupByBasic
                | Operation::GroupByFiltered
                | Operation::GroupByHaving
                | Operation::GroupByOrdered
                | Operation::JoinAggregate
                | Operation::SubqueryComparison
        )
    }

    /// Rule tags that admit this operation through the rule-gate filter.
    ///
    /// Stored in every point payload as `rule_tags`, so a gate decision
    /// becomes a plain "any of" payload match in the vector index.
    pub fn rule_tags(&self) -> Vec<RuleTag> {
        match self {
            Operation::InsertRecord => vec![RuleTag::Insert],
            Operation::UpdateRecord => vec![RuleTag::Update],
            Operation::DeleteRecord => vec![RuleTag::Delete],
            read => {
                let mut tags = vec![RuleTag::SelectBasic];
                if read.filters() {
                    tags.push(RuleTag::SelectWhere);
                }
                if read.aggregates() {
                    tags.push(RuleTag::SelectAggregate);
                }
                tags
            }
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// High-level grouping of intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Read,
    Write,
    Analytics,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Read => "READ",
            Category::Write => "WRITE",
            Category::Analytics => "ANALYTICS",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Coarse operation tag produced by the keyword rule gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuleTag {
    Insert,
    Update,
    Delete,
    SelectWhere,
    SelectAggregate,
    SelectBasic,
}

impl RuleTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            RuleTag::Insert => "INSERT",
            RuleTag::Update => "UPDATE",
            RuleTag::Delete => "DELETE",
            RuleTag::SelectWhere => "SELECT_WHERE",
            RuleTag::SelectAggregate => "SELECT_AGGREGATE",
            RuleTag::SelectBasic => "SELECT_BASIC",
        }
    }
}

impl std::fmt::Display for RuleTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
