//! Database schema documents and the retrieval context handed to SQL generation.

use serde::{Deserialize, Serialize};

/// Description of one table, as supplied for schema ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub table_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub columns: Vec<ColumnSchema>,
    #[serde(default)]
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    /// SQL data type, e.g. `integer`, `text`.
    #[serde(rename = "type")]
    pub data_type: String,
    /// Representative values, embedded with the column for value-aware retrieval.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    /// Referencing column in this table.
    pub col: String,
    /// Referenced table.
    pub foreign_table: String,
}

/// Whether retrieval found any table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextStatus {
    Ok,
    Empty,
}

/// Schema fragments relevant to a query, shaped for prompt construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaContext {
    pub status: ContextStatus,
    /// `table.column` names that matched directly.
    pub matched_columns: Vec<String>,
    pub tables: Vec<TableContext>,
}

impl SchemaContext {
    pub fn empty() -> Self {
        Self {
            status: ContextStatus::Empty,
            matched_columns: Vec::new(),
            tables: Vec::new(),
        }
    }

    pub fn table_names(&self) -> Vec<String> {
        self.tables.iter().map(|t| t.table_name.clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableContext {
    pub table_name: String,
    pub description: Option<String>,
    pub columns: Vec<ColumnSchema>,
    pub relationships: Vec<Relationship>,
}

impl From<&TableSchema> for TableContext {
    fn from(table: &TableSchema) -> Self {
        Self {
            table_name: table.table_name.clone(),
            description: table.description.clone(),
            columns: table.columns.clone(),
            relationships: table
                .foreign_keys
                .iter()
                .map(|fk| Relationship {
                    column: fk.col.clone(),
                    references_table: fk.foreign_table.clone(),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub column: String,
    pub references_table: String,
}
