//! Schema store with hierarchical table/column retrieval.
//!
//! Each table is indexed twice over: one point for the table summary and
//! one per column. A column hit pulls in its parent table, fetched by a
//! payload-filtered scroll when the table itself did not rank.

use std::collections::HashSet;
use std::sync::Arc;

use iq_protocol::api::SchemaIngestReport;
use iq_protocol::schema::{ColumnSchema, ContextStatus, SchemaContext, TableContext, TableSchema};
use serde_json::{Value, json};

use crate::embedder::Embedder;
use crate::error::{EngineError, EngineResult};
use crate::index::{Filter, Point, SearchQuery, VectorIndex, deterministic_id};

pub const DEFAULT_TOP_K: usize = 15;

const TYPE_TABLE: &str = "table";
const TYPE_COLUMN: &str = "column";

pub fn table_point_id(table: &str) -> String {
    deterministic_id(&format!("table:{table}"))
}

pub fn column_point_id(table: &str, column: &str) -> String {
    deterministic_id(&format!("column:{table}.{column}"))
}

/// Semantic summary embedded for the table node.
pub fn table_text(table: &TableSchema) -> String {
    let mut text = format!("Table: {}. ", table.table_name);
    if let Some(desc) = table.description.as_deref().filter(|d| !d.is_empty()) {
        text.push_str(&format!("Summary: {desc}. "));
    }
    let cols: Vec<&str> = table.columns.iter().map(|c| c.name.as_str()).collect();
    text.push_str(&format!("Contains columns: {}", cols.join(", ")));
    text
}

/// Contextualized text embedded for a column node.
pub fn column_text(table: &str, column: &ColumnSchema) -> String {
    let mut text = format!(
        "Table: {table}, Column: {} (Type: {})",
        column.name, column.data_type
    );
    if !column.samples.is_empty() {
        text.push_str(&format!(". Example values: {}", column.samples.join(", ")));
    }
    text
}

/// Table and column fragments in their own collection.
#[derive(Clone)]
pub struct SchemaStore {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    collection: String,
}

impl SchemaStore {
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

    /// Embed and upsert table and column nodes. Re-ingesting a table
    /// overwrites its nodes.
    pub async fn ingest(&self, tables: &[TableSchema]) -> EngineResult<SchemaIngestReport> {
        let mut texts = Vec::new();
        let mut payloads = Vec::new();

        for table in tables {
            let name = &table.table_name;
            let summary = table_text(table);
            let table_id = table_point_id(name);
            payloads.push((
                table_id.clone(),
                json!({
                    "type": TYPE_TABLE,
                    "table_name": name,
                    "schema_text": summary,
                    "full_schema": serde_json::to_value(table)?,
                }),
            ));
            texts.push(summary);

            for column in &table.columns {
                let context = column_text(name, column);
                payloads.push((
                    column_point_id(name, &column.name),
                    json!({
                        "type": TYPE_COLUMN,
                        "table_name": name,
                        "column_name": column.name,
                        "context_text": context,
                        "parent_table_id": table_id,
                        "samples": column.samples,
                    }),
                ));
                texts.push(context);
            }
        }

        if texts.is_empty() {
            return Ok(SchemaIngestReport {
                tables: 0,
                vectors: 0,
            });
        }

        let vectors = self.embedder.batch_embed(&texts).await?;
        if vectors.len() != texts.len() {
            return Err(EngineError::Embedding(format!(
                "embedder returned {} vectors for {} texts",
                vectors.len(),
                texts.len()
            )));
        }

        self.index
            .ensure_collection(&self.collection, self.embedder.dimension())
            .await?;

        let points: Vec<Point> = payloads
            .into_iter()
            .zip(vectors)
            .map(|((id, payload), vector)| Point {
                id,
                vector,
                payload,
            })
            .collect();
        let count = points.len();
        self.index.upsert(&self.collection, points).await?;

        tracing::info!(
            tables = tables.len(),
            vectors = count,
            collection = %self.collection,
            "schema ingested"
        );
        Ok(SchemaIngestReport {
            tables: tables.len(),
            vectors: count,
        })
    }

    /// Tables relevant to `query`. Upstream faults yield an empty context.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> SchemaContext {
        match self.try_retrieve(query, top_k).await {
            Ok(ctx) => ctx,
            Err(e) => {
                tracing::error!(error = %e, "schema retrieval failed, returning empty context");
                SchemaContext::empty()
            }
        }
    }

    async fn try_retrieve(&self, query: &str, top_k: usize) -> EngineResult<SchemaContext> {
        tracing::debug!(query, top_k, "searching schema");
        let vector = self.embedder.embed(query).await?;
        let hits = self
            .index
            .search(
                &self.collection,
                &SearchQuery {
                    vector,
                    limit: top_k,
                    filter: None,
                },
            )
            .await?;

        let mut tables: Vec<TableSchema> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();
        let mut matched_columns = Vec::new();

        for hit in hits {
            let Some(table_name) = hit.payload.get("table_name").and_then(Value::as_str) else {
                tracing::warn!(point_id = %hit.id, "schema hit without table_name");
                continue;
            };
            match hit.payload.get("type").and_then(Value::as_str) {
                Some(TYPE_TABLE) => {
                    if !seen.contains(table_name) {
                        if let Some(schema) = full_schema(&hit.payload) {
                            seen.insert(table_name.to_string());
                            tables.push(schema);
                        }
                    }
                }
                Some(TYPE_COLUMN) => {
                    let column = hit
                        .payload
                        .get("column_name")
                        .and_then(Value::as_str)
                        .unwrap_or_default();
                    matched_columns.push(format!("{table_name}.{column}"));
                    if !seen.contains(table_name) {
                        if let Some(schema) = self.table_by_name(table_name).await? {
                            seen.insert(table_name.to_string());
                            tables.push(schema);
                        }
                    }
                }
                other => {
                    tracing::warn!(point_id = %hit.id, kind = ?other, "unknown schema node type");
                }
            }
        }

        let status = if tables.is_empty() {
            ContextStatus::Empty
        } else {
            ContextStatus::Ok
        };
        tracing::info!(
            tables = tables.len(),
            matched_columns = matched_columns.len(),
            "schema retrieval complete"
        );

        Ok(SchemaContext {
            status,
            matched_columns,
            tables: tables.iter().map(TableContext::from).collect(),
        })
    }

    async fn table_by_name(&self, table_name: &str) -> EngineResult<Option<TableSchema>> {
        let filter = Filter::value("type", TYPE_TABLE).and_value("table_name", table_name);
        let points = self
            .index
            .scroll(&self.collection, Some(&filter), 1)
            .await?;
        Ok(points.first().and_then(|p| full_schema(&p.payload)))
    }
}

fn full_schema(payload: &Value) -> Option<TableSchema> {
    let raw = payload.get("full_schema")?;
    match serde_json::from_value(raw.clone()) {
        Ok(schema) => Some(schema),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable full_schema payload");
            None
        }
    }
}
