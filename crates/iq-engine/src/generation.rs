//! SQL generation. Assembles schema and intent context into a system
//! prompt and hands it to a named LLM provider.
//!
//! Providers implement [`SqlGenerator`]; `iq-api` registers an Ollama chat
//! backend under `"ollama"`. The classifier run that supplies the example
//! hits also supplies the reported intent.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use iq_protocol::api::{GenerateSqlResponse, GenerationMeta};
use iq_protocol::schema::SchemaContext;
use iq_protocol::SearchHit;

use crate::error::{EngineError, EngineResult};
use crate::pipeline::IntentClassifier;
use crate::schema::{DEFAULT_TOP_K, SchemaStore};

/// Number of intent hits shown to the model as examples.
pub const EXAMPLE_LIMIT: usize = 5;

/// An LLM backend that turns prompts into SQL text.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    /// Generate a completion for `user` under the `system` instructions.
    async fn generate(&self, system: &str, user: &str) -> EngineResult<String>;

    /// Provider name (registry key and logging).
    fn name(&self) -> &str;
}

/// Render the system prompt.
pub fn build_system_prompt(schema: &SchemaContext, examples: &[SearchHit]) -> String {
    let mut schema_text = String::from("### DATABASE SCHEMA (PostgreSQL)\n");
    if schema.tables.is_empty() {
        schema_text.push_str("No relevant tables found in context.\n");
    }
    for table in &schema.tables {
        let columns: Vec<String> = table
            .columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.data_type))
            .collect();
        schema_text.push_str(&format!("- Table `{}`: ({})", table.table_name, columns.join(", ")));
        if !table.relationships.is_empty() {
            let fks: Vec<String> = table
                .relationships
                .iter()
                .map(|r| format!("{} -> {}", r.column, r.references_table))
                .collect();
            schema_text.push_str(&format!(" | FKs: {}", fks.join(", ")));
        }
        if let Some(desc) = table.description.as_deref().filter(|d| !d.is_empty()) {
            schema_text.push_str(&format!(" -- {desc}"));
        }
        schema_text.push('\n');
    }

    let mut examples_text = String::from("### SIMILAR PAST EXAMPLES (Reference Only)\n");
    if examples.is_empty() {
        examples_text.push_str("No reference examples available.\n");
    }
    for (i, hit) in examples.iter().enumerate() {
        let p = &hit.payload;
        examples_text.push_str(&format!(
            "{}. User: '{}'\n   Intent: {} ({})\n",
            i + 1,
            p.text.as_deref().unwrap_or("Unknown query"),
            p.category.map(|c| c.as_str()).unwrap_or("General"),
            p.operation.map(|o| o.as_str()).unwrap_or("SELECT"),
        ));
    }

    format!(
        "You are an expert SQL Generator for a PostgreSQL database.
Your goal is to convert the user's natural language request into a valid, efficient SQL query.

{schema_text}
{examples_text}
### RULES:
1. **Scope:** Use ONLY the tables and columns defined in the schema above. Do not hallucinate table names.
2. **Dialect:** Generate standard PostgreSQL syntax.
3. **Format:** Return ONLY the raw SQL query. Do not include markdown formatting (like ```sql), comments, or explanations.
4. **Relationships:** Pay attention to the 'FKs' (Foreign Keys) listed in the schema to join tables correctly.
5. **Context:** Use the 'Similar Past Examples' to understand how to map vague terms to specific database columns.
"
    )
}

/// Strip markdown code fences from model output.
pub fn clean_sql(text: &str) -> &str {
    let trimmed = text.trim();

    let Some(start) = trimmed.find("```") else {
        return trimmed;
    };
    let after_fence = &trimmed[start + 3..];
    let Some(end) = after_fence.find("```") else {
        return trimmed;
    };
    let body = &after_fence[..end];

    // A language tag such as ```SQL or ```postgresql fills the opening line.
    match body.split_once('\n') {
        Some((tag, rest)) if is_fence_tag(tag) => rest.trim(),
        _ => body.trim(),
    }
}

fn is_fence_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

/// Gathers context and dispatches to a registered provider.
#[derive(Clone)]
pub struct SqlAgent {
    classifier: IntentClassifier,
    schema: SchemaStore,
    providers: BTreeMap<String, Arc<dyn SqlGenerator>>,
}

impl SqlAgent {
    pub fn new(classifier: IntentClassifier, schema: SchemaStore) -> Self {
        Self {
            classifier,
            schema,
            providers: BTreeMap::new(),
        }
    }

    /// Register a provider under its own name.
    pub fn with_provider(mut self, provider: Arc<dyn SqlGenerator>) -> Self {
        self.providers.insert(provider.name().to_string(), provider);
        self
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }

    pub async fn generate(&self, query: &str, provider: &str) -> EngineResult<GenerateSqlResponse> {
        let generator = self
            .providers
            .get(provider)
            .ok_or_else(|| EngineError::UnknownProvider(provider.to_string()))?;

        tracing::info!(query, provider, "generating SQL");

        let schema = self.schema.retrieve(query, DEFAULT_TOP_K).await;
        let classification = self.classifier.classify(query).await;
        let examples: Vec<SearchHit> = classification
            .hits
            .iter()
            .take(EXAMPLE_LIMIT)
            .cloned()
            .collect();

        let system = build_system_prompt(&schema, &examples);
        let raw = generator.generate(&system, query).await?;
        let sql = clean_sql(&raw);
        if sql.is_empty() {
            return Err(EngineError::Generation(format!(
                "{provider} returned an empty response"
            )));
        }

        Ok(GenerateSqlResponse {
            status: "success".into(),
            user_query: query.to_string(),
            generated_sql: sql.to_string(),
            provider: provider.to_string(),
            meta: GenerationMeta {
                schema_tables: schema.table_names(),
                intents_found: examples.len(),
                intent: classification.result.final_intent_id,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::ingest::Ingestor;
    use crate::mock::{HashingEmbedder, MemoryIndex, StaticGenerator};
    use crate::pipeline::ClassifierConfig;
    use iq_protocol::api::IngestRequest;
    use iq_protocol::schema::{ColumnSchema, ContextStatus, Relationship, TableContext, TableSchema};
    use iq_protocol::{Category, HitPayload, Operation, SourceKind};

    // ── clean_sql ───────────────────────────────────────────────

    #[test]
    fn clean_sql_raw() {
        assert_eq!(clean_sql("  SELECT 1;\n"), "SELECT 1;");
    }

    #[test]
    fn clean_sql_sql_fence() {
        assert_eq!(clean_sql("```sql\nSELECT * FROM users;\n```"), "SELECT * FROM users;");
    }

    #[test]
    fn clean_sql_any_language_tag() {
        assert_eq!(clean_sql("```SQL\nSELECT 1\n```"), "SELECT 1");
        assert_eq!(clean_sql("```postgresql\nSELECT now();\n```"), "SELECT now();");
        assert_eq!(clean_sql("```sql \nSELECT 2\n```"), "SELECT 2");
    }

    #[test]
    fn clean_sql_single_line_fence() {
        assert_eq!(clean_sql("```SELECT 1;```"), "SELECT 1;");
    }

    #[test]
    fn clean_sql_plain_fence_with_chatter() {
        let input = "Here you go:\n```\nDELETE FROM users WHERE id = 501;\n```\nDone.";
        assert_eq!(clean_sql(input), "DELETE FROM users WHERE id = 501;");
    }

    // ── build_system_prompt ─────────────────────────────────────

    #[test]
    fn prompt_lists_schema_and_examples() {
        let schema = SchemaContext {
            status: ContextStatus::Ok,
            matched_columns: vec![],
            tables: vec![TableContext {
                table_name: "users".into(),
                description: Some("Registered users".into()),
                columns: vec![ColumnSchema {
                    name: "id".into(),
                    data_type: "integer".into(),
                    samples: vec![],
                }],
                relationships: vec![Relationship {
                    column: "role_id".into(),
                    references_table: "roles".into(),
                }],
            }],
        };
        let hit = SearchHit {
            id: "p1".into(),
            score: 0.9,
            payload: HitPayload {
                intent_id: Some(503),
                source: SourceKind::Example,
                operation: Some(Operation::DeleteRecord),
                category: Some(Category::Write),
                complexity: Some(3),
                text: Some("delete user 501".into()),
            },
        };

        let prompt = build_system_prompt(&schema, &[hit]);
        assert!(prompt.contains("- Table `users`: (id (integer)) | FKs: role_id -> roles -- Registered users"));
        assert!(prompt.contains("1. User: 'delete user 501'\n   Intent: WRITE (DELETE_RECORD)"));
        assert!(prompt.contains("### RULES:"));
    }

    #[test]
    fn prompt_without_context() {
        let prompt = build_system_prompt(&SchemaContext::empty(), &[]);
        assert!(prompt.contains("No relevant tables found in context."));
        assert!(prompt.contains("No reference examples available."));
    }

    // ── SqlAgent ────────────────────────────────────────────────

    async fn agent(reply: &str) -> (SqlAgent, Arc<StaticGenerator>) {
        let embedder = Arc::new(HashingEmbedder::new(512));
        let index = Arc::new(MemoryIndex::new());
        Ingestor::new(embedder.clone(), index.clone(), "sql_intents")
            .run(
                &Catalog::builtin(),
                &IngestRequest {
                    force: true,
                    dry_run: false,
                },
            )
            .await
            .unwrap();

        let schema = SchemaStore::new(embedder.clone(), index.clone(), "db_schema");
        schema
            .ingest(&[TableSchema {
                table_name: "users".into(),
                description: Some("Registered users".into()),
                columns: vec![ColumnSchema {
                    name: "id".into(),
                    data_type: "integer".into(),
                    samples: vec![],
                }],
                foreign_keys: vec![],
            }])
            .await
            .unwrap();

        let classifier = IntentClassifier::new(
            embedder,
            index,
            "sql_intents",
            &ClassifierConfig::default(),
        );
        let generator = Arc::new(StaticGenerator::new("ollama", reply));
        let agent = SqlAgent::new(classifier, schema).with_provider(generator.clone());
        (agent, generator)
    }

    #[tokio::test]
    async fn generate_with_registered_provider() {
        let (agent, generator) = agent("```sql\nDELETE FROM users WHERE id = 501;\n```").await;
        let resp = agent.generate("delete user 501", "ollama").await.unwrap();

        assert_eq!(resp.status, "success");
        assert_eq!(resp.generated_sql, "DELETE FROM users WHERE id = 501;");
        assert_eq!(resp.provider, "ollama");
        assert_eq!(resp.meta.schema_tables, vec!["users".to_string()]);
        assert_eq!(resp.meta.intents_found, EXAMPLE_LIMIT);
        assert_eq!(resp.meta.intent, Some(503));

        let (system, user) = generator.last_prompt().await.unwrap();
        assert_eq!(user, "delete user 501");
        assert!(system.contains("Table `users`"));
        assert!(system.contains("DELETE_RECORD"));
    }

    #[tokio::test]
    async fn unknown_provider_rejected() {
        let (agent, generator) = agent("SELECT 1").await;
        let err = agent.generate("show users", "gemini").await.unwrap_err();
        assert!(matches!(err, EngineError::UnknownProvider(ref p) if p == "gemini"));
        assert!(generator.last_prompt().await.is_none());
        assert_eq!(agent.provider_names(), vec!["ollama"]);
    }

    #[tokio::test]
    async fn empty_completion_is_error() {
        let (agent, _) = agent("```sql\n```").await;
        let err = agent.generate("show users", "ollama").await.unwrap_err();
        assert!(matches!(err, EngineError::Generation(_)));
    }
}
