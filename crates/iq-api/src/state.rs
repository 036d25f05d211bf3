//! Shared application state for the Axum server.
//!
//! Supports two modes:
//! - **Service mode**: Qdrant index + Ollama embedder, built in `main.rs`.
//! - **In-memory mode**: `MemoryIndex` + `HashingEmbedder` (tests and development).

use std::sync::Arc;

use tokio::sync::Mutex;

use iq_engine::generation::SqlAgent;
use iq_engine::ingest::Ingestor;
use iq_engine::mock::{HashingEmbedder, MemoryIndex};
use iq_engine::schema::SchemaStore;
use iq_engine::{Catalog, Embedder, EngineResult, IntentClassifier, SqlGenerator, VectorIndex};
use iq_protocol::api::IngestRequest;
use iq_protocol::schema::{ColumnSchema, ForeignKey, TableSchema};

use crate::config::ApiConfig;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    /// Intent definitions served by `/api/intents` and used for ingestion.
    pub catalog: Arc<Catalog>,
    pub classifier: IntentClassifier,
    pub ingestor: Ingestor,
    pub schema: SchemaStore,
    /// SQL generation with its provider registry.
    pub agent: SqlAgent,
    /// Matches reported by `/api/classify-intent`.
    pub match_limit: usize,
    /// Held for the duration of a catalog ingestion run.
    pub ingest_lock: Arc<Mutex<()>>,
}

impl AppState {
    /// Wire the engine components over shared backends.
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        catalog: Catalog,
        config: &ApiConfig,
    ) -> Self {
        let classifier = IntentClassifier::new(
            embedder.clone(),
            index.clone(),
            config.index.collection.clone(),
            &config.classifier,
        );
        let ingestor = Ingestor::new(
            embedder.clone(),
            index.clone(),
            config.index.collection.clone(),
        );
        let schema = SchemaStore::new(embedder, index, config.index.schema_collection.clone());
        let agent = SqlAgent::new(classifier.clone(), schema.clone());

        Self {
            catalog: Arc::new(catalog),
            classifier,
            ingestor,
            schema,
            agent,
            match_limit: config.classifier.match_limit,
            ingest_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Register a SQL generation provider.
    pub fn with_generator(mut self, generator: Arc<dyn SqlGenerator>) -> Self {
        self.agent = self.agent.with_provider(generator);
        self
    }

    /// Create in-memory state with the built-in catalog (nothing ingested).
    pub fn in_memory() -> Self {
        let config = ApiConfig::default();
        Self::new(
            Arc::new(HashingEmbedder::new(config.embedding.dimension)),
            Arc::new(MemoryIndex::new()),
            Catalog::builtin(),
            &config,
        )
    }

    /// In-memory state with the catalog ingested and the sample tables
    /// stored, for development and tests.
    pub async fn with_sample_data() -> EngineResult<Self> {
        let state = Self::in_memory();
        state
            .ingestor
            .run(
                &state.catalog,
                &IngestRequest {
                    force: true,
                    dry_run: false,
                },
            )
            .await?;
        state.schema.ingest(&sample_tables()).await?;
        Ok(state)
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// A small HR schema: `departments` and `employees`.
pub fn sample_tables() -> Vec<TableSchema> {
    fn col(name: &str, data_type: &str, samples: &[&str]) -> ColumnSchema {
        ColumnSchema {
            name: name.into(),
            data_type: data_type.into(),
            samples: samples.iter().map(|s| s.to_string()).collect(),
        }
    }

    vec![
        TableSchema {
            table_name: "departments".into(),
            description: Some("Organizational units".into()),
            columns: vec![
                col("id", "integer", &[]),
                col("name", "text", &["Engineering", "Sales", "Finance"]),
            ],
            foreign_keys: vec![],
        },
        TableSchema {
            table_name: "employees".into(),
            description: Some("Staff members and their salaries".into()),
            columns: vec![
                col("id", "integer", &[]),
                col("name", "text", &[]),
                col("salary", "numeric", &[]),
                col("hired_at", "date", &[]),
                col("department_id", "integer", &[]),
            ],
            foreign_keys: vec![ForeignKey {
                col: "department_id".into(),
                foreign_table: "departments".into(),
            }],
        },
    ]
}
