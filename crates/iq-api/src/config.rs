//! API server configuration, loadable from TOML and overridden from the
//! environment.

use anyhow::{Context, ensure};
use serde::Deserialize;

use iq_engine::ClassifierConfig;

/// Top-level API server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Listen address (e.g., "0.0.0.0").
    #[serde(default = "default_host")]
    pub host: String,
    /// Listen port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub catalog: CatalogConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Qdrant,
    Memory,
}

/// Vector index settings.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_index_backend")]
    pub backend: IndexBackend,
    /// Qdrant REST base URL.
    #[serde(default = "default_qdrant_url")]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    /// Collection holding intent reference texts.
    #[serde(default = "default_collection")]
    pub collection: String,
    /// Collection holding table and column nodes.
    #[serde(default = "default_schema_collection")]
    pub schema_collection: String,
    #[serde(default = "default_index_timeout")]
    pub timeout_secs: u64,
}

fn default_index_backend() -> IndexBackend {
    IndexBackend::Qdrant
}
fn default_qdrant_url() -> String {
    "http://localhost:6333".into()
}
fn default_collection() -> String {
    "sql_intents".into()
}
fn default_schema_collection() -> String {
    "db_schema".into()
}
fn default_index_timeout() -> u64 {
    30
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            backend: default_index_backend(),
            url: default_qdrant_url(),
            api_key: None,
            collection: default_collection(),
            schema_collection: default_schema_collection(),
            timeout_secs: default_index_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    Ollama,
    /// Offline feature-hashing embedder.
    Hashing,
}

/// Embedding model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_backend")]
    pub backend: EmbeddingBackend,
    /// Ollama HTTP API base URL.
    #[serde(default = "default_ollama_host")]
    pub host: String,
    #[serde(default = "default_embedding_model")]
    pub model: String,
    /// Vector size; also the size of newly created collections.
    #[serde(default = "default_dimension")]
    pub dimension: usize,
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,
}

fn default_embedding_backend() -> EmbeddingBackend {
    EmbeddingBackend::Ollama
}
fn default_ollama_host() -> String {
    "http://localhost:11434".into()
}
fn default_embedding_model() -> String {
    "all-minilm".into()
}
fn default_dimension() -> usize {
    384
}
fn default_embedding_timeout() -> u64 {
    30
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            backend: default_embedding_backend(),
            host: default_ollama_host(),
            model: default_embedding_model(),
            dimension: default_dimension(),
            timeout_secs: default_embedding_timeout(),
        }
    }
}

/// SQL generation model settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Register the `ollama` generation provider.
    #[serde(default = "default_llm_enabled")]
    pub enabled: bool,
    #[serde(default = "default_ollama_host")]
    pub host: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_enabled() -> bool {
    true
}
fn default_llm_model() -> String {
    "llama3.2".into()
}
fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: default_llm_enabled(),
            host: default_ollama_host(),
            model: default_llm_model(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Intent catalog source.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CatalogConfig {
    /// TOML catalog replacing the built-in one.
    #[serde(default)]
    pub path: Option<String>,
    /// Run an unforced ingestion before serving.
    #[serde(default)]
    pub ingest_on_startup: bool,
}

impl ApiConfig {
    /// Load config from a TOML file path.
    pub fn from_file(path: &str) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {path}"))?;
        let config: Self =
            toml::from_str(&contents).with_context(|| format!("parsing config file {path}"))?;
        Ok(config)
    }

    /// File (if any) plus process environment overrides.
    pub fn load(path: Option<&str>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Reject classifier settings that would break the confidence bounds
    /// or make every classification empty.
    pub fn validate(&self) -> anyhow::Result<()> {
        let classifier = &self.classifier;
        ensure!(
            (0.0..=1.0).contains(&classifier.confidence_threshold),
            "classifier.confidence_threshold must be within [0, 1], got {}",
            classifier.confidence_threshold
        );
        ensure!(classifier.search_limit > 0, "classifier.search_limit must be at least 1");
        ensure!(classifier.match_limit > 0, "classifier.match_limit must be at least 1");

        let w = &classifier.weights;
        for (name, weight) in [
            ("description", w.description),
            ("example", w.example),
            ("paraphrase", w.paraphrase),
            ("keyword", w.keyword),
            ("unknown", w.unknown),
        ] {
            ensure!(
                weight.is_finite() && weight >= 0.0,
                "classifier.weights.{name} must be a finite non-negative number, got {weight}"
            );
        }
        Ok(())
    }

    /// Apply overrides from an environment lookup.
    pub fn apply_env<F>(&mut self, var: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("IQ_HOST") {
            self.host = v;
        }
        if let Some(v) = var("IQ_PORT") {
            self.port = parse_var("IQ_PORT", &v)?;
        }
        if let Some(v) = var("QDRANT_URL") {
            self.index.url = v;
        }
        if let Some(v) = var("QDRANT_API_KEY") {
            self.index.api_key = Some(v).filter(|k| !k.is_empty());
        }
        if let Some(v) = var("COLLECTION_NAME") {
            self.index.collection = v;
        }
        if let Some(v) = var("SCHEMA_COLLECTION_NAME") {
            self.index.schema_collection = v;
        }
        if let Some(v) = var("VECTOR_SIZE") {
            self.embedding.dimension = parse_var("VECTOR_SIZE", &v)?;
        }
        if let Some(v) = var("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = var("OLLAMA_HOST") {
            self.embedding.host = v.clone();
            self.llm.host = v;
        }
        if let Some(v) = var("LLM_MODEL") {
            self.llm.model = v;
        }
        if let Some(v) = var("CONFIDENCE_THRESHOLD") {
            self.classifier.confidence_threshold = parse_var("CONFIDENCE_THRESHOLD", &v)?;
        }
        Ok(())
    }
}

fn parse_var<T>(name: &str, value: &str) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .trim()
        .parse()
        .with_context(|| format!("invalid value for {name}: {value:?}"))
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
            index: IndexConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            classifier: ClassifierConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}
