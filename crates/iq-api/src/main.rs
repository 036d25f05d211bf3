//! IntentQL API — SQL intent classification server.
//!
//! Classifies natural-language questions into SQL intents, serves the
//! intent catalog and schema context, and generates SQL through Ollama.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use iq_api::backends::{OllamaEmbedder, OllamaGenerator, QdrantIndex};
use iq_api::config::{ApiConfig, EmbeddingBackend, IndexBackend};
use iq_api::routes;
use iq_api::state::AppState;
use iq_engine::mock::{HashingEmbedder, MemoryIndex};
use iq_engine::{Catalog, Embedder, VectorIndex};
use iq_protocol::api::{IngestRequest, IngestStatus};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "iq-api starting");

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("IQ_CONFIG").ok());
    let config = ApiConfig::load(config_path.as_deref())?;

    let embedder: Arc<dyn Embedder> = match config.embedding.backend {
        EmbeddingBackend::Ollama => Arc::new(
            OllamaEmbedder::new(&config.embedding).context("building Ollama embedder")?,
        ),
        EmbeddingBackend::Hashing => {
            tracing::warn!("using hashing embedder, similarity is lexical only");
            Arc::new(HashingEmbedder::new(config.embedding.dimension))
        }
    };

    // The model must answer before we accept traffic.
    embedder
        .embed("warmup")
        .await
        .with_context(|| format!("embedding model {} is not available", embedder.model_name()))?;
    tracing::info!(
        model = embedder.model_name(),
        dimension = embedder.dimension(),
        "embedding model ready"
    );

    let index: Arc<dyn VectorIndex> = match config.index.backend {
        IndexBackend::Qdrant => {
            tracing::info!(url = %config.index.url, "using Qdrant index");
            Arc::new(QdrantIndex::new(&config.index).context("building Qdrant client")?)
        }
        IndexBackend::Memory => {
            tracing::warn!("using in-memory index, vectors are lost on restart");
            Arc::new(MemoryIndex::new())
        }
    };

    let catalog = match &config.catalog.path {
        Some(path) => Catalog::from_file(path).with_context(|| format!("loading catalog {path}"))?,
        None => Catalog::builtin(),
    };
    tracing::info!(
        intents = catalog.len(),
        reference_texts = catalog.reference_text_count(),
        "intent catalog loaded"
    );

    let mut state = AppState::new(embedder, index, catalog, &config);
    if config.llm.enabled {
        let generator = OllamaGenerator::new(&config.llm).context("building Ollama generator")?;
        state = state.with_generator(Arc::new(generator));
        tracing::info!(model = %config.llm.model, "SQL generation enabled");
    }

    if config.catalog.ingest_on_startup {
        let report = state
            .ingestor
            .ingest(&state.catalog, &IngestRequest::default())
            .await;
        if report.status == IngestStatus::Error {
            tracing::error!(message = %report.message, "startup ingestion failed");
        }
    }

    let app = routes::build_router(state, &config.cors_origins);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "listening");

    axum::serve(listener, app).await?;

    Ok(())
}
