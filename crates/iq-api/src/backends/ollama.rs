//! Ollama HTTP clients: `/api/embed` for vectors, `/api/chat` for SQL.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use iq_engine::embedder::{Embedder, normalize};
use iq_engine::generation::SqlGenerator;
use iq_engine::{EngineError, EngineResult};

use crate::config::{EmbeddingConfig, LlmConfig};

fn http_client(timeout_secs: u64) -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

/// Ollama embed API request body.
#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: Vec<String>,
}

/// Ollama embed API response (only fields we need).
#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

/// Embedding client for a local Ollama server.
pub struct OllamaEmbedder {
    client: reqwest::Client,
    url: String,
    model: String,
    dimension: usize,
}

impl OllamaEmbedder {
    pub fn new(config: &EmbeddingConfig) -> EngineResult<Self> {
        let client = http_client(config.timeout_secs)
            .map_err(|e| EngineError::Embedding(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/api/embed", config.host.trim_end_matches('/')),
            model: config.model.clone(),
            dimension: config.dimension,
        })
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>> {
        let mut vectors = self.batch_embed(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EngineError::Embedding("ollama returned no embedding".into()))
    }

    async fn batch_embed(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let body = EmbedRequest {
            model: &self.model,
            input: texts.iter().map(|t| normalize(t)).collect(),
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Embedding(format!("ollama embed request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(EngineError::Embedding(format!(
                "ollama embed returned {status}: {text}"
            )));
        }

        let parsed: EmbedResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Embedding(format!("invalid ollama embed response: {e}")))?;

        if parsed.embeddings.len() != texts.len() {
            return Err(EngineError::Embedding(format!(
                "ollama returned {} embeddings for {} inputs",
                parsed.embeddings.len(),
                texts.len()
            )));
        }
        if let Some(bad) = parsed.embeddings.iter().find(|v| v.len() != self.dimension) {
            return Err(EngineError::Embedding(format!(
                "model {} produced {}-dimensional vectors, expected {}",
                self.model,
                bad.len(),
                self.dimension
            )));
        }

        Ok(parsed.embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Ollama chat API request body.
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

/// Ollama chat API response (only fields we need).
#[derive(Deserialize)]
struct ChatResponse {
    message: Option<ResponseMessage>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

/// SQL generation provider backed by Ollama chat, registered as `ollama`.
pub struct OllamaGenerator {
    client: reqwest::Client,
    url: String,
    model: String,
}

impl OllamaGenerator {
    pub fn new(config: &LlmConfig) -> EngineResult<Self> {
        let client = http_client(config.timeout_secs)
            .map_err(|e| EngineError::Generation(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            url: format!("{}/api/chat", config.host.trim_end_matches('/')),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl SqlGenerator for OllamaGenerator {
    async fn generate(&self, system: &str, user: &str) -> EngineResult<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            stream: false,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Generation(format!("ollama chat request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(EngineError::Generation(format!(
                "ollama chat returned {}",
                response.status()
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| EngineError::Generation(format!("invalid ollama chat response: {e}")))?;

        chat.message
            .map(|m| m.content)
            .ok_or_else(|| EngineError::Generation("ollama response has no message".into()))
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
