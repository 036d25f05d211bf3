//! Text embedding abstraction.
//!
//! `Embedder` trait with single and batch calls. Two impls:
//! - `OllamaEmbedder`: HTTP, lives in `iq-api`
//! - `HashingEmbedder`: deterministic bag-of-words, in `mock.rs`

use async_trait::async_trait;

use crate::error::EngineResult;

/// Converts text into fixed-dimension vectors.
///
/// Implementations are shared across concurrent requests and must be
/// deterministic for a fixed model.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> EngineResult<Vec<f32>>;

    /// Embed many texts, preserving input order.
    async fn batch_embed(&self, texts: &[String]) -> EngineResult<Vec<Vec<f32>>>;

    /// Output vector dimension.
    fn dimension(&self) -> usize;

    /// Model name (for logging).
    fn model_name(&self) -> &str;
}

/// Trim and collapse internal whitespace before embedding.
pub fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Scale a vector to unit length. Zero vectors are returned unchanged.
pub fn l2_normalize(mut v: Vec<f32>) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut v {
            *x /= norm;
        }
    }
    v
}
