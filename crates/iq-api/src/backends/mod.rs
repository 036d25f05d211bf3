//! HTTP implementations of the engine's embedder, index and generator traits.

pub mod ollama;
pub mod qdrant;

pub use ollama::{OllamaEmbedder, OllamaGenerator};
pub use qdrant::QdrantIndex;
