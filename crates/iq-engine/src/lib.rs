//! IntentQL engine — classifies natural-language queries into SQL intents.
//!
//! Pipeline: [`rule_gate`] narrows the candidate operations, [`search`]
//! retrieves the nearest reference texts, [`voting`] aggregates them into a
//! ranked decision and [`gate`] rejects low-confidence winners. The
//! [`pipeline`] module wires the stages together.
//!
//! Around the core: [`ingest`] loads the [`catalog`] into the vector index,
//! [`schema`] stores and retrieves table/column fragments, and
//! [`generation`] builds the LLM prompt for SQL generation. External
//! services sit behind the [`Embedder`], [`VectorIndex`] and
//! [`SqlGenerator`] traits; [`mock`] provides in-process implementations.

pub mod catalog;
pub mod embedder;
pub mod error;
pub mod gate;
pub mod generation;
pub mod index;
pub mod ingest;
pub mod mock;
pub mod pipeline;
pub mod rule_gate;
pub mod schema;
pub mod search;
pub mod voting;

pub use catalog::Catalog;
pub use embedder::Embedder;
pub use error::{EngineError, EngineResult};
pub use gate::ConfidenceGate;
pub use generation::SqlGenerator;
pub use index::VectorIndex;
pub use pipeline::{Classification, ClassifierConfig, IntentClassifier, Stage};
pub use rule_gate::RuleGate;
pub use voting::SourceWeights;
