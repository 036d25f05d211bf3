//! End-to-end tests for IntentQL live under `tests/`.
//!
//! They drive the real `iq-api` router over the engine with in-memory
//! backends, plus wiremock servers standing in for Ollama and Qdrant.
