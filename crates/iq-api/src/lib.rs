//! IntentQL API — library crate for the intent classification server.
//!
//! Re-exports all modules so the binary (`main.rs`) and external crates
//! (e.g. `iq-e2e-tests`) can access `AppState`, `build_router` and the
//! HTTP backends.

pub mod backends;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;
