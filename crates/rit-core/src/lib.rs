//! # rit-core
//!
//! Core crate for the RIT execution system, providing:
//!
//! - **Types** (`types`) — enums, book/position/session snapshots, order intents
//! - **Configuration** (`config`) — JSON config deserialization and validation
//! - **Error types** (`error`) — domain-specific `RitError` via thiserror
//! - **Logging** (`logging`) — tracing-based structured logging

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

// Re-export types at crate root for convenience.
pub use types::*;
