//! This crate implements a provenance registry for physical waste batches.
//! It records who owns each batch, who may act on it, how its content and
//! lifecycle status evolved, and how revenue from it is split.

pub mod types; // Defines records, errors, events and signed call envelopes.
pub mod api; // Exposes the registry over JSON-RPC.
pub mod validation; // Authenticates signed calls (signature and replay nonce).
pub mod state; // Holds the registry tables and per-sender nonces.
pub mod chain; // Provides the logical block clock.
pub mod registry; // Applies registry state transitions under a single writer.
pub mod journal; // Persists committed registry events for auditing.
pub mod config; // Defines and loads system configuration.

// Re-export commonly used types and configurations for easier access.
pub use types::*;
pub use config::Config;
pub use registry::{RegistryEngine, RegistryService};
