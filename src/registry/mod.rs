//! Batch Registry Module
//!
//! This module implements the registry engine for waste batches:
//! - RegistryEngine: provenance, ownership, delegated permissions, versions,
//!   status history, licenses and revenue shares
//! - RegistryService: single-writer access to the engine for concurrent callers
//! - limits: field bounds checked on every mutation

mod engine;
mod service;
pub mod limits;

#[cfg(test)]
mod tests;

pub use engine::RegistryEngine;
pub use service::RegistryService;
