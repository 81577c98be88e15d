//! State Management Module
//! 
//! This module owns all mutable state behind the registry:
//! - `RegistryStore`: the seven registry tables plus the two global counters
//! - `AccountCache`: per-sender replay nonces for signed calls

mod store;
mod accounts;

pub use store::RegistryStore;
pub use accounts::AccountCache;
