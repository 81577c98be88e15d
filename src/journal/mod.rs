//! Event Journal Module
//! 
//! This module persists committed registry events for auditing.
//! Downstream services can read the journal instead of polling registry state.

mod store;
pub use store::{EventJournal, JournalEntry, JournalWriter};
