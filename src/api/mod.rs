//! API Module
//! 
//! This module handles the JSON-RPC API of the registry.
//! It provides the HTTP endpoint that clients use to mutate and query batches.

mod server;
pub mod calls;


pub use server::{AppState, Server, router};
