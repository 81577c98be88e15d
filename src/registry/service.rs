//! Registry Service Module
//!
//! This module serializes access to the registry engine. Every mutation runs
//! under a single write lock, which stands in for the total ordering a
//! hosting chain would provide: no two mutations interleave, and each one sees
//! the fully-applied result of the previous one.

use crate::{
    chain::BlockClock,
    registry::RegistryEngine,
    types::{RegistryError, RegistryEvent, TxContext},
};
use ethers::types::Address;
use std::sync::Arc;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use tracing::{info, warn};

/// Shared handle to the registry engine
///
/// Cloning is cheap; all clones operate on the same engine.
#[derive(Clone)]
pub struct RegistryService {
    /// Engine behind a read-write lock (write = mutation, read = query)
    engine: Arc<RwLock<RegistryEngine>>,
    /// Logical clock used to stamp each operation
    clock: BlockClock,
    /// Channel to the event journal, if one is attached
    events: Option<UnboundedSender<RegistryEvent>>,
}

impl RegistryService {
    /// Creates a new service
    ///
    /// # Arguments
    /// * `engine` - Engine holding the registry state
    /// * `clock` - Block clock supplying the logical timestamp
    pub fn new(engine: RegistryEngine, clock: BlockClock) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            clock,
            events: None,
        }
    }

    /// Forward every committed event to `sender`
    pub fn with_journal(mut self, sender: UnboundedSender<RegistryEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn clock(&self) -> &BlockClock {
        &self.clock
    }

    /// Run one mutation on behalf of `sender`
    ///
    /// The transaction context is stamped after the write lock is taken, so
    /// block heights observed by successive mutations never go backwards.
    /// Events are forwarded before the lock is released, keeping the journal
    /// in commit order.
    pub async fn execute<T, F>(&self, sender: Address, op: F) -> Result<T, RegistryError>
    where
        F: FnOnce(&mut RegistryEngine, &TxContext) -> Result<T, RegistryError>,
    {
        let mut engine = self.engine.write().await;
        let ctx = TxContext::new(sender, self.clock.current());

        let result = op(&mut *engine, &ctx);

        for event in engine.drain_events() {
            info!(
                "Committed {} for batch {:?} at block {}",
                event.kind(),
                event.hash(),
                ctx.block_height
            );
            if let Some(events) = &self.events {
                if events.send(event).is_err() {
                    warn!("Event journal is gone; event dropped");
                }
            }
        }

        if let Err(e) = &result {
            warn!("Call from {:?} rejected: {}", sender, e);
        }
        result
    }

    /// Run a read-only query against the engine and the current block height
    pub async fn read<T, F>(&self, query: F) -> T
    where
        F: FnOnce(&RegistryEngine, u64) -> T,
    {
        let engine = self.engine.read().await;
        query(&*engine, self.clock.current())
    }
}
