use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Logical clock shared by the block producer and the registry
///
/// The height only ever moves forward.
#[derive(Clone, Debug)]
pub struct BlockClock {
    height: Arc<AtomicU64>,
}

impl BlockClock {
    pub fn new(genesis_height: u64) -> Self {
        Self {
            height: Arc::new(AtomicU64::new(genesis_height)),
        }
    }

    pub fn current(&self) -> u64 {
        self.height.load(Ordering::SeqCst)
    }

    /// Advance by one block and return the new height
    pub fn advance(&self) -> u64 {
        self.advance_by(1)
    }

    /// Advance by `blocks`, saturating at `u64::MAX`
    pub fn advance_by(&self, blocks: u64) -> u64 {
        let previous = self
            .height
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |h| {
                Some(h.saturating_add(blocks))
            })
            .unwrap_or_else(|h| h);
        previous.saturating_add(blocks)
    }
}

impl Default for BlockClock {
    fn default() -> Self {
        Self::new(0)
    }
}
