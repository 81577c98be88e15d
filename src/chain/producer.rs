//! Block Producer Module
//! 
//! Runs the background loop that ticks the logical clock. Each tick is one
//! block; the registry stamps records with the height current at the time of
//! the call.

use crate::{chain::BlockClock, config::ChainConfig};
use tokio::time::{sleep, Duration};
use tracing::{debug, info};

/// Background block producer
pub struct BlockProducer {
    /// Clock shared with the registry service
    clock: BlockClock,
    /// Chain configuration (block interval)
    config: ChainConfig,
}

impl BlockProducer {
    /// Creates a new block producer
    /// 
    /// # Arguments
    /// * `clock` - Clock to advance
    /// * `config` - Chain configuration settings
    pub fn new(clock: BlockClock, config: ChainConfig) -> Self {
        Self { clock, config }
    }

    /// Start producing blocks
    /// 
    /// Runs until the task is dropped.
    pub async fn start(self) -> anyhow::Result<()> {
        info!(
            "Block producer starting at height {} (interval {}ms)",
            self.clock.current(),
            self.config.block_interval_ms
        );

        let interval = Duration::from_millis(self.config.block_interval_ms.max(1));
        loop {
            sleep(interval).await;
            let height = self.clock.advance();
            debug!("Produced block {}", height);
        }
    }
}
