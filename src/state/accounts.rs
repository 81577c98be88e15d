use ethers::types::Address;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Replay-protection nonces for every sender that has submitted a signed call
#[derive(Clone, Default)]
pub struct AccountCache {
    nonces: Arc<RwLock<HashMap<Address, u64>>>,
}

impl AccountCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next nonce the sender must use (0 for unseen senders)
    pub async fn get_nonce(&self, address: &Address) -> u64 {
        let nonces = self.nonces.read().await;
        nonces.get(address).copied().unwrap_or(0)
    }

    /// Accept `nonce` if it is exactly the expected one and advance the counter
    ///
    /// Check and increment happen under one write lock, so two calls racing
    /// with the same nonce cannot both pass. Returns the expected nonce on
    /// mismatch.
    pub async fn consume_nonce(&self, address: &Address, nonce: u64) -> Result<(), u64> {
        let mut nonces = self.nonces.write().await;
        let expected = nonces.entry(*address).or_insert(0);
        if *expected != nonce {
            return Err(*expected);
        }
        *expected += 1;
        Ok(())
    }
}
