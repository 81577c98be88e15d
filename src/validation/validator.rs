use crate::{CallError, SignedCall, state::AccountCache};
use tracing::{debug, warn};

/// Authenticates the caller of every mutating RPC call
pub struct CallValidator {
    accounts: AccountCache,
}

impl CallValidator {
    pub fn new(accounts: AccountCache) -> Self {
        Self { accounts }
    }

    /// Validate a signed call for `method`
    /// Returns Ok(()) if the sender signed it and the nonce was fresh
    pub async fn validate(&self, method: &str, call: &SignedCall) -> Result<(), CallError> {
        debug!("Validating {} call from {:?}", method, call.sender);

        // 1. Verify signature
        self.verify_signature(method, call)?;

        // 2. Consume nonce
        self.check_nonce(call).await?;

        debug!("Call validation successful");
        Ok(())
    }

    /// Verify that `call.sender` signed the call digest
    fn verify_signature(&self, method: &str, call: &SignedCall) -> Result<(), CallError> {
        let digest = call.digest(method);

        let recovered_address = call
            .signature
            .recover(digest)
            .map_err(|_| CallError::InvalidSignature)?;

        if recovered_address != call.sender {
            warn!("Signature verification failed: signer mismatch");
            return Err(CallError::InvalidSignature);
        }

        Ok(())
    }

    /// Accept the nonce only if it is exactly the sender's next one
    async fn check_nonce(&self, call: &SignedCall) -> Result<(), CallError> {
        self.accounts
            .consume_nonce(&call.sender, call.nonce)
            .await
            .map_err(|expected| {
                warn!(
                    "Nonce check failed for {:?}: expected {}, got {}",
                    call.sender, expected, call.nonce
                );
                CallError::InvalidNonce {
                    expected,
                    got: call.nonce,
                }
            })
    }
}
