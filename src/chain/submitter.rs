//! Keep-alive transfer submission
//!
//! One call, one extrinsic: there is no retry, and once broadcast the
//! transfer cannot be recalled even if the caller stops waiting.

use super::{ChainEndpoint, ChainSession, TransferResult};
use crate::amount::MinorUnitAmount;
use crate::wallet::AgentKeypair;
use crate::{Error, Result};
use std::time::Duration;
use subxt::utils::AccountId32;
use tracing::{info, instrument, warn};

/// Submits balance transfers from the agent account
#[derive(Debug, Clone)]
pub struct TransferSubmitter {
    endpoint: ChainEndpoint,
    finalization_timeout: Option<Duration>,
}

impl TransferSubmitter {
    /// Create a submitter that waits for finalization without a deadline
    pub fn new(endpoint: ChainEndpoint) -> Self {
        Self {
            endpoint,
            finalization_timeout: None,
        }
    }

    /// Bound the wait for finalization; `None` waits indefinitely
    pub fn with_finalization_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.finalization_timeout = timeout;
        self
    }

    /// Open a fresh session on the configured endpoint
    pub async fn connect(&self) -> Result<Box<dyn ChainSession>> {
        self.endpoint.connect().await
    }

    /// Connect and submit a transfer of `amount` minor units
    pub async fn submit(
        &self,
        keypair: &AgentKeypair,
        recipient: &AccountId32,
        amount: MinorUnitAmount,
    ) -> Result<TransferResult> {
        let session = self.connect().await?;
        self.submit_with(session.as_ref(), keypair, recipient, amount)
            .await
    }

    /// Submit a transfer over an already open session
    #[instrument(skip_all, fields(recipient = %recipient, amount = %amount))]
    pub async fn submit_with(
        &self,
        session: &dyn ChainSession,
        keypair: &AgentKeypair,
        recipient: &AccountId32,
        amount: MinorUnitAmount,
    ) -> Result<TransferResult> {
        let value = amount.to_u128()?;
        let sender = keypair.account_id();

        log_balance(session, recipient, "Recipient balance before the transfer call").await;
        log_balance(session, &sender, "Sender balance before the transfer call").await;

        let transfer = session.transfer_keep_alive(keypair, recipient, value);
        let outcome = match self.finalization_timeout {
            Some(limit) => tokio::time::timeout(limit, transfer)
                .await
                .map_err(|_| Error::Timeout(limit))?,
            None => transfer.await,
        };

        let result = match outcome {
            Err(Error::NotExecuted(reason)) => {
                warn!(%reason, "Transaction was not executed");
                return Err(Error::NotExecuted(reason));
            }
            other => other?,
        };

        // Module errors render as `section.name: docs`
        if let Some(failure) = &result.dispatch_error {
            warn!(block_hash = %result.block_hash_hex(), "{}", failure);
        }

        log_balance(session, recipient, "Balance after the transfer call").await;

        info!(
            tx_hash = %result.transaction_hash_hex(),
            block_hash = %result.block_hash_hex(),
            "Transfer finalized"
        );
        Ok(result)
    }
}

/// Balance reads around a transfer are informational only
async fn log_balance(session: &dyn ChainSession, account: &AccountId32, label: &str) {
    match session.free_balance(account).await {
        Ok(free) => info!(account = %account, free, "{}", label),
        Err(e) => warn!(account = %account, error = %e, "{} unavailable", label),
    }
}
