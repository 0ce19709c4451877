//! Chain access
//!
//! Actions talk to the chain through two small ports so the transfer
//! sequence can be exercised without a node:
//! - `ChainConnector` opens a fresh session per call (no pooling)
//! - `ChainSession` reads balances/properties and submits keep-alive transfers

mod submitter;
mod substrate;

use crate::wallet::AgentKeypair;
use crate::Result;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::fmt;
use std::sync::Arc;
use subxt::utils::{AccountId32, H256};

pub use submitter::TransferSubmitter;
pub use substrate::{SubxtConnector, SubxtSession};

/// Native token metadata reported by the node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u32,
}

/// Why a finalized extrinsic was rejected by the runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchFailure {
    /// Pallet error decoded from metadata
    Module {
        section: String,
        name: String,
        docs: Vec<String>,
    },
    Other(String),
}

impl DispatchFailure {
    pub fn to_json(&self) -> Value {
        match self {
            DispatchFailure::Module {
                section,
                name,
                docs,
            } => json!({
                "section": section,
                "name": name,
                "docs": docs.join(" "),
            }),
            DispatchFailure::Other(message) => json!({ "message": message }),
        }
    }
}

impl fmt::Display for DispatchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchFailure::Module {
                section,
                name,
                docs,
            } => write!(f, "{}.{}: {}", section, name, docs.join(" ")),
            DispatchFailure::Other(message) => f.write_str(message),
        }
    }
}

/// Outcome of one submitted transfer extrinsic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferResult {
    pub transaction_hash: H256,
    pub block_hash: H256,
    /// Set when the extrinsic finalized but its call failed
    pub dispatch_error: Option<DispatchFailure>,
}

impl TransferResult {
    pub fn transaction_hash_hex(&self) -> String {
        hash_hex(&self.transaction_hash)
    }

    pub fn block_hash_hex(&self) -> String {
        hash_hex(&self.block_hash)
    }
}

/// Full 0x-prefixed hex; `Display` on `H256` abbreviates.
pub fn hash_hex(hash: &H256) -> String {
    format!("0x{}", hex::encode(hash.as_bytes()))
}

#[async_trait]
pub trait ChainSession: Send + Sync {
    async fn token_info(&self) -> Result<TokenInfo>;

    /// Free balance in minor units; unknown accounts report zero
    async fn free_balance(&self, account: &AccountId32) -> Result<u128>;

    /// Sign and broadcast `Balances::transfer_keep_alive`, then wait until the
    /// extrinsic is finalized or the pool reports a terminal error.
    async fn transfer_keep_alive(
        &self,
        signer: &AgentKeypair,
        dest: &AccountId32,
        value: u128,
    ) -> Result<TransferResult>;
}

#[async_trait]
pub trait ChainConnector: Send + Sync {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn ChainSession>>;
}

/// A connector bound to one RPC endpoint
#[derive(Clone)]
pub struct ChainEndpoint {
    connector: Arc<dyn ChainConnector>,
    url: String,
}

impl ChainEndpoint {
    pub fn new(connector: Arc<dyn ChainConnector>, url: impl Into<String>) -> Self {
        Self {
            connector,
            url: url.into(),
        }
    }

    pub async fn connect(&self) -> Result<Box<dyn ChainSession>> {
        self.connector.connect(&self.url).await
    }
}

impl fmt::Debug for ChainEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainEndpoint")
            .field("url", &self.url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_hex_is_not_abbreviated() {
        let hash = H256::from_low_u64_be(0xabcdef);
        let hex = hash_hex(&hash);
        assert_eq!(hex.len(), 66);
        assert!(hex.ends_with("abcdef"));
    }

    #[test]
    fn test_dispatch_failure_display() {
        let failure = DispatchFailure::Module {
            section: "balances".to_string(),
            name: "InsufficientBalance".to_string(),
            docs: vec!["Balance too low to send value.".to_string()],
        };
        assert_eq!(
            failure.to_string(),
            "balances.InsufficientBalance: Balance too low to send value."
        );
        assert_eq!(failure.to_json()["name"], "InsufficientBalance");
    }
}
