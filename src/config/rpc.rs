//! RPC endpoint configuration
//!
//! Resolution order per network:
//! 1. Per-network env vars (VARA_RPC_URL, VARA_TESTNET_RPC_URL, POLKADOT_RPC_URL)
//! 2. Public RPC fallbacks - rate limited, for testing only
//!
//! # Examples
//!
//! ```bash
//! # Dedicated node (recommended for production)
//! export VARA_RPC_URL="wss://my-node.example.com"
//!
//! # No env vars - uses public RPCs
//! ```

use super::{Network, Settings};
use std::collections::HashMap;

/// Environment variable names
pub(crate) mod env_vars {
    pub const VARA_RPC_URL: &str = "VARA_RPC_URL";
    pub const VARA_TESTNET_RPC_URL: &str = "VARA_TESTNET_RPC_URL";
    pub const POLKADOT_RPC_URL: &str = "POLKADOT_RPC_URL";
}

/// Public RPC endpoints (rate limited, for testing only)
mod public_rpcs {
    pub const VARA: &str = "wss://rpc.vara.network";
    pub const VARA_TESTNET: &str = "wss://testnet.vara.network";
    pub const POLKADOT: &str = "wss://rpc.polkadot.io";
}

/// RPC configuration for the supported networks
#[derive(Debug, Clone)]
pub struct RpcConfig {
    urls: HashMap<Network, String>,
}

impl RpcConfig {
    /// Resolve endpoints from settings, then public RPCs for anything missing.
    pub fn from_settings(settings: &dyn Settings) -> Self {
        let mut urls = HashMap::new();

        for network in Network::ALL {
            let var = Self::env_var(network);
            if let Some(url) = super::lookup(settings, var) {
                tracing::debug!(network = network.name(), "Using {} for RPC", var);
                urls.insert(network, url);
            }
        }

        for network in Network::ALL {
            urls.entry(network).or_insert_with(|| {
                tracing::warn!(
                    network = network.name(),
                    "No RPC configured, using public RPC (rate limited)"
                );
                Self::public_rpc(network).to_string()
            });
        }

        Self { urls }
    }

    /// Get RPC URL for a network
    pub fn get(&self, network: Network) -> Option<&str> {
        self.urls.get(&network).map(|s| s.as_str())
    }

    pub(crate) fn env_var(network: Network) -> &'static str {
        match network {
            Network::Vara => env_vars::VARA_RPC_URL,
            Network::VaraTestnet => env_vars::VARA_TESTNET_RPC_URL,
            Network::Polkadot => env_vars::POLKADOT_RPC_URL,
        }
    }

    fn public_rpc(network: Network) -> &'static str {
        match network {
            Network::Vara => public_rpcs::VARA,
            Network::VaraTestnet => public_rpcs::VARA_TESTNET,
            Network::Polkadot => public_rpcs::POLKADOT,
        }
    }
}
