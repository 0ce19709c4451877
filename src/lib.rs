//! Vara Wallet Agent
//!
//! Wallet actions for conversational agents on Vara and Polkadot:
//! - Look up the free balance of any account
//! - Transfer or airdrop native tokens from the agent's account
//! - Pair an external wallet and sign messages
//!
//! # Security Model
//!
//! - The seed is read once from settings and never logged or serialized
//! - Every transfer is a single keep-alive extrinsic; there is no retry
//! - Full audit trail of dispatched actions when an audit log is configured

pub mod actions;
pub mod address;
pub mod amount;
pub mod audit;
pub mod chain;
pub mod config;
pub mod extract;
pub mod plugin;
pub mod wallet;

mod error;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use actions::{Action, ActionResponse, TransferContent, TransferKind};
pub use amount::{normalize, AmountError, AmountInput, MinorUnitAmount};
pub use chain::{TransferResult, TransferSubmitter};
pub use config::{Config, EnvFallback, EnvSettings, Network, RpcConfig, Settings};
pub use error::{Error, Result};
pub use extract::State;
pub use plugin::{PluginDeps, WalletPlugin};
