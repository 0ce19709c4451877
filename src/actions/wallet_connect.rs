//! External wallet pairing
//!
//! The pairing protocol itself lives behind `WalletConnector`; this action
//! only asks for a session and relays the pairing URI to the user.

use super::{reply, Action, ActionExample, ActionResponse, Callback, ACTION_CONNECT_WALLET};
use crate::config::Network;
use crate::extract::State;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info};

/// A paired external wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletSession {
    pub topic: String,
    /// URI the user opens in their wallet to approve pairing
    pub uri: String,
    /// Addresses the wallet exposed for this session
    pub accounts: Vec<String>,
}

impl WalletSession {
    pub fn primary_account(&self) -> Option<&str> {
        self.accounts.first().map(String::as_str)
    }
}

/// Signing-session service for an external wallet
#[async_trait]
pub trait WalletConnector: Send + Sync {
    /// Start pairing for `network` and return the pending session
    async fn pair(&self, network: Network) -> Result<WalletSession>;

    async fn active_session(&self) -> Option<WalletSession>;

    /// Ask the wallet to sign `message` with `address`; returns a 0x hex signature
    async fn sign_message(
        &self,
        session: &WalletSession,
        address: &str,
        message: &str,
    ) -> Result<String>;
}

const CONNECT_EXAMPLES: &[ActionExample] = &[ActionExample {
    user: "Connect my wallet",
    agent: "Open this link in your wallet to connect.",
}];

/// `CONNECT_WALLET`
pub struct WalletConnectAction {
    connector: Arc<dyn WalletConnector>,
    network: Network,
}

impl WalletConnectAction {
    pub fn new(connector: Arc<dyn WalletConnector>, network: Network) -> Self {
        Self { connector, network }
    }
}

#[async_trait]
impl Action for WalletConnectAction {
    fn name(&self) -> &'static str {
        ACTION_CONNECT_WALLET
    }

    fn similes(&self) -> &'static [&'static str] {
        &["WALLET_CONNECT", "PAIR_WALLET"]
    }

    fn description(&self) -> &'static str {
        "Connect an external wallet to sign on the user's behalf"
    }

    fn examples(&self) -> &'static [ActionExample] {
        CONNECT_EXAMPLES
    }

    async fn handle(&self, _state: &State, callback: Callback<'_>) -> bool {
        info!("Starting CONNECT_WALLET handler...");

        if let Some(session) = self.connector.active_session().await {
            reply(
                callback,
                ActionResponse::success(format!(
                    "Wallet already connected: {}",
                    session.accounts.join(", ")
                ))
                .with_content(json!({ "topic": session.topic, "accounts": session.accounts })),
            );
            return true;
        }

        match self.connector.pair(self.network).await {
            Ok(session) => {
                info!(
                    topic = %session.topic,
                    network = self.network.name(),
                    "Wallet pairing started"
                );
                reply(
                    callback,
                    ActionResponse::success(format!(
                        "Open this URI in your wallet to connect: {}",
                        session.uri
                    ))
                    .with_content(json!({ "topic": session.topic, "uri": session.uri })),
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Wallet pairing failed");
                reply(
                    callback,
                    ActionResponse::failure(
                        format!("Error connecting wallet: {}", e),
                        e.to_string(),
                    ),
                );
                false
            }
        }
    }
}
