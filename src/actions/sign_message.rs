//! Message signing
//!
//! Signs with the connected external wallet when there is one, otherwise
//! with the agent's own account.

use super::{extract_object, reply, Action, ActionExample, ActionResponse, Callback};
use super::{WalletConnector, ACTION_SIGN_MESSAGE};
use crate::config::Network;
use crate::extract::{ObjectGenerator, State};
use crate::wallet::AgentKeypair;
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

const SIGN_TEMPLATE: &str = r#"Respond with a JSON markdown block containing only the extracted values. Use null for any values that cannot be determined.


Example response:
```json
{
    "message": "Hello from Vara"
}
```

{{recentMessages}}

Given the recent messages, extract the following information about the requested message signature:
- Exact message text to sign

Respond with a JSON markdown block containing only the extracted values."#;

const SIGN_EXAMPLES: &[ActionExample] = &[ActionExample {
    user: "Sign the message \"Hello from Vara\"",
    agent: "Signing that message now.",
}];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SignMessageContent {
    /// Exact message text to sign
    pub message: String,
}

impl SignMessageContent {
    pub fn from_value(value: Value) -> Result<Self> {
        let content: Self = serde_json::from_value(value)
            .map_err(|e| Error::InvalidContent(e.to_string()))?;
        if content.message.is_empty() {
            return Err(Error::InvalidContent("message is empty".to_string()));
        }
        Ok(content)
    }
}

/// Signer address and 0x hex signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignedMessage {
    pub address: String,
    pub signature: String,
}

/// `SIGN_MESSAGE`
pub struct SignMessageAction {
    generator: Arc<dyn ObjectGenerator>,
    keypair: Arc<AgentKeypair>,
    network: Network,
    wallet: Option<Arc<dyn WalletConnector>>,
}

impl SignMessageAction {
    pub fn new(
        generator: Arc<dyn ObjectGenerator>,
        keypair: Arc<AgentKeypair>,
        network: Network,
    ) -> Self {
        Self {
            generator,
            keypair,
            network,
            wallet: None,
        }
    }

    pub fn with_wallet(mut self, wallet: Arc<dyn WalletConnector>) -> Self {
        self.wallet = Some(wallet);
        self
    }

    pub async fn sign(&self, message: &str) -> Result<SignedMessage> {
        if let Some(wallet) = &self.wallet {
            if let Some(session) = wallet.active_session().await {
                let address = session
                    .primary_account()
                    .ok_or_else(|| Error::WalletSession("session exposes no accounts".to_string()))?
                    .to_string();
                info!(address = %address, "Signing with connected wallet");
                let signature = wallet.sign_message(&session, &address, message).await?;
                return Ok(SignedMessage { address, signature });
            }
        }

        let address = self.keypair.address(self.network.ss58_prefix());
        info!(address = %address, "Signing with agent account");
        let signature = format!("0x{}", hex::encode(self.keypair.sign_message(message.as_bytes())));
        Ok(SignedMessage { address, signature })
    }
}

#[async_trait]
impl Action for SignMessageAction {
    fn name(&self) -> &'static str {
        ACTION_SIGN_MESSAGE
    }

    fn similes(&self) -> &'static [&'static str] {
        &["SIGN", "SIGN_TEXT"]
    }

    fn description(&self) -> &'static str {
        "Sign a message with the connected wallet or the agent's account"
    }

    fn examples(&self) -> &'static [ActionExample] {
        SIGN_EXAMPLES
    }

    async fn handle(&self, state: &State, callback: Callback<'_>) -> bool {
        info!("Starting SIGN_MESSAGE handler...");

        let generator = self.generator.as_ref();
        let content = match extract_object::<SignMessageContent>(generator, SIGN_TEMPLATE, state)
            .await
            .and_then(SignMessageContent::from_value)
        {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Invalid content for SIGN_MESSAGE action");
                reply(
                    callback,
                    ActionResponse::failure(
                        "Unable to process sign request. Invalid content provided.",
                        "Invalid sign content",
                    ),
                );
                return false;
            }
        };

        match self.sign(&content.message).await {
            Ok(signed) => {
                reply(
                    callback,
                    ActionResponse::success(format!(
                        "Message signed by {}: {}",
                        signed.address, signed.signature
                    ))
                    .with_content(json!({
                        "message": content.message,
                        "address": signed.address,
                        "signature": signed.signature,
                    })),
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Error signing message");
                reply(
                    callback,
                    ActionResponse::failure(format!("Error signing message: {}", e), e.to_string()),
                );
                false
            }
        }
    }
}
