//! Token transfer and airdrop actions
//!
//! Both move native tokens from the agent account with
//! `Balances::transfer_keep_alive`; they differ only in wording.

use super::{
    extract_object, reply, Action, ActionExample, ActionResponse, Callback, ACTION_AIRDROP,
    ACTION_SEND_VARA,
};
use crate::address::{is_valid_address, parse_account};
use crate::amount::{normalize_exact, AmountInput};
use crate::chain::{TransferResult, TransferSubmitter};
use crate::extract::{ObjectGenerator, State};
use crate::wallet::AgentKeypair;
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

const TRANSFER_TEMPLATE: &str = r#"Respond with a JSON markdown block containing only the extracted values. Use null for any values that cannot be determined.


Example response:
```json
{
    "recipient": "5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK",
    "amount": "1000"
}
```

{{recentMessages}}

Given the recent messages, extract the following information about the requested Vara token transfer:
- Recipient wallet address
- Amount of Vara to transfer

Respond with a JSON markdown block containing only the extracted values."#;

const AIRDROP_TEMPLATE: &str = r#"Respond with a JSON markdown block containing only the extracted values. Use null for any values that cannot be determined.


Example response:
```json
{
    "recipient": "5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK",
    "amount": "1000"
}
```

{{recentMessages}}

Given the recent messages, extract the following information about the requested Vara token airdrop:
- Recipient wallet address
- Amount of Vara to airdrop

Respond with a JSON markdown block containing only the extracted values."#;

const SEND_SIMILES: &[&str] = &[
    "TRANSFER_VARA_TOKEN",
    "TRANSFER_TOKEN",
    "TRANSFER_TOKENS_ON_VARA",
    "TRANSFER_TOKEN_ON_VARA",
    "SEND_TOKENS_ON_VARA",
    "SEND_TOKENS_ON_VARA_NETWORK",
    "SEND_VARA_ON_VARA_NETWORK",
    "SEND_VARA_TOKEN_ON_VARA",
    "PAY_ON_VARA",
];

const SEND_EXAMPLES: &[ActionExample] = &[
    ActionExample {
        user: "Send 1 VARA to 5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK",
        agent: "Sure, I'll send 1 VARA to that address now.",
    },
    ActionExample {
        user: "Please send 1 VARA tokens to 5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK",
        agent: "Of course. Sending 1 VARA to that address now.",
    },
];

const AIRDROP_EXAMPLES: &[ActionExample] = &[ActionExample {
    user: "Airdrop 1 VARA to 5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK",
    agent: "Sure, I'll airdrop 1 VARA to that address now.",
}];

/// Which wording a transfer is reported with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferKind {
    Send,
    Airdrop,
}

impl TransferKind {
    fn noun(&self) -> &'static str {
        match self {
            TransferKind::Send => "transfer",
            TransferKind::Airdrop => "airdrop",
        }
    }

    fn gerund(&self) -> &'static str {
        match self {
            TransferKind::Send => "transferring",
            TransferKind::Airdrop => "airdropping",
        }
    }

    fn template(&self) -> &'static str {
        match self {
            TransferKind::Send => TRANSFER_TEMPLATE,
            TransferKind::Airdrop => AIRDROP_TEMPLATE,
        }
    }
}

/// Transfer parameters extracted from the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TransferContent {
    /// Recipient wallet address (SS58 or 0x-prefixed hex)
    pub recipient: String,
    /// Amount in whole tokens; use a string for more than 10 digits
    pub amount: AmountInput,
}

impl TransferContent {
    /// Accept only a well-typed object whose recipient is a valid address.
    pub fn from_value(value: Value) -> Result<Self> {
        let content: Self = serde_json::from_value(value)
            .map_err(|e| Error::InvalidContent(e.to_string()))?;
        if !is_valid_address(&content.recipient) {
            return Err(Error::InvalidContent(format!(
                "'{}' is not a valid address",
                content.recipient
            )));
        }
        Ok(content)
    }
}

/// `SEND_VARA` / `AIRDROP`
pub struct TransferAction {
    kind: TransferKind,
    generator: Arc<dyn ObjectGenerator>,
    submitter: Arc<TransferSubmitter>,
    keypair: Arc<AgentKeypair>,
    dispatch_error_is_failure: bool,
}

impl TransferAction {
    pub fn new(
        kind: TransferKind,
        generator: Arc<dyn ObjectGenerator>,
        submitter: Arc<TransferSubmitter>,
        keypair: Arc<AgentKeypair>,
    ) -> Self {
        Self {
            kind,
            generator,
            submitter,
            keypair,
            dispatch_error_is_failure: false,
        }
    }

    /// Report finalized-but-failed extrinsics as action failures
    pub fn with_dispatch_error_as_failure(mut self, enabled: bool) -> Self {
        self.dispatch_error_is_failure = enabled;
        self
    }

    /// Validate, normalize and submit an already extracted request.
    pub async fn submit(&self, content: &TransferContent) -> Result<TransferResult> {
        let recipient = parse_account(&content.recipient)?;

        // The session that reports decimals also carries the transfer
        let session = self.submitter.connect().await?;
        let token = session.token_info().await?;
        let amount = normalize_exact(&content.amount, token.decimals)?;

        info!(
            recipient = %content.recipient,
            amount = %content.amount,
            symbol = %token.symbol,
            "Submitting {}", self.kind.noun()
        );
        self.submitter
            .submit_with(session.as_ref(), &self.keypair, &recipient, amount)
            .await
    }

    /// Run everything after extraction and report through `callback`.
    pub async fn execute(&self, content: &TransferContent, callback: Callback<'_>) -> bool {
        match self.submit(content).await {
            Ok(result) => {
                let response = self.completed_response(&result);
                let succeeded = !response.is_failure();
                reply(callback, response);
                succeeded
            }
            Err(e) => {
                error!(error = %e, "Error during token {}", self.kind.noun());
                reply(callback, self.error_response(&e.to_string()));
                false
            }
        }
    }

    fn completed_response(&self, result: &TransferResult) -> ActionResponse {
        let Some(failure) = &result.dispatch_error else {
            return ActionResponse::success(format!(
                "Transfer completed successfully! tx hash: {} Block Hash: {}",
                result.transaction_hash_hex(),
                result.block_hash_hex()
            ));
        };

        warn!(
            tx_hash = %result.transaction_hash_hex(),
            dispatch_error = %failure,
            "Extrinsic finalized with a dispatch error"
        );

        if self.dispatch_error_is_failure {
            let message = format!("{} (tx hash: {})", failure, result.transaction_hash_hex());
            return self
                .error_response(&message)
                .with_content(json!({
                    "error": message,
                    "dispatch_error": failure.to_json(),
                }));
        }

        ActionResponse::success(format!(
            "Transfer completed successfully! tx hash: {} Block Hash: {} (dispatch error: {})",
            result.transaction_hash_hex(),
            result.block_hash_hex(),
            failure
        ))
        .with_content(json!({ "dispatch_error": failure.to_json() }))
    }

    fn error_response(&self, message: &str) -> ActionResponse {
        ActionResponse::failure(
            format!("Error {} tokens: {}", self.kind.gerund(), message),
            message,
        )
    }
}

#[async_trait]
impl Action for TransferAction {
    fn name(&self) -> &'static str {
        match self.kind {
            TransferKind::Send => ACTION_SEND_VARA,
            TransferKind::Airdrop => ACTION_AIRDROP,
        }
    }

    fn similes(&self) -> &'static [&'static str] {
        match self.kind {
            TransferKind::Send => SEND_SIMILES,
            TransferKind::Airdrop => &[],
        }
    }

    fn description(&self) -> &'static str {
        match self.kind {
            TransferKind::Send => "Transfer Vara tokens from the agent's wallet to another address",
            TransferKind::Airdrop => {
                "Airdrop Vara tokens from the agent's wallet to user specified address"
            }
        }
    }

    fn examples(&self) -> &'static [ActionExample] {
        match self.kind {
            TransferKind::Send => SEND_EXAMPLES,
            TransferKind::Airdrop => AIRDROP_EXAMPLES,
        }
    }

    async fn handle(&self, state: &State, callback: Callback<'_>) -> bool {
        info!("Starting {} handler...", self.name());

        let generator = self.generator.as_ref();
        let template = self.kind.template();
        let extracted = match extract_object::<TransferContent>(generator, template, state).await {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "Extraction failed for {}", self.name());
                reply(callback, self.error_response(&e.to_string()));
                return false;
            }
        };

        let content = match TransferContent::from_value(extracted) {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Invalid content for {} action", self.name());
                reply(
                    callback,
                    ActionResponse::failure(
                        format!(
                            "Unable to process {} request. Invalid content provided.",
                            self.kind.noun()
                        ),
                        format!("Invalid {} content", self.kind.noun()),
                    ),
                );
                return false;
            }
        };

        self.execute(&content, callback).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ChainEndpoint, DispatchFailure};
    use crate::testing::{alice_account, bob_keypair, MockChain, MockGenerator, Replies, ALICE};
    use std::time::Duration;

    fn action(kind: TransferKind, chain: &MockChain, reply: Value) -> TransferAction {
        let endpoint = ChainEndpoint::new(Arc::new(chain.clone()), "ws://mock");
        TransferAction::new(
            kind,
            Arc::new(MockGenerator::returning(reply)),
            Arc::new(TransferSubmitter::new(endpoint)),
            Arc::new(bob_keypair()),
        )
    }

    fn state(text: &str) -> State {
        State::from_message("user1", text)
    }

    #[tokio::test]
    async fn test_send_reports_hashes() {
        let chain = MockChain::new(12);
        let action = action(
            TransferKind::Send,
            &chain,
            json!({"recipient": ALICE, "amount": "1.5"}),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        let ok = action
            .handle(&state(&format!("Send 1.5 VARA to {ALICE}")), Some(&callback))
            .await;

        assert!(ok);
        let response = replies.only();
        assert!(response.text.starts_with("Transfer completed successfully! tx hash: 0x"));
        assert!(response.text.contains("Block Hash: 0x"));
        assert_eq!(response.content, json!({}));
        assert_eq!(chain.submissions(), vec![(alice_account(), 1_500_000_000_000)]);
    }

    #[tokio::test]
    async fn test_invalid_recipient_never_touches_chain() {
        let chain = MockChain::new(12);
        let action = action(
            TransferKind::Send,
            &chain,
            json!({"recipient": "not-an-address", "amount": "1"}),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(!action.handle(&state("send 1 to nowhere"), Some(&callback)).await);

        let response = replies.only();
        assert_eq!(
            response.text,
            "Unable to process transfer request. Invalid content provided."
        );
        assert_eq!(response.content, json!({"error": "Invalid transfer content"}));
        assert_eq!(chain.connections(), 0);
    }

    #[tokio::test]
    async fn test_missing_fields_are_invalid_content() {
        let chain = MockChain::new(12);
        let action = action(
            TransferKind::Airdrop,
            &chain,
            json!({"recipient": ALICE, "amount": null}),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(!action.handle(&state("airdrop please"), Some(&callback)).await);
        assert_eq!(
            replies.only().content,
            json!({"error": "Invalid airdrop content"})
        );
    }

    #[tokio::test]
    async fn test_airdrop_wording() {
        let chain = MockChain::new(12);
        let action = action(
            TransferKind::Airdrop,
            &chain,
            json!({"recipient": ALICE, "amount": 1}),
        );

        assert_eq!(action.name(), "AIRDROP");
        assert!(action.similes().is_empty());

        let replies = Replies::default();
        let callback = replies.callback();
        assert!(action.handle(&state("Airdrop 1 VARA"), Some(&callback)).await);
        assert_eq!(chain.balance_of(&alice_account()), 1_000_000_000_000);
    }

    #[tokio::test]
    async fn test_large_json_number_asks_for_string() {
        let chain = MockChain::new(12);
        let action = action(
            TransferKind::Airdrop,
            &chain,
            json!({"recipient": ALICE, "amount": 12345678901u64}),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(!action.handle(&state("airdrop a lot"), Some(&callback)).await);

        let response = replies.only();
        assert_eq!(
            response.text,
            "Error airdropping tokens: For big representation of number, please use a string instead of a number"
        );
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_excess_precision_is_rejected() {
        let chain = MockChain::new(2);
        let action = action(
            TransferKind::Send,
            &chain,
            json!({"recipient": ALICE, "amount": "1.005"}),
        );

        assert!(!action.handle(&state("send 1.005"), None).await);
        assert!(chain.submissions().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_error_reported_in_content() {
        let chain = MockChain::new(12).with_dispatch_error(DispatchFailure::Module {
            section: "balances".to_string(),
            name: "InsufficientBalance".to_string(),
            docs: vec!["Balance too low to send value.".to_string()],
        });
        let action = action(
            TransferKind::Send,
            &chain,
            json!({"recipient": ALICE, "amount": "1"}),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(action.handle(&state("send 1"), Some(&callback)).await);

        let response = replies.only();
        assert!(response.text.starts_with("Transfer completed successfully!"));
        assert_eq!(response.content["dispatch_error"]["name"], "InsufficientBalance");
    }

    #[tokio::test]
    async fn test_dispatch_error_as_failure() {
        let chain = MockChain::new(12).with_dispatch_error(DispatchFailure::Other(
            "Token error".to_string(),
        ));
        let action = action(
            TransferKind::Send,
            &chain,
            json!({"recipient": ALICE, "amount": "1"}),
        )
        .with_dispatch_error_as_failure(true);
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(!action.handle(&state("send 1"), Some(&callback)).await);

        let response = replies.only();
        assert!(response.text.starts_with("Error transferring tokens: Token error"));
        assert_eq!(response.content["dispatch_error"]["message"], "Token error");
    }

    #[tokio::test]
    async fn test_repeated_sends_have_distinct_hashes() {
        let chain = MockChain::new(12);
        let action = action(
            TransferKind::Send,
            &chain,
            json!({"recipient": ALICE, "amount": "1"}),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(action.handle(&state("send 1"), Some(&callback)).await);
        assert!(action.handle(&state("send 1 again"), Some(&callback)).await);

        let texts: Vec<String> = replies.all().into_iter().map(|r| r.text).collect();
        assert_eq!(texts.len(), 2);
        assert_ne!(texts[0], texts[1]);
    }

    #[tokio::test]
    async fn test_finalization_timeout_is_reported() {
        let chain = MockChain::new(12).with_stalled_finalization();
        let endpoint = ChainEndpoint::new(Arc::new(chain.clone()), "ws://mock");
        let submitter = TransferSubmitter::new(endpoint)
            .with_finalization_timeout(Some(Duration::from_millis(20)));
        let action = TransferAction::new(
            TransferKind::Send,
            Arc::new(MockGenerator::returning(
                json!({"recipient": ALICE, "amount": "1"}),
            )),
            Arc::new(submitter),
            Arc::new(bob_keypair()),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(!action.handle(&state("send 1"), Some(&callback)).await);
        assert!(replies
            .only()
            .text
            .contains("waiting for finalization"));
    }

    #[tokio::test]
    async fn test_model_failure_is_reported() {
        let chain = MockChain::new(12);
        let action = TransferAction::new(
            TransferKind::Send,
            Arc::new(MockGenerator::failing("rate limited")),
            Arc::new(TransferSubmitter::new(ChainEndpoint::new(
                Arc::new(chain.clone()),
                "ws://mock",
            ))),
            Arc::new(bob_keypair()),
        );
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(!action.handle(&state("send 1"), Some(&callback)).await);
        assert!(replies.only().text.contains("rate limited"));
        assert_eq!(chain.connections(), 0);
    }

    #[tokio::test]
    async fn test_execute_skips_extraction() {
        let chain = MockChain::new(12);
        let generator = Arc::new(MockGenerator::returning(json!({})));
        let action = TransferAction::new(
            TransferKind::Send,
            generator.clone(),
            Arc::new(TransferSubmitter::new(ChainEndpoint::new(
                Arc::new(chain.clone()),
                "ws://mock",
            ))),
            Arc::new(bob_keypair()),
        );
        let content = TransferContent {
            recipient: ALICE.to_string(),
            amount: "0.000000000001".into(),
        };

        assert!(action.execute(&content, None).await);
        assert!(generator.prompts().is_empty());
        assert_eq!(chain.submissions(), vec![(alice_account(), 1)]);
    }

    #[tokio::test]
    async fn test_prompt_includes_conversation() {
        let chain = MockChain::new(12);
        let generator = Arc::new(MockGenerator::returning(
            json!({"recipient": ALICE, "amount": "1"}),
        ));
        let action = TransferAction::new(
            TransferKind::Send,
            generator.clone(),
            Arc::new(TransferSubmitter::new(ChainEndpoint::new(
                Arc::new(chain),
                "ws://mock",
            ))),
            Arc::new(bob_keypair()),
        );

        action.handle(&state("Send 1 VARA to Alice"), None).await;

        let prompts = generator.prompts();
        assert!(prompts[0].contains("user1: Send 1 VARA to Alice"));
        assert!(!prompts[0].contains("{{recentMessages}}"));
    }
}
