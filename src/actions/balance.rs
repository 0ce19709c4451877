//! Free balance lookup

use super::{extract_object, reply, Action, ActionExample, ActionResponse, Callback};
use super::ACTION_LOOKUP_BALANCE;
use crate::address::{is_valid_address, parse_account};
use crate::amount::format_units;
use crate::chain::ChainEndpoint;
use crate::extract::{ObjectGenerator, State};
use crate::{Error, Result};
use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

const LOOKUP_TEMPLATE: &str = r#"Respond with a JSON markdown block containing only the extracted values.


Example response:
```json
{
    "address": "5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK"
}
```

{{recentMessages}}

Given the recent messages, extract the following information about the requested account balance lookup:
- Address of the wallet in question

Respond with a JSON markdown block containing only the extracted values."#;

const LOOKUP_EXAMPLES: &[ActionExample] = &[
    ActionExample {
        user: "How many VARA does the address have? 5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK",
        agent: "Sure, I'll query the balance of the provided address.",
    },
    ActionExample {
        user: "Check account balance of 5GWbvXjefEvXXETtKQH7YBsUaPc379KAQATW1eqeJT26cbsK",
        agent: "Of course. Looking up the account balance for you.",
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LookupContent {
    /// Address of the wallet in question
    pub address: String,
}

impl LookupContent {
    pub fn from_value(value: Value) -> Result<Self> {
        let content: Self = serde_json::from_value(value)
            .map_err(|e| Error::InvalidContent(e.to_string()))?;
        if !is_valid_address(&content.address) {
            return Err(Error::InvalidContent(format!(
                "'{}' is not a valid address",
                content.address
            )));
        }
        Ok(content)
    }
}

/// `LOOKUP_BALANCE`
pub struct LookupBalanceAction {
    generator: Arc<dyn ObjectGenerator>,
    endpoint: ChainEndpoint,
}

impl LookupBalanceAction {
    pub fn new(generator: Arc<dyn ObjectGenerator>, endpoint: ChainEndpoint) -> Self {
        Self {
            generator,
            endpoint,
        }
    }

    /// Free balance of `address`, formatted with the chain's token symbol
    pub async fn lookup(&self, address: &str) -> Result<String> {
        let account = parse_account(address)?;
        let session = self.endpoint.connect().await?;
        let token = session.token_info().await?;
        let free = session.free_balance(&account).await?;

        let formatted = format_units(free, token.decimals);
        info!(address, free = %formatted, symbol = %token.symbol, "Balance fetched");
        Ok(format!("{} {}", formatted, token.symbol))
    }
}

#[async_trait]
impl Action for LookupBalanceAction {
    fn name(&self) -> &'static str {
        ACTION_LOOKUP_BALANCE
    }

    fn description(&self) -> &'static str {
        "Lookup free balance of the user specified address"
    }

    fn examples(&self) -> &'static [ActionExample] {
        LOOKUP_EXAMPLES
    }

    async fn handle(&self, state: &State, callback: Callback<'_>) -> bool {
        info!("Starting LOOKUP_BALANCE handler...");

        let generator = self.generator.as_ref();
        let content = match extract_object::<LookupContent>(generator, LOOKUP_TEMPLATE, state)
            .await
            .and_then(LookupContent::from_value)
        {
            Ok(content) => content,
            Err(e) => {
                warn!(error = %e, "Invalid content for LOOKUP_BALANCE action");
                reply(
                    callback,
                    ActionResponse::failure(
                        "Unable to process lookup request. Invalid content provided.",
                        "Invalid lookup content",
                    ),
                );
                return false;
            }
        };

        match self.lookup(&content.address).await {
            Ok(balance) => {
                reply(
                    callback,
                    ActionResponse::success(format!(
                        "Address balance of {}: {}",
                        content.address, balance
                    )),
                );
                true
            }
            Err(e) => {
                error!(error = %e, "Error during balance lookup");
                reply(
                    callback,
                    ActionResponse::failure(
                        format!("Error looking up balance: {}", e),
                        e.to_string(),
                    ),
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{alice_account, MockChain, MockGenerator, Replies, ALICE};
    use serde_json::json;

    fn action(chain: &MockChain, reply: Value) -> LookupBalanceAction {
        LookupBalanceAction::new(
            Arc::new(MockGenerator::returning(reply)),
            ChainEndpoint::new(Arc::new(chain.clone()), "ws://mock"),
        )
    }

    #[tokio::test]
    async fn test_lookup_formats_balance() {
        let chain = MockChain::new(12).with_balance(alice_account(), 42_500_000_000_000);
        let action = action(&chain, json!({"address": ALICE}));
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(
            action
                .handle(&State::from_message("user1", "balance?"), Some(&callback))
                .await
        );
        assert_eq!(
            replies.only().text,
            format!("Address balance of {ALICE}: 42.5 VARA")
        );
    }

    #[tokio::test]
    async fn test_unknown_account_has_zero_balance() {
        let chain = MockChain::new(12);
        let action = action(&chain, json!({}));
        assert_eq!(action.lookup(ALICE).await.unwrap(), "0 VARA");
    }

    #[tokio::test]
    async fn test_invalid_address_is_invalid_content() {
        let chain = MockChain::new(12);
        let action = action(&chain, json!({"address": "0x1234"}));
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(
            !action
                .handle(&State::from_message("user1", "balance of 0x1234"), Some(&callback))
                .await
        );
        let response = replies.only();
        assert_eq!(
            response.text,
            "Unable to process lookup request. Invalid content provided."
        );
        assert_eq!(response.content, json!({"error": "Invalid lookup content"}));
        assert_eq!(chain.connections(), 0);
    }

    #[tokio::test]
    async fn test_connection_failure_is_reported() {
        let chain = MockChain::new(12).with_failing_connection();
        let action = action(&chain, json!({"address": ALICE}));
        let replies = Replies::default();
        let callback = replies.callback();

        assert!(
            !action
                .handle(&State::from_message("user1", "balance?"), Some(&callback))
                .await
        );
        assert!(replies
            .only()
            .text
            .starts_with("Error looking up balance: Chain RPC error"));
    }
}
