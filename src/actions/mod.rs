//! Conversational wallet actions
//!
//! Every action follows the same shape: extract structured intent from the
//! conversation through an `ObjectGenerator`, validate it, call the chain,
//! then report a single `ActionResponse` through the callback. Failures are
//! reported, never raised, so a bad request cannot take down the host.

mod balance;
mod sign_message;
mod transfer;
mod wallet_connect;

use crate::extract::{compose_prompt, ObjectGenerator, State};
use crate::Result;
use async_trait::async_trait;
use schemars::{schema_for, JsonSchema};
use serde::Serialize;
use serde_json::{json, Value};

pub use balance::{LookupBalanceAction, LookupContent};
pub use sign_message::{SignMessageAction, SignMessageContent, SignedMessage};
pub use transfer::{TransferAction, TransferContent, TransferKind};
pub use wallet_connect::{WalletConnectAction, WalletConnector, WalletSession};

pub const ACTION_SEND_VARA: &str = "SEND_VARA";
pub const ACTION_AIRDROP: &str = "AIRDROP";
pub const ACTION_LOOKUP_BALANCE: &str = "LOOKUP_BALANCE";
pub const ACTION_CONNECT_WALLET: &str = "CONNECT_WALLET";
pub const ACTION_SIGN_MESSAGE: &str = "SIGN_MESSAGE";

/// Reply delivered to the conversation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionResponse {
    pub text: String,
    pub content: Value,
}

impl ActionResponse {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            content: json!({}),
        }
    }

    pub fn failure(text: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            content: json!({ "error": error.into() }),
        }
    }

    pub fn with_content(mut self, content: Value) -> Self {
        self.content = content;
        self
    }

    pub fn is_failure(&self) -> bool {
        self.content.get("error").is_some()
    }
}

/// Receives the action's reply; absent when the host only wants the outcome
pub type Callback<'a> = Option<&'a (dyn Fn(ActionResponse) + Send + Sync)>;

pub(crate) fn reply(callback: Callback<'_>, response: ActionResponse) {
    if let Some(callback) = callback {
        callback(response);
    }
}

/// Sample exchange shown to the agent runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActionExample {
    pub user: &'static str,
    pub agent: &'static str,
}

#[async_trait]
pub trait Action: Send + Sync {
    fn name(&self) -> &'static str;

    /// Alternative names the runtime may select this action by
    fn similes(&self) -> &'static [&'static str] {
        &[]
    }

    fn description(&self) -> &'static str;

    fn examples(&self) -> &'static [ActionExample] {
        &[]
    }

    /// Run the action; returns whether it succeeded
    async fn handle(&self, state: &State, callback: Callback<'_>) -> bool;
}

/// JSON schema sent to the model alongside the prompt
pub(crate) fn schema_of<T: JsonSchema>() -> Value {
    serde_json::to_value(schema_for!(T)).unwrap_or(Value::Null)
}

/// Render `template` against the conversation and ask the model for `T`'s shape.
pub(crate) async fn extract_object<T: JsonSchema>(
    generator: &dyn ObjectGenerator,
    template: &str,
    state: &State,
) -> Result<Value> {
    let prompt = compose_prompt(template, state);
    generator.generate_object(&prompt, &schema_of::<T>()).await
}
