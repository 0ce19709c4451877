//! Structured intent extraction
//!
//! Actions render a prompt template against recent conversation and ask an
//! external model for a JSON object. The model is a collaborator behind
//! `ObjectGenerator`; this module only owns prompt composition and parsing
//! of the JSON markdown block the model replies with.

mod openai;

use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use openai::OpenAiObjectGenerator;

/// Placeholder replaced with the rendered conversation
pub const RECENT_MESSAGES: &str = "{{recentMessages}}";

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memory {
    pub user: String,
    pub text: String,
}

/// Conversation state handed to an action
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct State {
    pub recent_messages: Vec<Memory>,
}

impl State {
    /// State holding a single user message
    pub fn from_message(user: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recent_messages: vec![Memory {
                user: user.into(),
                text: text.into(),
            }],
        }
    }

    pub fn push(&mut self, user: impl Into<String>, text: impl Into<String>) {
        self.recent_messages.push(Memory {
            user: user.into(),
            text: text.into(),
        });
    }

    /// Latest message text, used for audit previews
    pub fn last_text(&self) -> Option<&str> {
        self.recent_messages.last().map(|m| m.text.as_str())
    }

    fn render_recent_messages(&self) -> String {
        self.recent_messages
            .iter()
            .map(|m| format!("{}: {}", m.user, m.text))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Substitute the conversation into a prompt template
pub fn compose_prompt(template: &str, state: &State) -> String {
    template.replace(RECENT_MESSAGES, &state.render_recent_messages())
}

/// External model that turns a prompt into a JSON object
#[async_trait]
pub trait ObjectGenerator: Send + Sync {
    /// `schema` describes the expected object; implementations may forward
    /// it to the model or ignore it.
    async fn generate_object(&self, prompt: &str, schema: &Value) -> Result<Value>;
}

/// Stand-in used when no model endpoint is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl ObjectGenerator for UnconfiguredGenerator {
    async fn generate_object(&self, _prompt: &str, _schema: &Value) -> Result<Value> {
        Err(Error::Config(format!(
            "{} is required for conversational actions",
            crate::config::MODEL_API_URL_ENV
        )))
    }
}

/// Parse the JSON object out of a model reply.
///
/// Accepts a fenced ```` ```json ```` block, a bare fenced block, or raw JSON.
pub fn parse_json_block(text: &str) -> Result<Value> {
    let body = fenced_body(text).unwrap_or(text).trim();
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::Model(format!("Reply is not valid JSON: {}", e)))?;

    if !value.is_object() {
        return Err(Error::Model("Reply is not a JSON object".to_string()));
    }
    Ok(value)
}

fn fenced_body(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    // Language tag, on its own line or run into the body
    let body = text[start + 3..].trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    let end = body.find("```")?;
    Some(&body[..end])
}
