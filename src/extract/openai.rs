//! OpenAI-compatible chat completions client
//!
//! Works with any endpoint speaking the `/chat/completions` dialect
//! (OpenAI, OpenRouter, local llama.cpp / vLLM servers).

use super::{parse_json_block, ObjectGenerator};
use crate::config::ModelSettings;
use crate::{Error, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Structured extraction through a chat completions endpoint
pub struct OpenAiObjectGenerator {
    http: reqwest::Client,
    api_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiObjectGenerator {
    pub fn new(settings: &ModelSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
        })
    }

    fn request_body(&self, prompt: &str, schema: &Value) -> Value {
        json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {
                    "role": "system",
                    "content": format!(
                        "Reply with a single JSON markdown block matching this JSON schema:\n{}",
                        schema
                    )
                },
                { "role": "user", "content": prompt }
            ]
        })
    }

    fn extract_object(response: ChatResponse) -> Result<Value> {
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::Model("Empty completion".to_string()))?;
        parse_json_block(&content)
    }
}

#[async_trait]
impl ObjectGenerator for OpenAiObjectGenerator {
    async fn generate_object(&self, prompt: &str, schema: &Value) -> Result<Value> {
        let url = format!("{}/chat/completions", self.api_url);
        let mut request = self.http.post(&url).json(&self.request_body(prompt, schema));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        tracing::debug!(model = %self.model, "Requesting structured extraction");
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Model(format!("{} returned {}: {}", url, status, body)));
        }

        let response: ChatResponse = response.json().await?;
        Self::extract_object(response)
    }
}
