//! Chat completion adapter. `(messages, model, params) -> string`, built on
//! the centralized `with_retry` combinator instead of a per-adapter retry
//! loop.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::config::CapabilitiesConfig;
use crate::error::{CapabilityError, CapabilityResult};
use crate::retry::with_retry;

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

pub struct ChatClient {
    http: reqwest::Client,
    config: CapabilitiesConfig,
}

impl ChatClient {
    pub fn new(config: CapabilitiesConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub fn from_env() -> CapabilityResult<Self> {
        Ok(Self::new(CapabilitiesConfig::from_env()?))
    }

    /// Run a chat completion, returning the assistant message content
    /// (possibly empty string when the provider returns no content).
    pub async fn chat_completion(&self, messages: &[ChatMessage], model: &str, params: Value) -> CapabilityResult<String> {
        let policy = self.config.retry_policy("chat_completion");
        with_retry(&policy, CapabilityError::is_retryable, || self.send(messages, model, &params)).await
    }

    async fn send(&self, messages: &[ChatMessage], model: &str, params: &Value) -> CapabilityResult<String> {
        let mut body = params.clone();
        if !body.is_object() {
            body = serde_json::json!({});
        }
        body["model"] = Value::String(model.to_string());
        body["messages"] = serde_json::to_value(messages).unwrap_or(Value::Null);

        debug!(model, "sending chat completion request");
        let response = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                CapabilityError::Transient(format!("chat completion {status}: {text}"))
            } else {
                CapabilityError::Permanent(format!("chat completion {status}: {text}"))
            });
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default())
    }
}
