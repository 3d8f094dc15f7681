//! Vision analysis adapter. `(image_bytes, prompt) -> string`. Base64-encodes
//! the image and sends it as a multimodal `image_url` content block
//! alongside the text prompt.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde_json::json;
use tracing::debug;

use crate::config::CapabilitiesConfig;
use crate::error::{CapabilityError, CapabilityResult};
use crate::retry::with_retry;

const DEFAULT_VISION_MODEL: &str = "gpt-4o-mini";
const DEFAULT_SYSTEM_PROMPT: &str =
    "You are an expert presentation analyst. Analyze slide images and extract comprehensive content understanding for script generation.";

pub struct VisionClient {
    http: reqwest::Client,
    config: CapabilitiesConfig,
}

impl VisionClient {
    pub fn new(config: CapabilitiesConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub fn from_env() -> CapabilityResult<Self> {
        Ok(Self::new(CapabilitiesConfig::from_env()?))
    }

    /// Analyze a single image, returning the model's free-form analysis text.
    /// The original falls back to a canned description on failure; the
    /// caller here decides that policy since `analyze_slides` may want to
    /// treat a vision failure as a retryable step error instead.
    pub async fn analyze_image(&self, image_bytes: &[u8], prompt: &str) -> CapabilityResult<String> {
        let policy = self.config.retry_policy("analyze_image");
        with_retry(&policy, CapabilityError::is_retryable, || self.send(image_bytes, prompt)).await
    }

    async fn send(&self, image_bytes: &[u8], prompt: &str) -> CapabilityResult<String> {
        let encoded = BASE64.encode(image_bytes);
        let body = json!({
            "model": DEFAULT_VISION_MODEL,
            "messages": [
                { "role": "system", "content": DEFAULT_SYSTEM_PROMPT },
                {
                    "role": "user",
                    "content": [
                        { "type": "text", "text": prompt },
                        { "type": "image_url", "image_url": { "url": format!("data:image/png;base64,{encoded}") } },
                    ],
                },
            ],
            "max_tokens": 2000,
        });

        debug!(bytes = image_bytes.len(), "sending vision analysis request");
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
                CapabilityError::Transient(format!("vision analysis {status}: {text}"))
            } else {
                CapabilityError::Permanent(format!("vision analysis {status}: {text}"))
            });
        }

        #[derive(serde::Deserialize)]
        struct Resp {
            choices: Vec<Choice>,
        }
        #[derive(serde::Deserialize)]
        struct Choice {
            message: Message,
        }
        #[derive(serde::Deserialize)]
        struct Message {
            content: Option<String>,
        }

        let parsed: Resp = response.json().await?;
        Ok(parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default()
            .trim()
            .to_string())
    }
}
