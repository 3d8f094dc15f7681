//! Image generation adapter. `(prompt, model, size, n) -> list<URL | data-URI>`.
//! Prefers hosted URLs, falling back to a `data:image/png;base64,...` URI
//! when the provider returns raw bytes instead.

use serde::Deserialize;
use tracing::debug;

use crate::config::CapabilitiesConfig;
use crate::error::{CapabilityError, CapabilityResult};
use crate::retry::with_retry;

#[derive(Debug, Deserialize)]
struct ImageGenerateResponse {
    #[serde(default)]
    data: Vec<ImageDatum>,
}

#[derive(Debug, Deserialize)]
struct ImageDatum {
    url: Option<String>,
    b64_json: Option<String>,
}

pub struct ImageGenClient {
    http: reqwest::Client,
    config: CapabilitiesConfig,
}

impl ImageGenClient {
    pub fn new(config: CapabilitiesConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub fn from_env() -> CapabilityResult<Self> {
        Ok(Self::new(CapabilitiesConfig::from_env()?))
    }

    pub async fn generate(&self, prompt: &str, model: &str, size: &str, n: u32) -> CapabilityResult<Vec<String>> {
        let policy = self.config.retry_policy("image_generate");
        with_retry(&policy, CapabilityError::is_retryable, || self.send(prompt, model, size, n)).await
    }

    async fn send(&self, prompt: &str, model: &str, size: &str, n: u32) -> CapabilityResult<Vec<String>> {
        debug!(model, size, n, "sending image generation request");
        let response = self
            .http
            .post(format!("{}/images/generations", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "model": model, "prompt": prompt, "size": size, "n": n }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                CapabilityError::Transient(format!("image generate {status}: {body}"))
            } else {
                CapabilityError::Permanent(format!("image generate {status}: {body}"))
            });
        }

        let parsed: ImageGenerateResponse = response.json().await?;
        Ok(parsed
            .data
            .into_iter()
            .filter_map(|d| match (d.url, d.b64_json) {
                (Some(url), _) => Some(url),
                (None, Some(b64)) => Some(format!("data:image/png;base64,{b64}")),
                (None, None) => None,
            })
            .collect())
    }
}
