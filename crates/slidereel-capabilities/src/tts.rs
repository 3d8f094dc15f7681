//! Text-to-speech adapter. `(model, voice, text) -> bytes`. `reqwest` gives
//! us the whole response body at once; the adapter collects it and
//! surfaces `TtsEmpty` when the body is empty.

use bytes::Bytes;
use tracing::debug;

use crate::config::CapabilitiesConfig;
use crate::error::{CapabilityError, CapabilityResult};
use crate::retry::with_retry;

pub struct TtsClient {
    http: reqwest::Client,
    config: CapabilitiesConfig,
}

impl TtsClient {
    pub fn new(config: CapabilitiesConfig) -> Self {
        Self { http: reqwest::Client::new(), config }
    }

    pub fn from_env() -> CapabilityResult<Self> {
        Ok(Self::new(CapabilitiesConfig::from_env()?))
    }

    /// Synthesize speech audio for `text`, returning the encoded audio bytes.
    pub async fn synthesize(&self, model: &str, voice: &str, text: &str) -> CapabilityResult<Bytes> {
        let policy = self.config.retry_policy("tts_speech");
        with_retry(&policy, CapabilityError::is_retryable, || self.send(model, voice, text)).await
    }

    async fn send(&self, model: &str, voice: &str, text: &str) -> CapabilityResult<Bytes> {
        debug!(model, voice, chars = text.len(), "sending tts request");
        let response = self
            .http
            .post(format!("{}/audio/speech", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&serde_json::json!({ "model": model, "voice": voice, "input": text }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() {
                CapabilityError::Transient(format!("tts {status}: {body}"))
            } else {
                CapabilityError::Permanent(format!("tts {status}: {body}"))
            });
        }

        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Err(CapabilityError::TtsEmpty);
        }
        Ok(bytes)
    }
}
