//! Shared configuration for the OpenAI-compatible capability adapters:
//! reads `OPENAI_API_KEY` and an optional `OPENAI_BASE_URL`.

use std::time::Duration;

use crate::error::{CapabilityError, CapabilityResult};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone)]
pub struct CapabilitiesConfig {
    pub api_key: String,
    pub base_url: String,
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub timeout: Duration,
}

impl CapabilitiesConfig {
    pub fn from_env() -> CapabilityResult<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| CapabilityError::config_error("OPENAI_API_KEY is required"))?;
        Ok(Self {
            api_key,
            base_url: std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            max_attempts: std::env::var("OPENAI_RETRIES").ok().and_then(|s| s.parse().ok()).unwrap_or(3),
            base_delay: Duration::from_millis(
                std::env::var("OPENAI_BACKOFF_MS").ok().and_then(|s| s.parse().ok()).unwrap_or(500),
            ),
            timeout: Duration::from_secs(std::env::var("OPENAI_TIMEOUT_SECS").ok().and_then(|s| s.parse().ok()).unwrap_or(60)),
        })
    }

    pub fn retry_policy(&self, operation_name: &str) -> RetryPolicy {
        RetryPolicy::new(operation_name)
            .with_max_attempts(self.max_attempts)
            .with_base_delay(self.base_delay)
            .with_timeout(self.timeout)
    }
}
