//! Capability adapter error types.

use thiserror::Error;

pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("transient external API error: {0}")]
    Transient(String),

    #[error("permanent external API error: {0}")]
    Permanent(String),

    #[error("TTS stream was empty")]
    TtsEmpty,

    #[error("request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("config error: {0}")]
    ConfigError(String),
}

impl From<crate::retry::TimedOut> for CapabilityError {
    fn from(timed_out: crate::retry::TimedOut) -> Self {
        CapabilityError::Timeout(timed_out.0)
    }
}

impl CapabilityError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether `with_retry` should retry this error. Network/5xx failures
    /// are transient; malformed-request and auth failures are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            CapabilityError::Transient(_) | CapabilityError::Timeout(_) => true,
            CapabilityError::Http(e) => e.is_timeout() || e.is_connect() || e.status().map(|s| s.is_server_error()).unwrap_or(false),
            CapabilityError::Permanent(_) | CapabilityError::TtsEmpty | CapabilityError::ConfigError(_) => false,
        }
    }

    pub fn is_permanent_failure(&self) -> bool {
        !self.is_retryable()
    }
}
