//! KV client error types.

use thiserror::Error;

pub type KvResult<T> = Result<T, KvError>;

#[derive(Debug, Error)]
pub enum KvError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl KvError {
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Connection-level failures are transient and worth a sleep-and-retry
    /// by the caller; malformed payloads are not.
    pub fn is_retryable(&self) -> bool {
        match self {
            KvError::StoreUnavailable(_) => true,
            KvError::Redis(e) => e.is_connection_dropped() || e.is_connection_refusal() || e.is_timeout(),
            KvError::Json(_) => false,
        }
    }
}
