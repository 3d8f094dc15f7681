//! State manager error types.

use thiserror::Error;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("state not found for file {0}")]
    NotFound(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("version conflict writing state for {0}, gave up after {1} retries")]
    VersionConflict(String, u32),

    #[error("kv error: {0}")]
    Kv(#[from] slidereel_kv::KvError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StateError {
    pub fn store_unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    pub fn not_found(file_id: impl Into<String>) -> Self {
        Self::NotFound(file_id.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }
}
