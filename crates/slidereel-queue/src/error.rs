//! Task queue error types.

use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("queue unavailable: {0}")]
    QueueUnavailable(String),

    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    #[error("kv error: {0}")]
    Kv(#[from] slidereel_kv::KvError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl QueueError {
    pub fn queue_unavailable(msg: impl Into<String>) -> Self {
        Self::QueueUnavailable(msg.into())
    }

    pub fn task_not_found(task_id: impl Into<String>) -> Self {
        Self::TaskNotFound(task_id.into())
    }

    pub fn invalid_transition(msg: impl Into<String>) -> Self {
        Self::InvalidTransition(msg.into())
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            QueueError::QueueUnavailable(_) => true,
            QueueError::Kv(e) => e.is_retryable(),
            QueueError::TaskNotFound(_) | QueueError::InvalidTransition(_) | QueueError::Json(_) => false,
        }
    }
}
