//! Worker/master error types.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("invalid task payload: {0}")]
    InvalidTaskPayload(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("queue error: {0}")]
    Queue(#[from] slidereel_queue::QueueError),

    #[error("state error: {0}")]
    State(#[from] slidereel_state::StateError),

    #[error("storage error: {0}")]
    Storage(#[from] slidereel_storage::StorageError),

    #[error("capability error: {0}")]
    Capability(#[from] slidereel_capabilities::CapabilityError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] slidereel_pipeline::PipelineError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn invalid_task_payload(msg: impl Into<String>) -> Self {
        Self::InvalidTaskPayload(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
