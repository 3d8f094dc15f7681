//! Pipeline-level error kinds.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("state error: {0}")]
    State(#[from] slidereel_state::StateError),

    #[error("queue error: {0}")]
    Queue(#[from] slidereel_queue::QueueError),

    #[error("storage error: {0}")]
    Storage(#[from] slidereel_storage::StorageError),

    #[error("external capability error: {0}")]
    Capability(#[from] slidereel_capabilities::CapabilityError),

    #[error("media tooling error: {0}")]
    Media(#[from] slidereel_media::MediaError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancellation requested")]
    Cancelled,
}

impl PipelineError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
