//! Shared data model for the slidereel pipeline core.
//!
//! This crate provides Serde-serializable types for:
//! - Task identity, status, and the tagged `TaskPayload` variant (video/podcast/purge)
//! - Per-file pipeline state: step status, errors, and artifact registry

pub mod ids;
pub mod state;
pub mod task;

pub use ids::{FileId, TaskId};
pub use state::{Artifact, FileState, FileStatus, StateError, StepEntry, StepStatus};
pub use task::{
    DocumentTaskFields, FilePurgeTask, PodcastTask, SourceType, Task, TaskPayload, TaskStatus,
    VideoTask,
};
