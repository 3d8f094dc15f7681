//! Resumable, step-ordered pipeline coordinators for the video and podcast
//! product modes, built on the queue/state/storage/capabilities/media
//! crates.

pub mod context;
pub mod coordinator;
pub mod error;
pub mod helpers;
pub mod podcast_coordinator;
pub mod steps;
pub mod video_coordinator;

pub use context::PipelineContext;
pub use error::{PipelineError, PipelineResult};
