//! Per-file pipeline state: step status, errors, artifacts, task/file
//! correlation.

pub mod error;
pub mod state_manager;

pub use error::{StateError, StateResult};
pub use state_manager::{StateManager, StateManagerConfig};
