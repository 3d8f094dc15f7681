#![deny(unreachable_patterns)]
//! Master scheduler and per-task worker runtime.
//!
//! This crate provides:
//! - `MasterConfig`/`WorkerRuntimeConfig`, read once at process startup
//! - `WorkerRuntime`, the per-task lifecycle driving a pipeline coordinator
//! - Structured per-task logging

pub mod config;
pub mod error;
pub mod logging;
pub mod runtime;

pub use config::{MasterConfig, WorkerRuntimeConfig};
pub use error::{WorkerError, WorkerResult};
pub use logging::TaskLogger;
pub use runtime::WorkerRuntime;
