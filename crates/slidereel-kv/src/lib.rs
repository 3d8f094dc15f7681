//! Typed key-value/list store client, the thinnest layer on top of Redis.
//!
//! The Task Queue and State Manager crates build their domain semantics on
//! top of [`KvStore`]; this crate knows nothing about tasks, files, or steps.

pub mod client;
pub mod error;

pub use client::{KvConfig, KvStore};
pub use error::{KvError, KvResult};
