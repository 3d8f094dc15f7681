//! FIFO task queue over the shared key-value/list store.
//!
//! Provides task submission, status updates, blocking dispatch (`next`),
//! cancellation, and cursor-based enumeration.

pub mod error;
pub mod task_queue;

pub use error::{QueueError, QueueResult};
pub use task_queue::{DurableMirror, NullMirror, QueueConfig, TaskQueue};
