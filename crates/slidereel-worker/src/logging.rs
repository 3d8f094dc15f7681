//! Structured task logging utilities.
//!
//! Provides consistent, structured logging for task processing with
//! tracing spans and contextual information.

use slidereel_models::TaskId;
use tracing::{error, info, warn, Span};

/// Task logger for structured logging with consistent formatting.
///
/// Provides a simple interface for logging task lifecycle events
/// with automatic contextual information (task ID, task type).
#[derive(Debug, Clone)]
pub struct TaskLogger {
    task_id: String,
    task_type: String,
}

impl TaskLogger {
    /// Create a new task logger for a specific task.
    pub fn new(task_id: &TaskId, task_type: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            task_type: task_type.to_string(),
        }
    }

    /// Create a new task logger from a string task ID.
    pub fn from_string(task_id: &str, task_type: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            task_type: task_type.to_string(),
        }
    }

    /// Log the start of task processing.
    pub fn log_start(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            task_type = %self.task_type,
            "Task started: {}", message
        );
    }

    /// Log a progress update during task processing.
    pub fn log_progress(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            task_type = %self.task_type,
            "Task progress: {}", message
        );
    }

    /// Log a progress update at debug verbosity, for the monitor's
    /// periodic full-detail cadence.
    pub fn log_progress_detail(&self, message: &str) {
        tracing::debug!(
            task_id = %self.task_id,
            task_type = %self.task_type,
            "Task progress (detail): {}", message
        );
    }

    /// Log a warning during task processing.
    pub fn log_warning(&self, message: &str) {
        warn!(
            task_id = %self.task_id,
            task_type = %self.task_type,
            "Task warning: {}", message
        );
    }

    /// Log an error during task processing.
    pub fn log_error(&self, message: &str) {
        error!(
            task_id = %self.task_id,
            task_type = %self.task_type,
            "Task error: {}", message
        );
    }

    /// Log the completion of task processing.
    pub fn log_completion(&self, message: &str) {
        info!(
            task_id = %self.task_id,
            task_type = %self.task_type,
            "Task completed: {}", message
        );
    }

    /// Get the task ID.
    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    /// Get the task type.
    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Create a tracing span for this task.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "task",
            task_id = %self.task_id,
            task_type = %self.task_type
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_logger_creation() {
        let task_id = TaskId::new();
        let logger = TaskLogger::new(&task_id, "video");

        assert_eq!(logger.task_id(), task_id.to_string());
        assert_eq!(logger.task_type(), "video");
    }

    #[test]
    fn task_logger_from_string() {
        let logger = TaskLogger::from_string("task-123", "podcast");

        assert_eq!(logger.task_id(), "task-123");
        assert_eq!(logger.task_type(), "podcast");
    }
}
