//! The file-pipeline state document: per-step status, errors, artifacts.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FileId, TaskId};

/// Status of a single step within a file's pipeline. The only legal
/// transitions are `pending -> processing -> (completed | failed | cancelled)`
/// or `pending -> skipped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Skipped,
    Cancelled,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Pending => "pending",
            StepStatus::Processing => "processing",
            StepStatus::Completed => "completed",
            StepStatus::Failed => "failed",
            StepStatus::Skipped => "skipped",
            StepStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Completed | StepStatus::Failed | StepStatus::Skipped | StepStatus::Cancelled
        )
    }

    /// Whether `self -> next` is a legal transition.
    pub fn can_transition_to(&self, next: StepStatus) -> bool {
        use StepStatus::*;
        matches!(
            (self, next),
            (Pending, Processing)
                | (Pending, Skipped)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single step's status and, once completed, its output payload.
///
/// `data` is only meaningful when `status == Completed`; downstream readers
/// MUST treat any other `data` value as absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepEntry {
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl StepEntry {
    pub fn pending() -> Self {
        Self {
            status: StepStatus::Pending,
            data: None,
        }
    }

    pub fn skipped() -> Self {
        Self {
            status: StepStatus::Skipped,
            data: None,
        }
    }

    pub fn completed_data(&self) -> Option<&serde_json::Value> {
        if self.status == StepStatus::Completed {
            self.data.as_ref()
        } else {
            None
        }
    }
}

/// Overall status of a file's pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Uploaded,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Uploaded => "uploaded",
            FileStatus::Processing => "processing",
            FileStatus::Completed => "completed",
            FileStatus::Failed => "failed",
            FileStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FileStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One entry in `errors[]`: records which step failed, why, and when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateError {
    pub step: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// A single externally addressable output of the pipeline.
///
/// Entries are additive; a step that supersedes a prior output for the same
/// logical name replaces that entry rather than appending a second one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Artifact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

/// The per-`file_id` pipeline state document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileState {
    pub file_id: FileId,
    pub file_path: String,
    pub file_ext: String,
    pub status: FileStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cancelled_step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default = "default_voice_language")]
    pub voice_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub podcast_transcript_language: Option<String>,
    #[serde(default)]
    pub generate_avatar: bool,
    #[serde(default = "default_true")]
    pub generate_subtitles: bool,
    #[serde(default = "default_true")]
    pub generate_video: bool,
    #[serde(default)]
    pub generate_podcast: bool,
    #[serde(default)]
    pub steps: BTreeMap<String, StepEntry>,
    #[serde(default)]
    pub errors: Vec<StateError>,
    #[serde(default)]
    pub artifacts: BTreeMap<String, Artifact>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Optimistic-concurrency counter: incremented on every successful write,
    /// backing the state manager's compare-and-set discipline.
    #[serde(default)]
    pub version: u64,
}

fn default_voice_language() -> String {
    "english".to_string()
}

fn default_true() -> bool {
    true
}

impl FileState {
    pub fn get_step(&self, step: &str) -> Option<&StepEntry> {
        self.steps.get(step)
    }

    pub fn step_is_completed(&self, step: &str) -> bool {
        self.steps
            .get(step)
            .map(|e| e.status == StepStatus::Completed)
            .unwrap_or(false)
    }

    /// The effective subtitle language, falling back to the voice language
    /// when none was submitted.
    pub fn effective_subtitle_language(&self) -> String {
        self.subtitle_language
            .clone()
            .unwrap_or_else(|| self.voice_language.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_entry_hides_data_unless_completed() {
        let mut entry = StepEntry::pending();
        entry.data = Some(serde_json::json!({"leftover": true}));
        entry.status = StepStatus::Failed;
        assert!(entry.completed_data().is_none());

        entry.status = StepStatus::Completed;
        assert!(entry.completed_data().is_some());
    }

    #[test]
    fn step_status_rejects_illegal_transitions() {
        assert!(!StepStatus::Completed.can_transition_to(StepStatus::Processing));
        assert!(!StepStatus::Pending.can_transition_to(StepStatus::Completed));
        assert!(StepStatus::Pending.can_transition_to(StepStatus::Processing));
    }

    #[test]
    fn effective_subtitle_language_falls_back_to_voice_language() {
        let state = FileState {
            file_id: FileId::from_string("f1"),
            file_path: "/tmp/f1.pdf".into(),
            file_ext: "pdf".into(),
            status: FileStatus::Uploaded,
            current_step: None,
            cancelled_step: None,
            task_id: None,
            voice_language: "spanish".into(),
            subtitle_language: None,
            podcast_transcript_language: None,
            generate_avatar: false,
            generate_subtitles: true,
            generate_video: true,
            generate_podcast: false,
            steps: BTreeMap::new(),
            errors: Vec::new(),
            artifacts: BTreeMap::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        };
        assert_eq!(state.effective_subtitle_language(), "spanish");
    }
}
