//! The `Task` entity: a unit of work submitted to the dispatch queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::{FileId, TaskId};

/// Kind of document a task was submitted against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Pdf,
    Slides,
}

impl SourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceType::Pdf => "pdf",
            SourceType::Slides => "slides",
        }
    }
}

impl std::fmt::Display for SourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall lifecycle status of a [`Task`]. Transitions are
/// `queued -> processing | cancelled`, `processing -> completed | failed | cancelled`;
/// the remaining three are terminal sinks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Processing => "processing",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// Whether `self -> next` is one of the edges in the allowed status graph.
    pub fn can_transition_to(&self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        matches!(
            (self, next),
            (Queued, Processing)
                | (Queued, Cancelled)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
        )
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TaskStatus::Queued),
            "processing" => Some(TaskStatus::Processing),
            "completed" => Some(TaskStatus::Completed),
            "failed" => Some(TaskStatus::Failed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    pub const ALL: [TaskStatus; 5] = [
        TaskStatus::Queued,
        TaskStatus::Processing,
        TaskStatus::Completed,
        TaskStatus::Failed,
        TaskStatus::Cancelled,
    ];
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fields shared by the video and podcast task variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentTaskFields {
    pub file_id: FileId,
    pub file_path: String,
    pub file_ext: String,
    pub source_type: SourceType,
    #[serde(default = "default_voice_language")]
    pub voice_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_id: Option<String>,
}

fn default_voice_language() -> String {
    "english".to_string()
}

/// A task that produces a narrated video (and, incidentally, transcripts/subtitles).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoTask {
    #[serde(flatten)]
    pub common: DocumentTaskFields,
    #[serde(default = "default_true")]
    pub generate_avatar: bool,
    #[serde(default = "default_true")]
    pub generate_subtitles: bool,
    #[serde(default = "default_true")]
    pub generate_video: bool,
}

/// A task that produces a two-voice narrated podcast from a PDF.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastTask {
    #[serde(flatten)]
    pub common: DocumentTaskFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcript_language: Option<String>,
    #[serde(default)]
    pub generate_subtitles: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub podcast_host_voice: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub podcast_guest_voice: Option<String>,
}

/// A task that deletes every storage artifact associated with a file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePurgeTask {
    pub file_id: FileId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<TaskId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_ext: Option<String>,
}

fn default_true() -> bool {
    true
}

/// Tagged union over the task types this service accepts. Replaces the opaque
/// `kwargs: HashMap<String, Value>` bag with typed, named fields per variant
/// while keeping `task_type` as the discriminant on the wire and in the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "task_type", rename_all = "snake_case")]
pub enum TaskPayload {
    Video(VideoTask),
    Podcast(PodcastTask),
    FilePurge(FilePurgeTask),
}

impl TaskPayload {
    pub fn file_id(&self) -> &FileId {
        match self {
            TaskPayload::Video(t) => &t.common.file_id,
            TaskPayload::Podcast(t) => &t.common.file_id,
            TaskPayload::FilePurge(t) => &t.file_id,
        }
    }

    pub fn task_type(&self) -> &'static str {
        match self {
            TaskPayload::Video(_) => "video",
            TaskPayload::Podcast(_) => "podcast",
            TaskPayload::FilePurge(_) => "file_purge",
        }
    }
}

/// A unit of work enqueued for processing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    #[serde(flatten)]
    pub payload: TaskPayload,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn new(payload: TaskPayload) -> Self {
        let now = Utc::now();
        Self {
            task_id: TaskId::new(),
            payload,
            status: TaskStatus::Queued,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn file_id(&self) -> &FileId {
        self.payload.file_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_video_task() -> TaskPayload {
        TaskPayload::Video(VideoTask {
            common: DocumentTaskFields {
                file_id: FileId::from_string("file-1"),
                file_path: "/tmp/file-1.pdf".into(),
                file_ext: "pdf".into(),
                source_type: SourceType::Pdf,
                voice_language: "english".into(),
                subtitle_language: Some("english".into()),
                voice_id: None,
            },
            generate_avatar: false,
            generate_subtitles: true,
            generate_video: true,
        })
    }

    #[test]
    fn task_payload_serde_roundtrip_keeps_task_type_tag() {
        let payload = sample_video_task();
        let task = Task::new(payload);
        let json = serde_json::to_string(&task).unwrap();
        assert!(json.contains("\"task_type\":\"video\""));
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.task_id, task.task_id);
        assert_eq!(back.payload.task_type(), "video");
    }

    #[test]
    fn status_transitions_follow_the_allowed_graph() {
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Processing));
        assert!(TaskStatus::Queued.can_transition_to(TaskStatus::Cancelled));
        assert!(!TaskStatus::Queued.can_transition_to(TaskStatus::Completed));
        assert!(TaskStatus::Processing.can_transition_to(TaskStatus::Completed));
        assert!(!TaskStatus::Completed.can_transition_to(TaskStatus::Processing));
        assert!(TaskStatus::Completed.is_terminal());
        assert!(!TaskStatus::Processing.is_terminal());
    }

    #[test]
    fn file_purge_payload_resolves_file_id() {
        let payload = TaskPayload::FilePurge(FilePurgeTask {
            file_id: FileId::from_string("file-9"),
            task_id: None,
            file_ext: None,
        });
        assert_eq!(payload.file_id().as_str(), "file-9");
        assert_eq!(payload.task_type(), "file_purge");
    }
}
