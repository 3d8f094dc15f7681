//! Shared context threaded through every coordinator and step call: the
//! constructed clients for state, queue, storage, and each external
//! capability, plus the per-`file_id` workspace directory steps write
//! intermediate artifacts into.
//!
//! Built once at worker startup and passed down by reference, rather than
//! as in-process global singletons.

use std::path::PathBuf;
use std::sync::Arc;

use slidereel_capabilities::{ChatClient, ImageGenClient, TtsClient, VisionClient};
use slidereel_models::{FileId, TaskId};
use slidereel_queue::TaskQueue;
use slidereel_state::StateManager;
use slidereel_storage::StorageProvider;

#[derive(Clone)]
pub struct PipelineContext {
    pub state: Arc<StateManager>,
    pub queue: Arc<TaskQueue>,
    pub storage: Arc<dyn StorageProvider>,
    pub chat: Arc<ChatClient>,
    pub tts: Arc<TtsClient>,
    pub vision: Arc<VisionClient>,
    pub image_gen: Arc<ImageGenClient>,
    pub workspace_root: PathBuf,
    pub task_id: TaskId,
}

impl PipelineContext {
    /// The workspace directory intermediate step artifacts are written
    /// under for this run's `file_id`. Created lazily by callers via
    /// [`Self::ensure_workspace_dir`].
    pub fn workspace_dir(&self, file_id: &FileId) -> PathBuf {
        self.workspace_root.join(file_id.as_str())
    }

    pub async fn ensure_workspace_dir(&self, file_id: &FileId) -> std::io::Result<PathBuf> {
        let dir = self.workspace_dir(file_id);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    /// Non-blocking check of the cancellation flag for this run's task.
    pub async fn is_cancelled(&self) -> bool {
        self.queue.is_cancelled(&self.task_id).await.unwrap_or(false)
    }
}
