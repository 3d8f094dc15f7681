//! FIFO task submission, dispatch, and cancellation over the shared
//! key-value store.

use chrono::Utc;
use slidereel_kv::KvStore;
use slidereel_models::{Task, TaskId, TaskPayload, TaskStatus};
use tracing::{debug, info, warn};

use crate::error::{QueueError, QueueResult};

const TASK_PREFIX: &str = "ss:task";
const DISPATCH_LIST_KEY: &str = "ss:task_queue";
const CANCEL_FLAG_TTL_SECS: u64 = 300;
const TASK_TTL_SECS: u64 = 60 * 60 * 24; // 24h default task record TTL.

#[derive(Debug, Clone)]
pub struct QueueConfig {
    pub redis_url: String,
    pub task_ttl_secs: u64,
    pub cancel_flag_ttl_secs: u64,
}

impl QueueConfig {
    pub fn from_env() -> Self {
        Self {
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),
            task_ttl_secs: std::env::var("TASK_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(TASK_TTL_SECS),
            cancel_flag_ttl_secs: std::env::var("TASK_CANCEL_FLAG_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(CANCEL_FLAG_TTL_SECS),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            task_ttl_secs: TASK_TTL_SECS,
            cancel_flag_ttl_secs: CANCEL_FLAG_TTL_SECS,
        }
    }
}

/// A mirror the task queue best-effort writes to for durable history.
/// Mirroring MUST NOT block the critical path: failures are logged and
/// swallowed.
#[async_trait::async_trait]
pub trait DurableMirror: Send + Sync {
    async fn insert_task(&self, task: &Task);
    async fn update_task(&self, task_id: &TaskId, status: TaskStatus, error: Option<&str>);
}

/// A mirror that does nothing; the default when no relational store is configured.
pub struct NullMirror;

#[async_trait::async_trait]
impl DurableMirror for NullMirror {
    async fn insert_task(&self, _task: &Task) {}
    async fn update_task(&self, _task_id: &TaskId, _status: TaskStatus, _error: Option<&str>) {}
}

pub struct TaskQueue {
    kv: KvStore,
    config: QueueConfig,
    mirror: Box<dyn DurableMirror>,
}

impl TaskQueue {
    pub fn new(kv: KvStore, config: QueueConfig) -> Self {
        Self {
            kv,
            config,
            mirror: Box::new(NullMirror),
        }
    }

    pub fn with_mirror(mut self, mirror: Box<dyn DurableMirror>) -> Self {
        self.mirror = mirror;
        self
    }

    pub fn from_env() -> QueueResult<Self> {
        let config = QueueConfig::from_env();
        let kv = KvStore::from_env()?;
        Ok(Self::new(kv, config))
    }

    fn task_key(task_id: &TaskId) -> String {
        format!("{TASK_PREFIX}:{task_id}")
    }

    fn cancel_flag_key(task_id: &TaskId) -> String {
        format!("{TASK_PREFIX}:{task_id}:cancelled")
    }

    /// Allocate an opaque id, persist the task record at `queued`, and append
    /// it to the tail of the dispatch list. Best-effort mirrors to the
    /// durable store with `kwargs` already sanitized by construction (the
    /// typed `TaskPayload` never carries anything beyond what the store
    /// should see; `file_path` stays in Redis only, never the mirror).
    pub async fn submit(&self, payload: TaskPayload) -> QueueResult<TaskId> {
        let task = Task::new(payload);
        let task_id = task.task_id.clone();
        let key = Self::task_key(&task_id);
        let json = serde_json::to_string(&task)?;

        self.kv
            .setex(&key, self.config.task_ttl_secs, &json)
            .await
            .map_err(|e| QueueError::queue_unavailable(e.to_string()))?;

        self.mirror.insert_task(&task).await;

        let queue_len = self
            .kv
            .rpush(DISPATCH_LIST_KEY, task_id.as_str())
            .await
            .map_err(|e| QueueError::queue_unavailable(e.to_string()))?;

        info!(
            task_id = %task_id,
            file_id = %task.file_id(),
            queue_len,
            "submitted task"
        );
        Ok(task_id)
    }

    pub async fn get(&self, task_id: &TaskId) -> QueueResult<Option<Task>> {
        let key = Self::task_key(task_id);
        match self.kv.get(&key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    async fn save(&self, task: &Task) -> QueueResult<()> {
        let key = Self::task_key(&task.task_id);
        let json = serde_json::to_string(task)?;
        self.kv.setex(&key, self.config.task_ttl_secs, &json).await?;
        Ok(())
    }

    /// Atomic read-modify-write of the task record: refreshes `updated_at`,
    /// mirrors `status`/`error` best-effort. Returns `false` when the task
    /// does not exist; rejects transitions outside the allowed status
    /// graph.
    pub async fn update_status(
        &self,
        task_id: &TaskId,
        new_status: TaskStatus,
        error: Option<String>,
    ) -> QueueResult<bool> {
        let Some(mut task) = self.get(task_id).await? else {
            return Ok(false);
        };

        if task.status != new_status && !task.status.can_transition_to(new_status) {
            return Err(QueueError::invalid_transition(format!(
                "{task_id}: {} -> {new_status}",
                task.status
            )));
        }

        task.status = new_status;
        task.updated_at = Utc::now();
        if let Some(err) = error {
            task.error = Some(err);
        }
        self.save(&task).await?;
        self.mirror
            .update_task(task_id, new_status, task.error.as_deref())
            .await;
        info!(task_id = %task_id, status = %new_status, "task status updated");
        Ok(true)
    }

    /// Blocking pop from the head of the dispatch list with a short timeout.
    /// Safe for many concurrent callers: Redis's `BRPOP` hands each popped
    /// element to exactly one caller.
    pub async fn next(&self, timeout_secs: f64) -> QueueResult<Option<TaskId>> {
        match self.kv.brpop(DISPATCH_LIST_KEY, timeout_secs).await {
            Ok(Some(raw)) => Ok(Some(TaskId::from_string(raw))),
            Ok(None) => Ok(None),
            Err(e) => {
                warn!(error = %e, "error popping next task");
                Err(QueueError::from(e))
            }
        }
    }

    /// No-op completion marker: list-based dispatch needs no per-message ack,
    /// unlike a streams-based queue. Kept as an explicit call site so a
    /// caller's intent ("I'm done with this task") stays visible in the code.
    pub async fn complete_task_processing(&self, task_id: &TaskId) -> QueueResult<()> {
        debug!(task_id = %task_id, "completed task processing");
        Ok(())
    }

    /// Cancel a task from `queued` (remove from the dispatch list) or from
    /// `processing` (set `status=cancelled` and write the short-lived flag).
    /// Idempotent: terminal states return `false`.
    pub async fn cancel(&self, task_id: &TaskId) -> QueueResult<bool> {
        let Some(mut task) = self.get(task_id).await? else {
            warn!(task_id = %task_id, "attempted to cancel non-existent task");
            return Ok(false);
        };

        match task.status {
            TaskStatus::Queued => {
                let removed = self
                    .kv
                    .lrem(DISPATCH_LIST_KEY, 1, task_id.as_str())
                    .await?;
                task.status = TaskStatus::Cancelled;
                task.error = Some("Task was cancelled by user".to_string());
                task.updated_at = Utc::now();
                self.save(&task).await?;
                info!(task_id = %task_id, removed, "task cancelled while queued");
                Ok(true)
            }
            TaskStatus::Processing => {
                task.status = TaskStatus::Cancelled;
                task.error = Some("Task was cancelled by user".to_string());
                task.updated_at = Utc::now();
                self.save(&task).await?;
                self.kv
                    .setex(&Self::cancel_flag_key(task_id), self.config.cancel_flag_ttl_secs, "true")
                    .await?;
                info!(task_id = %task_id, "task marked cancelled during processing");
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// True if the task record's status is `cancelled` OR the short-lived
    /// flag key exists.
    pub async fn is_cancelled(&self, task_id: &TaskId) -> QueueResult<bool> {
        if let Some(task) = self.get(task_id).await? {
            if task.status == TaskStatus::Cancelled {
                return Ok(true);
            }
        }
        self.kv.exists(&Self::cancel_flag_key(task_id)).await.map_err(QueueError::from)
    }

    /// Non-blocking, cursor-based enumeration of tasks for tooling
    /// (`task-status` CLI). Optionally filtered by status.
    pub async fn scan(&self, status: Option<TaskStatus>) -> QueueResult<Vec<Task>> {
        let keys = self.kv.scan_keys(&format!("{TASK_PREFIX}:*"), 500).await?;
        let mut tasks = Vec::new();
        for key in keys {
            // Skip the `:cancelled` flag keys, which share the task prefix.
            if key.ends_with(":cancelled") {
                continue;
            }
            if let Some(raw) = self.kv.get(&key).await? {
                match serde_json::from_str::<Task>(&raw) {
                    Ok(task) => {
                        if status.map(|s| s == task.status).unwrap_or(true) {
                            tasks.push(task);
                        }
                    }
                    Err(e) => warn!(key = %key, error = %e, "failed to decode task during scan"),
                }
            }
        }
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(tasks)
    }

    pub async fn dispatch_list_len(&self) -> QueueResult<i64> {
        Ok(self.kv.llen(DISPATCH_LIST_KEY).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_config_defaults_use_documented_ttls() {
        let config = QueueConfig::default();
        assert_eq!(config.task_ttl_secs, 86400);
        assert_eq!(config.cancel_flag_ttl_secs, 300);
    }

    #[test]
    fn task_key_and_cancel_flag_key_use_the_documented_layout() {
        let task_id = TaskId::from_string("abc123");
        assert_eq!(TaskQueue::task_key(&task_id), "ss:task:abc123");
        assert_eq!(
            TaskQueue::cancel_flag_key(&task_id),
            "ss:task:abc123:cancelled"
        );
    }
}
