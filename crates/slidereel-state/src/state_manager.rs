//! CRUD of the per-file pipeline state document, with per-step transitions,
//! task↔file correlation, and compare-and-set atomicity.

use std::collections::BTreeMap;

use chrono::Utc;
use redis::Script;
use slidereel_kv::KvStore;
use slidereel_models::{FileId, FileState, FileStatus, StateError as StepError, StepEntry, StepStatus, TaskId};
use tracing::{info, warn};

use crate::error::{StateError, StateResult};

const STATE_PREFIX: &str = "ai_slider:state";
const TASK_FILE_MAP_PREFIX: &str = "ai_slider:task_file";
const DEFAULT_STATE_TTL_SECS: u64 = 60 * 60 * 24; // configurable; refreshed on every write.
const MAX_CAS_RETRIES: u32 = 5;

/// Lua script implementing compare-and-set: only write the new document if
/// the stored `version` still matches the one the caller last read (or the
/// key is absent and the caller expected version 0). Returns 1 on success, 0
/// on conflict.
const CAS_SET_SCRIPT: &str = r#"
local current = redis.call('GET', KEYS[1])
local expected_version = tonumber(ARGV[2])
if current then
    local ok, decoded = pcall(cjson.decode, current)
    if ok and decoded.version ~= expected_version then
        return 0
    end
elseif expected_version ~= 0 then
    return 0
end
redis.call('SET', KEYS[1], ARGV[1], 'EX', ARGV[3])
return 1
"#;

#[derive(Debug, Clone)]
pub struct StateManagerConfig {
    pub state_ttl_secs: u64,
}

impl StateManagerConfig {
    pub fn from_env() -> Self {
        Self {
            state_ttl_secs: std::env::var("STATE_TTL_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_STATE_TTL_SECS),
        }
    }
}

impl Default for StateManagerConfig {
    fn default() -> Self {
        Self {
            state_ttl_secs: DEFAULT_STATE_TTL_SECS,
        }
    }
}

pub struct StateManager {
    kv: KvStore,
    config: StateManagerConfig,
    cas_script: Script,
}

impl StateManager {
    pub fn new(kv: KvStore, config: StateManagerConfig) -> Self {
        Self {
            kv,
            config,
            cas_script: Script::new(CAS_SET_SCRIPT),
        }
    }

    pub fn from_env() -> StateResult<Self> {
        let kv = KvStore::from_env()?;
        Ok(Self::new(kv, StateManagerConfig::from_env()))
    }

    fn state_key(file_id: &FileId) -> String {
        format!("{STATE_PREFIX}:{file_id}")
    }

    fn task_file_key(task_id: &TaskId) -> String {
        format!("{TASK_FILE_MAP_PREFIX}:{task_id}")
    }

    /// Materialize a new state document if one doesn't already exist. The
    /// caller (a coordinator) supplies the already-computed initial `steps`
    /// map, since which steps are fixed-present-but-skipped vs. omitted
    /// entirely depends on which coordinator is about to run.
    pub async fn create(
        &self,
        file_id: FileId,
        file_path: String,
        file_ext: String,
        first_step: Option<String>,
        steps: BTreeMap<String, StepEntry>,
    ) -> StateResult<FileState> {
        if let Some(existing) = self.get(&file_id).await? {
            return Ok(existing);
        }
        let now = Utc::now();
        let state = FileState {
            file_id: file_id.clone(),
            file_path,
            file_ext,
            status: FileStatus::Uploaded,
            current_step: first_step,
            cancelled_step: None,
            task_id: None,
            voice_language: "english".to_string(),
            subtitle_language: None,
            podcast_transcript_language: None,
            generate_avatar: false,
            generate_subtitles: true,
            generate_video: true,
            generate_podcast: false,
            steps,
            errors: Vec::new(),
            artifacts: BTreeMap::new(),
            created_at: now,
            updated_at: now,
            version: 0,
        };
        self.write_new(&state).await?;
        info!(file_id = %file_id, "created pipeline state");
        Ok(state)
    }

    pub async fn get(&self, file_id: &FileId) -> StateResult<Option<FileState>> {
        let key = Self::state_key(file_id);
        match self.kv.get(&key).await? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub async fn get_step(&self, file_id: &FileId, step: &str) -> StateResult<Option<StepEntry>> {
        Ok(self
            .get(file_id)
            .await?
            .and_then(|s| s.steps.get(step).cloned()))
    }

    async fn write_new(&self, state: &FileState) -> StateResult<()> {
        self.cas_write(&state.file_id, 0, state).await
    }

    async fn cas_write(&self, file_id: &FileId, expected_version: u64, state: &FileState) -> StateResult<()> {
        let key = Self::state_key(file_id);
        let json = serde_json::to_string(state)?;
        let committed: i64 = self
            .kv
            .eval_script(
                &self.cas_script,
                &[&key],
                &[
                    &json,
                    &expected_version.to_string(),
                    &self.config.state_ttl_secs.to_string(),
                ],
            )
            .await?;
        if committed == 1 {
            Ok(())
        } else {
            Err(StateError::VersionConflict(file_id.to_string(), 0))
        }
    }

    /// Read-modify-write under compare-and-set: retries the whole cycle on
    /// version conflict up to `MAX_CAS_RETRIES` times.
    async fn mutate<F>(&self, file_id: &FileId, mut f: F) -> StateResult<FileState>
    where
        F: FnMut(&mut FileState) -> StateResult<()>,
    {
        for attempt in 0..MAX_CAS_RETRIES {
            let Some(mut state) = self.get(file_id).await? else {
                return Err(StateError::not_found(file_id.to_string()));
            };
            let expected_version = state.version;
            f(&mut state)?;
            state.version = expected_version + 1;
            state.updated_at = Utc::now();
            match self.cas_write(file_id, expected_version, &state).await {
                Ok(()) => return Ok(state),
                Err(StateError::VersionConflict(_, _)) => {
                    warn!(file_id = %file_id, attempt, "state version conflict, retrying");
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        Err(StateError::VersionConflict(file_id.to_string(), MAX_CAS_RETRIES))
    }

    /// Write-through step transition. Rejects transitions outside the allowed graph.
    pub async fn set_step_status(
        &self,
        file_id: &FileId,
        step: &str,
        status: StepStatus,
        data: Option<serde_json::Value>,
    ) -> StateResult<FileState> {
        let step = step.to_string();
        self.mutate(file_id, move |state| {
            let current = state
                .steps
                .entry(step.clone())
                .or_insert_with(StepEntry::pending);
            if current.status != status && !current.status.can_transition_to(status) {
                return Err(StateError::invalid_transition(format!(
                    "{step}: {} -> {status}",
                    current.status
                )));
            }
            current.status = status;
            if status == StepStatus::Completed {
                current.data = data.clone();
            }
            state.current_step = Some(step.clone());
            Ok(())
        })
        .await
    }

    pub async fn set_step_status_by_task(
        &self,
        task_id: &TaskId,
        step: &str,
        status: StepStatus,
        data: Option<serde_json::Value>,
    ) -> StateResult<FileState> {
        let file_id = self.require_file_id_by_task(task_id).await?;
        self.set_step_status(&file_id, step, status, data).await
    }

    /// Record or supersede a named artifact entry: additive, except a step
    /// that supersedes a prior output for the same logical name replaces
    /// that entry rather than appending a second one.
    pub async fn add_artifact(
        &self,
        file_id: &FileId,
        name: &str,
        artifact: slidereel_models::Artifact,
    ) -> StateResult<FileState> {
        let name = name.to_string();
        self.mutate(file_id, move |state| {
            state.artifacts.insert(name.clone(), artifact.clone());
            Ok(())
        })
        .await
    }

    pub async fn add_error(&self, file_id: &FileId, step: &str, message: &str) -> StateResult<FileState> {
        let step = step.to_string();
        let message = message.to_string();
        self.mutate(file_id, move |state| {
            state.errors.push(StepError {
                step: step.clone(),
                message: message.clone(),
                timestamp: Utc::now(),
            });
            Ok(())
        })
        .await
    }

    pub async fn mark_completed(&self, file_id: &FileId) -> StateResult<FileState> {
        self.mutate(file_id, |state| {
            state.status = FileStatus::Completed;
            Ok(())
        })
        .await
    }

    pub async fn mark_failed(&self, file_id: &FileId) -> StateResult<FileState> {
        self.mutate(file_id, |state| {
            state.status = FileStatus::Failed;
            Ok(())
        })
        .await
    }

    pub async fn mark_cancelled(
        &self,
        file_id: &FileId,
        cancelled_step: Option<&str>,
    ) -> StateResult<FileState> {
        let cancelled_step = cancelled_step.map(|s| s.to_string());
        self.mutate(file_id, move |state| {
            state.status = FileStatus::Cancelled;
            state.cancelled_step = cancelled_step.clone();
            Ok(())
        })
        .await
    }

    pub async fn mark_completed_by_task(&self, task_id: &TaskId) -> StateResult<FileState> {
        let file_id = self.require_file_id_by_task(task_id).await?;
        self.mark_completed(&file_id).await
    }

    pub async fn mark_failed_by_task(&self, task_id: &TaskId) -> StateResult<FileState> {
        let file_id = self.require_file_id_by_task(task_id).await?;
        self.mark_failed(&file_id).await
    }

    pub async fn mark_cancelled_by_task(
        &self,
        task_id: &TaskId,
        cancelled_step: Option<&str>,
    ) -> StateResult<FileState> {
        let file_id = self.require_file_id_by_task(task_id).await?;
        self.mark_cancelled(&file_id, cancelled_step).await
    }

    /// Whole-document replace, used by coordinators refreshing option flags
    /// atomically at the start of a run.
    pub async fn save(&self, state: FileState) -> StateResult<FileState> {
        let file_id = state.file_id.clone();
        self.mutate(&file_id, move |existing| {
            let incoming = state.clone();
            existing.file_path = incoming.file_path;
            existing.file_ext = incoming.file_ext;
            existing.task_id = incoming.task_id;
            existing.voice_language = incoming.voice_language;
            existing.subtitle_language = incoming.subtitle_language;
            existing.podcast_transcript_language = incoming.podcast_transcript_language;
            existing.generate_avatar = incoming.generate_avatar;
            existing.generate_subtitles = incoming.generate_subtitles;
            existing.generate_video = incoming.generate_video;
            existing.generate_podcast = incoming.generate_podcast;
            Ok(())
        })
        .await
    }

    pub async fn set_task_id_for_file(&self, file_id: &FileId, task_id: &TaskId) -> StateResult<FileState> {
        let task_id_owned = task_id.clone();
        let state = self
            .mutate(file_id, move |state| {
                state.task_id = Some(task_id_owned.clone());
                Ok(())
            })
            .await?;
        self.kv
            .setex(
                &Self::task_file_key(task_id),
                self.config.state_ttl_secs,
                file_id.as_str(),
            )
            .await?;
        Ok(state)
    }

    pub async fn get_file_id_by_task(&self, task_id: &TaskId) -> StateResult<Option<FileId>> {
        Ok(self
            .kv
            .get(&Self::task_file_key(task_id))
            .await?
            .map(FileId::from_string))
    }

    async fn require_file_id_by_task(&self, task_id: &TaskId) -> StateResult<FileId> {
        self.get_file_id_by_task(task_id)
            .await?
            .ok_or_else(|| StateError::not_found(format!("task {task_id} has no known file")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_key_and_task_file_key_use_the_documented_layout() {
        let file_id = FileId::from_string("file-1");
        let task_id = TaskId::from_string("task-1");
        assert_eq!(StateManager::state_key(&file_id), "ai_slider:state:file-1");
        assert_eq!(
            StateManager::task_file_key(&task_id),
            "ai_slider:task_file:task-1"
        );
    }

    #[test]
    fn config_from_env_defaults_to_one_day() {
        std::env::remove_var("STATE_TTL_SECS");
        let config = StateManagerConfig::from_env();
        assert_eq!(config.state_ttl_secs, 86400);
    }
}
