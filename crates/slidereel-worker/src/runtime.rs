//! Per-task worker runtime: load a task, validate its payload, transition it
//! to `processing`, dispatch to the matching pipeline coordinator, and
//! reconcile the terminal status.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use slidereel_capabilities::{CapabilitiesConfig, ChatClient, ImageGenClient, TtsClient, VisionClient};
use slidereel_models::{
    FileId, FileState, FileStatus, PodcastTask, SourceType, StepEntry, Task, TaskId, TaskPayload,
    TaskStatus, VideoTask,
};
use slidereel_pipeline::{podcast_coordinator, video_coordinator, PipelineContext};
use slidereel_queue::TaskQueue;
use slidereel_state::StateManager;
use slidereel_storage::StorageProvider;
use tracing::{info, warn};

use crate::config::WorkerRuntimeConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::TaskLogger;

const SLIDES_STEP_UNIVERSE: &[&str] = &[
    "extract_slides",
    "convert_slides",
    "analyze_slides",
    "generate_transcripts",
    "revise_transcripts",
    "translate_voice_transcripts",
    "translate_subtitle_transcripts",
    "generate_audio",
    "generate_avatar",
    "generate_subtitles",
    "compose_video",
];

const PDF_STEP_UNIVERSE: &[&str] = &[
    "segment_pdf_content",
    "revise_pdf_transcripts",
    "translate_voice_transcripts",
    "translate_subtitle_transcripts",
    "generate_pdf_chapter_images",
    "generate_pdf_audio",
    "generate_avatar",
    "generate_pdf_subtitles",
    "compose_video",
];

const PODCAST_STEP_UNIVERSE: &[&str] = &[
    "segment_pdf_content",
    "generate_podcast_script",
    "translate_podcast_script",
    "generate_podcast_audio",
    "generate_podcast_subtitles",
    "compose_podcast",
];

/// Everything a worker process needs, constructed once at startup from the
/// environment and shared across the single task this process runs.
pub struct WorkerRuntime {
    queue: Arc<TaskQueue>,
    state: Arc<StateManager>,
    storage: Arc<dyn StorageProvider>,
    chat: Arc<ChatClient>,
    tts: Arc<TtsClient>,
    vision: Arc<VisionClient>,
    image_gen: Arc<ImageGenClient>,
    config: WorkerRuntimeConfig,
}

impl WorkerRuntime {
    pub async fn from_env() -> WorkerResult<Self> {
        let queue = TaskQueue::from_env()?;
        let state = StateManager::from_env()?;
        let storage = slidereel_storage::provider_from_env().await?;
        let caps = CapabilitiesConfig::from_env().map_err(|e| WorkerError::config_error(e.to_string()))?;
        Ok(Self {
            queue: Arc::new(queue),
            state: Arc::new(state),
            storage: Arc::from(storage),
            chat: Arc::new(ChatClient::new(caps.clone())),
            tts: Arc::new(TtsClient::new(caps.clone())),
            vision: Arc::new(VisionClient::new(caps.clone())),
            image_gen: Arc::new(ImageGenClient::new(caps)),
            config: WorkerRuntimeConfig::from_env(),
        })
    }

    /// Run the full lifecycle for `task_id`. Returns `Ok(())` on success or
    /// cooperative cancellation; `Err` means the task was marked `failed`
    /// and the process should exit non-zero.
    pub async fn run(&self, task_id: &TaskId) -> WorkerResult<()> {
        let Some(task) = self.queue.get(task_id).await? else {
            return Err(WorkerError::invalid_task_payload(format!("no task record for {task_id}")));
        };

        if self.queue.is_cancelled(task_id).await? {
            info!(task_id = %task_id, "task already cancelled before processing started");
            return Ok(());
        }

        if matches!(task.payload, TaskPayload::FilePurge(_)) {
            return self.run_file_purge(&task).await;
        }

        self.validate_document_task(&task)?;

        let logger = TaskLogger::new(task_id, task.payload.task_type());
        self.transition_to_processing(task_id).await;
        logger.log_start("document pipeline dispatch starting");

        let file_id = task.payload.file_id().clone();
        self.ensure_state(&task).await?;
        self.state.set_task_id_for_file(&file_id, task_id).await?;

        let monitor = self.spawn_progress_monitor(task_id.clone(), logger.clone());
        let outcome = self.dispatch(&task, &file_id).await;
        monitor.abort();

        self.reconcile(task_id, &logger, outcome).await
    }

    fn validate_document_task(&self, task: &Task) -> WorkerResult<()> {
        match &task.payload {
            TaskPayload::Video(v) => {
                if v.common.file_path.trim().is_empty() || v.common.file_ext.trim().is_empty() {
                    return Err(WorkerError::invalid_task_payload("video task is missing file_path or file_ext"));
                }
            }
            TaskPayload::Podcast(p) => {
                if p.common.file_path.trim().is_empty() || p.common.file_ext.trim().is_empty() {
                    return Err(WorkerError::invalid_task_payload("podcast task is missing file_path or file_ext"));
                }
            }
            TaskPayload::FilePurge(_) => {}
        }
        Ok(())
    }

    /// Best-effort: a concurrent cancel between `is_cancelled` above and here
    /// can make this transition illegal; that race is accepted rather than
    /// treated as a startup failure.
    async fn transition_to_processing(&self, task_id: &TaskId) {
        if let Err(e) = self.queue.update_status(task_id, TaskStatus::Processing, None).await {
            warn!(task_id = %task_id, error = %e, "could not transition task to processing");
        }
    }

    async fn reconcile(
        &self,
        task_id: &TaskId,
        logger: &TaskLogger,
        outcome: Result<(), slidereel_pipeline::PipelineError>,
    ) -> WorkerResult<()> {
        match outcome {
            Ok(()) => {
                if self.queue.is_cancelled(task_id).await.unwrap_or(false) {
                    logger.log_completion("task cancelled during processing");
                    return Ok(());
                }
                if let Err(e) = self.queue.update_status(task_id, TaskStatus::Completed, None).await {
                    warn!(task_id = %task_id, error = %e, "could not mark task completed");
                }
                self.queue.complete_task_processing(task_id).await?;
                logger.log_completion("document pipeline finished");
                Ok(())
            }
            Err(e) => {
                logger.log_error(&format!("document pipeline failed: {e}"));
                if let Err(update_err) = self.queue.update_status(task_id, TaskStatus::Failed, Some(e.to_string())).await {
                    warn!(task_id = %task_id, error = %update_err, "could not mark task failed");
                }
                self.queue.complete_task_processing(task_id).await.ok();
                Err(WorkerError::from(e))
            }
        }
    }

    async fn dispatch(&self, task: &Task, file_id: &FileId) -> Result<(), slidereel_pipeline::PipelineError> {
        let ctx = PipelineContext {
            state: Arc::clone(&self.state),
            queue: Arc::clone(&self.queue),
            storage: Arc::clone(&self.storage),
            chat: Arc::clone(&self.chat),
            tts: Arc::clone(&self.tts),
            vision: Arc::clone(&self.vision),
            image_gen: Arc::clone(&self.image_gen),
            workspace_root: PathBuf::from(&self.config.workspace_root),
            task_id: task.task_id.clone(),
        };
        match &task.payload {
            TaskPayload::Video(v) => video_coordinator::run(&ctx, file_id, v.common.source_type).await,
            TaskPayload::Podcast(_) => podcast_coordinator::run(&ctx, file_id).await,
            TaskPayload::FilePurge(_) => unreachable!("file_purge is handled before dispatch"),
        }
    }

    /// Create the file-pipeline state document on first processing of a
    /// `file_id`, pre-populating every fixed step id as `pending` or
    /// `skipped` per the task's option flags, then applies the option
    /// flags themselves via a whole-document `save`.
    async fn ensure_state(&self, task: &Task) -> WorkerResult<FileState> {
        let file_id = task.payload.file_id().clone();
        if let Some(existing) = self.state.get(&file_id).await? {
            return Ok(existing);
        }

        let now = Utc::now();
        let (file_path, file_ext, universe, active, draft) = match &task.payload {
            TaskPayload::Video(v) => {
                let draft = draft_video_state(&file_id, v, now);
                let (universe, active) = match v.common.source_type {
                    SourceType::Slides => (SLIDES_STEP_UNIVERSE, video_coordinator::slides_step_list(&draft)),
                    SourceType::Pdf => (PDF_STEP_UNIVERSE, video_coordinator::pdf_step_list(&draft)),
                };
                (v.common.file_path.clone(), v.common.file_ext.clone(), universe, active, draft)
            }
            TaskPayload::Podcast(p) => {
                let draft = draft_podcast_state(&file_id, p, now);
                let active = podcast_coordinator::step_list(&draft);
                (p.common.file_path.clone(), p.common.file_ext.clone(), PODCAST_STEP_UNIVERSE, active, draft)
            }
            TaskPayload::FilePurge(_) => unreachable!("file_purge never reaches ensure_state"),
        };

        let steps = build_step_map(universe, &active);
        let first_step = active.first().map(|s| s.to_string());
        let created = self.state.create(file_id.clone(), file_path, file_ext, first_step, steps).await?;

        let mut to_save = created;
        to_save.voice_language = draft.voice_language;
        to_save.subtitle_language = draft.subtitle_language;
        to_save.podcast_transcript_language = draft.podcast_transcript_language;
        to_save.generate_avatar = draft.generate_avatar;
        to_save.generate_subtitles = draft.generate_subtitles;
        to_save.generate_video = draft.generate_video;
        to_save.generate_podcast = draft.generate_podcast;
        Ok(self.state.save(to_save).await?)
    }

    async fn run_file_purge(&self, task: &Task) -> WorkerResult<()> {
        let TaskPayload::FilePurge(purge) = &task.payload else {
            unreachable!("run_file_purge called with non-purge payload");
        };
        self.transition_to_processing(&task.task_id).await;

        let scoping_task_id = purge
            .task_id
            .as_ref()
            .map(|t| t.to_string())
            .unwrap_or_else(|| task.task_id.to_string());

        let result = match self.state.get(&purge.file_id).await? {
            Some(state) => slidereel_storage::purge_file(self.storage.as_ref(), &state, &scoping_task_id).await,
            None => {
                warn!(file_id = %purge.file_id, "file_purge requested for file with no known state");
                Ok(Vec::new())
            }
        };

        match result {
            Ok(deleted) => {
                info!(task_id = %task.task_id, file_id = %purge.file_id, count = deleted.len(), "file purge completed");
                self.queue.update_status(&task.task_id, TaskStatus::Completed, None).await.ok();
                self.queue.complete_task_processing(&task.task_id).await?;
                Ok(())
            }
            Err(e) => {
                self.queue
                    .update_status(&task.task_id, TaskStatus::Failed, Some(e.to_string()))
                    .await
                    .ok();
                self.queue.complete_task_processing(&task.task_id).await.ok();
                Err(WorkerError::from(e))
            }
        }
    }

    /// Background task polling task status every `progress_interval`,
    /// logging at `info` on status change and at `debug` with full detail
    /// every 5th check. Aborted by the caller once the main dispatch future
    /// completes; also self-terminates on observing cancellation.
    fn spawn_progress_monitor(&self, task_id: TaskId, logger: TaskLogger) -> tokio::task::JoinHandle<()> {
        let queue = Arc::clone(&self.queue);
        let interval = self.config.progress_interval;
        tokio::spawn(async move {
            let mut last_status: Option<TaskStatus> = None;
            let mut tick: u64 = 0;
            loop {
                tokio::time::sleep(interval).await;
                tick += 1;

                match queue.get(&task_id).await {
                    Ok(Some(task)) => {
                        if Some(task.status) != last_status {
                            logger.log_progress(&format!("status is now {}", task.status));
                            last_status = Some(task.status);
                        }
                        if tick % 5 == 0 {
                            logger.log_progress_detail(&format!("poll {tick}: status={}", task.status));
                        }
                        if task.status == TaskStatus::Cancelled {
                            break;
                        }
                    }
                    Ok(None) => break,
                    Err(e) => logger.log_warning(&format!("progress monitor failed to read task: {e}")),
                }

                if queue.is_cancelled(&task_id).await.unwrap_or(false) {
                    break;
                }
            }
        })
    }
}

fn build_step_map(universe: &[&str], active: &[&str]) -> BTreeMap<String, StepEntry> {
    universe
        .iter()
        .map(|&step| {
            let entry = if active.contains(&step) { StepEntry::pending() } else { StepEntry::skipped() };
            (step.to_string(), entry)
        })
        .collect()
}

fn draft_video_state(file_id: &FileId, task: &VideoTask, now: chrono::DateTime<Utc>) -> FileState {
    FileState {
        file_id: file_id.clone(),
        file_path: task.common.file_path.clone(),
        file_ext: task.common.file_ext.clone(),
        status: FileStatus::Uploaded,
        current_step: None,
        cancelled_step: None,
        task_id: None,
        voice_language: task.common.voice_language.clone(),
        subtitle_language: task.common.subtitle_language.clone(),
        podcast_transcript_language: None,
        generate_avatar: task.generate_avatar,
        // A document task always generates subtitles regardless of the
        // submitted flag; only the podcast path treats it as optional.
        generate_subtitles: true,
        generate_video: task.generate_video,
        generate_podcast: false,
        steps: BTreeMap::new(),
        errors: Vec::new(),
        artifacts: BTreeMap::new(),
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

fn draft_podcast_state(file_id: &FileId, task: &PodcastTask, now: chrono::DateTime<Utc>) -> FileState {
    FileState {
        file_id: file_id.clone(),
        file_path: task.common.file_path.clone(),
        file_ext: task.common.file_ext.clone(),
        status: FileStatus::Uploaded,
        current_step: None,
        cancelled_step: None,
        task_id: None,
        voice_language: task.common.voice_language.clone(),
        subtitle_language: None,
        podcast_transcript_language: task.transcript_language.clone(),
        generate_avatar: false,
        generate_subtitles: task.generate_subtitles,
        generate_video: false,
        generate_podcast: true,
        steps: BTreeMap::new(),
        errors: Vec::new(),
        artifacts: BTreeMap::new(),
        created_at: now,
        updated_at: now,
        version: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_step_map_marks_inactive_steps_skipped() {
        let universe = SLIDES_STEP_UNIVERSE;
        let active = vec!["extract_slides", "convert_slides", "generate_audio", "compose_video"];
        let steps = build_step_map(universe, &active);
        assert_eq!(steps["extract_slides"].status, slidereel_models::StepStatus::Pending);
        assert_eq!(steps["translate_voice_transcripts"].status, slidereel_models::StepStatus::Skipped);
        assert_eq!(steps.len(), universe.len());
    }

    #[test]
    fn draft_video_state_forces_subtitles_on() {
        let task = VideoTask {
            common: slidereel_models::DocumentTaskFields {
                file_id: FileId::from_string("f1"),
                file_path: "/tmp/f1.pdf".into(),
                file_ext: "pdf".into(),
                source_type: SourceType::Pdf,
                voice_language: "english".into(),
                subtitle_language: None,
                voice_id: None,
            },
            generate_avatar: false,
            generate_subtitles: false,
            generate_video: true,
        };
        let draft = draft_video_state(&FileId::from_string("f1"), &task, Utc::now());
        assert!(draft.generate_subtitles);
    }
}
