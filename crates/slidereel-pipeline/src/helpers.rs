//! Shared pipeline helpers: cancellation checks, step-status transitions,
//! step data fetch. Used identically by both coordinator types.

use serde_json::Value;
use slidereel_models::{FileId, FileState, StepStatus};
use tracing::info;

use crate::context::PipelineContext;
use crate::error::PipelineResult;

/// Check whether the task backing `file_id` has been cancelled; if so, mark
/// the current `step` cancelled and the overall file state cancelled, and
/// return `true` so the caller can stop without marking the run `completed`.
pub async fn check_and_handle_cancellation(
    ctx: &PipelineContext,
    file_id: &FileId,
    step: &str,
) -> PipelineResult<bool> {
    if !ctx.is_cancelled().await {
        return Ok(false);
    }
    info!(file_id = %file_id, step, "cancellation observed, stopping coordinator");
    ctx.state
        .set_step_status(file_id, step, StepStatus::Cancelled, None)
        .await?;
    ctx.state.mark_cancelled(file_id, Some(step)).await?;
    Ok(true)
}

/// Transition `step` from `pending` to `processing`, refreshing
/// `current_step`.
pub async fn set_step_status_processing(
    ctx: &PipelineContext,
    file_id: &FileId,
    step: &str,
) -> PipelineResult<()> {
    ctx.state
        .set_step_status(file_id, step, StepStatus::Processing, None)
        .await?;
    Ok(())
}

/// Fetch a step's `data`, reading it fresh from the latest persisted state
/// rather than from whatever snapshot the caller happens to be holding —
/// downstream steps must see writes from steps that ran earlier in the same
/// coordinator pass.
pub async fn fetch_step_data(
    ctx: &PipelineContext,
    file_id: &FileId,
    step: &str,
) -> PipelineResult<Option<Value>> {
    Ok(ctx
        .state
        .get_step(file_id, step)
        .await?
        .and_then(|entry| entry.completed_data().cloned()))
}

/// Transcript source selection priority: a completed
/// translation step wins over a completed revision step, which wins over
/// the original extractor/generator output. Each candidate is looked up by
/// name in order; the first one with completed data is used.
pub async fn select_transcript_source(
    ctx: &PipelineContext,
    file_id: &FileId,
    candidates: &[&str],
) -> PipelineResult<Option<Value>> {
    for step in candidates {
        if let Some(data) = fetch_step_data(ctx, file_id, step).await? {
            return Ok(Some(data));
        }
    }
    Ok(None)
}

/// Refresh `state` in place from the store. Coordinators re-read after every
/// step so resumability and downstream transcript selection see the latest
/// write.
pub async fn reload(ctx: &PipelineContext, file_id: &FileId) -> PipelineResult<FileState> {
    ctx.state
        .get(file_id)
        .await?
        .ok_or_else(|| crate::error::PipelineError::invalid_input(format!("no state for file {file_id}")))
}
