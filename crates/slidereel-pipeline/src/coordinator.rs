//! The shared coordinator skeleton driving both product-mode coordinators:
//! compute an ordered step list → for each step, skip if already completed,
//! else check cancellation, transition to processing, invoke the step, and
//! on success write its `data` through `set_step_status(.., Completed, ..)`.

use std::future::Future;
use std::pin::Pin;

use slidereel_models::{FileId, FileState, FileStatus, StepStatus};
use tracing::{error, info};

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::{check_and_handle_cancellation, reload, set_step_status_processing};

/// A step function's future, boxed so coordinators can dispatch by name
/// without a boxed-closure-per-call-site registry.
pub type StepFuture<'a> = Pin<Box<dyn Future<Output = PipelineResult<serde_json::Value>> + Send + 'a>>;

/// Maps a step name to its implementation's boxed future. Each coordinator
/// supplies its own dispatcher covering only the steps in its graph.
pub type StepDispatch = for<'a> fn(&'a PipelineContext, &'a FileState, &'a str) -> StepFuture<'a>;

/// Drive `steps` to completion against `file_id`, resuming from the first
/// non-completed entry.
///
/// Returns `Ok(())` when every step is completed or skipped, and when a step
/// cooperatively cancels (the state is left `cancelled`, not `completed`).
/// Returns `Err` when a step fails; the overall file state is marked
/// `failed` before the error is returned.
pub async fn run(
    ctx: &PipelineContext,
    file_id: &FileId,
    steps: &[&str],
    dispatch: StepDispatch,
) -> PipelineResult<()> {
    for &step in steps {
        let state = reload(ctx, file_id).await?;
        if state.step_is_completed(step) {
            continue;
        }

        if check_and_handle_cancellation(ctx, file_id, step).await? {
            return Ok(());
        }

        set_step_status_processing(ctx, file_id, step).await?;
        info!(file_id = %file_id, step, "running step");

        let state = reload(ctx, file_id).await?;
        match dispatch(ctx, &state, step).await {
            Ok(data) => {
                ctx.state.set_step_status(file_id, step, StepStatus::Completed, Some(data)).await?;
            }
            Err(PipelineError::Cancelled) => {
                return Ok(());
            }
            Err(e) => {
                error!(file_id = %file_id, step, error = %e, "step failed");
                ctx.state.set_step_status(file_id, step, StepStatus::Failed, None).await?;
                ctx.state.add_error(file_id, step, &e.to_string()).await?;
                ctx.state.mark_failed(file_id).await?;
                return Err(e);
            }
        }
    }

    let state = reload(ctx, file_id).await?;
    if state.status != FileStatus::Cancelled {
        ctx.state.mark_completed(file_id).await?;
    }
    Ok(())
}
