//! Avatar presenter image generation for the slides/video path: produces one
//! still presenter image via the image generation capability, composited
//! into the corner of the final frame by `compose_video` (no avatar-video
//! generation client is available, so this step is narrowed to a still
//! image; see DESIGN.md).

use serde_json::{json, Value};
use slidereel_models::FileState;

use crate::context::PipelineContext;
use crate::error::PipelineResult;

const AVATAR_PROMPT: &str = "A friendly professional presenter, upper body, looking directly at the \
camera, plain neutral background, suitable for a picture-in-picture video overlay.";
const AVATAR_SIZE: &str = "512x512";

/// Generate a single presenter avatar image for the video. Only scheduled by
/// the slides/video coordinator when `generate_avatar` is set.
pub async fn generate_avatar(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let urls = ctx.image_gen.generate(AVATAR_PROMPT, "dall-e-3", AVATAR_SIZE, 1).await?;

    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let out_path = workspace.join("avatar.png");
    if let Some(first) = urls.first() {
        crate::steps::pdf::download_image(first, &out_path).await?;
    }

    Ok(json!({ "avatar_path": out_path.to_string_lossy() }))
}
