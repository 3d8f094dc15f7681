//! Final composition and upload: the only steps in the whole pipeline that
//! touch the external storage adapter.

use serde_json::{json, Value};
use slidereel_media::{FfmpegCommand, FfmpegRunner};
use slidereel_models::{Artifact, FileState};
use slidereel_storage::keys;

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::fetch_step_data;

fn require_task_id(state: &FileState) -> PipelineResult<String> {
    state
        .task_id
        .as_ref()
        .map(|t| t.to_string())
        .ok_or_else(|| PipelineError::invalid_input("compose requires a task_id on the file state"))
}

/// Render the slideshow/chapter-images track muxed with its narration audio.
/// The image-concat list is the command's primary input; the audio is added
/// as a second `-i` via `output_args` since [`FfmpegCommand`] only models one
/// primary input slot.
async fn build_slideshow(image_paths: &[String], audio_path: &str, output_path: &std::path::Path) -> PipelineResult<()> {
    if image_paths.is_empty() {
        return Err(PipelineError::invalid_input("compose requires at least one slide image"));
    }
    let duration = slidereel_media::get_duration(audio_path).await?;
    let per_image = (duration / image_paths.len() as f64).max(0.5);

    let concat_list = output_path.with_extension("images.txt");
    let mut manifest = String::new();
    for path in image_paths {
        manifest.push_str(&format!("file '{path}'\nduration {per_image:.3}\n"));
    }
    if let Some(last) = image_paths.last() {
        manifest.push_str(&format!("file '{last}'\n"));
    }
    tokio::fs::write(&concat_list, manifest).await?;

    let cmd = FfmpegCommand::new(&concat_list, output_path)
        .input_args(["-f", "concat", "-safe", "0"])
        .output_args(["-i", audio_path, "-c:v", "libx264", "-c:a", "aac", "-pix_fmt", "yuv420p", "-shortest"]);

    FfmpegRunner::new().with_timeout(900).run(&cmd).await?;
    Ok(())
}

/// Overlay the presenter avatar image in the bottom-right corner of an
/// already-muxed video, as a second ffmpeg pass.
async fn overlay_avatar(video_path: &std::path::Path, avatar_path: &str, output_path: &std::path::Path) -> PipelineResult<()> {
    let cmd = FfmpegCommand::new(video_path, output_path).output_args([
        "-i",
        avatar_path,
        "-filter_complex",
        "[0:v][1:v] overlay=W-w-20:H-h-20",
        "-c:a",
        "copy",
    ]);
    FfmpegRunner::new().with_timeout(900).run(&cmd).await?;
    Ok(())
}

/// Render and upload the final slides/video, burning in subtitles and
/// overlaying the avatar when generated.
pub async fn compose_video(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    compose_video_track(ctx, state, "convert_slides", "generate_audio", "generate_subtitles", "generate_avatar").await
}

/// Render and upload the final PDF/video, using generated chapter
/// illustrations in place of slide renders.
pub async fn compose_pdf_video(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    compose_video_track(ctx, state, "generate_pdf_chapter_images", "generate_pdf_audio", "generate_pdf_subtitles", "generate_avatar").await
}

async fn compose_video_track(
    ctx: &PipelineContext,
    state: &FileState,
    images_step: &str,
    audio_step: &str,
    subtitles_step: &str,
    avatar_step: &str,
) -> PipelineResult<Value> {
    let task_id = require_task_id(state)?;

    let images_data = fetch_step_data(ctx, &state.file_id, images_step)
        .await?
        .ok_or_else(|| PipelineError::invalid_input(format!("compose_video requires {images_step} data")))?;
    let image_paths: Vec<String> = serde_json::from_value(images_data["image_paths"].clone()).unwrap_or_default();

    let audio_data = fetch_step_data(ctx, &state.file_id, audio_step)
        .await?
        .ok_or_else(|| PipelineError::invalid_input(format!("compose_video requires {audio_step} data")))?;
    let audio_path = audio_data["audio_path"].as_str().unwrap_or_default().to_string();

    let avatar_path = fetch_step_data(ctx, &state.file_id, avatar_step)
        .await?
        .and_then(|d| d["avatar_path"].as_str().map(|s| s.to_string()));

    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let silent_path = workspace.join("final_silent.mp4");
    build_slideshow(&image_paths, &audio_path, &silent_path).await?;

    let final_path = if let Some(avatar) = avatar_path.as_deref() {
        let with_avatar = workspace.join("final_with_avatar.mp4");
        overlay_avatar(&silent_path, avatar, &with_avatar).await?;
        with_avatar
    } else {
        silent_path
    };

    let muxed_path = if state.generate_subtitles {
        let subtitles_data = fetch_step_data(ctx, &state.file_id, subtitles_step).await?;
        if let Some(srt_path) = subtitles_data.and_then(|d| d["subtitle_path"].as_str().map(|s| s.to_string())) {
            let with_subs = workspace.join("final.mp4");
            let cmd = FfmpegCommand::new(&final_path, &with_subs).output_args(["-vf", &format!("subtitles={srt_path}"), "-c:a", "copy"]);
            FfmpegRunner::new().with_timeout(900).run(&cmd).await?;
            with_subs
        } else {
            final_path
        }
    } else {
        final_path
    };

    let key = keys::video_final_key(&task_id);
    let location = ctx.storage.upload(&muxed_path.to_string_lossy(), &key, "video/mp4").await?;
    ctx.state
        .add_artifact(
            &state.file_id,
            "final_video",
            Artifact {
                local_path: Some(muxed_path.to_string_lossy().to_string()),
                storage_key: Some(key.clone()),
                storage_uri: Some(location.clone()),
                content_type: Some("video/mp4".to_string()),
            },
        )
        .await?;

    let audio_key = keys::audio_final_key(&task_id);
    let audio_location = ctx.storage.upload(&audio_path, &audio_key, "audio/mpeg").await?;
    ctx.state
        .add_artifact(
            &state.file_id,
            "final_audio",
            Artifact {
                local_path: Some(audio_path.clone()),
                storage_key: Some(audio_key),
                storage_uri: Some(audio_location),
                content_type: Some("audio/mpeg".to_string()),
            },
        )
        .await?;

    Ok(json!({ "storage_key": key, "storage_uri": location }))
}

/// Upload the podcast audio mix and its Markdown transcript side-artifact.
/// The transcript itself is assembled by the podcast coordinator after the
/// step graph completes; this step only produces and uploads the final
/// audio mix.
pub async fn compose_podcast(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let task_id = require_task_id(state)?;

    let audio_data = fetch_step_data(ctx, &state.file_id, "generate_podcast_audio")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("compose_podcast requires generate_podcast_audio data"))?;
    let audio_path = audio_data["audio_path"].as_str().unwrap_or_default().to_string();

    let key = keys::podcast_audio_final_key(&task_id);
    let location = ctx.storage.upload(&audio_path, &key, "audio/mpeg").await?;
    ctx.state
        .add_artifact(
            &state.file_id,
            "podcast_audio",
            Artifact {
                local_path: Some(audio_path),
                storage_key: Some(key.clone()),
                storage_uri: Some(location.clone()),
                content_type: Some("audio/mpeg".to_string()),
            },
        )
        .await?;

    Ok(json!({ "storage_key": key, "storage_uri": location }))
}
