//! Podcast coordinator: ensures the shared `segment_pdf_content` prerequisite
//! has run, then drives its own step graph, then assembles the Markdown
//! transcript side-artifact.

use slidereel_models::{Artifact, FileId, FileState};
use slidereel_storage::keys;

use crate::context::PipelineContext;
use crate::coordinator::{self, StepDispatch, StepFuture};
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::fetch_step_data;
use crate::steps::podcast_script::PodcastLine;
use crate::steps::{audio, compose, pdf, podcast_script, subtitles, translate};

const SOURCE_LANGUAGE: &str = "english";

fn translate_script_needed(state: &FileState) -> bool {
    state
        .podcast_transcript_language
        .as_deref()
        .map(|lang| lang != SOURCE_LANGUAGE)
        .unwrap_or(false)
}

/// Compute the ordered step list for the podcast path, excluding the
/// `segment_pdf_content` prerequisite (run separately, idempotently, before
/// the step loop).
pub fn step_list(state: &FileState) -> Vec<&'static str> {
    let mut steps = vec!["generate_podcast_script"];
    if translate_script_needed(state) {
        steps.push("translate_podcast_script");
    }
    steps.push("generate_podcast_audio");
    if state.generate_subtitles {
        steps.push("generate_podcast_subtitles");
    }
    steps.push("compose_podcast");
    steps
}

fn dispatch<'a>(ctx: &'a PipelineContext, state: &'a FileState, step: &'a str) -> StepFuture<'a> {
    match step {
        "generate_podcast_script" => Box::pin(podcast_script::generate_podcast_script(ctx, state)),
        "translate_podcast_script" => Box::pin(translate::translate_podcast_script(ctx, state)),
        "generate_podcast_audio" => Box::pin(audio::generate_podcast_audio(ctx, state)),
        "generate_podcast_subtitles" => Box::pin(subtitles::generate_podcast_subtitles(ctx, state)),
        "compose_podcast" => Box::pin(compose::compose_podcast(ctx, state)),
        other => Box::pin(async move { Err(PipelineError::invalid_input(format!("unknown podcast step {other}"))) }),
    }
}

/// Run the podcast coordinator for `file_id`.
pub async fn run(ctx: &PipelineContext, file_id: &FileId) -> PipelineResult<()> {
    let state = crate::helpers::reload(ctx, file_id).await?;
    if !state.step_is_completed("segment_pdf_content") {
        coordinator::run(ctx, file_id, &["segment_pdf_content"], pdf::dispatch_segment_only as StepDispatch).await?;
    }

    let steps = step_list(&state);
    coordinator::run(ctx, file_id, &steps, dispatch as StepDispatch).await?;

    let state = crate::helpers::reload(ctx, file_id).await?;
    if state.step_is_completed("compose_podcast") {
        assemble_transcript(ctx, &state).await?;
    }
    Ok(())
}

/// Build and upload the Markdown transcript side-artifact, preferring a
/// completed `translate_podcast_script` over `generate_podcast_script`, and
/// labeling each line with the voice name `generate_podcast_audio` assigned
/// it.
async fn assemble_transcript(ctx: &PipelineContext, state: &FileState) -> PipelineResult<()> {
    let script_data = crate::helpers::select_transcript_source(ctx, &state.file_id, &["translate_podcast_script", "generate_podcast_script"])
        .await?
        .ok_or_else(|| PipelineError::invalid_input("transcript assembly requires a completed podcast script"))?;
    let lines: Vec<PodcastLine> = serde_json::from_value(script_data["lines"].clone()).unwrap_or_default();

    let audio_data = fetch_step_data(ctx, &state.file_id, "generate_podcast_audio").await?;
    let voice_names: Vec<String> = audio_data
        .and_then(|d| serde_json::from_value(d["voice_names"].clone()).ok())
        .unwrap_or_default();

    let mut markdown = String::from("# Podcast Transcript\n\n");
    for (i, line) in lines.iter().enumerate() {
        let voice = voice_names.get(i).cloned().unwrap_or_else(|| line.speaker.clone());
        markdown.push_str(&format!("**{voice}**: {}\n\n", line.text));
    }

    let task_id = state
        .task_id
        .as_ref()
        .map(|t| t.to_string())
        .ok_or_else(|| PipelineError::invalid_input("transcript assembly requires a task_id"))?;
    let key = keys::podcast_transcript_key(&task_id);
    let location = ctx.storage.upload_bytes(markdown.into_bytes(), &key, "text/markdown").await?;

    ctx.state
        .add_artifact(
            &state.file_id,
            "podcast_transcript",
            Artifact {
                local_path: None,
                storage_key: Some(key),
                storage_uri: Some(location),
                content_type: Some("text/markdown".to_string()),
            },
        )
        .await?;
    Ok(())
}
