//! Video coordinator: drives both source-kind step graphs to completion,
//! unified here on the shared skeleton in [`crate::coordinator`].

use slidereel_models::{FileId, FileState, SourceType};

use crate::context::PipelineContext;
use crate::coordinator::{self, StepDispatch, StepFuture};
use crate::error::{PipelineError, PipelineResult};
use crate::steps::{audio, avatar, compose, pdf, slides, translate};

const SOURCE_LANGUAGE: &str = "english";

fn translate_voice_needed(state: &FileState) -> bool {
    state.voice_language != SOURCE_LANGUAGE
}

/// Per the translation-branch rule, an unset `subtitle_language` always
/// skips translation (subtitles then follow the voice/original transcript
/// as-is) rather than falling back to `voice_language` for the comparison.
fn translate_subtitles_needed(state: &FileState) -> bool {
    match state.subtitle_language.as_deref() {
        None => false,
        Some(lang) => !lang.is_empty() && lang != SOURCE_LANGUAGE,
    }
}

/// Compute the ordered step list for the slides/video path, with the
/// translate-inclusion rules applied consistently with the PDF path.
pub fn slides_step_list(state: &FileState) -> Vec<&'static str> {
    let mut steps = vec!["extract_slides", "convert_slides", "analyze_slides", "generate_transcripts", "revise_transcripts"];
    if translate_voice_needed(state) {
        steps.push("translate_voice_transcripts");
    }
    if translate_subtitles_needed(state) {
        steps.push("translate_subtitle_transcripts");
    }
    steps.push("generate_audio");
    if state.generate_avatar {
        steps.push("generate_avatar");
    }
    if state.generate_subtitles {
        steps.push("generate_subtitles");
    }
    if state.generate_video {
        steps.push("compose_video");
    }
    steps
}

/// Compute the ordered step list for the PDF/video path.
pub fn pdf_step_list(state: &FileState) -> Vec<&'static str> {
    let mut steps = vec!["segment_pdf_content", "revise_pdf_transcripts"];
    if translate_voice_needed(state) {
        steps.push("translate_voice_transcripts");
    }
    if translate_subtitles_needed(state) {
        steps.push("translate_subtitle_transcripts");
    }
    steps.push("generate_pdf_chapter_images");
    steps.push("generate_pdf_audio");
    if state.generate_avatar {
        steps.push("generate_avatar");
    }
    if state.generate_subtitles {
        steps.push("generate_pdf_subtitles");
    }
    if state.generate_video {
        steps.push("compose_video");
    }
    steps
}

fn dispatch_slides<'a>(ctx: &'a PipelineContext, state: &'a FileState, step: &'a str) -> StepFuture<'a> {
    match step {
        "extract_slides" => Box::pin(slides::extract_slides(ctx, state)),
        "convert_slides" => Box::pin(slides::convert_slides(ctx, state)),
        "analyze_slides" => Box::pin(slides::analyze_slides(ctx, state)),
        "generate_transcripts" => Box::pin(slides::generate_transcripts(ctx, state)),
        "revise_transcripts" => Box::pin(slides::revise_transcripts(ctx, state)),
        "translate_voice_transcripts" => Box::pin(translate::translate_voice_transcripts(ctx, state)),
        "translate_subtitle_transcripts" => Box::pin(translate::translate_subtitle_transcripts(ctx, state)),
        "generate_audio" => Box::pin(audio::generate_audio(ctx, state)),
        "generate_avatar" => Box::pin(avatar::generate_avatar(ctx, state)),
        "generate_subtitles" => Box::pin(crate::steps::subtitles::generate_subtitles(ctx, state)),
        "compose_video" => Box::pin(compose::compose_video(ctx, state)),
        other => Box::pin(unknown_step(other)),
    }
}

fn dispatch_pdf<'a>(ctx: &'a PipelineContext, state: &'a FileState, step: &'a str) -> StepFuture<'a> {
    match step {
        "segment_pdf_content" => Box::pin(pdf::segment_pdf_content(ctx, state)),
        "revise_pdf_transcripts" => Box::pin(pdf::revise_pdf_transcripts(ctx, state)),
        "translate_voice_transcripts" => Box::pin(translate::translate_voice_transcripts(ctx, state)),
        "translate_subtitle_transcripts" => Box::pin(translate::translate_subtitle_transcripts(ctx, state)),
        "generate_pdf_chapter_images" => Box::pin(pdf::generate_pdf_chapter_images(ctx, state)),
        "generate_pdf_audio" => Box::pin(audio::generate_pdf_audio(ctx, state)),
        "generate_avatar" => Box::pin(avatar::generate_avatar(ctx, state)),
        "generate_pdf_subtitles" => Box::pin(crate::steps::subtitles::generate_pdf_subtitles(ctx, state)),
        "compose_video" => Box::pin(compose::compose_pdf_video(ctx, state)),
        other => Box::pin(unknown_step(other)),
    }
}

async fn unknown_step(step: &str) -> PipelineResult<serde_json::Value> {
    Err(PipelineError::invalid_input(format!("unknown video step {step}")))
}

/// Run the video coordinator for `file_id`, selecting the slides or PDF step
/// graph by `source_type`. The source kind lives on the task, not the
/// per-file state document, so the caller (worker runtime) passes it in
/// explicitly rather than this module reading it from `state`.
pub async fn run(ctx: &PipelineContext, file_id: &FileId, source_type: SourceType) -> PipelineResult<()> {
    let state = crate::helpers::reload(ctx, file_id).await?;
    let (steps, dispatch) = match source_type {
        SourceType::Slides => (slides_step_list(&state), dispatch_slides as StepDispatch),
        SourceType::Pdf => (pdf_step_list(&state), dispatch_pdf as StepDispatch),
    };
    coordinator::run(ctx, file_id, &steps, dispatch).await
}
