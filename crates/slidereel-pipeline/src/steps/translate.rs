//! Conditional translation steps. Each is only ever scheduled by a
//! coordinator when its target language differs from the source; by the
//! time these run, a differing-language precondition already holds.

use serde_json::{json, Value};
use slidereel_capabilities::translate_text;
use slidereel_models::FileState;

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::select_transcript_source;
use crate::steps::podcast_script::PodcastLine;
use crate::steps::TranscriptSegment;

const SOURCE_LANGUAGE: &str = "english";

/// The revised-transcript step whichever coordinator produced, preferring
/// the PDF path's step name since a file only ever has one of the two.
async fn revised_transcripts(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Vec<TranscriptSegment>> {
    let data = select_transcript_source(ctx, &state.file_id, &["revise_pdf_transcripts", "revise_transcripts"])
        .await?
        .ok_or_else(|| PipelineError::invalid_input("translation requires a completed revision step"))?;
    Ok(serde_json::from_value(data["transcripts"].clone()).unwrap_or_default())
}

async fn translate_segments(ctx: &PipelineContext, segments: Vec<TranscriptSegment>, target_language: &str) -> PipelineResult<Vec<TranscriptSegment>> {
    let mut translated = Vec::with_capacity(segments.len());
    for segment in segments {
        let text = translate_text(&ctx.chat, &segment.text, SOURCE_LANGUAGE, target_language).await?;
        translated.push(TranscriptSegment { index: segment.index, text });
    }
    Ok(translated)
}

/// Translate the voice-narration transcript to `voice_language`. Skipped by
/// the coordinator when `voice_language == "english"`.
pub async fn translate_voice_transcripts(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let segments = revised_transcripts(ctx, state).await?;
    let translated = translate_segments(ctx, segments, &state.voice_language).await?;
    Ok(json!({ "transcripts": translated }))
}

/// Translate the subtitle transcript to `subtitle_language`. Skipped by the
/// coordinator when `subtitle_language` is null or equals the source
/// language.
pub async fn translate_subtitle_transcripts(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let segments = revised_transcripts(ctx, state).await?;
    let target = state.effective_subtitle_language();
    let translated = translate_segments(ctx, segments, &target).await?;
    Ok(json!({ "transcripts": translated }))
}

/// Translate the podcast host/guest script to the submitted transcript
/// language. Skipped when that language equals the source.
pub async fn translate_podcast_script(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let data = crate::helpers::fetch_step_data(ctx, &state.file_id, "generate_podcast_script")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("translate_podcast_script requires generate_podcast_script data"))?;
    let lines: Vec<PodcastLine> = serde_json::from_value(data["lines"].clone()).unwrap_or_default();

    let target = state
        .podcast_transcript_language
        .clone()
        .unwrap_or_else(|| SOURCE_LANGUAGE.to_string());

    let mut translated = Vec::with_capacity(lines.len());
    for line in lines {
        let text = translate_text(&ctx.chat, &line.text, SOURCE_LANGUAGE, &target).await?;
        translated.push(PodcastLine { speaker: line.speaker, text });
    }

    Ok(json!({ "lines": translated }))
}
