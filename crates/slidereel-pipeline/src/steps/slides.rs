//! Slide-deck extraction, rendering, analysis, and transcript drafting.

use serde_json::{json, Value};
use slidereel_capabilities::ChatMessage;
use slidereel_models::FileState;
use tracing::{info, warn};

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::{check_and_handle_cancellation, fetch_step_data};
use crate::steps::{TranscriptSegment, CANCEL_CHECK_STRIDE};

const STEP: &str = "extract_slides";

/// Extract per-slide text content from the uploaded presentation.
pub async fn extract_slides(_ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let pages = slidereel_media::extract_text_pages(&state.file_path, &state.file_ext).await?;
    info!(file_id = %state.file_id, slide_count = pages.len(), "extracted slide text");
    Ok(json!({ "pages": pages }))
}

/// Render each slide to a PNG under the file's workspace directory.
pub async fn convert_slides(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let extracted = fetch_step_data(ctx, &state.file_id, STEP)
        .await?
        .ok_or_else(|| PipelineError::invalid_input("convert_slides requires extract_slides data"))?;
    let page_count = extracted["pages"].as_array().map(|a| a.len()).unwrap_or(0);

    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let slides_dir = workspace.join("slides");
    tokio::fs::create_dir_all(&slides_dir).await?;

    let mut image_paths = Vec::with_capacity(page_count);
    for index in 0..page_count {
        if index % CANCEL_CHECK_STRIDE == 0 && check_and_handle_cancellation(ctx, &state.file_id, "convert_slides").await? {
            return Err(PipelineError::Cancelled);
        }
        let out_path = slides_dir.join(format!("slide_{:04}.png", index + 1));
        slidereel_media::render_page_to_image(&state.file_path, &state.file_ext, index, &out_path).await?;
        image_paths.push(out_path.to_string_lossy().to_string());
    }

    Ok(json!({ "image_paths": image_paths }))
}

const ANALYSIS_PROMPT: &str = "Describe the key visual elements, charts, and layout of this slide so a narration writer can reference them accurately.";

/// Run vision analysis over each rendered slide image.
pub async fn analyze_slides(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let converted = fetch_step_data(ctx, &state.file_id, "convert_slides")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("analyze_slides requires convert_slides data"))?;
    let image_paths: Vec<String> = serde_json::from_value(converted["image_paths"].clone()).unwrap_or_default();

    let mut analyses = Vec::with_capacity(image_paths.len());
    for (index, path) in image_paths.iter().enumerate() {
        if index % CANCEL_CHECK_STRIDE == 0 && check_and_handle_cancellation(ctx, &state.file_id, "analyze_slides").await? {
            return Err(PipelineError::Cancelled);
        }
        let bytes = tokio::fs::read(path).await?;
        match ctx.vision.analyze_image(&bytes, ANALYSIS_PROMPT).await {
            Ok(analysis) => analyses.push(analysis),
            Err(e) => {
                warn!(slide = index + 1, error = %e, "vision analysis failed for slide, using empty analysis");
                analyses.push(String::new());
            }
        }
    }

    Ok(json!({ "analyses": analyses }))
}

fn script_system_prompt(voice_language: &str) -> String {
    format!(
        "You are an expert presentation narrator. Write a concise, natural spoken narration \
         script in {voice_language} for one slide, using its extracted text and visual analysis. \
         Return only the narration text, with no stage directions or commentary."
    )
}

/// Draft narration transcripts for every slide from its text and analysis.
pub async fn generate_transcripts(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let extracted = fetch_step_data(ctx, &state.file_id, "extract_slides")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("generate_transcripts requires extract_slides data"))?;
    let analyzed = fetch_step_data(ctx, &state.file_id, "analyze_slides").await?;

    let pages: Vec<String> = serde_json::from_value(extracted["pages"].clone()).unwrap_or_default();
    let analyses: Vec<String> = analyzed
        .and_then(|v| serde_json::from_value(v["analyses"].clone()).ok())
        .unwrap_or_default();

    let system = script_system_prompt(&state.voice_language);
    let mut transcripts = Vec::with_capacity(pages.len());
    for (index, page_text) in pages.iter().enumerate() {
        let analysis = analyses.get(index).cloned().unwrap_or_default();
        let user_prompt = format!("Slide text:\n{page_text}\n\nVisual analysis:\n{analysis}");
        let messages = [ChatMessage::system(system.clone()), ChatMessage::user(user_prompt)];
        let text = ctx
            .chat
            .chat_completion(&messages, "gpt-4o-mini", json!({ "temperature": 0.5 }))
            .await?;
        transcripts.push(TranscriptSegment { index, text: text.trim().to_string() });
    }

    Ok(json!({ "transcripts": transcripts }))
}

const REVISION_PROMPT: &str = "You are a meticulous script editor. Revise this narration for clarity, \
pacing, and natural spoken delivery without changing its meaning. Return only the revised text.";

/// Polish the drafted transcripts for pacing and natural delivery.
pub async fn revise_transcripts(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    revise_transcript_step(ctx, state, "generate_transcripts").await
}

/// Shared revision body for both the slides and PDF transcript-revision
/// steps, which differ only in which earlier step they read from.
pub(crate) async fn revise_transcript_step(ctx: &PipelineContext, state: &FileState, source_step: &str) -> PipelineResult<Value> {
    let drafted = fetch_step_data(ctx, &state.file_id, source_step)
        .await?
        .ok_or_else(|| PipelineError::invalid_input(format!("revision requires {source_step} data")))?;
    let segments: Vec<TranscriptSegment> = serde_json::from_value(drafted["transcripts"].clone()).unwrap_or_default();

    let mut revised = Vec::with_capacity(segments.len());
    for segment in segments {
        let messages = [ChatMessage::system(REVISION_PROMPT), ChatMessage::user(segment.text.clone())];
        let text = ctx
            .chat
            .chat_completion(&messages, "gpt-4o-mini", json!({ "temperature": 0.3 }))
            .await?;
        revised.push(TranscriptSegment { index: segment.index, text: text.trim().to_string() });
    }

    Ok(json!({ "transcripts": revised }))
}
