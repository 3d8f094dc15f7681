//! PDF content segmentation, transcript revision, and chapter-image
//! generation.

use serde_json::{json, Value};
use slidereel_capabilities::ChatMessage;
use slidereel_models::FileState;
use tracing::info;

use crate::context::PipelineContext;
use crate::coordinator::StepFuture;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::{check_and_handle_cancellation, fetch_step_data};
use crate::steps::{TranscriptSegment, CANCEL_CHECK_STRIDE};

/// Single-step dispatcher used by the podcast coordinator to run
/// `segment_pdf_content` as a standalone prerequisite, ahead of its own
/// step graph.
pub fn dispatch_segment_only<'a>(ctx: &'a PipelineContext, state: &'a FileState, step: &'a str) -> StepFuture<'a> {
    match step {
        "segment_pdf_content" => Box::pin(segment_pdf_content(ctx, state)),
        other => Box::pin(async move { Err(PipelineError::invalid_input(format!("unknown step {other}"))) }),
    }
}

const SEGMENT_SYSTEM_PROMPT: &str = "You are an expert editor. Split the given document text into a \
sequence of self-contained content chapters suitable for narration, preserving reading order. \
Return each chapter separated by a line containing only '---'.";

/// Split the extracted PDF text into narration-sized content segments.
/// Shared prerequisite of the video/PDF and podcast/PDF coordinators.
pub async fn segment_pdf_content(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let pages = slidereel_media::extract_text_pages(&state.file_path, &state.file_ext).await?;
    let full_text = pages.join("\n\n");

    let messages = [ChatMessage::system(SEGMENT_SYSTEM_PROMPT), ChatMessage::user(full_text)];
    let response = ctx
        .chat
        .chat_completion(&messages, "gpt-4o-mini", json!({ "temperature": 0.2 }))
        .await?;

    let segments: Vec<String> = response
        .split("\n---\n")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    let segments = if segments.is_empty() { pages } else { segments };

    info!(file_id = %state.file_id, segment_count = segments.len(), "segmented pdf content");
    Ok(json!({ "segments": segments }))
}

const PDF_REVISION_PROMPT: &str = "You are a meticulous script editor. Revise this narration for \
clarity, pacing, and natural spoken delivery without changing its meaning. Return only the revised \
text.";

/// Draft and revise narration transcripts for each PDF segment in one pass
/// (the PDF path collapses the slides path's separate generate/revise steps
/// into a single `revise_pdf_transcripts` step, since a PDF segment has no
/// counterpart to a slide's visual analysis to generate from first).
pub async fn revise_pdf_transcripts(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let segmented = fetch_step_data(ctx, &state.file_id, "segment_pdf_content")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("revise_pdf_transcripts requires segment_pdf_content data"))?;
    let segments: Vec<String> = serde_json::from_value(segmented["segments"].clone()).unwrap_or_default();

    let draft_system = format!(
        "You are an expert narrator. Write a concise spoken narration in {} for the given \
         document chapter. Return only the narration text.",
        state.voice_language
    );
    let mut revised = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let draft_messages = [ChatMessage::system(draft_system.clone()), ChatMessage::user(segment.clone())];
        let draft = ctx
            .chat
            .chat_completion(&draft_messages, "gpt-4o-mini", json!({ "temperature": 0.5 }))
            .await?;

        let revise_messages = [ChatMessage::system(PDF_REVISION_PROMPT), ChatMessage::user(draft)];
        let text = ctx
            .chat
            .chat_completion(&revise_messages, "gpt-4o-mini", json!({ "temperature": 0.3 }))
            .await?;
        revised.push(TranscriptSegment { index, text: text.trim().to_string() });
    }

    Ok(json!({ "transcripts": revised }))
}

const CHAPTER_IMAGE_SIZE: &str = "1024x1024";

/// Generate one illustrative chapter image per PDF segment via the image
/// generation capability.
pub async fn generate_pdf_chapter_images(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let segmented = fetch_step_data(ctx, &state.file_id, "segment_pdf_content")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("generate_pdf_chapter_images requires segment_pdf_content data"))?;
    let segments: Vec<String> = serde_json::from_value(segmented["segments"].clone()).unwrap_or_default();

    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let images_dir = workspace.join("chapter_images");
    tokio::fs::create_dir_all(&images_dir).await?;

    let mut image_paths = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        if index % CANCEL_CHECK_STRIDE == 0 && check_and_handle_cancellation(ctx, &state.file_id, "generate_pdf_chapter_images").await? {
            return Err(PipelineError::Cancelled);
        }
        let prompt = format!("An editorial illustration representing this chapter of a document: {}", truncate(segment, 500));
        let urls = ctx.image_gen.generate(&prompt, "dall-e-3", CHAPTER_IMAGE_SIZE, 1).await?;
        let out_path = images_dir.join(format!("chapter_{:04}.png", index + 1));
        if let Some(first) = urls.first() {
            download_image(first, &out_path).await?;
        }
        image_paths.push(out_path.to_string_lossy().to_string());
    }

    Ok(json!({ "image_paths": image_paths }))
}

fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

pub(crate) async fn download_image(source: &str, out_path: &std::path::Path) -> PipelineResult<()> {
    if let Some(b64) = source.strip_prefix("data:image/png;base64,") {
        use base64::engine::general_purpose::STANDARD as BASE64;
        use base64::Engine;
        let bytes = BASE64
            .decode(b64)
            .map_err(|e| PipelineError::invalid_input(format!("invalid base64 image data: {e}")))?;
        tokio::fs::write(out_path, bytes).await?;
    } else {
        let bytes = reqwest::get(source)
            .await
            .map_err(|e| PipelineError::invalid_input(format!("chapter image download failed: {e}")))?
            .bytes()
            .await
            .map_err(|e| PipelineError::invalid_input(format!("chapter image download failed: {e}")))?;
        tokio::fs::write(out_path, &bytes).await?;
    }
    Ok(())
}
