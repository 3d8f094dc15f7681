//! SRT subtitle generation: cue timing is derived from the
//! already-synthesized narration clips rather than a separate alignment
//! pass, so subtitles always match the audio track they ship alongside.

use serde_json::{json, Value};
use slidereel_media::get_duration;
use slidereel_models::FileState;

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::{fetch_step_data, select_transcript_source};
use crate::steps::TranscriptSegment;

fn format_timestamp(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let ms = total_ms % 1000;
    let total_secs = total_ms / 1000;
    let secs = total_secs % 60;
    let mins = (total_secs / 60) % 60;
    let hours = total_secs / 3600;
    format!("{hours:02}:{mins:02}:{secs:02},{ms:03}")
}

fn build_srt(cues: &[(f64, f64, String)]) -> String {
    let mut out = String::new();
    for (i, (start, end, text)) in cues.iter().enumerate() {
        out.push_str(&format!("{}\n", i + 1));
        out.push_str(&format!("{} --> {}\n", format_timestamp(*start), format_timestamp(*end)));
        out.push_str(text.trim());
        out.push_str("\n\n");
    }
    out
}

async fn cue_durations(audio_segment_paths: &[String]) -> PipelineResult<Vec<f64>> {
    let mut durations = Vec::with_capacity(audio_segment_paths.len());
    for path in audio_segment_paths {
        let info = get_duration(path).await?;
        durations.push(info);
    }
    Ok(durations)
}

async fn generate_subtitle_track(
    ctx: &PipelineContext,
    state: &FileState,
    text_candidates: &[&str],
    audio_step: &str,
    out_name: &str,
) -> PipelineResult<Value> {
    let text_data = select_transcript_source(ctx, &state.file_id, text_candidates)
        .await?
        .ok_or_else(|| PipelineError::invalid_input(format!("{out_name} requires a completed transcript source")))?;
    let segments: Vec<TranscriptSegment> = serde_json::from_value(text_data["transcripts"].clone()).unwrap_or_default();

    let audio_data = fetch_step_data(ctx, &state.file_id, audio_step)
        .await?
        .ok_or_else(|| PipelineError::invalid_input(format!("{out_name} requires {audio_step} data")))?;
    let segment_paths: Vec<String> = serde_json::from_value(audio_data["segment_paths"].clone()).unwrap_or_default();
    let durations = cue_durations(&segment_paths).await?;

    let mut cues = Vec::with_capacity(segments.len());
    let mut cursor = 0.0_f64;
    for (i, segment) in segments.iter().enumerate() {
        let duration = durations.get(i).copied().unwrap_or(3.0);
        cues.push((cursor, cursor + duration, segment.text.clone()));
        cursor += duration;
    }

    let srt = build_srt(&cues);
    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let path = workspace.join(format!("{out_name}.srt"));
    tokio::fs::write(&path, &srt).await?;

    Ok(json!({ "subtitle_path": path.to_string_lossy(), "cue_count": cues.len() }))
}

/// Generate subtitles for the slides/video path, timed against
/// `generate_audio`'s narration clips.
pub async fn generate_subtitles(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    generate_subtitle_track(
        ctx,
        state,
        &["translate_subtitle_transcripts", "revise_transcripts", "generate_transcripts"],
        "generate_audio",
        "subtitles",
    )
    .await
}

/// Generate subtitles for the PDF/video path, timed against
/// `generate_pdf_audio`'s narration clips.
pub async fn generate_pdf_subtitles(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    generate_subtitle_track(
        ctx,
        state,
        &["translate_subtitle_transcripts", "revise_pdf_transcripts"],
        "generate_pdf_audio",
        "pdf_subtitles",
    )
    .await
}

/// Generate subtitles for the podcast path. Cue text follows the podcast
/// script's dialogue lines rather than a segment transcript, timed against
/// `generate_podcast_audio`'s per-line clips.
pub async fn generate_podcast_subtitles(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let script_data = select_transcript_source(ctx, &state.file_id, &["translate_podcast_script", "generate_podcast_script"])
        .await?
        .ok_or_else(|| PipelineError::invalid_input("generate_podcast_subtitles requires a completed podcast script"))?;
    let lines: Vec<crate::steps::podcast_script::PodcastLine> = serde_json::from_value(script_data["lines"].clone()).unwrap_or_default();

    let audio_data = fetch_step_data(ctx, &state.file_id, "generate_podcast_audio")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("generate_podcast_subtitles requires generate_podcast_audio data"))?;
    let segment_paths: Vec<String> = serde_json::from_value(audio_data["segment_paths"].clone()).unwrap_or_default();
    let durations = cue_durations(&segment_paths).await?;

    let mut cues = Vec::with_capacity(lines.len());
    let mut cursor = 0.0_f64;
    for (i, line) in lines.iter().enumerate() {
        let duration = durations.get(i).copied().unwrap_or(3.0);
        let label = if line.speaker == "guest" { "Guest" } else { "Host" };
        cues.push((cursor, cursor + duration, format!("{label}: {}", line.text)));
        cursor += duration;
    }

    let srt = build_srt(&cues);
    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let path = workspace.join("podcast_subtitles.srt");
    tokio::fs::write(&path, &srt).await?;

    Ok(json!({ "subtitle_path": path.to_string_lossy(), "cue_count": cues.len() }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_srt_timestamps() {
        assert_eq!(format_timestamp(0.0), "00:00:00,000");
        assert_eq!(format_timestamp(61.5), "00:01:01,500");
        assert_eq!(format_timestamp(3661.25), "01:01:01,250");
    }

    #[test]
    fn builds_sequential_srt_blocks() {
        let cues = vec![(0.0, 2.0, "Hello".to_string()), (2.0, 4.5, "World".to_string())];
        let srt = build_srt(&cues);
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:02,000\nHello\n\n2\n"));
    }
}
