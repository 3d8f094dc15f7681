//! Text-to-speech audio synthesis for the video and podcast paths: one TTS
//! call per transcript segment, concatenated into a single narration track
//! via ffmpeg's concat demuxer.

use serde_json::{json, Value};
use slidereel_media::{FfmpegCommand, FfmpegRunner};
use slidereel_models::FileState;
use tracing::warn;

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::{check_and_handle_cancellation, select_transcript_source};
use crate::steps::podcast_script::PodcastLine;
use crate::steps::{TranscriptSegment, CANCEL_CHECK_STRIDE};

const DEFAULT_TTS_MODEL: &str = "tts-1";
const DEFAULT_VOICE: &str = "alloy";
const PODCAST_HOST_VOICE: &str = "onyx";
const PODCAST_GUEST_VOICE: &str = "nova";

async fn synthesize_segments(
    ctx: &PipelineContext,
    state: &FileState,
    segments: &[TranscriptSegment],
    voice: &str,
    audio_dir: &std::path::Path,
    step_for_cancellation: &str,
) -> PipelineResult<Vec<std::path::PathBuf>> {
    tokio::fs::create_dir_all(audio_dir).await?;
    let mut paths = Vec::with_capacity(segments.len());
    for (i, segment) in segments.iter().enumerate() {
        if i % CANCEL_CHECK_STRIDE == 0 && check_and_handle_cancellation(ctx, &state.file_id, step_for_cancellation).await? {
            return Err(PipelineError::Cancelled);
        }
        if segment.text.trim().is_empty() {
            warn!(file_id = %state.file_id, segment = segment.index, "skipping empty transcript segment");
            continue;
        }
        let bytes = ctx.tts.synthesize(DEFAULT_TTS_MODEL, voice, &segment.text).await?;
        let path = audio_dir.join(format!("segment_{:04}.mp3", segment.index + 1));
        tokio::fs::write(&path, &bytes).await?;
        paths.push(path);
    }
    Ok(paths)
}

/// Concatenate per-segment audio clips into one track via ffmpeg's concat
/// demuxer (`-f concat`). Requires the stream-copyable clips to share a
/// codec, which TTS output does by construction (all MP3 from one model).
async fn concat_audio(segment_paths: &[std::path::PathBuf], output_path: &std::path::Path) -> PipelineResult<()> {
    if segment_paths.is_empty() {
        return Err(PipelineError::invalid_input("no audio segments to concatenate"));
    }
    if segment_paths.len() == 1 {
        tokio::fs::copy(&segment_paths[0], output_path).await?;
        return Ok(());
    }

    let list_path = output_path.with_extension("concat.txt");
    let mut manifest = String::new();
    for path in segment_paths {
        manifest.push_str(&format!("file '{}'\n", path.display()));
    }
    tokio::fs::write(&list_path, manifest).await?;

    let cmd = FfmpegCommand::new(&list_path, output_path)
        .input_args(["-f", "concat", "-safe", "0"])
        .output_args(["-c", "copy"]);
    FfmpegRunner::new().with_timeout(300).run(&cmd).await?;
    Ok(())
}

async fn generate_audio_track(
    ctx: &PipelineContext,
    state: &FileState,
    source_candidates: &[&str],
    voice: &str,
    subdir: &str,
    step: &str,
) -> PipelineResult<Value> {
    let data = select_transcript_source(ctx, &state.file_id, source_candidates)
        .await?
        .ok_or_else(|| PipelineError::invalid_input(format!("{step} requires a completed transcript source")))?;
    let segments: Vec<TranscriptSegment> = serde_json::from_value(data["transcripts"].clone()).unwrap_or_default();

    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let audio_dir = workspace.join(subdir);
    let segment_paths = synthesize_segments(ctx, state, &segments, voice, &audio_dir, step).await?;

    let final_path = workspace.join(format!("{subdir}.mp3"));
    concat_audio(&segment_paths, &final_path).await?;

    Ok(json!({
        "audio_path": final_path.to_string_lossy(),
        "segment_paths": segment_paths.iter().map(|p| p.to_string_lossy().to_string()).collect::<Vec<_>>(),
    }))
}

/// Synthesize narration audio for the slides/video path. Transcript source
/// selection follows the documented priority: translated voice
/// transcript, then revised transcript, then the original draft.
pub async fn generate_audio(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    generate_audio_track(
        ctx,
        state,
        &["translate_voice_transcripts", "revise_transcripts", "generate_transcripts"],
        DEFAULT_VOICE,
        "audio",
        "generate_audio",
    )
    .await
}

/// Synthesize narration audio for the PDF/video path.
pub async fn generate_pdf_audio(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    generate_audio_track(
        ctx,
        state,
        &["translate_voice_transcripts", "revise_pdf_transcripts"],
        DEFAULT_VOICE,
        "pdf_audio",
        "generate_pdf_audio",
    )
    .await
}

/// Synthesize two-voice podcast audio, alternating host/guest TTS voices
/// per line, then concatenating in dialogue order.
///
/// The task-level `podcast_host_voice`/`podcast_guest_voice` selections are
/// not part of the persisted file-state document's attributes, so this step
/// falls back to fixed default voices rather than threading the task
/// payload through every step call; documented as a deliberate narrowing in
/// DESIGN.md.
pub async fn generate_podcast_audio(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let data = select_transcript_source(ctx, &state.file_id, &["translate_podcast_script", "generate_podcast_script"])
        .await?
        .ok_or_else(|| PipelineError::invalid_input("generate_podcast_audio requires a completed podcast script"))?;
    let lines: Vec<PodcastLine> = serde_json::from_value(data["lines"].clone()).unwrap_or_default();

    let workspace = ctx.ensure_workspace_dir(&state.file_id).await?;
    let audio_dir = workspace.join("podcast_audio");
    tokio::fs::create_dir_all(&audio_dir).await?;

    let mut segment_paths = Vec::with_capacity(lines.len());
    let mut voice_names = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        if i % CANCEL_CHECK_STRIDE == 0 && check_and_handle_cancellation(ctx, &state.file_id, "generate_podcast_audio").await? {
            return Err(PipelineError::Cancelled);
        }
        if line.text.trim().is_empty() {
            continue;
        }
        let voice = if line.speaker == "guest" { PODCAST_GUEST_VOICE } else { PODCAST_HOST_VOICE };
        let bytes = ctx.tts.synthesize(DEFAULT_TTS_MODEL, voice, &line.text).await?;
        let path = audio_dir.join(format!("line_{:04}.mp3", i + 1));
        tokio::fs::write(&path, &bytes).await?;
        segment_paths.push(path);
        voice_names.push(voice.to_string());
    }

    let final_path = workspace.join("podcast_audio.mp3");
    concat_audio(&segment_paths, &final_path).await?;

    Ok(json!({
        "audio_path": final_path.to_string_lossy(),
        "segment_paths": segment_paths.iter().map(|p| p.to_string_lossy().to_string()).collect::<Vec<_>>(),
        "voice_names": voice_names,
    }))
}
