//! Deterministic object-key naming for task/file artifacts.
//!
//! All writers use the task-first form exclusively; read paths tolerate
//! both the task-first and legacy `file_id`-first forms.

/// The final composed video, keyed by task.
pub fn video_final_key(task_id: &str) -> String {
    format!("outputs/{task_id}/video/final.mp4")
}

/// The final narration-only audio track, keyed by task.
pub fn audio_final_key(task_id: &str) -> String {
    format!("outputs/{task_id}/audio/final.mp3")
}

/// The final podcast audio mix, keyed by task.
pub fn podcast_audio_final_key(task_id: &str) -> String {
    format!("outputs/{task_id}/podcast/final.mp3")
}

/// A subtitle track in `locale` (srt or vtt), keyed by task.
pub fn subtitle_key(task_id: &str, locale: &str, ext: &str) -> String {
    format!("outputs/{task_id}/subtitles/{locale}.{ext}")
}

/// The podcast transcript markdown side-artifact.
pub fn podcast_transcript_key(task_id: &str) -> String {
    format!("outputs/{task_id}/podcast/transcript.md")
}

/// Legacy, pre-task-first naming: `<file_id>_final.{mp4,mp3,srt,vtt}`.
/// Only ever produced by old runs; current writers never use this form.
pub fn legacy_final_key(file_id: &str, ext: &str) -> String {
    format!("{file_id}_final.{ext}")
}

fn legacy_subtitle_key(file_id: &str, locale: &str, ext: &str) -> String {
    format!("{file_id}_{locale}.{ext}")
}

/// Every storage key a pipeline run could plausibly have written for a
/// `(task_id, file_id)` pair: the task-first final artifacts plus their
/// legacy equivalents. Used by [`crate::purge`] to delete idempotently and
/// by the `storage exists` CLI subcommand to check for presence, preferring
/// task-first keys when both would apply.
pub fn candidate_artifact_keys(task_id: &str, file_id: &str, subtitle_locales: &[&str]) -> Vec<String> {
    let mut keys = vec![
        video_final_key(task_id),
        audio_final_key(task_id),
        podcast_audio_final_key(task_id),
        podcast_transcript_key(task_id),
        legacy_final_key(file_id, "mp4"),
        legacy_final_key(file_id, "mp3"),
    ];
    for locale in subtitle_locales {
        keys.push(subtitle_key(task_id, locale, "srt"));
        keys.push(subtitle_key(task_id, locale, "vtt"));
        keys.push(legacy_subtitle_key(file_id, locale, "srt"));
        keys.push(legacy_subtitle_key(file_id, locale, "vtt"));
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_first_keys_use_the_documented_layout() {
        assert_eq!(video_final_key("t1"), "outputs/t1/video/final.mp4");
        assert_eq!(podcast_audio_final_key("t1"), "outputs/t1/podcast/final.mp3");
        assert_eq!(subtitle_key("t1", "french", "srt"), "outputs/t1/subtitles/french.srt");
    }

    #[test]
    fn candidate_keys_include_both_naming_forms() {
        let keys = candidate_artifact_keys("t1", "f1", &["french"]);
        assert!(keys.contains(&"outputs/t1/video/final.mp4".to_string()));
        assert!(keys.contains(&"f1_final.mp4".to_string()));
        assert!(keys.contains(&"outputs/t1/subtitles/french.srt".to_string()));
        assert!(keys.contains(&"f1_french.srt".to_string()));
    }
}
