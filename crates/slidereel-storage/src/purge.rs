//! `task_type=file_purge` support: collect every storage key a pipeline run
//! could have written for a file and delete them idempotently. Shared by the
//! worker's file-purge task handler and the `storage exists` CLI subcommand,
//! which reuses the same collection logic to report presence instead of
//! deleting.

use slidereel_models::FileState;
use tracing::{info, warn};

use crate::error::StorageResult;
use crate::keys::candidate_artifact_keys;
use crate::provider::StorageProvider;

/// Every key the state document's `artifacts` map names, plus the
/// deterministic task-first/legacy naming patterns, deduplicated.
pub fn collect_artifact_keys(state: &FileState, task_id: &str) -> Vec<String> {
    let mut keys: Vec<String> = state
        .artifacts
        .values()
        .filter_map(|artifact| artifact.storage_key.clone())
        .collect();

    let subtitle_locale = state.effective_subtitle_language();
    keys.extend(candidate_artifact_keys(task_id, state.file_id.as_str(), &[subtitle_locale.as_str()]));

    keys.sort();
    keys.dedup();
    keys
}

/// Delete every candidate key for `state`, tolerating already-absent keys.
/// Returns the keys actually found-and-deleted.
pub async fn purge_file(
    provider: &dyn StorageProvider,
    state: &FileState,
    task_id: &str,
) -> StorageResult<Vec<String>> {
    let candidates = collect_artifact_keys(state, task_id);
    let mut deleted = Vec::new();
    for key in candidates {
        match provider.exists(&key).await {
            Ok(true) => {
                provider.delete(&key).await?;
                info!(key, "purged artifact");
                deleted.push(key);
            }
            Ok(false) => {}
            Err(e) => warn!(key, error = %e, "failed to check artifact existence during purge"),
        }
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use chrono::Utc;
    use slidereel_models::{Artifact, FileId, FileStatus};

    use super::*;

    fn sample_state() -> FileState {
        let mut artifacts = BTreeMap::new();
        artifacts.insert(
            "final_video".to_string(),
            Artifact {
                storage_key: Some("outputs/t1/video/final.mp4".to_string()),
                ..Default::default()
            },
        );
        FileState {
            file_id: FileId::from_string("f1"),
            file_path: "/tmp/f1.pdf".into(),
            file_ext: "pdf".into(),
            status: FileStatus::Completed,
            current_step: None,
            cancelled_step: None,
            task_id: None,
            voice_language: "english".into(),
            subtitle_language: None,
            podcast_transcript_language: None,
            generate_avatar: false,
            generate_subtitles: true,
            generate_video: true,
            generate_podcast: false,
            steps: BTreeMap::new(),
            errors: Vec::new(),
            artifacts,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn collect_artifact_keys_includes_artifacts_map_and_deterministic_names() {
        let state = sample_state();
        let keys = collect_artifact_keys(&state, "t1");
        assert!(keys.contains(&"outputs/t1/video/final.mp4".to_string()));
        assert!(keys.contains(&"f1_final.mp4".to_string()));
    }
}
