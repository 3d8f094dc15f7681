//! Two-voice podcast script generation from segmented PDF content.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use slidereel_capabilities::ChatMessage;
use slidereel_models::FileState;

use crate::context::PipelineContext;
use crate::error::{PipelineError, PipelineResult};
use crate::helpers::fetch_step_data;

/// One line of podcast dialogue, tagged by speaker role.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PodcastLine {
    pub speaker: String,
    pub text: String,
}

const SCRIPT_SYSTEM_PROMPT: &str = "You are a podcast script writer. Turn the given document content \
into a natural two-person conversation between a HOST and a GUEST discussing the material. Write \
each line of dialogue on its own line, prefixed by 'HOST:' or 'GUEST:'. Keep it engaging and \
conversational; do not include stage directions.";

/// Generate a host/guest podcast script from the document's segmented
/// content (`segment_pdf_content`, run as a prerequisite by the podcast
/// coordinator regardless of product mode).
pub async fn generate_podcast_script(ctx: &PipelineContext, state: &FileState) -> PipelineResult<Value> {
    let segmented = fetch_step_data(ctx, &state.file_id, "segment_pdf_content")
        .await?
        .ok_or_else(|| PipelineError::invalid_input("generate_podcast_script requires segment_pdf_content data"))?;
    let segments: Vec<String> = serde_json::from_value(segmented["segments"].clone()).unwrap_or_default();
    let full_text = segments.join("\n\n");

    let messages = [ChatMessage::system(SCRIPT_SYSTEM_PROMPT), ChatMessage::user(full_text)];
    let response = ctx
        .chat
        .chat_completion(&messages, "gpt-4o-mini", json!({ "temperature": 0.6 }))
        .await?;

    let lines = parse_script(&response);
    Ok(json!({ "lines": lines }))
}

fn parse_script(response: &str) -> Vec<PodcastLine> {
    let mut lines = Vec::new();
    for raw_line in response.lines() {
        let raw_line = raw_line.trim();
        if raw_line.is_empty() {
            continue;
        }
        if let Some(rest) = raw_line.strip_prefix("HOST:") {
            lines.push(PodcastLine { speaker: "host".to_string(), text: rest.trim().to_string() });
        } else if let Some(rest) = raw_line.strip_prefix("GUEST:") {
            lines.push(PodcastLine { speaker: "guest".to_string(), text: rest.trim().to_string() });
        } else if let Some(last) = lines.last_mut() {
            // Unlabeled continuation line: append to the current speaker's turn.
            let last: &mut PodcastLine = last;
            last.text.push(' ');
            last.text.push_str(raw_line);
        }
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_labeled_speaker_turns() {
        let script = "HOST: Welcome to the show.\nGUEST: Thanks for having me.\nHOST: Let's dive in.";
        let lines = parse_script(script);
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].speaker, "host");
        assert_eq!(lines[1].speaker, "guest");
    }

    #[test]
    fn folds_unlabeled_continuation_into_previous_turn() {
        let script = "HOST: Welcome to the show.\nand thanks for tuning in.";
        let lines = parse_script(script);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].text, "Welcome to the show. and thanks for tuning in.");
    }
}
