//! Translation capability. No dedicated translation endpoint exists in this
//! provider's API, so translation is a `ChatClient` call with a
//! translation-specific system prompt, the same chat completion function
//! used for script generation.

use serde_json::json;

use crate::chat::{ChatClient, ChatMessage};
use crate::error::CapabilityResult;

const DEFAULT_TRANSLATION_MODEL: &str = "gpt-4o-mini";

fn system_prompt(source_language: &str, target_language: &str) -> String {
    format!(
        "You are a professional translator. Translate the given text from {source_language} to \
         {target_language}. Preserve meaning, tone, and structure. Return only the translated \
         text, with no commentary or quotation marks."
    )
}

/// Translate a single block of text from `source_language` to `target_language`.
pub async fn translate_text(client: &ChatClient, text: &str, source_language: &str, target_language: &str) -> CapabilityResult<String> {
    let messages = [ChatMessage::system(system_prompt(source_language, target_language)), ChatMessage::user(text)];
    client.chat_completion(&messages, DEFAULT_TRANSLATION_MODEL, json!({ "temperature": 0.2 })).await
}
