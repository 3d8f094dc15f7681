//! External capability contracts: chat, translation, vision, TTS, image
//! generation. Each adapter is a thin `reqwest` client against an
//! OpenAI-compatible HTTP API, sharing one retry combinator and one
//! environment-driven configuration.

pub mod chat;
pub mod config;
pub mod error;
pub mod image_gen;
pub mod retry;
pub mod translate;
pub mod tts;
pub mod vision;

pub use chat::{ChatClient, ChatMessage};
pub use config::CapabilitiesConfig;
pub use error::{CapabilityError, CapabilityResult};
pub use image_gen::ImageGenClient;
pub use retry::{with_retry, RetryPolicy, TimedOut};
pub use translate::translate_text;
pub use tts::TtsClient;
pub use vision::VisionClient;
