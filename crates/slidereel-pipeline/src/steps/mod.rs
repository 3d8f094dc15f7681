//! Step implementations: idempotent, resumable units each producing one
//! step's `data`.
//!
//! Each function here takes the context and the file's current state and
//! returns the `data` payload for its step; the coordinator (not the step
//! itself) writes that payload through `set_step_status(.., Completed, ..)`
//! once the call returns successfully. This keeps the completed-write to
//! one call site shared by both coordinators, instead of every step
//! function writing through state on its own.

pub mod audio;
pub mod avatar;
pub mod compose;
pub mod pdf;
pub mod podcast_script;
pub mod slides;
pub mod subtitles;
pub mod translate;

use serde::{Deserialize, Serialize};

/// One narration unit: a slide's or segment's spoken text, in a typed
/// shape shared by every step that produces or consumes transcripts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSegment {
    pub index: usize,
    pub text: String,
}

/// How often (in slide/segment count) long-running per-item loops
/// re-check cancellation.
pub const CANCEL_CHECK_STRIDE: usize = 2;
