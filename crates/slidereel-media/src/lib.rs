//! FFmpeg/document CLI wrappers.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with progress parsing and cancellation
//! - Video probing via `ffprobe`
//! - Cross-device-safe file moves
//! - PDF/PPTX slide text extraction and page-to-image rendering

pub mod command;
pub mod error;
pub mod fs_utils;
pub mod probe;
pub mod progress;
pub mod slides;

pub use command::{FfmpegCommand, FfmpegRunner};
pub use error::{MediaError, MediaResult};
pub use fs_utils::move_file;
pub use probe::{get_duration, probe_video, VideoInfo};
pub use progress::{FfmpegProgress, ProgressCallback};
pub use slides::{extract_text_pages, render_page_to_image};
