//! FFmpeg CLI wrapper for the video generation pipeline.
//!
//! This crate provides:
//! - Type-safe FFmpeg command building with multiple inputs
//! - A timeout-bounded, cancellable runner that keeps the stderr tail
//! - Placeholder clips, silent audio and still-image clips
//! - SRT subtitle rendering
//! - Concatenation, duration reconciliation and the final mux

pub mod assemble;
pub mod audio;
pub mod command;
pub mod concat;
pub mod encoding;
pub mod error;
pub mod filters;
pub mod fs_utils;
pub mod mux;
pub mod placeholder;
pub mod probe;
pub mod progress;
pub mod reconcile;
pub mod still;
pub mod subtitles;

pub use assemble::{AssemblyPaths, MediaAssembler};
pub use audio::render_silent_audio;
pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner};
pub use concat::concat_clips;
pub use error::{MediaError, MediaResult};
pub use mux::mux_with_subtitles;
pub use placeholder::{render_placeholder, PlaceholderKind, PlaceholderStyle};
pub use probe::{probe_duration, probe_media, MediaInfo};
pub use progress::FfmpegProgress;
pub use reconcile::{plan_reconciliation, reconcile_duration, ReconcilePlan};
pub use still::render_still_clip;
pub use subtitles::{render_srt, rescale_cues, write_srt};
