//! Shared encoding parameters.
//!
//! Every rendered clip (placeholder or generated) uses the same frame size,
//! rate, codec and pixel format so the concat demuxer can join them with
//! stream copy.

/// Output width in pixels (portrait).
pub const OUTPUT_WIDTH: u32 = 1080;

/// Output height in pixels (portrait).
pub const OUTPUT_HEIGHT: u32 = 1920;

/// Output frame rate.
pub const OUTPUT_FPS: u32 = 30;

pub const VIDEO_CODEC: &str = "libx264";
pub const PIXEL_FORMAT: &str = "yuv420p";
pub const ENCODE_PRESET: &str = "veryfast";
pub const ENCODE_CRF: u8 = 23;

/// Codec for the final muxed audio track.
pub const AUDIO_CODEC: &str = "aac";
pub const AUDIO_BITRATE: &str = "128k";

/// Codec for generated narration placeholders (written as `.mp3`).
pub const SILENT_AUDIO_CODEC: &str = "libmp3lame";
pub const SILENT_AUDIO_SAMPLE_RATE: u32 = 44_100;

/// Frame size as `WxH`.
pub fn frame_size() -> String {
    format!("{}x{}", OUTPUT_WIDTH, OUTPUT_HEIGHT)
}
