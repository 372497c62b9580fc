//! Placeholder clips for visual cues without generated media.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoding::{
    frame_size, ENCODE_CRF, ENCODE_PRESET, OUTPUT_FPS, PIXEL_FORMAT, VIDEO_CODEC,
};
use crate::error::{MediaError, MediaResult};
use crate::filters::drawtext_filter;

/// Default placeholder background.
pub const DEFAULT_PLACEHOLDER_COLOR: &str = "0x1e1e2e";

/// Look of placeholder clips.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceholderStyle {
    /// FFmpeg color spec for the background
    pub color: String,
    /// Font for the caption; FFmpeg's fontconfig default when unset
    pub font_file: Option<PathBuf>,
}

impl Default for PlaceholderStyle {
    fn default() -> Self {
        Self {
            color: DEFAULT_PLACEHOLDER_COLOR.to_string(),
            font_file: None,
        }
    }
}

/// Which variant of the placeholder was rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// Background with the caption burned in
    Captioned,
    /// Background only; the caption could not be drawn
    Plain,
}

/// Render a solid-color clip of `duration_seconds` with `caption` centered on it.
///
/// When the caption cannot be drawn (missing font, drawtext unavailable),
/// the clip is rendered again without it. Only a failure of the plain
/// render is returned.
pub async fn render_placeholder(
    runner: &FfmpegRunner,
    output: impl AsRef<Path>,
    duration_seconds: f64,
    caption: &str,
    style: &PlaceholderStyle,
) -> MediaResult<PlaceholderKind> {
    if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
        return Err(MediaError::invalid_input(format!(
            "placeholder duration must be positive, got {}",
            duration_seconds
        )));
    }

    let output = output.as_ref();

    let captioned = placeholder_command(output, duration_seconds, Some(caption), style);
    match runner.run(&captioned).await {
        Ok(()) => {
            info!(path = %output.display(), duration_seconds, "Rendered placeholder clip");
            return Ok(PlaceholderKind::Captioned);
        }
        Err(e) => {
            warn!(
                path = %output.display(),
                error = %e,
                "Captioned placeholder failed, rendering without text"
            );
        }
    }

    let plain = placeholder_command(output, duration_seconds, None, style);
    runner.run(&plain).await?;

    info!(path = %output.display(), duration_seconds, "Rendered plain placeholder clip");
    Ok(PlaceholderKind::Plain)
}

fn placeholder_command(
    output: &Path,
    duration_seconds: f64,
    caption: Option<&str>,
    style: &PlaceholderStyle,
) -> FfmpegCommand {
    let source = format!(
        "color=c={}:s={}:r={}:d={:.3}",
        style.color,
        frame_size(),
        OUTPUT_FPS,
        duration_seconds
    );

    let mut cmd = FfmpegCommand::new("placeholder", output).lavfi(source);
    if let Some(text) = caption.map(str::trim).filter(|t| !t.is_empty()) {
        cmd = cmd.video_filter(drawtext_filter(text, style.font_file.as_deref()));
    }

    cmd.video_codec(VIDEO_CODEC)
        .preset(ENCODE_PRESET)
        .crf(ENCODE_CRF)
        .pixel_format(PIXEL_FORMAT)
        .frame_rate(OUTPUT_FPS)
        .output_arg("-an")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captioned_command() {
        let cmd = placeholder_command(
            Path::new("/w/j/clip_0.mp4"),
            10.0,
            Some("cinematic shot of space"),
            &PlaceholderStyle::default(),
        );
        let joined = cmd.build_args().join(" ");
        assert!(joined.contains("-f lavfi -i color=c=0x1e1e2e:s=1080x1920:r=30:d=10.000"));
        assert!(joined.contains("-vf drawtext=text=cinematic shot of space:"));
        assert!(joined.contains("-pix_fmt yuv420p"));
    }

    #[test]
    fn test_plain_command_has_no_filter() {
        let cmd = placeholder_command(
            Path::new("/w/j/clip_0.mp4"),
            4.5,
            None,
            &PlaceholderStyle::default(),
        );
        let args = cmd.build_args();
        assert!(!args.contains(&"-vf".to_string()));
        assert!(args.join(" ").contains("d=4.500"));
    }

    #[test]
    fn test_blank_caption_is_plain() {
        let cmd = placeholder_command(
            Path::new("/w/j/clip_0.mp4"),
            1.0,
            Some("   "),
            &PlaceholderStyle::default(),
        );
        assert!(!cmd.build_args().contains(&"-vf".to_string()));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_both_renders_failing_is_fatal() {
        let runner = FfmpegRunner::new().with_binary("false");
        let err = render_placeholder(
            &runner,
            "/tmp/unused.mp4",
            10.0,
            "caption",
            &PlaceholderStyle::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FfmpegFailed { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_reports_captioned() {
        let runner = FfmpegRunner::new().with_binary("true");
        let kind = render_placeholder(
            &runner,
            "/tmp/unused.mp4",
            10.0,
            "caption",
            &PlaceholderStyle::default(),
        )
        .await
        .unwrap();
        assert_eq!(kind, PlaceholderKind::Captioned);
    }
}
