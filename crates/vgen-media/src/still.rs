//! Clips rendered from a single generated image.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoding::{ENCODE_CRF, ENCODE_PRESET, OUTPUT_FPS, PIXEL_FORMAT, VIDEO_CODEC};
use crate::error::{MediaError, MediaResult};
use crate::filters::fill_frame_filter;

/// Render `image` as a clip of `duration_seconds`, filling the portrait frame.
pub async fn render_still_clip(
    runner: &FfmpegRunner,
    image: impl AsRef<Path>,
    output: impl AsRef<Path>,
    duration_seconds: f64,
) -> MediaResult<()> {
    let image = image.as_ref();
    let output = output.as_ref();

    if !image.exists() {
        return Err(MediaError::FileNotFound(image.to_path_buf()));
    }
    if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
        return Err(MediaError::invalid_input(format!(
            "clip duration must be positive, got {}",
            duration_seconds
        )));
    }

    runner
        .run(&still_clip_command(image, output, duration_seconds))
        .await?;

    info!(path = %output.display(), duration_seconds, "Rendered still clip");
    Ok(())
}

fn still_clip_command(image: &Path, output: &Path, duration_seconds: f64) -> FfmpegCommand {
    FfmpegCommand::new("still_clip", output)
        .input_args(["-loop", "1"])
        .input(image)
        .duration(duration_seconds)
        .video_filter(fill_frame_filter())
        .video_codec(VIDEO_CODEC)
        .preset(ENCODE_PRESET)
        .crf(ENCODE_CRF)
        .pixel_format(PIXEL_FORMAT)
        .frame_rate(OUTPUT_FPS)
        .output_arg("-an")
}
