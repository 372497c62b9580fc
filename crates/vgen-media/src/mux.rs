//! Final mux of video, narration and burned-in subtitles.

use std::path::Path;
use tracing::{debug, info};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoding::{
    AUDIO_BITRATE, AUDIO_CODEC, ENCODE_CRF, ENCODE_PRESET, PIXEL_FORMAT, VIDEO_CODEC,
};
use crate::error::{MediaError, MediaResult};
use crate::filters::subtitles_filter;

/// Mux `video` with `audio`, burning in `subtitles`, into `output`.
///
/// Video is re-encoded to H.264 and audio to AAC; the output stops at the
/// end of the shorter stream. `expected_seconds` is only used for progress logs.
pub async fn mux_with_subtitles(
    runner: &FfmpegRunner,
    video: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    subtitles: impl AsRef<Path>,
    output: impl AsRef<Path>,
    expected_seconds: Option<f64>,
) -> MediaResult<()> {
    let video = video.as_ref();
    let audio = audio.as_ref();
    let subtitles = subtitles.as_ref();
    let output = output.as_ref();

    for input in [video, audio, subtitles] {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
    }

    let cmd = mux_command(video, audio, subtitles, output);
    runner
        .run_with_progress(&cmd, move |progress| {
            if let Some(total) = expected_seconds {
                debug!(
                    percent = (progress.fraction_of(total) * 100.0).round(),
                    "Mux progress"
                );
            }
        })
        .await?;

    info!(path = %output.display(), "Muxed final video");
    Ok(())
}

fn mux_command(video: &Path, audio: &Path, subtitles: &Path, output: &Path) -> FfmpegCommand {
    FfmpegCommand::new("mux", output)
        .input(video)
        .input(audio)
        .video_filter(subtitles_filter(subtitles))
        .map("0:v:0")
        .map("1:a:0")
        .video_codec(VIDEO_CODEC)
        .preset(ENCODE_PRESET)
        .crf(ENCODE_CRF)
        .pixel_format(PIXEL_FORMAT)
        .audio_codec(AUDIO_CODEC)
        .audio_bitrate(AUDIO_BITRATE)
        .shortest()
        .output_args(["-movflags", "+faststart", "-f", "mp4"])
}
