//! Silent narration track.

use std::path::Path;
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::encoding::{SILENT_AUDIO_CODEC, SILENT_AUDIO_SAMPLE_RATE};
use crate::error::{MediaError, MediaResult};

/// Render a silent stereo track of `duration_seconds` to `output`.
pub async fn render_silent_audio(
    runner: &FfmpegRunner,
    output: impl AsRef<Path>,
    duration_seconds: f64,
) -> MediaResult<()> {
    if !(duration_seconds.is_finite() && duration_seconds > 0.0) {
        return Err(MediaError::invalid_input(format!(
            "silent audio duration must be positive, got {}",
            duration_seconds
        )));
    }

    let output = output.as_ref();
    let cmd = silent_audio_command(output, duration_seconds);
    runner.run(&cmd).await?;

    info!(path = %output.display(), duration_seconds, "Rendered silent audio");
    Ok(())
}

fn silent_audio_command(output: &Path, duration_seconds: f64) -> FfmpegCommand {
    FfmpegCommand::new("silent_audio", output)
        .lavfi(format!(
            "anullsrc=r={}:cl=stereo",
            SILENT_AUDIO_SAMPLE_RATE
        ))
        .duration(duration_seconds)
        .audio_codec(SILENT_AUDIO_CODEC)
        .audio_bitrate("128k")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_shape() {
        let args = silent_audio_command(Path::new("/w/j/audio.mp3"), 30.0).build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-f lavfi -i anullsrc=r=44100:cl=stereo -t 30.000 -c:a libmp3lame"));
        assert_eq!(args.last().map(String::as_str), Some("/w/j/audio.mp3"));
    }

    #[tokio::test]
    async fn test_rejects_zero_duration() {
        let err = render_silent_audio(&FfmpegRunner::new(), "/tmp/a.mp3", 0.0)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));
    }
}
