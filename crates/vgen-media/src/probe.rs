//! FFprobe media information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::warn;

use crate::command::FfmpegRunner;
use crate::error::{MediaError, MediaResult};

/// Media file information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Container duration in seconds
    pub duration: f64,
    pub has_video: bool,
    pub has_audio: bool,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    duration: Option<String>,
}

/// Probe timeout when the runner has none.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 60;

/// Probe a media file with `ffprobe` from `PATH`.
pub async fn probe_media(path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
    FfmpegRunner::new().probe(path).await
}

/// Probe the duration of a media file in seconds with `ffprobe` from `PATH`.
pub async fn probe_duration(path: impl AsRef<Path>) -> MediaResult<f64> {
    FfmpegRunner::new().probe_duration(path).await
}

impl FfmpegRunner {
    /// Probe a media file with this runner's FFprobe binary.
    ///
    /// Bounded by the runner's timeout, or [`DEFAULT_PROBE_TIMEOUT_SECS`];
    /// the process is killed when the limit expires.
    pub async fn probe(&self, path: impl AsRef<Path>) -> MediaResult<MediaInfo> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(MediaError::FileNotFound(path.to_path_buf()));
        }

        let ffprobe =
            which::which(self.ffprobe_binary()).map_err(|_| MediaError::FfprobeNotFound)?;
        let timeout_secs = self.timeout_secs().unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS);

        let output = Command::new(ffprobe)
            .args([
                "-v",
                "error",
                "-print_format",
                "json",
                "-show_format",
                "-show_streams",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output();

        let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), output).await {
            Ok(output) => output?,
            Err(_) => {
                warn!(path = %path.display(), timeout_secs, "FFprobe timed out");
                return Err(MediaError::Timeout(timeout_secs));
            }
        };

        if !output.status.success() {
            return Err(MediaError::FfprobeFailed {
                message: format!("FFprobe failed for {}", path.display()),
                stderr: Some(String::from_utf8_lossy(&output.stderr).trim().to_string()),
            });
        }

        parse_probe_output(&output.stdout)
    }

    /// Probe the duration of a media file in seconds.
    ///
    /// Fails unless the duration is present, finite and positive.
    pub async fn probe_duration(&self, path: impl AsRef<Path>) -> MediaResult<f64> {
        let info = self.probe(path.as_ref()).await?;
        if info.duration.is_finite() && info.duration > 0.0 {
            Ok(info.duration)
        } else {
            Err(MediaError::InvalidMedia(format!(
                "{} has no usable duration",
                path.as_ref().display()
            )))
        }
    }
}

fn parse_probe_output(stdout: &[u8]) -> MediaResult<MediaInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video = find_stream(&probe.streams, "video");

    // Format duration first, then the longest stream duration
    let duration = probe
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds)
        .or_else(|| {
            probe
                .streams
                .iter()
                .filter_map(|s| s.duration.as_deref().and_then(parse_seconds))
                .reduce(f64::max)
        })
        .unwrap_or(0.0);

    Ok(MediaInfo {
        duration,
        has_video: video.is_some(),
        has_audio: find_stream(&probe.streams, "audio").is_some(),
        width: video.and_then(|s| s.width),
        height: video.and_then(|s| s.height),
    })
}

fn find_stream<'a>(streams: &'a [FfprobeStream], kind: &str) -> Option<&'a FfprobeStream> {
    streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some(kind))
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    #[cfg(unix)]
    use crate::test_support::script;

    #[test]
    fn test_parse_format_duration() {
        let json = br#"{
            "streams": [
                {"codec_type": "video", "width": 1080, "height": 1920, "duration": "29.9"},
                {"codec_type": "audio", "duration": "30.0"}
            ],
            "format": {"duration": "30.016000"}
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 30.016).abs() < 1e-9);
        assert!(info.has_video && info.has_audio);
        assert_eq!(info.width, Some(1080));
        assert_eq!(info.height, Some(1920));
    }

    #[test]
    fn test_falls_back_to_stream_duration() {
        let json = br#"{"streams": [{"codec_type": "audio", "duration": "12.5"}], "format": {}}"#;
        let info = parse_probe_output(json).unwrap();
        assert!((info.duration - 12.5).abs() < 1e-9);
        assert!(!info.has_video);
    }

    #[test]
    fn test_missing_duration_is_zero() {
        let info = parse_probe_output(br#"{"format": {"duration": "N/A"}}"#).unwrap();
        assert_eq!(info.duration, 0.0);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = probe_duration("/nonexistent/vgen/clip.mp4").await.unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_ffprobe_times_out() {
        let dir = tempfile::TempDir::new().unwrap();
        let stub = script(dir.path(), "ffprobe", "sleep 30");
        let media = dir.path().join("audio.mp3");
        std::fs::write(&media, b"x").unwrap();

        let runner = FfmpegRunner::new()
            .with_ffprobe_binary(stub.to_string_lossy())
            .with_timeout(1);
        let err = tokio::time::timeout(Duration::from_secs(5), runner.probe_duration(&media))
            .await
            .expect("probe must honour the runner timeout")
            .unwrap_err();
        assert!(matches!(err, MediaError::Timeout(1)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_configured_ffprobe_binary() {
        let dir = tempfile::TempDir::new().unwrap();
        let stub = script(
            dir.path(),
            "ffprobe",
            r#"echo '{"streams": [{"codec_type": "audio"}], "format": {"duration": "12.5"}}'"#,
        );
        let media = dir.path().join("audio.mp3");
        std::fs::write(&media, b"x").unwrap();

        let runner = FfmpegRunner::new().with_ffprobe_binary(stub.to_string_lossy());
        let seconds = runner.probe_duration(&media).await.unwrap();
        assert!((seconds - 12.5).abs() < 1e-9);
    }
}
