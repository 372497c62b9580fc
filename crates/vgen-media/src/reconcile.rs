//! Matching the concatenated video to the narration length.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// How to bring a video to the audio duration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconcilePlan {
    /// Cut the video at `target_seconds`
    Trim { target_seconds: f64 },
    /// Play the video `loop_count` times in total, then cut at `target_seconds`
    Loop { loop_count: u32, target_seconds: f64 },
}

impl ReconcilePlan {
    /// Total number of times the source plays.
    pub fn loop_count(&self) -> u32 {
        match self {
            ReconcilePlan::Trim { .. } => 1,
            ReconcilePlan::Loop { loop_count, .. } => *loop_count,
        }
    }

    pub fn target_seconds(&self) -> f64 {
        match self {
            ReconcilePlan::Trim { target_seconds } | ReconcilePlan::Loop { target_seconds, .. } => {
                *target_seconds
            }
        }
    }
}

/// Decide between trimming and looping.
///
/// A video at least as long as the audio is trimmed (equal lengths included).
/// A shorter one is looped `ceil(audio / video)` times.
pub fn plan_reconciliation(video_seconds: f64, audio_seconds: f64) -> MediaResult<ReconcilePlan> {
    let valid = |d: f64| d.is_finite() && d > 0.0;
    if !valid(video_seconds) || !valid(audio_seconds) {
        return Err(MediaError::invalid_input(format!(
            "durations must be positive, got video={} audio={}",
            video_seconds, audio_seconds
        )));
    }

    if video_seconds >= audio_seconds {
        return Ok(ReconcilePlan::Trim {
            target_seconds: audio_seconds,
        });
    }

    // A strictly shorter video always needs at least one extra pass
    let loop_count = ((audio_seconds / video_seconds).ceil() as u32).max(2);
    Ok(ReconcilePlan::Loop {
        loop_count,
        target_seconds: audio_seconds,
    })
}

/// FFmpeg command applying `plan` to `input`.
pub fn reconcile_command(plan: &ReconcilePlan, input: &Path, output: &Path) -> FfmpegCommand {
    let mut cmd = FfmpegCommand::new("reconcile", output);
    if let ReconcilePlan::Loop { loop_count, .. } = plan {
        cmd = cmd
            .input_arg("-stream_loop")
            .input_arg((loop_count - 1).to_string());
    }
    cmd.input(input)
        .duration(plan.target_seconds())
        .stream_copy()
}

/// Bring `video` to the duration of `audio`, writing to `output`.
///
/// Returns the path of the video to use next: `output` on success, or
/// `video` unchanged when either duration cannot be probed (including a
/// probe that outlives the runner timeout) or the adjustment fails. Only
/// cancellation is returned as an error.
pub async fn reconcile_duration(
    runner: &FfmpegRunner,
    video: impl AsRef<Path>,
    audio: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<PathBuf> {
    let video = video.as_ref();
    let audio = audio.as_ref();
    let output = output.as_ref();

    let durations = async {
        let video_seconds = runner.probe_duration(video).await?;
        let audio_seconds = runner.probe_duration(audio).await?;
        Ok::<_, MediaError>((video_seconds, audio_seconds))
    };
    let (video_seconds, audio_seconds) = match durations.await {
        Ok(d) => d,
        Err(e) => {
            warn!(error = %e, "Could not probe durations, skipping reconciliation");
            return Ok(video.to_path_buf());
        }
    };

    let plan = match plan_reconciliation(video_seconds, audio_seconds) {
        Ok(plan) => plan,
        Err(e) => {
            warn!(error = %e, "Skipping reconciliation");
            return Ok(video.to_path_buf());
        }
    };

    match runner.run(&reconcile_command(&plan, video, output)).await {
        Ok(()) => {
            info!(
                video_seconds,
                audio_seconds,
                loop_count = plan.loop_count(),
                "Reconciled video duration"
            );
            Ok(output.to_path_buf())
        }
        Err(MediaError::Cancelled) => Err(MediaError::Cancelled),
        Err(e) => {
            warn!(error = %e, "Reconciliation failed, using unadjusted video");
            Ok(video.to_path_buf())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longer_video_is_trimmed() {
        assert_eq!(
            plan_reconciliation(45.0, 30.0).unwrap(),
            ReconcilePlan::Trim { target_seconds: 30.0 }
        );
    }

    #[test]
    fn test_equal_durations_trim_once() {
        let plan = plan_reconciliation(30.0, 30.0).unwrap();
        assert_eq!(plan, ReconcilePlan::Trim { target_seconds: 30.0 });
        assert_eq!(plan.loop_count(), 1);
    }

    #[test]
    fn test_shorter_video_loops() {
        let plan = plan_reconciliation(10.0, 30.0).unwrap();
        assert_eq!(plan.loop_count(), 3);

        let plan = plan_reconciliation(10.0, 30.5).unwrap();
        assert_eq!(plan.loop_count(), 4);

        let plan = plan_reconciliation(29.9, 30.0).unwrap();
        assert_eq!(plan.loop_count(), 2);
        assert_eq!(plan.target_seconds(), 30.0);
    }

    #[test]
    fn test_loop_count_property() {
        for v in [0.5, 1.0, 3.3, 7.0, 12.25] {
            for a in [1.0, 2.0, 9.99, 30.0, 61.7] {
                let plan = plan_reconciliation(v, a).unwrap();
                if v >= a {
                    assert_eq!(plan.loop_count(), 1);
                } else {
                    let n = plan.loop_count();
                    assert!(n >= 2);
                    assert_eq!(n, (a / v).ceil() as u32);
                    assert!(n as f64 * v >= a);
                }
            }
        }
    }

    #[test]
    fn test_invalid_durations() {
        assert!(plan_reconciliation(0.0, 30.0).is_err());
        assert!(plan_reconciliation(10.0, -1.0).is_err());
        assert!(plan_reconciliation(f64::NAN, 1.0).is_err());
    }

    #[test]
    fn test_loop_command() {
        let plan = ReconcilePlan::Loop {
            loop_count: 3,
            target_seconds: 30.0,
        };
        let joined = reconcile_command(&plan, Path::new("concat.mp4"), Path::new("reconciled.mp4"))
            .build_args()
            .join(" ");
        assert!(joined.contains("-stream_loop 2 -i concat.mp4 -t 30.000 -c copy reconciled.mp4"));
    }

    #[test]
    fn test_trim_command_has_no_loop() {
        let plan = ReconcilePlan::Trim { target_seconds: 12.0 };
        let args = reconcile_command(&plan, Path::new("in.mp4"), Path::new("out.mp4")).build_args();
        assert!(!args.contains(&"-stream_loop".to_string()));
        assert!(args.join(" ").contains("-i in.mp4 -t 12.000 -c copy"));
    }

    #[tokio::test]
    async fn test_probe_failure_returns_original() {
        let runner = FfmpegRunner::new();
        let original = PathBuf::from("/nonexistent/concat.mp4");
        let result = reconcile_duration(&runner, &original, "/nonexistent/audio.mp3", "/tmp/r.mp4")
            .await
            .unwrap();
        assert_eq!(result, original);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hanging_probe_skips_reconciliation() {
        let dir = tempfile::TempDir::new().unwrap();
        let stub = crate::test_support::script(dir.path(), "ffprobe", "sleep 30");
        let video = dir.path().join("concat.mp4");
        let audio = dir.path().join("audio.mp3");
        std::fs::write(&video, b"x").unwrap();
        std::fs::write(&audio, b"x").unwrap();

        let runner = FfmpegRunner::new()
            .with_ffprobe_binary(stub.to_string_lossy())
            .with_timeout(1);
        let reconciled = dir.path().join("reconciled.mp4");
        let result = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            reconcile_duration(&runner, &video, &audio, &reconciled),
        )
        .await
        .expect("reconciliation must not wait on a hung probe")
        .unwrap();
        assert_eq!(result, video);
    }
}
