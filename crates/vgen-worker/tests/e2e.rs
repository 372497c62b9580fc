//! Full pipeline against real FFmpeg with every capability unconfigured.
//!
//! Skipped when ffmpeg/ffprobe or the filters the pipeline needs are missing.

use std::process::Command;
use std::time::Duration;

use vgen_media::probe_duration;
use vgen_models::{GenerationRequest, JobStage};
use vgen_queue::JobService;
use vgen_worker::{LocalJobService, RetryConfig, WorkerConfig};

fn ffmpeg_ready() -> bool {
    let probe_ok = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false);
    let filters = Command::new("ffmpeg")
        .args(["-hide_banner", "-filters"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .map(|o| String::from_utf8_lossy(&o.stdout).to_string())
        .unwrap_or_default();
    probe_ok && filters.contains("subtitles") && filters.contains("anullsrc")
}

#[tokio::test]
async fn test_unconfigured_prompt_produces_video() {
    if !ffmpeg_ready() {
        eprintln!("skipping: ffmpeg with subtitles support not available");
        return;
    }

    let dir = tempfile::TempDir::new().unwrap();
    let config = WorkerConfig {
        work_dir: dir.path().to_path_buf(),
        job_timeout: Duration::from_secs(300),
        retry: RetryConfig::default().with_max_attempts(1),
        ..WorkerConfig::default()
    };

    let service = LocalJobService::from_config(&config).unwrap();
    let job_id = service
        .submit(GenerationRequest::new("space exploration"))
        .await
        .unwrap();

    let status = service
        .wait_for_terminal(&job_id, Duration::from_millis(100))
        .await
        .unwrap();
    assert_eq!(status.state, JobStage::Done, "job failed: {:?}", status.error);
    assert_eq!(status.progress, 100);

    let result = status.result.unwrap();
    assert!(result.success);
    assert!(result.upload_urls.is_empty());
    assert!(result.script_data.narration.contains("space exploration"));
    assert_eq!(result.media_files.clip_paths.len(), 3);
    for clip in &result.media_files.clip_paths {
        assert!(clip.exists(), "missing clip {}", clip.display());
    }

    let audio_seconds = probe_duration(&result.media_files.audio_path).await.unwrap();
    assert!((audio_seconds - 30.0).abs() < 0.5, "audio was {}s", audio_seconds);

    assert!(result.final_video_path.starts_with(dir.path().join(job_id.as_str())));
    let final_seconds = probe_duration(&result.final_video_path).await.unwrap();
    assert!(final_seconds > 0.0);

    assert_eq!(
        service.store().progress_history(&job_id).await,
        vec![10, 25, 50, 75, 90, 100]
    );
}
