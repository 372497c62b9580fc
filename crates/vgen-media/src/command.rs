//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};
use crate::progress::{parse_progress_line, FfmpegProgress, ProgressLine};

/// Number of stderr lines kept for error reports.
const DEFAULT_STDERR_TAIL: usize = 20;

/// One `-i` input with the options that precede it.
#[derive(Debug, Clone)]
struct FfmpegInput {
    args: Vec<String>,
    source: String,
}

/// Builder for FFmpeg commands.
///
/// Input options accumulate until the next [`FfmpegCommand::input`] call and
/// are attached to that input, so multi-input commands read in the same order
/// as the resulting command line.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Short name used in logs, metrics and errors
    operation: String,
    inputs: Vec<FfmpegInput>,
    pending_input_args: Vec<String>,
    output: PathBuf,
    output_args: Vec<String>,
    overwrite: bool,
    log_level: String,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command writing to `output`.
    pub fn new(operation: impl Into<String>, output: impl AsRef<Path>) -> Self {
        Self {
            operation: operation.into(),
            inputs: Vec::new(),
            pending_input_args: Vec::new(),
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
            overwrite: true,
            log_level: "error".to_string(),
        }
    }

    /// Add an option for the next input (placed before its `-i`).
    pub fn input_arg(mut self, arg: impl Into<String>) -> Self {
        self.pending_input_args.push(arg.into());
        self
    }

    /// Add multiple options for the next input.
    pub fn input_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.pending_input_args
            .extend(args.into_iter().map(Into::into));
        self
    }

    /// Add a file input.
    pub fn input(self, path: impl AsRef<Path>) -> Self {
        let source = path.as_ref().to_string_lossy().to_string();
        self.input_source(source)
    }

    /// Add a libavfilter source graph as input (`-f lavfi -i <graph>`).
    pub fn lavfi(self, graph: impl Into<String>) -> Self {
        self.input_arg("-f").input_arg("lavfi").input_source(graph)
    }

    fn input_source(mut self, source: impl Into<String>) -> Self {
        let args = std::mem::take(&mut self.pending_input_args);
        self.inputs.push(FfmpegInput {
            args,
            source: source.into(),
        });
        self
    }

    /// Add an output argument.
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Add multiple output arguments.
    pub fn output_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.output_args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Limit output duration.
    pub fn duration(self, seconds: f64) -> Self {
        self.output_arg("-t").output_arg(format!("{:.3}", seconds))
    }

    /// Set video filter.
    pub fn video_filter(self, filter: impl Into<String>) -> Self {
        self.output_arg("-vf").output_arg(filter)
    }

    /// Select a stream for the output.
    pub fn map(self, spec: impl Into<String>) -> Self {
        self.output_arg("-map").output_arg(spec)
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Copy all streams without re-encoding.
    pub fn stream_copy(self) -> Self {
        self.output_arg("-c").output_arg("copy")
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, format: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(format)
    }

    /// Set output frame rate.
    pub fn frame_rate(self, fps: u32) -> Self {
        self.output_arg("-r").output_arg(fps.to_string())
    }

    /// Set audio bitrate.
    pub fn audio_bitrate(self, bitrate: impl Into<String>) -> Self {
        self.output_arg("-b:a").output_arg(bitrate)
    }

    /// Stop at the end of the shortest stream.
    pub fn shortest(self) -> Self {
        self.output_arg("-shortest")
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn output_path(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if self.overwrite {
            args.push("-y".to_string());
        }

        args.push("-hide_banner".to_string());
        args.push("-nostats".to_string());
        args.push("-v".to_string());
        args.push(self.log_level.clone());

        // Progress output to stderr
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.extend(input.args.iter().cloned());
            args.push("-i".to_string());
            args.push(input.source.clone());
        }

        args.extend(self.output_args.iter().cloned());
        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// Runner for FFmpeg commands with timeout, cancellation and stderr capture.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// Executable name or path
    binary: String,
    /// FFprobe executable name or path
    ffprobe_binary: String,
    /// Cancellation signal receiver
    cancel_rx: Option<watch::Receiver<bool>>,
    /// Timeout in seconds
    timeout_secs: Option<u64>,
    stderr_tail: usize,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl FfmpegRunner {
    /// Create a new runner using `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            ffprobe_binary: "ffprobe".to_string(),
            cancel_rx: None,
            timeout_secs: None,
            stderr_tail: DEFAULT_STDERR_TAIL,
        }
    }

    /// Use a different executable.
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Use a different FFprobe executable for [`FfmpegRunner::probe`].
    pub fn with_ffprobe_binary(mut self, binary: impl Into<String>) -> Self {
        self.ffprobe_binary = binary.into();
        self
    }

    pub fn ffprobe_binary(&self) -> &str {
        &self.ffprobe_binary
    }

    /// Set cancellation signal.
    pub fn with_cancel(mut self, cancel_rx: watch::Receiver<bool>) -> Self {
        self.cancel_rx = Some(cancel_rx);
        self
    }

    /// Set timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn timeout_secs(&self) -> Option<u64> {
        self.timeout_secs
    }

    /// Run an FFmpeg command.
    pub async fn run(&self, cmd: &FfmpegCommand) -> MediaResult<()> {
        self.run_with_progress(cmd, |_| {}).await
    }

    /// Run an FFmpeg command with progress callback.
    pub async fn run_with_progress<F>(
        &self,
        cmd: &FfmpegCommand,
        progress_callback: F,
    ) -> MediaResult<()>
    where
        F: Fn(FfmpegProgress) + Send + 'static,
    {
        let binary = which::which(&self.binary).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        let operation = cmd.operation().to_string();
        debug!(operation = %operation, "Running FFmpeg: {} {}", self.binary, args.join(" "));

        let started = Instant::now();
        let mut child = Command::new(binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let tail_len = self.stderr_tail.max(1);
        let log_operation = operation.clone();
        let reader_handle = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut current = FfmpegProgress::default();
            let mut tail: VecDeque<String> = VecDeque::with_capacity(tail_len);

            while let Ok(Some(line)) = lines.next_line().await {
                match parse_progress_line(&line, &mut current) {
                    ProgressLine::Field(Some(progress)) => progress_callback(progress),
                    ProgressLine::Field(None) => {}
                    ProgressLine::Diagnostic => {
                        debug!(operation = %log_operation, "ffmpeg: {}", line);
                        if tail.len() == tail_len {
                            tail.pop_front();
                        }
                        tail.push_back(line);
                    }
                }
            }

            tail
        });

        let waited = self.wait_for_completion(&mut child).await;
        let tail = reader_handle.await.unwrap_or_default();

        let elapsed = started.elapsed().as_secs_f64();
        metrics::histogram!("vgen_ffmpeg_duration_seconds", "operation" => operation.clone())
            .record(elapsed);

        let status = match waited {
            Ok(status) => status,
            Err(e) => {
                metrics::counter!("vgen_ffmpeg_failures_total", "operation" => operation.clone())
                    .increment(1);
                return Err(e);
            }
        };

        if status.success() {
            debug!(operation = %operation, elapsed_secs = elapsed, "FFmpeg finished");
            return Ok(());
        }

        metrics::counter!("vgen_ffmpeg_failures_total", "operation" => operation.clone())
            .increment(1);
        let stderr = if tail.is_empty() {
            None
        } else {
            Some(tail.into_iter().collect::<Vec<_>>().join("\n"))
        };
        Err(MediaError::ffmpeg_failed(
            operation,
            format!("exited with {}", status),
            stderr,
            status.code(),
        ))
    }

    /// Wait for child process with cancellation and timeout.
    async fn wait_for_completion(&self, child: &mut Child) -> MediaResult<ExitStatus> {
        enum Outcome {
            Exited(std::io::Result<ExitStatus>),
            TimedOut(u64),
            Cancelled,
        }

        let timeout_secs = self.timeout_secs;
        let timeout = async move {
            match timeout_secs {
                Some(secs) => {
                    tokio::time::sleep(Duration::from_secs(secs)).await;
                    secs
                }
                None => std::future::pending().await,
            }
        };

        let mut cancel_rx = self.cancel_rx.clone();
        let cancelled = async move {
            match cancel_rx.as_mut() {
                Some(rx) => loop {
                    if *rx.borrow_and_update() {
                        return;
                    }
                    if rx.changed().await.is_err() {
                        // Sender gone; cancellation can no longer happen
                        std::future::pending::<()>().await;
                    }
                },
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            secs = timeout => Outcome::TimedOut(secs),
            _ = cancelled => Outcome::Cancelled,
        };

        match outcome {
            Outcome::Exited(status) => Ok(status?),
            Outcome::TimedOut(secs) => {
                warn!("FFmpeg timed out after {} seconds, killing process", secs);
                let _ = child.kill().await;
                Err(MediaError::Timeout(secs))
            }
            Outcome::Cancelled => {
                info!("FFmpeg cancelled, killing process");
                let _ = child.kill().await;
                Err(MediaError::Cancelled)
            }
        }
    }
}

/// Check if FFmpeg is available.
pub fn check_ffmpeg() -> MediaResult<PathBuf> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)
}

/// Check if FFprobe is available.
pub fn check_ffprobe() -> MediaResult<PathBuf> {
    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_input_order() {
        let cmd = FfmpegCommand::new("mux", "out.mp4")
            .input_arg("-stream_loop")
            .input_arg("2")
            .input("video.mp4")
            .input("audio.mp3")
            .map("0:v:0")
            .map("1:a:0")
            .shortest();

        let args = cmd.build_args();
        let joined = args.join(" ");
        assert!(joined.contains("-stream_loop 2 -i video.mp4 -i audio.mp3 -map 0:v:0 -map 1:a:0"));
        assert_eq!(args.first().map(String::as_str), Some("-y"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
    }

    #[test]
    fn test_lavfi_input() {
        let cmd = FfmpegCommand::new("silence", "a.mp3")
            .lavfi("anullsrc=r=44100:cl=stereo")
            .duration(30.0);
        let joined = cmd.build_args().join(" ");
        assert!(joined.contains("-f lavfi -i anullsrc=r=44100:cl=stereo -t 30.000 a.mp3"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runner_success_and_failure() {
        let cmd = FfmpegCommand::new("probe", "/dev/null").input("in.mp4");

        FfmpegRunner::new().with_binary("true").run(&cmd).await.unwrap();

        let err = FfmpegRunner::new()
            .with_binary("false")
            .run(&cmd)
            .await
            .unwrap_err();
        match err {
            MediaError::FfmpegFailed {
                operation,
                exit_code,
                ..
            } => {
                assert_eq!(operation, "probe");
                assert_eq!(exit_code, Some(1));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let cmd = FfmpegCommand::new("x", "out.mp4");
        let err = FfmpegRunner::new()
            .with_binary("vgen-definitely-not-installed")
            .run(&cmd)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FfmpegNotFound));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancelled_before_exit() {
        let (tx, rx) = watch::channel(true);
        let cmd = FfmpegCommand::new("x", "/dev/null");
        // `yes` never exits on its own
        let err = FfmpegRunner::new()
            .with_binary("yes")
            .with_cancel(rx)
            .run(&cmd)
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::Cancelled));
        drop(tx);
    }
}
