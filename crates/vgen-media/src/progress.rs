//! FFmpeg progress parsing.

use serde::{Deserialize, Serialize};

/// Progress information from FFmpeg's `-progress` output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FfmpegProgress {
    /// Current frame number
    pub frame: u64,
    /// Output time in milliseconds
    pub out_time_ms: i64,
    /// Encoding speed (e.g., 1.5 = 1.5x realtime)
    pub speed: f64,
    /// Whether encoding is complete
    pub is_complete: bool,
}

impl FfmpegProgress {
    /// Fraction of `expected_seconds` already written, in [0, 1].
    pub fn fraction_of(&self, expected_seconds: f64) -> f64 {
        if expected_seconds.is_nan() || expected_seconds <= 0.0 {
            return 0.0;
        }
        (self.out_time_ms as f64 / 1000.0 / expected_seconds).clamp(0.0, 1.0)
    }
}

/// Outcome of feeding one stderr line to [`parse_progress_line`].
#[derive(Debug, PartialEq)]
pub(crate) enum ProgressLine {
    /// A `key=value` progress field; `Some` at the end of a block
    Field(Option<FfmpegProgress>),
    /// Anything else: a diagnostic line
    Diagnostic,
}

/// Parse a line of FFmpeg's `-progress pipe:2` output.
pub(crate) fn parse_progress_line(line: &str, current: &mut FfmpegProgress) -> ProgressLine {
    let line = line.trim();

    let Some((key, value)) = line.split_once('=') else {
        return ProgressLine::Diagnostic;
    };

    match key {
        "out_time_ms" | "out_time_us" => {
            // Both keys carry microseconds despite the name
            if let Ok(us) = value.parse::<i64>() {
                current.out_time_ms = us / 1000;
            }
        }
        "frame" => {
            if let Ok(frame) = value.parse() {
                current.frame = frame;
            }
        }
        "speed" => {
            if let Some(speed) = value.strip_suffix('x').and_then(|s| s.trim().parse().ok()) {
                current.speed = speed;
            }
        }
        "progress" => {
            if value == "end" {
                current.is_complete = true;
            }
            return ProgressLine::Field(Some(current.clone()));
        }
        "fps" | "bitrate" | "total_size" | "out_time" | "dup_frames" | "drop_frames" => {}
        k if k.starts_with("stream_") => {}
        _ => return ProgressLine::Diagnostic,
    }

    ProgressLine::Field(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_block() {
        let mut progress = FfmpegProgress::default();

        assert_eq!(
            parse_progress_line("out_time_us=5000000", &mut progress),
            ProgressLine::Field(None)
        );
        assert_eq!(progress.out_time_ms, 5000);

        parse_progress_line("speed=1.5x", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        parse_progress_line("speed=N/A", &mut progress);
        assert!((progress.speed - 1.5).abs() < 0.01);

        match parse_progress_line("progress=end", &mut progress) {
            ProgressLine::Field(Some(p)) => assert!(p.is_complete),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_diagnostic_lines() {
        let mut progress = FfmpegProgress::default();
        assert_eq!(
            parse_progress_line("[Parsed_subtitles_0 @ 0x1] Unable to open x.srt", &mut progress),
            ProgressLine::Diagnostic
        );
        assert_eq!(
            parse_progress_line("Error opening input: a=b", &mut progress),
            ProgressLine::Diagnostic
        );
    }

    #[test]
    fn test_fraction() {
        let progress = FfmpegProgress {
            out_time_ms: 15_000,
            ..Default::default()
        };
        assert!((progress.fraction_of(30.0) - 0.5).abs() < 1e-9);
        assert_eq!(progress.fraction_of(0.0), 0.0);
        assert_eq!(progress.fraction_of(10.0), 1.0);
    }
}
