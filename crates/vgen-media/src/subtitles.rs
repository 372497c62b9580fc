//! SRT subtitle rendering.

use std::path::Path;

use vgen_models::{format_srt_timestamp, SubtitleCue};

use crate::error::MediaResult;

/// Render cues as an SRT document.
///
/// Blocks are numbered from 1 in the order given; cue timing is written
/// as-is, overlapping or not. Blank lines inside cue text would end a block
/// early, so they are dropped, and cues left without text are skipped.
pub fn render_srt(cues: &[SubtitleCue]) -> String {
    let mut out = String::new();
    let blocks = cues
        .iter()
        .map(|cue| (cue, cue_text(&cue.text)))
        .filter(|(_, text)| !text.is_empty());
    for (i, (cue, text)) in blocks.enumerate() {
        out.push_str(&(i + 1).to_string());
        out.push('\n');
        out.push_str(&format_srt_timestamp(cue.start_seconds));
        out.push_str(" --> ");
        out.push_str(&format_srt_timestamp(cue.end_seconds));
        out.push('\n');
        out.push_str(&text);
        out.push_str("\n\n");
    }
    out
}

fn cue_text(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write cues to `path` as SRT, replacing any existing file.
pub async fn write_srt(path: impl AsRef<Path>, cues: &[SubtitleCue]) -> MediaResult<()> {
    tokio::fs::write(path.as_ref(), render_srt(cues)).await?;
    Ok(())
}

/// Stretch or compress a cue timeline so its last cue ends at `target_seconds`.
///
/// Returns the cues unchanged when either span is not positive.
pub fn rescale_cues(cues: &[SubtitleCue], target_seconds: f64) -> Vec<SubtitleCue> {
    let span = cues.iter().map(|c| c.end_seconds).fold(0.0, f64::max);
    if !(span > 0.0 && target_seconds.is_finite() && target_seconds > 0.0) {
        return cues.to_vec();
    }

    let factor = target_seconds / span;
    cues.iter()
        .map(|c| SubtitleCue {
            start_seconds: c.start_seconds * factor,
            end_seconds: c.end_seconds * factor,
            text: c.text.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cues() -> Vec<SubtitleCue> {
        vec![
            SubtitleCue::new(0.0, 10.0, "first"),
            SubtitleCue::new(10.0, 20.0, "second"),
            SubtitleCue::new(20.0, 30.0, "third"),
        ]
    }

    #[test]
    fn test_render_blocks() {
        let srt = render_srt(&cues());
        assert!(srt.starts_with("1\n00:00:00,000 --> 00:00:10,000\nfirst\n\n2\n"));
        assert!(srt.ends_with("3\n00:00:20,000 --> 00:00:30,000\nthird\n\n"));
        assert_eq!(srt.matches(" --> ").count(), 3);
    }

    #[test]
    fn test_blank_lines_do_not_split_blocks() {
        let srt = render_srt(&[
            SubtitleCue::new(0.0, 4.0, "  Stars are born\n\n  in clouds of gas  "),
            SubtitleCue::new(4.0, 8.0, "\n\n"),
            SubtitleCue::new(8.0, 12.0, "and die"),
        ]);
        assert_eq!(
            srt,
            "1\n00:00:00,000 --> 00:00:04,000\nStars are born\nin clouds of gas\n\n\
             2\n00:00:08,000 --> 00:00:12,000\nand die\n\n"
        );
    }

    #[test]
    fn test_render_empty() {
        assert_eq!(render_srt(&[]), "");
    }

    #[test]
    fn test_rescale_to_narration() {
        let scaled = rescale_cues(&cues(), 15.0);
        assert!((scaled[0].end_seconds - 5.0).abs() < 1e-9);
        assert!((scaled[2].start_seconds - 10.0).abs() < 1e-9);
        assert!((scaled[2].end_seconds - 15.0).abs() < 1e-9);
        assert_eq!(scaled[1].text, "second");
    }

    #[test]
    fn test_rescale_degenerate_inputs() {
        assert_eq!(rescale_cues(&cues(), 0.0), cues());
        assert_eq!(rescale_cues(&cues(), f64::NAN), cues());
        assert!(rescale_cues(&[], 10.0).is_empty());
    }

    #[tokio::test]
    async fn test_write_srt_overwrites() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("subtitles.srt");
        tokio::fs::write(&path, "stale").await.unwrap();

        write_srt(&path, &cues()).await.unwrap();

        let written = tokio::fs::read_to_string(&path).await.unwrap();
        assert!(written.starts_with("1\n"));
        assert!(!written.contains("stale"));
    }
}
