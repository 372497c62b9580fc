//! Clip concatenation with the concat demuxer.

use std::path::{Path, PathBuf};
use tracing::info;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};

/// Build a concat demuxer list for `clips`, one `file '<path>'` line each.
///
/// Paths are made absolute because the demuxer resolves relative entries
/// against the list file, not the working directory.
pub fn concat_list(clips: &[PathBuf]) -> String {
    clips
        .iter()
        .map(|clip| {
            let absolute = std::path::absolute(clip).unwrap_or_else(|_| clip.clone());
            format!("file '{}'\n", escape_list_path(&absolute))
        })
        .collect()
}

/// Quote handling for the concat list: `'` closes, escapes and reopens.
fn escape_list_path(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

/// Join `clips` in order into `output` without re-encoding.
///
/// The list file is written to `list_path` and left in place for debugging.
pub async fn concat_clips(
    runner: &FfmpegRunner,
    clips: &[PathBuf],
    list_path: impl AsRef<Path>,
    output: impl AsRef<Path>,
) -> MediaResult<()> {
    if clips.is_empty() {
        return Err(MediaError::invalid_input("no clips to concatenate"));
    }
    if let Some(missing) = clips.iter().find(|c| !c.exists()) {
        return Err(MediaError::FileNotFound(missing.clone()));
    }

    let list_path = list_path.as_ref();
    let output = output.as_ref();
    tokio::fs::write(list_path, concat_list(clips)).await?;

    let cmd = FfmpegCommand::new("concat", output)
        .input_args(["-f", "concat", "-safe", "0"])
        .input(list_path)
        .stream_copy();
    runner.run(&cmd).await?;

    info!(clips = clips.len(), path = %output.display(), "Concatenated clips");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_preserves_order() {
        let clips = vec![
            PathBuf::from("/w/j/clip_0.mp4"),
            PathBuf::from("/w/j/clip_1.mp4"),
            PathBuf::from("/w/j/clip_2.mp4"),
        ];
        assert_eq!(
            concat_list(&clips),
            "file '/w/j/clip_0.mp4'\nfile '/w/j/clip_1.mp4'\nfile '/w/j/clip_2.mp4'\n"
        );
    }

    #[test]
    fn test_list_escapes_quotes() {
        let clips = vec![PathBuf::from("/w/it's/clip_0.mp4")];
        assert_eq!(concat_list(&clips), "file '/w/it'\\''s/clip_0.mp4'\n");
    }

    #[test]
    fn test_relative_paths_made_absolute() {
        let list = concat_list(&[PathBuf::from("work/clip_0.mp4")]);
        let path = list
            .trim_end()
            .strip_prefix("file '")
            .and_then(|s| s.strip_suffix('\''))
            .unwrap();
        assert!(Path::new(path).is_absolute());
    }

    #[tokio::test]
    async fn test_empty_and_missing_inputs() {
        let runner = FfmpegRunner::new();
        let err = concat_clips(&runner, &[], "/tmp/l.txt", "/tmp/o.mp4")
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::InvalidInput(_)));

        let err = concat_clips(
            &runner,
            &[PathBuf::from("/nonexistent/clip_0.mp4")],
            "/tmp/l.txt",
            "/tmp/o.mp4",
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::FileNotFound(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runner_failure_propagates() {
        let dir = tempfile::TempDir::new().unwrap();
        let clip = dir.path().join("clip_0.mp4");
        tokio::fs::write(&clip, b"x").await.unwrap();
        let list = dir.path().join("concat.txt");

        let runner = FfmpegRunner::new().with_binary("false");
        let err = concat_clips(&runner, &[clip.clone()], &list, dir.path().join("concat.mp4"))
            .await
            .unwrap_err();
        assert!(matches!(err, MediaError::FfmpegFailed { .. }));

        let written = tokio::fs::read_to_string(&list).await.unwrap();
        assert!(written.contains("clip_0.mp4"));
    }
}
