//! Filter graph construction and escaping.
//!
//! FFmpeg parses a `-vf` argument twice: once as a filter graph (where
//! `[ ] , ;` separate filters and `\ '` quote) and once per filter as an
//! option list (where `:` separates options and `\ '` quote). Values
//! embedded in a filter are escaped for both levels, innermost first.

use std::path::Path;

use crate::encoding::{OUTPUT_HEIGHT, OUTPUT_WIDTH};

/// Maximum number of characters burned into a placeholder clip.
pub const MAX_OVERLAY_CHARS: usize = 50;

/// Escape a value for the filter option level.
pub fn escape_option_value(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('\'', "\\'")
        .replace(':', "\\:")
}

/// Escape a string for the filter graph level.
pub fn escape_filtergraph(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '\'' | '[' | ']' | ',' | ';') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Escape a filesystem path for use as a filter option inside `-vf`.
pub fn escape_filter_path(path: &Path) -> String {
    escape_filtergraph(&escape_option_value(&path.to_string_lossy()))
}

/// `subtitles` filter burning in the given SRT file.
pub fn subtitles_filter(subtitle_path: &Path) -> String {
    format!("subtitles={}", escape_filter_path(subtitle_path))
}

/// Truncate overlay text to [`MAX_OVERLAY_CHARS`] characters.
pub fn truncate_overlay_text(text: &str) -> String {
    text.trim().chars().take(MAX_OVERLAY_CHARS).collect()
}

/// Escape text for the `drawtext` filter.
///
/// drawtext expands `%{...}` sequences and treats `\` as an escape before
/// the option and graph levels apply, so text gets three passes.
pub fn escape_drawtext_text(text: &str) -> String {
    let expanded = text.replace('\\', "\\\\").replace('%', "\\%");
    escape_filtergraph(&escape_option_value(&expanded))
}

/// `drawtext` filter centering `text` on the frame.
///
/// The text is truncated before escaping so escapes are never cut in half.
pub fn drawtext_filter(text: &str, font_file: Option<&Path>) -> String {
    let escaped = escape_drawtext_text(&truncate_overlay_text(text));
    let font = font_file
        .map(|f| format!("fontfile={}:", escape_filter_path(f)))
        .unwrap_or_default();
    format!(
        "drawtext={}text={}:fontcolor=white:fontsize=48:x=(w-text_w)/2:y=(h-text_h)/2:box=1:boxcolor=black@0.4:boxborderw=20",
        font, escaped
    )
}

/// Scale-and-crop a still image to fill the portrait frame.
pub fn fill_frame_filter() -> String {
    format!(
        "scale={w}:{h}:force_original_aspect_ratio=increase,crop={w}:{h},setsar=1",
        w = OUTPUT_WIDTH,
        h = OUTPUT_HEIGHT
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_path_escaping() {
        let path = Path::new("/tmp/job's:dir/sub.srt");
        // option level: ' -> \'  : -> \:   then graph level escapes each backslash and quote
        assert_eq!(escape_filter_path(path), "/tmp/job\\\\\\'s\\\\:dir/sub.srt");
        assert_eq!(escape_filter_path(Path::new("/work/abc/subtitles.srt")), "/work/abc/subtitles.srt");
    }

    #[test]
    fn test_subtitles_filter_plain_path() {
        assert_eq!(
            subtitles_filter(Path::new("/work/j1/subtitles.srt")),
            "subtitles=/work/j1/subtitles.srt"
        );
    }

    #[test]
    fn test_graph_separators_escaped() {
        assert_eq!(escape_filtergraph("a,b;c[d]"), "a\\,b\\;c\\[d\\]");
    }

    #[test]
    fn test_drawtext_escaping() {
        assert_eq!(escape_drawtext_text("plain text"), "plain text");
        assert_eq!(escape_drawtext_text("50%"), "50\\\\\\\\%");
        assert_eq!(escape_drawtext_text("a:b"), "a\\\\:b");
        assert_eq!(escape_drawtext_text("a,b"), "a\\,b");
    }

    #[test]
    fn test_truncate_before_escape() {
        let text = format!("{}:tail", "x".repeat(49));
        let truncated = truncate_overlay_text(&text);
        assert_eq!(truncated.chars().count(), MAX_OVERLAY_CHARS);
        assert!(truncated.ends_with(':'));

        let filter = drawtext_filter(&text, None);
        assert!(!filter.contains("tail"));
        assert!(filter.starts_with("drawtext=text="));
    }

    #[test]
    fn test_drawtext_with_font() {
        let filter = drawtext_filter("hi", Some(Path::new("/fonts/a.ttf")));
        assert!(filter.starts_with("drawtext=fontfile=/fonts/a.ttf:text=hi:"));
    }
}
