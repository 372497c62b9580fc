//! Script data produced by the script stage.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// One visual beat of the video, rendered into one clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct VisualCue {
    pub index: u32,
    /// Prompt handed to the image capability
    pub descriptor: String,
    pub duration_seconds: f64,
}

/// A timed line of subtitle text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleCue {
    pub start_seconds: f64,
    pub end_seconds: f64,
    pub text: String,
}

impl SubtitleCue {
    pub fn new(start_seconds: f64, end_seconds: f64, text: impl Into<String>) -> Self {
        Self {
            start_seconds,
            end_seconds,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end_seconds - self.start_seconds
    }
}

/// Narration plus the cues derived from it.
///
/// Visual cue order is playback order. Subtitle cues from external
/// providers may overlap or leave gaps; only the structural checks in
/// [`ScriptData::validate`] are enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScriptData {
    #[serde(alias = "script")]
    pub narration: String,
    pub visual_cues: Vec<VisualCue>,
    pub subtitle_cues: Vec<SubtitleCue>,
}

/// Structural violations of a script.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScriptError {
    #[error("narration is empty")]
    EmptyNarration,

    #[error("script has no visual cues")]
    NoVisualCues,

    #[error("script has no subtitle cues")]
    NoSubtitleCues,

    #[error("visual cue index {0} is used more than once")]
    DuplicateCueIndex(u32),

    #[error("visual cue {index} has non-positive duration {duration}")]
    InvalidCueDuration { index: u32, duration: f64 },

    #[error("subtitle cue {position} has invalid timing {start}..{end}")]
    InvalidSubtitleTiming { position: usize, start: f64, end: f64 },

    #[error("subtitle cue {0} has empty text")]
    EmptySubtitleText(usize),
}

impl ScriptData {
    /// Check the structural invariants every stage downstream relies on.
    pub fn validate(&self) -> Result<(), ScriptError> {
        if self.narration.trim().is_empty() {
            return Err(ScriptError::EmptyNarration);
        }
        if self.visual_cues.is_empty() {
            return Err(ScriptError::NoVisualCues);
        }
        if self.subtitle_cues.is_empty() {
            return Err(ScriptError::NoSubtitleCues);
        }

        let mut seen = HashSet::new();
        for cue in &self.visual_cues {
            if !seen.insert(cue.index) {
                return Err(ScriptError::DuplicateCueIndex(cue.index));
            }
            if !(cue.duration_seconds.is_finite() && cue.duration_seconds > 0.0) {
                return Err(ScriptError::InvalidCueDuration {
                    index: cue.index,
                    duration: cue.duration_seconds,
                });
            }
        }

        for (position, cue) in self.subtitle_cues.iter().enumerate() {
            let valid = cue.start_seconds.is_finite()
                && cue.end_seconds.is_finite()
                && cue.start_seconds >= 0.0
                && cue.end_seconds > cue.start_seconds;
            if !valid {
                return Err(ScriptError::InvalidSubtitleTiming {
                    position,
                    start: cue.start_seconds,
                    end: cue.end_seconds,
                });
            }
            if cue.text.trim().is_empty() {
                return Err(ScriptError::EmptySubtitleText(position));
            }
        }

        Ok(())
    }

    /// Sum of all visual cue durations.
    pub fn total_visual_duration(&self) -> f64 {
        self.visual_cues.iter().map(|c| c.duration_seconds).sum()
    }

    /// End of the last subtitle cue.
    pub fn subtitle_span(&self) -> f64 {
        self.subtitle_cues
            .iter()
            .map(|c| c.end_seconds)
            .fold(0.0, f64::max)
    }
}
