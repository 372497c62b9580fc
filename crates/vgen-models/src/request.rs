//! Generation requests.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::{Validate, ValidationError};

/// Maximum title length used for uploads.
pub const MAX_TITLE_CHARS: usize = 100;

/// Social platforms a finished video can be published to.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Youtube,
    Tiktok,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Youtube, Platform::Tiktok];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Tiktok => "tiktok",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which platforms the caller wants the result uploaded to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadFlags {
    #[serde(default)]
    pub to_youtube: bool,
    #[serde(default)]
    pub to_tiktok: bool,
}

impl UploadFlags {
    /// Requested destinations, in a stable order.
    pub fn destinations(&self) -> Vec<Platform> {
        Platform::ALL
            .into_iter()
            .filter(|p| match p {
                Platform::Youtube => self.to_youtube,
                Platform::Tiktok => self.to_tiktok,
            })
            .collect()
    }

    pub fn any(&self) -> bool {
        self.to_youtube || self.to_tiktok
    }
}

/// A request to turn a prompt into a video. Immutable once accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    #[validate(
        length(min = 1, max = 2000),
        custom(function = "validate_not_blank")
    )]
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_flags: Option<UploadFlags>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Comma separated tags, e.g. `"space,science"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags_csv: Option<String>,
}

fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

impl GenerationRequest {
    /// Create a request with only a prompt.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            upload_flags: None,
            title: None,
            description: None,
            tags_csv: None,
        }
    }

    /// Set upload destinations.
    pub fn with_upload_flags(mut self, flags: UploadFlags) -> Self {
        self.upload_flags = Some(flags);
        self
    }

    /// Set the upload title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the comma separated tags.
    pub fn with_tags_csv(mut self, tags: impl Into<String>) -> Self {
        self.tags_csv = Some(tags.into());
        self
    }

    /// Requested upload destinations (empty when none were asked for).
    pub fn destinations(&self) -> Vec<Platform> {
        self.upload_flags.map(|f| f.destinations()).unwrap_or_default()
    }

    /// Upload title, defaulting to the prompt.
    pub fn resolved_title(&self) -> String {
        let title = self
            .title
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| self.prompt.trim());
        title.chars().take(MAX_TITLE_CHARS).collect()
    }

    /// Tags parsed from `tags_csv`, trimmed with empties dropped.
    pub fn tags(&self) -> Vec<String> {
        self.tags_csv
            .as_deref()
            .map(|csv| {
                csv.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_prompt_rejected() {
        assert!(GenerationRequest::new("   ").validate().is_err());
        assert!(GenerationRequest::new("").validate().is_err());
        assert!(GenerationRequest::new("space exploration").validate().is_ok());
    }

    #[test]
    fn test_destinations() {
        let req = GenerationRequest::new("p");
        assert!(req.destinations().is_empty());

        let req = req.with_upload_flags(UploadFlags {
            to_youtube: true,
            to_tiktok: true,
        });
        assert_eq!(req.destinations(), vec![Platform::Youtube, Platform::Tiktok]);
    }

    #[test]
    fn test_tags_and_title_defaults() {
        let req = GenerationRequest::new("  deep sea  ").with_tags_csv(" ocean, ,fish ,");
        assert_eq!(req.tags(), vec!["ocean".to_string(), "fish".to_string()]);
        assert_eq!(req.resolved_title(), "deep sea");

        let long = "x".repeat(300);
        assert_eq!(GenerationRequest::new(long).resolved_title().len(), MAX_TITLE_CHARS);
    }

    #[test]
    fn test_camel_case_wire_format() {
        let json = r#"{"prompt":"cats","uploadFlags":{"toYoutube":true},"tagsCsv":"a,b"}"#;
        let req: GenerationRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.destinations(), vec![Platform::Youtube]);
        assert_eq!(req.tags().len(), 2);
    }
}
