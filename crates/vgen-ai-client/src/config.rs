//! Capability client configuration.
//!
//! Every capability is optional: a missing API key or endpoint leaves the
//! client unconfigured and the pipeline uses its fallback output instead.

use std::time::Duration;

use vgen_models::Platform;

const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_secs(key: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(key)
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(default),
    )
}

/// Script generation (Gemini `generateContent`).
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    /// Tried in order until one returns a usable script
    pub models: Vec<String>,
    pub timeout: Duration,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-flash-lite".to_string(),
                "gemini-2.5-pro".to_string(),
            ],
            timeout: Duration::from_secs(60),
        }
    }
}

impl GeminiConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_opt("GEMINI_API_KEY"),
            base_url: env_opt("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            models: env_opt("GEMINI_MODELS")
                .map(|s| {
                    s.split(',')
                        .map(str::trim)
                        .filter(|m| !m.is_empty())
                        .map(str::to_string)
                        .collect::<Vec<_>>()
                })
                .filter(|m| !m.is_empty())
                .unwrap_or(defaults.models),
            timeout: env_secs("GEMINI_TIMEOUT_SECS", 60),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some() && !self.models.is_empty()
    }
}

/// Image generation (OpenAI-compatible `/v1/images/generations`).
#[derive(Debug, Clone)]
pub struct ImageConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    /// Requested size, portrait to match the output frame
    pub size: String,
    pub timeout: Duration,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: "gpt-image-1".to_string(),
            size: "1024x1536".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl ImageConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_opt("IMAGE_API_KEY").or_else(|| env_opt("OPENAI_API_KEY")),
            base_url: env_opt("IMAGE_BASE_URL").unwrap_or(defaults.base_url),
            model: env_opt("IMAGE_MODEL").unwrap_or(defaults.model),
            size: env_opt("IMAGE_SIZE").unwrap_or(defaults.size),
            timeout: env_secs("IMAGE_TIMEOUT_SECS", 120),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Narration synthesis (OpenAI-compatible `/v1/audio/speech`).
#[derive(Debug, Clone)]
pub struct SpeechConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub voice: String,
    pub timeout: Duration,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            model: "tts-1".to_string(),
            voice: "alloy".to_string(),
            timeout: Duration::from_secs(120),
        }
    }
}

impl SpeechConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            api_key: env_opt("SPEECH_API_KEY").or_else(|| env_opt("OPENAI_API_KEY")),
            base_url: env_opt("SPEECH_BASE_URL").unwrap_or(defaults.base_url),
            model: env_opt("SPEECH_MODEL").unwrap_or(defaults.model),
            voice: env_opt("SPEECH_VOICE").unwrap_or(defaults.voice),
            timeout: env_secs("SPEECH_TIMEOUT_SECS", 120),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// Upload endpoint for one platform.
#[derive(Debug, Clone, Default)]
pub struct PlatformUploadConfig {
    /// Multipart upload URL answering `{"url": ...}`
    pub endpoint: Option<String>,
    pub token: Option<String>,
}

impl PlatformUploadConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some() && self.token.is_some()
    }
}

/// Upload endpoints for all platforms.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    pub youtube: PlatformUploadConfig,
    pub tiktok: PlatformUploadConfig,
    pub timeout: Duration,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            youtube: PlatformUploadConfig::default(),
            tiktok: PlatformUploadConfig::default(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl PublishConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            youtube: PlatformUploadConfig {
                endpoint: env_opt("YOUTUBE_UPLOAD_URL"),
                token: env_opt("YOUTUBE_UPLOAD_TOKEN"),
            },
            tiktok: PlatformUploadConfig {
                endpoint: env_opt("TIKTOK_UPLOAD_URL"),
                token: env_opt("TIKTOK_UPLOAD_TOKEN"),
            },
            timeout: env_secs("UPLOAD_TIMEOUT_SECS", 300),
        }
    }

    pub fn platform(&self, platform: Platform) -> &PlatformUploadConfig {
        match platform {
            Platform::Youtube => &self.youtube,
            Platform::Tiktok => &self.tiktok,
        }
    }
}
