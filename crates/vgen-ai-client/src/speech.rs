//! Narration synthesis client (OpenAI-compatible).

use std::path::Path;

use reqwest::Client;
use serde::Serialize;
use tracing::debug;

use crate::config::SpeechConfig;
use crate::error::{ExternalServiceError, ServiceResult};
use crate::http::{build_client, ensure_success, join_url};

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Turns narration text into an MP3 file.
#[derive(Debug, Clone)]
pub struct SpeechClient {
    config: SpeechConfig,
    client: Client,
}

impl SpeechClient {
    pub fn new(config: SpeechConfig) -> ServiceResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Synthesize `text` and write the MP3 to `output`.
    pub async fn synthesize(&self, text: &str, output: &Path) -> ServiceResult<()> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ExternalServiceError::unconfigured("speech API key not set"))?;

        if text.trim().is_empty() {
            return Err(ExternalServiceError::invalid_response("nothing to synthesize"));
        }

        let request = SpeechRequest {
            model: &self.config.model,
            input: text,
            voice: &self.config.voice,
            response_format: "mp3",
        };

        let response = self
            .client
            .post(join_url(&self.config.base_url, "v1/audio/speech"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success("Speech API", response).await?;

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(ExternalServiceError::invalid_response("Speech API returned no audio"));
        }

        tokio::fs::write(output, &audio).await?;
        debug!(path = %output.display(), bytes = audio.len(), "Wrote narration audio");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::ErrorKind;

    fn config(base_url: String) -> SpeechConfig {
        SpeechConfig {
            api_key: Some("sk-test".into()),
            base_url,
            timeout: Duration::from_secs(5),
            ..SpeechConfig::default()
        }
    }

    #[tokio::test]
    async fn test_synthesize() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/audio/speech"))
            .and(body_partial_json(serde_json::json!({"input": "hello", "voice": "alloy"})))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let out = dir.path().join("audio.mp3");
        SpeechClient::new(config(server.uri()))
            .unwrap()
            .synthesize("hello", &out)
            .await
            .unwrap();

        assert_eq!(tokio::fs::read(&out).await.unwrap(), b"ID3audio");
    }

    #[tokio::test]
    async fn test_empty_audio_is_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::TempDir::new().unwrap();
        let err = SpeechClient::new(config(server.uri()))
            .unwrap()
            .synthesize("hello", &dir.path().join("audio.mp3"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut cfg = config(server.uri());
        cfg.timeout = Duration::from_millis(200);
        let dir = tempfile::TempDir::new().unwrap();
        let err = SpeechClient::new(cfg)
            .unwrap()
            .synthesize("hello", &dir.path().join("audio.mp3"))
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Timeout);
    }
}
