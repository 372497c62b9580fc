//! Gemini client for script generation.
//!
//! Asks Gemini for a short narration plus the visual and subtitle cues
//! that go with it, as a single JSON object.

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use vgen_models::ScriptData;

use crate::config::GeminiConfig;
use crate::error::{ExternalServiceError, ServiceResult};
use crate::http::{build_client, ensure_success, join_url};

/// Gemini API client.
#[derive(Debug, Clone)]
pub struct GeminiScriptClient {
    config: GeminiConfig,
    client: Client,
}

/// Gemini API request.
#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

/// Gemini API response.
#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<ResponseContent>,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiScriptClient {
    /// Create a new Gemini client.
    pub fn new(config: GeminiConfig) -> ServiceResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Generate a validated script for `prompt`, trying each configured model in turn.
    pub async fn generate_script(&self, prompt: &str) -> ServiceResult<ScriptData> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ExternalServiceError::unconfigured("GEMINI_API_KEY not set"))?;

        let request_text = build_prompt(prompt);
        let mut last_error = None;

        for model in &self.config.models {
            info!("Attempting Gemini API with model: {}", model);
            match self.call_model(api_key, model, &request_text).await {
                Ok(script) => {
                    info!(
                        model = %model,
                        visual_cues = script.visual_cues.len(),
                        "Got script from Gemini"
                    );
                    return Ok(script);
                }
                Err(e) => {
                    warn!("Failed with model {}: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ExternalServiceError::unconfigured("no Gemini models configured")))
    }

    async fn call_model(&self, api_key: &str, model: &str, prompt: &str) -> ServiceResult<ScriptData> {
        let url = join_url(
            &self.config.base_url,
            &format!("v1beta/models/{}:generateContent", model),
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;
        let response = ensure_success("Gemini", response).await?;

        let body: GeminiResponse = response.json().await.map_err(|e| {
            ExternalServiceError::invalid_response(format!("Failed to parse Gemini response: {}", e))
        })?;

        let text = body
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .find_map(|p| p.text.as_deref())
            .ok_or_else(|| ExternalServiceError::invalid_response("No content in Gemini response"))?;

        parse_script(text)
    }
}

/// Parse and validate a script from model output, tolerating markdown fences.
pub fn parse_script(text: &str) -> ServiceResult<ScriptData> {
    let script: ScriptData = serde_json::from_str(strip_code_fence(text)).map_err(|e| {
        ExternalServiceError::invalid_response(format!("Failed to parse script JSON: {}", e))
    })?;

    script
        .validate()
        .map_err(|e| ExternalServiceError::invalid_response(format!("Script rejected: {}", e)))?;

    Ok(script)
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let text = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn build_prompt(prompt: &str) -> String {
    format!(
        r#"Write the script for a short vertical video about the following topic.

TOPIC:
{prompt}

Return ONLY a single JSON object with this schema:
{{
  "narration": "The full voice-over text, 60 to 90 words",
  "visualCues": [
    {{ "index": 0, "descriptor": "Image prompt describing the shot", "durationSeconds": 5.0 }}
  ],
  "subtitleCues": [
    {{ "startSeconds": 0.0, "endSeconds": 3.5, "text": "Part of the narration" }}
  ]
}}

Rules:
- 3 to 8 visual cues, indexed from 0 in playback order, each 3 to 10 seconds long.
- Subtitle cues cover the whole narration in order, each under 12 words.
- startSeconds must be lower than endSeconds for every subtitle cue.
- Do not include any text outside the JSON object.
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::error::ErrorKind;

    fn script_json() -> serde_json::Value {
        json!({
            "narration": "Space is vast.",
            "visualCues": [
                {"index": 0, "descriptor": "stars", "durationSeconds": 4.0},
                {"index": 1, "descriptor": "planet", "durationSeconds": 4.0}
            ],
            "subtitleCues": [
                {"startSeconds": 0.0, "endSeconds": 8.0, "text": "Space is vast."}
            ]
        })
    }

    fn gemini_body(text: &str) -> serde_json::Value {
        json!({"candidates": [{"content": {"parts": [{"text": text}]}}]})
    }

    fn config(base_url: String, models: &[&str]) -> GeminiConfig {
        GeminiConfig {
            api_key: Some("test-key".into()),
            base_url,
            models: models.iter().map(|m| m.to_string()).collect(),
            timeout: Duration::from_secs(5),
        }
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fence("  {}  "), "{}");
    }

    #[test]
    fn test_parse_rejects_invalid_script() {
        let mut value = script_json();
        value["visualCues"] = json!([]);
        let err = parse_script(&value.to_string()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_generate_script() {
        let server = MockServer::start().await;
        let fenced = format!("```json\n{}\n```", script_json());

        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-test:generateContent"))
            .and(query_param("key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body(&fenced)))
            .expect(1)
            .mount(&server)
            .await;

        let client = GeminiScriptClient::new(config(server.uri(), &["gemini-test"])).unwrap();
        let script = client.generate_script("space").await.unwrap();
        assert_eq!(script.visual_cues.len(), 2);
        assert_eq!(script.narration, "Space is vast.");
    }

    #[tokio::test]
    async fn test_model_fallback() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/models/broken:generateContent"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/working:generateContent"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(gemini_body(&script_json().to_string())),
            )
            .mount(&server)
            .await;

        let client =
            GeminiScriptClient::new(config(server.uri(), &["broken", "working"])).unwrap();
        assert!(client.generate_script("space").await.is_ok());
    }

    #[tokio::test]
    async fn test_all_models_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(gemini_body("not json")))
            .mount(&server)
            .await;

        let client = GeminiScriptClient::new(config(server.uri(), &["a", "b"])).unwrap();
        let err = client.generate_script("space").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidResponse);
    }

    #[tokio::test]
    async fn test_unconfigured() {
        let client = GeminiScriptClient::new(GeminiConfig::default()).unwrap();
        assert!(!client.is_configured());
        let err = client.generate_script("space").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unconfigured);
    }
}
