//! Image generation client (OpenAI-compatible).

use std::path::Path;

use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ImageConfig;
use crate::error::{ExternalServiceError, ServiceResult};
use crate::http::{build_client, ensure_success, join_url};

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    size: &'a str,
    n: u32,
}

#[derive(Debug, Deserialize)]
struct ImageResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Debug, Deserialize)]
struct ImageData {
    b64_json: Option<String>,
    url: Option<String>,
}

/// Generates one still image per visual cue.
#[derive(Debug, Clone)]
pub struct ImageClient {
    config: ImageConfig,
    client: Client,
}

impl ImageClient {
    pub fn new(config: ImageConfig) -> ServiceResult<Self> {
        let client = build_client(config.timeout)?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    /// Generate an image for `descriptor` and write it to `output`.
    ///
    /// Accepts either inline base64 data or a URL to download.
    pub async fn generate_image(&self, descriptor: &str, output: &Path) -> ServiceResult<()> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| ExternalServiceError::unconfigured("image API key not set"))?;

        let request = ImageRequest {
            model: &self.config.model,
            prompt: descriptor,
            size: &self.config.size,
            n: 1,
        };

        let response = self
            .client
            .post(join_url(&self.config.base_url, "v1/images/generations"))
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;
        let response = ensure_success("Image API", response).await?;

        let body: ImageResponse = response.json().await.map_err(|e| {
            ExternalServiceError::invalid_response(format!("Failed to parse image response: {}", e))
        })?;
        let image = body
            .data
            .into_iter()
            .next()
            .ok_or_else(|| ExternalServiceError::invalid_response("Image response has no data"))?;

        let bytes = match (image.b64_json, image.url) {
            (Some(b64), _) => base64::engine::general_purpose::STANDARD
                .decode(b64.trim())
                .map_err(|e| {
                    ExternalServiceError::invalid_response(format!("Invalid base64 image: {}", e))
                })?,
            (None, Some(url)) => self.download(&url).await?,
            (None, None) => {
                return Err(ExternalServiceError::invalid_response(
                    "Image response has neither b64_json nor url",
                ))
            }
        };

        if bytes.is_empty() {
            return Err(ExternalServiceError::invalid_response("Image is empty"));
        }

        tokio::fs::write(output, &bytes).await?;
        debug!(path = %output.display(), bytes = bytes.len(), "Wrote generated image");
        Ok(())
    }

    async fn download(&self, url: &str) -> ServiceResult<Vec<u8>> {
        let response = self.client.get(url).send().await?;
        let response = ensure_success("Image download", response).await?;
        Ok(response.bytes().await?.to_vec())
    }
}
