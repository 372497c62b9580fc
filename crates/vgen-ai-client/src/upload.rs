//! Social platform uploads.

use std::path::Path;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use vgen_models::Platform;

use crate::config::PlatformUploadConfig;
use crate::error::{ExternalServiceError, ServiceResult};
use crate::http::{build_client, ensure_success};

/// Title, description and tags sent with an upload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadMetadata {
    pub title: String,
    pub description: String,
    pub tags: Vec<String>,
}

/// Publishes a finished video to one platform.
#[async_trait]
pub trait PlatformUploader: Send + Sync {
    fn platform(&self) -> Platform;

    /// Upload `video` and return its public URL.
    async fn upload(&self, video: &Path, metadata: &UploadMetadata) -> ServiceResult<String>;
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    url: Option<String>,
}

/// Uploader posting the video as multipart form data to a platform gateway.
#[derive(Debug, Clone)]
pub struct HttpUploader {
    platform: Platform,
    endpoint: String,
    token: String,
    client: Client,
}

impl HttpUploader {
    /// Build an uploader, or `None` if the platform has no endpoint configured.
    pub fn from_config(
        platform: Platform,
        config: &PlatformUploadConfig,
        timeout: std::time::Duration,
    ) -> ServiceResult<Option<Self>> {
        let (Some(endpoint), Some(token)) = (config.endpoint.clone(), config.token.clone()) else {
            return Ok(None);
        };
        Ok(Some(Self {
            platform,
            endpoint,
            token,
            client: build_client(timeout)?,
        }))
    }
}

#[async_trait]
impl PlatformUploader for HttpUploader {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn upload(&self, video: &Path, metadata: &UploadMetadata) -> ServiceResult<String> {
        let bytes = tokio::fs::read(video).await?;
        let file_name = video
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "video.mp4".to_string());

        let file = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("video/mp4")
            .map_err(|e| ExternalServiceError::request_failed(e.to_string()))?;

        let form = Form::new()
            .part("video", file)
            .text("title", metadata.title.clone())
            .text("description", metadata.description.clone())
            .text("tags", metadata.tags.join(","));

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(self.platform.as_str(), response).await?;

        let body: UploadResponse = response.json().await.map_err(|e| {
            ExternalServiceError::invalid_response(format!("Failed to parse upload response: {}", e))
        })?;
        let url = body
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ExternalServiceError::invalid_response("Upload response has no url"))?;

        info!(platform = %self.platform, url = %url, "Uploaded video");
        Ok(url)
    }
}
