//! Publish stage.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{info, warn};
use vgen_ai_client::{HttpUploader, PlatformUploader, PublishConfig, UploadMetadata};
use vgen_models::{GenerationRequest, Platform, ScriptData, UploadUrls};

use super::{JobContext, PublishStage};
use crate::error::WorkerResult;
use crate::metrics;

/// Upload metadata for a request: title defaults to the prompt, the
/// description to the narration.
pub fn publish_metadata(request: &GenerationRequest, script: &ScriptData) -> UploadMetadata {
    let description = request
        .description
        .as_deref()
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(script.narration.as_str())
        .to_string();

    UploadMetadata {
        title: request.resolved_title(),
        description,
        tags: request.tags(),
    }
}

/// Uploads to every requested platform that has an uploader.
///
/// Platforms are independent: a failed or unconfigured platform is logged
/// and left out of the result.
#[derive(Default)]
pub struct Publisher {
    uploaders: BTreeMap<Platform, Arc<dyn PlatformUploader>>,
}

impl Publisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// HTTP uploaders for every platform with an endpoint and token.
    pub fn from_config(config: &PublishConfig) -> WorkerResult<Self> {
        let mut publisher = Self::new();
        for platform in Platform::ALL {
            if let Some(uploader) =
                HttpUploader::from_config(platform, config.platform(platform), config.timeout)?
            {
                publisher = publisher.with_uploader(Arc::new(uploader));
            }
        }
        Ok(publisher)
    }

    pub fn with_uploader(mut self, uploader: Arc<dyn PlatformUploader>) -> Self {
        self.uploaders.insert(uploader.platform(), uploader);
        self
    }

    pub fn configured_platforms(&self) -> Vec<Platform> {
        self.uploaders.keys().copied().collect()
    }
}

#[async_trait]
impl PublishStage for Publisher {
    async fn publish(
        &self,
        ctx: &JobContext,
        video: &Path,
        metadata: &UploadMetadata,
        destinations: &[Platform],
    ) -> UploadUrls {
        let uploads = destinations.iter().map(|platform| async move {
            let Some(uploader) = self.uploaders.get(platform) else {
                warn!(job_id = %ctx.job_id, platform = %platform, "No uploader configured, skipping");
                return None;
            };

            match uploader.upload(video, metadata).await {
                Ok(url) => {
                    info!(job_id = %ctx.job_id, platform = %platform, url = %url, "Uploaded video");
                    metrics::record_upload(platform.as_str(), true);
                    Some((*platform, url))
                }
                Err(e) => {
                    warn!(job_id = %ctx.job_id, platform = %platform, error = %e, "Upload failed");
                    metrics::record_upload(platform.as_str(), false);
                    None
                }
            }
        });

        join_all(uploads).await.into_iter().flatten().collect()
    }
}
