//! One-shot local generation: runs a single prompt in-process and prints
//! the job result as JSON.
//!
//! Usage: `vgen-generate "space exploration" [--youtube] [--tiktok]`

use std::time::Duration;

use anyhow::{bail, Context};
use vgen_models::{GenerationRequest, JobStage, UploadFlags};
use vgen_queue::JobService;
use vgen_worker::{init_tracing, LocalJobService, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls crypto provider"))?;
    dotenvy::dotenv().ok();
    init_tracing();

    let mut flags = UploadFlags::default();
    let mut prompt_parts = Vec::new();
    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--youtube" => flags.to_youtube = true,
            "--tiktok" => flags.to_tiktok = true,
            _ => prompt_parts.push(arg),
        }
    }
    if prompt_parts.is_empty() {
        bail!("usage: vgen-generate <prompt> [--youtube] [--tiktok]");
    }

    let mut request = GenerationRequest::new(prompt_parts.join(" "));
    if flags.any() {
        request = request.with_upload_flags(flags);
    }

    let config = WorkerConfig::from_env();
    let service = LocalJobService::from_config(&config).context("building pipeline")?;

    let job_id = service.submit(request).await?;
    eprintln!("job {} submitted", job_id);

    let status = service
        .wait_for_terminal(&job_id, Duration::from_millis(250))
        .await?;

    match (status.state, status.result) {
        (JobStage::Done, Some(result)) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        _ => bail!(
            "job {} failed after {} attempts: {}",
            job_id,
            status.attempts,
            status.error.unwrap_or_default()
        ),
    }
}
