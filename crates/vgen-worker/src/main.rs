//! Generation worker binary.

use std::sync::Arc;

use tracing::{error, info};

use vgen_queue::{JobQueue, RedisStatusStore};
use vgen_worker::{init_tracing, metrics, JobExecutor, JobOrchestrator, Pipeline, WorkerConfig};

#[tokio::main]
async fn main() {
    if let Err(e) = rustls::crypto::ring::default_provider().install_default() {
        eprintln!("Failed to install rustls crypto provider: {:?}", e);
        std::process::exit(1);
    }

    dotenvy::dotenv().ok();
    init_tracing();

    info!("Starting vgen-worker");

    if let Some(addr) = std::env::var("WORKER_METRICS_ADDR")
        .ok()
        .and_then(|s| s.parse().ok())
    {
        match metrics::install_exporter(addr) {
            Ok(()) => info!("Serving metrics on {}", addr),
            Err(e) => error!("Failed to start metrics exporter: {}", e),
        }
    }

    let config = WorkerConfig::from_env();
    info!(
        work_dir = %config.work_dir.display(),
        max_concurrent_jobs = config.max_concurrent_jobs,
        max_attempts = config.retry.max_attempts,
        script_configured = config.script.is_configured(),
        image_configured = config.image.is_configured(),
        speech_configured = config.speech.is_configured(),
        "Worker config loaded"
    );

    let queue = match JobQueue::from_env() {
        Ok(q) => Arc::new(q),
        Err(e) => {
            error!("Failed to create job queue: {}", e);
            std::process::exit(1);
        }
    };
    let store = Arc::new(RedisStatusStore::new(queue.client().clone()));

    let pipeline = match Pipeline::from_config(&config) {
        Ok(p) => p,
        Err(e) => {
            error!("Failed to build pipeline: {}", e);
            std::process::exit(1);
        }
    };
    let orchestrator = Arc::new(JobOrchestrator::new(pipeline, store, config.work_dir.clone()));

    let executor = Arc::new(JobExecutor::new(config, queue, orchestrator));

    let signal_executor = Arc::clone(&executor);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Received shutdown signal");
        signal_executor.shutdown();
    });

    if let Err(e) = executor.run().await {
        error!("Executor error: {}", e);
        std::process::exit(1);
    }

    info!("Worker shutdown complete");
}
