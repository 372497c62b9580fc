//! Application state.

use std::sync::Arc;

use vgen_queue::{JobQueue, JobService};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub jobs: Arc<dyn JobService>,
    /// Probed by `/ready`; absent when jobs run in-process
    pub queue: Option<Arc<JobQueue>>,
}

impl AppState {
    pub fn new(config: ApiConfig, jobs: Arc<dyn JobService>) -> Self {
        Self {
            config,
            jobs,
            queue: None,
        }
    }

    pub fn with_queue(mut self, queue: Arc<JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }
}
