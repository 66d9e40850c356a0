//! Sliding-window upload pool.
//!
//! At most `concurrency_limit` jobs run at once; each completion admits the
//! next queued job in input order. The first failure stops admission, but
//! jobs already in flight are allowed to settle before the pool returns.

use crate::error::DeployError;
use crate::models::{BlobAddress, UploadJob};
use crate::services::compression::Compressor;
use crate::services::storage::StorageGateway;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Read-only state shared by every job of one pool run.
struct UploadContext {
    gateway: Arc<dyn StorageGateway>,
    container: String,
    compressor: Compressor,
    simulate: bool,
}

impl UploadContext {
    async fn process(&self, job: UploadJob) -> Result<(), DeployError> {
        let address = BlobAddress::new(&self.container, &job.destination_key);
        let content_type = job.metadata.content_type.as_deref().unwrap_or("-");
        let log_line = format!("Copy {} => {} - {}", job.file_name(), address, content_type);

        if self.simulate {
            info!("🧪 {} (skip copy ok)", log_line);
            return Ok(());
        }

        let result = if job.compress {
            let artifact = self.compressor.compress(&job.source).await?;
            let uploaded = self
                .gateway
                .upload_blob(&address, artifact.path(), &job.metadata)
                .await;
            artifact.discard();
            uploaded
        } else {
            self.gateway
                .upload_blob(&address, &job.source, &job.metadata)
                .await
        };

        result.map_err(|source| {
            error!("❌ {} failed: {}", log_line, source);
            DeployError::Upload {
                path: job.source.clone(),
                key: job.destination_key.clone(),
                source,
            }
        })?;

        // Logged on completion only.
        info!("📤 {} ✅", log_line);
        Ok(())
    }
}

pub struct BoundedUploadPool {
    gateway: Arc<dyn StorageGateway>,
    container: String,
    compressor: Compressor,
    simulate: bool,
}

impl BoundedUploadPool {
    pub fn new(
        gateway: Arc<dyn StorageGateway>,
        container: impl Into<String>,
        compressor: Compressor,
    ) -> Self {
        Self {
            gateway,
            container: container.into(),
            compressor,
            simulate: false,
        }
    }

    /// In simulation mode every job succeeds without touching the gateway.
    pub fn simulated(mut self, simulate: bool) -> Self {
        self.simulate = simulate;
        self
    }

    /// Runs every job; returns the job count on full success or the first
    /// failure observed.
    pub async fn run(
        &self,
        jobs: Vec<UploadJob>,
        concurrency_limit: usize,
    ) -> Result<usize, DeployError> {
        let total = jobs.len();
        let limit = concurrency_limit.max(1);
        debug!("Processing {} files, {} at a time", total, limit);

        let context = Arc::new(UploadContext {
            gateway: Arc::clone(&self.gateway),
            container: self.container.clone(),
            compressor: self.compressor.clone(),
            simulate: self.simulate,
        });
        let mut queue = jobs.into_iter();
        let mut in_flight = JoinSet::new();
        let mut first_error: Option<DeployError> = None;
        let mut succeeded = 0usize;

        loop {
            while first_error.is_none() && in_flight.len() < limit {
                let Some(job) = queue.next() else { break };
                let context = Arc::clone(&context);
                in_flight.spawn(async move { context.process(job).await });
            }

            let Some(joined) = in_flight.join_next().await else {
                break;
            };

            let outcome = joined
                .map_err(|e| DeployError::TaskFailed(e.to_string()))
                .and_then(|result| result);

            match outcome {
                Ok(()) => succeeded += 1,
                Err(e) if first_error.is_none() => {
                    warn!("🛑 Upload failed, no further files will be started: {}", e);
                    first_error = Some(e);
                }
                Err(e) => debug!("Additional upload failure after abort: {}", e),
            }
        }

        match first_error {
            Some(e) => {
                warn!(
                    "{} of {} files uploaded before the batch failed",
                    succeeded, total
                );
                Err(e)
            }
            None => Ok(total),
        }
    }
}
