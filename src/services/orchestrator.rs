use crate::config::DeployConfig;
use crate::error::DeployError;
use crate::models::{BatchResult, FileMapping, UploadJob};
use crate::services::compression::{CompressionScheme, Compressor};
use crate::services::provisioner::{ProvisionPolicy, RetryingProvisioner};
use crate::services::storage::StorageGateway;
use crate::services::upload_pool::BoundedUploadPool;
use crate::utils::validation::{validate_container_name, validate_mappings};
use std::sync::Arc;
use tracing::info;

/// Top-level entry point: validate, (optionally) delete, provision, upload.
pub struct BatchOrchestrator {
    gateway: Arc<dyn StorageGateway>,
}

impl BatchOrchestrator {
    pub fn new(gateway: Arc<dyn StorageGateway>) -> Self {
        Self { gateway }
    }

    pub async fn execute(
        &self,
        files: &[FileMapping],
        config: &DeployConfig,
    ) -> Result<BatchResult, DeployError> {
        // Everything below this block may touch the network; nothing above does.
        let container = config.container_name.as_str();
        validate_container_name(container)?;
        let compression = config.gzip.then_some(CompressionScheme::Gzip);
        let jobs: Vec<UploadJob> = validate_mappings(files)?
            .into_iter()
            .map(|m| UploadJob::new(m.source, m.destination_key, &config.metadata, compression))
            .collect();
        let total_files = jobs.len();
        info!("📦 Processing ({}) files for container [{}]", total_files, container);

        let provisioner = RetryingProvisioner::new(
            Arc::clone(&self.gateway),
            ProvisionPolicy::from(&config.provision),
        )
        .simulated(config.copy_simulation);

        if config.container_delete {
            provisioner
                .delete_container(container, config.container_options.delete_timeout())
                .await;
        } else {
            info!("⏭️  Skipping delete of container [{}]", container);
        }

        provisioner
            .ensure_container(container, &config.container_options)
            .await?;

        let compressor =
            Compressor::gzip(config.compression_level).with_temp_dir(config.temp_dir.clone());
        let pool = BoundedUploadPool::new(Arc::clone(&self.gateway), container, compressor)
            .simulated(config.copy_simulation);

        let succeeded = pool.run(jobs, config.concurrency_limit()).await?;

        info!("✅ blob copy completed ({}) files", succeeded);
        Ok(BatchResult {
            total_files,
            succeeded,
        })
    }
}
