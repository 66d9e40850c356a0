use crate::services::storage::StorageError;
use crate::utils::validation::ValidationError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to provision container '{container}': {source}")]
    ProvisioningFatal {
        container: String,
        #[source]
        source: StorageError,
    },

    #[error("Container '{container}' was not provisioned after {attempts} attempts")]
    ProvisioningExhausted { container: String, attempts: u32 },

    #[error("Compression of {path} failed: {source}")]
    Compression {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Upload of {path} to '{key}' failed: {source}")]
    Upload {
        path: PathBuf,
        key: String,
        #[source]
        source: StorageError,
    },

    #[error("Upload task failed: {0}")]
    TaskFailed(String),
}

impl DeployError {
    /// Errors that belong to a single upload job rather than to the batch setup.
    pub fn is_job_error(&self) -> bool {
        matches!(
            self,
            DeployError::Compression { .. }
                | DeployError::Upload { .. }
                | DeployError::TaskFailed(_)
        )
    }
}
