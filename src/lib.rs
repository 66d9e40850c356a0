pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod services;
pub mod utils;

pub use crate::config::{DeployConfig, StorageCredentials};
pub use crate::error::DeployError;
pub use crate::models::{BatchResult, FileMapping};
pub use crate::services::orchestrator::BatchOrchestrator;
pub use crate::services::storage::{StorageError, StorageGateway};
