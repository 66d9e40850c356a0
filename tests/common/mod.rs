#![allow(dead_code)]

use async_trait::async_trait;
use blob_deploy::config::{ContainerOptions, DeployConfig, ProvisionSettings};
use blob_deploy::models::{BlobAddress, BlobMetadata};
use blob_deploy::services::storage::{StorageError, StorageGateway};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// How the mock answers `create_container_if_absent`.
#[derive(Debug, Clone)]
pub enum CreateBehavior {
    Succeed,
    BeingDeletedTimes(usize),
    AlwaysBeingDeleted,
    Fail(String),
    Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedUpload {
    pub key: String,
    pub container: String,
    pub path: PathBuf,
    pub metadata: BlobMetadata,
    pub content: Vec<u8>,
}

pub struct MockGateway {
    create_behavior: CreateBehavior,
    fail_delete: bool,
    failing_keys: HashSet<String>,
    upload_delay: Duration,
    pub delete_calls: AtomicUsize,
    pub create_calls: AtomicUsize,
    pub upload_calls: AtomicUsize,
    in_flight: AtomicUsize,
    pub high_water: AtomicUsize,
    pub uploads: Mutex<Vec<RecordedUpload>>,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            create_behavior: CreateBehavior::Succeed,
            fail_delete: false,
            failing_keys: HashSet::new(),
            upload_delay: Duration::from_millis(5),
            delete_calls: AtomicUsize::new(0),
            create_calls: AtomicUsize::new(0),
            upload_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            high_water: AtomicUsize::new(0),
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub fn with_create(mut self, behavior: CreateBehavior) -> Self {
        self.create_behavior = behavior;
        self
    }

    pub fn with_failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }

    pub fn with_failing_key(mut self, key: &str) -> Self {
        self.failing_keys.insert(key.to_string());
        self
    }

    pub fn with_upload_delay(mut self, delay: Duration) -> Self {
        self.upload_delay = delay;
        self
    }

    pub fn deletes(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    pub fn creates(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn total_calls(&self) -> usize {
        self.deletes() + self.creates() + self.upload_count()
    }

    pub fn max_concurrent_uploads(&self) -> usize {
        self.high_water.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Vec<RecordedUpload> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl StorageGateway for MockGateway {
    async fn delete_container(&self, _name: &str, _timeout: Duration) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete {
            return Err(StorageError::Service("ContainerNotFound".to_string()));
        }
        Ok(())
    }

    async fn create_container_if_absent(
        &self,
        _name: &str,
        _options: &ContainerOptions,
    ) -> Result<(), StorageError> {
        let call = self.create_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match &self.create_behavior {
            CreateBehavior::Succeed => Ok(()),
            CreateBehavior::BeingDeletedTimes(k) if call <= *k => {
                Err(StorageError::ContainerBeingDeleted)
            }
            CreateBehavior::BeingDeletedTimes(_) => Ok(()),
            CreateBehavior::AlwaysBeingDeleted => Err(StorageError::ContainerBeingDeleted),
            CreateBehavior::Fail(message) => Err(StorageError::Service(message.clone())),
            CreateBehavior::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }
    }

    async fn upload_blob(
        &self,
        address: &BlobAddress,
        local_path: &Path,
        metadata: &BlobMetadata,
    ) -> Result<(), StorageError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.high_water.fetch_max(now, Ordering::SeqCst);

        let content = tokio::fs::read(local_path).await;
        tokio::time::sleep(self.upload_delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let content = content?;
        self.uploads.lock().unwrap().push(RecordedUpload {
            key: address.key.clone(),
            container: address.container.clone(),
            path: local_path.to_path_buf(),
            metadata: metadata.clone(),
            content,
        });

        if self.failing_keys.contains(&address.key) {
            return Err(StorageError::Service(format!("rejected {}", address.key)));
        }
        Ok(())
    }
}

/// Config with millisecond backoff so retry tests stay fast.
pub fn fast_config(container: &str) -> DeployConfig {
    let mut config = DeployConfig::new(container);
    config.provision = ProvisionSettings {
        max_attempts: 10,
        initial_delay_in_ms: 1,
        retry_delay_in_ms: 2,
    };
    config
}

/// Writes `count` small files into `dir` and returns their paths.
pub fn write_files(dir: &Path, count: usize, extension: &str) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let path = dir.join(format!("file-{}.{}", i, extension));
            std::fs::write(&path, format!("content of file {}\n", i).repeat(50)).unwrap();
            path
        })
        .collect()
}
