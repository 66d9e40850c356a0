use crate::error::DeployError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31556926";
pub const DEFAULT_CONCURRENT_UPLOADS: usize = 10;
pub const DEFAULT_PROVISION_TIMEOUT_MS: u64 = 15_000;
pub const DEFAULT_DELETE_TIMEOUT_MS: u64 = 25_000;
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

pub const ENV_STORAGE_ACCOUNT: &str = "BLOB_STORAGE_ACCOUNT";
pub const ENV_STORAGE_ACCESS_KEY: &str = "BLOB_STORAGE_ACCESS_KEY";
pub const ENV_STORAGE_ENDPOINT: &str = "BLOB_STORAGE_ENDPOINT";
pub const ENV_STORAGE_REGION: &str = "BLOB_STORAGE_REGION";

pub const ENV_CONCURRENCY: &str = "BLOB_DEPLOY_CONCURRENCY";
pub const ENV_GZIP: &str = "BLOB_DEPLOY_GZIP";
pub const ENV_SIMULATE: &str = "BLOB_DEPLOY_SIMULATE";

/// Who may read a freshly created container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicAccessLevel {
    /// No anonymous access
    Private,
    /// Anonymous read of individual blobs
    #[default]
    Blob,
    /// Anonymous read of blobs and container listing
    Container,
}

impl FromStr for PublicAccessLevel {
    type Err = DeployError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "private" | "off" | "none" => Ok(Self::Private),
            "blob" => Ok(Self::Blob),
            "container" => Ok(Self::Container),
            other => Err(DeployError::Configuration(format!(
                "unknown public access level '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for PublicAccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Private => "private",
            Self::Blob => "blob",
            Self::Container => "container",
        };
        f.write_str(name)
    }
}

/// Options applied when the target container is created or deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContainerOptions {
    /// Public access level of a newly created container (default: blob)
    pub public_access_level: PublicAccessLevel,

    /// Timeout for a single create call in milliseconds (default: 15000)
    pub timeout_interval_in_ms: Option<u64>,

    /// Timeout for the delete call in milliseconds (default: 25000)
    pub delete_timeout_in_ms: u64,
}

impl Default for ContainerOptions {
    fn default() -> Self {
        Self {
            public_access_level: PublicAccessLevel::default(),
            timeout_interval_in_ms: Some(DEFAULT_PROVISION_TIMEOUT_MS),
            delete_timeout_in_ms: DEFAULT_DELETE_TIMEOUT_MS,
        }
    }
}

impl ContainerOptions {
    /// Create timeout; an unset or zero value falls back to the 15s minimum.
    pub fn timeout(&self) -> Duration {
        match self.timeout_interval_in_ms {
            Some(ms) if ms > 0 => Duration::from_millis(ms),
            _ => Duration::from_millis(DEFAULT_PROVISION_TIMEOUT_MS),
        }
    }

    pub fn delete_timeout(&self) -> Duration {
        Duration::from_millis(self.delete_timeout_in_ms)
    }
}

/// Metadata applied to every uploaded blob before per-file fields are derived
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MetadataDefaults {
    /// Cache-Control header (default: "public, max-age=31556926")
    pub cache_control: Option<String>,

    /// Arbitrary caller-supplied key/value pairs
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Default for MetadataDefaults {
    fn default() -> Self {
        Self {
            cache_control: Some(DEFAULT_CACHE_CONTROL.to_string()),
            extra: BTreeMap::new(),
        }
    }
}

/// Retry schedule for container creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvisionSettings {
    /// Maximum create attempts (default: 10)
    pub max_attempts: u32,

    /// Delay before the first attempt in milliseconds (default: 100)
    pub initial_delay_in_ms: u64,

    /// Delay before every later attempt in milliseconds (default: 10000)
    pub retry_delay_in_ms: u64,
}

impl Default for ProvisionSettings {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_delay_in_ms: 100,
            retry_delay_in_ms: 10_000,
        }
    }
}

/// Options for one deployment batch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeployConfig {
    /// Target container, required
    pub container_name: String,

    /// Delete the container before provisioning it (default: false)
    pub container_delete: bool,

    pub container_options: ContainerOptions,

    pub metadata: MetadataDefaults,

    /// Skip every network call and report success (default: false)
    pub copy_simulation: bool,

    /// Gzip files before upload (default: false)
    pub gzip: bool,

    /// Sliding window of in-flight uploads (default: 10)
    pub max_number_of_concurrent_uploads: usize,

    /// Gzip level 0-9 (default: 6)
    pub compression_level: u32,

    /// Directory for compressed temp files (default: system temp dir)
    pub temp_dir: Option<PathBuf>,

    pub provision: ProvisionSettings,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            container_name: String::new(),
            container_delete: false,
            container_options: ContainerOptions::default(),
            metadata: MetadataDefaults::default(),
            copy_simulation: false,
            gzip: false,
            max_number_of_concurrent_uploads: DEFAULT_CONCURRENT_UPLOADS,
            compression_level: DEFAULT_COMPRESSION_LEVEL,
            temp_dir: None,
            provision: ProvisionSettings::default(),
        }
    }
}

impl DeployConfig {
    pub fn new(container_name: impl Into<String>) -> Self {
        Self {
            container_name: container_name.into(),
            ..Self::default()
        }
    }

    /// Load options from a JSON file; missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self, DeployError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            DeployError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&raw).map_err(|e| {
            DeployError::Configuration(format!("invalid options in {}: {}", path.display(), e))
        })
    }

    /// Apply scalar overrides from environment variables
    pub fn with_env_overrides(self) -> Result<Self, DeployError> {
        self.with_overrides_from(|key| env::var(key).ok())
    }

    pub fn with_overrides_from<F>(mut self, lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_CONCURRENCY) {
            self.max_number_of_concurrent_uploads = raw.trim().parse().map_err(|_| {
                DeployError::Configuration(format!(
                    "{} must be a non-negative integer, got '{}'",
                    ENV_CONCURRENCY, raw
                ))
            })?;
        }
        if let Some(raw) = lookup(ENV_GZIP) {
            self.gzip = parse_flag(ENV_GZIP, &raw)?;
        }
        if let Some(raw) = lookup(ENV_SIMULATE) {
            self.copy_simulation = parse_flag(ENV_SIMULATE, &raw)?;
        }
        Ok(self)
    }

    /// The window size actually used by the upload pool
    pub fn concurrency_limit(&self) -> usize {
        self.max_number_of_concurrent_uploads.max(1)
    }
}

fn parse_flag(name: &str, value: &str) -> Result<bool, DeployError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(DeployError::Configuration(format!(
            "{} must be true/false, got '{}'",
            name, value
        ))),
    }
}

/// Account credentials for the storage service, read once at startup
#[derive(Clone)]
pub struct StorageCredentials {
    pub account: String,
    pub access_key: String,
    pub endpoint: Option<String>,
    pub region: String,
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("account", &self.account)
            .field("access_key", &"***")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .finish()
    }
}

impl StorageCredentials {
    /// Load credentials from environment variables
    pub fn from_env() -> Result<Self, DeployError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, DeployError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DeployError::Configuration(format!("{} must be set", key)))
        };

        Ok(Self {
            account: required(ENV_STORAGE_ACCOUNT)?,
            access_key: required(ENV_STORAGE_ACCESS_KEY)?,
            endpoint: lookup(ENV_STORAGE_ENDPOINT).filter(|v| !v.trim().is_empty()),
            region: lookup(ENV_STORAGE_REGION).unwrap_or_else(|| "us-east-1".to_string()),
        })
    }
}
