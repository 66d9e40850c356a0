use crate::config::MetadataDefaults;
use crate::services::compression::CompressionScheme;
use crate::utils::content_type;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Metadata keys that are always derived per file and win over configured defaults.
const DERIVED_KEYS: &[&str] = &["contentType", "contentEncoding"];

/// One entry of the caller's file list, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileMapping {
    #[serde(default)]
    pub src: Vec<PathBuf>,
    #[serde(default)]
    pub dest: String,
}

impl FileMapping {
    pub fn new(src: impl Into<PathBuf>, dest: impl Into<String>) -> Self {
        Self {
            src: vec![src.into()],
            dest: dest.into(),
        }
    }

    /// Parses the `SRC=DEST` form used on the command line.
    pub fn parse_pair(pair: &str) -> Option<Self> {
        let (src, dest) = pair.split_once('=')?;
        Some(Self::new(src.trim(), dest.trim()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BlobMetadata {
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
    pub cache_control: Option<String>,
    pub extra: BTreeMap<String, String>,
}

impl BlobMetadata {
    /// Merges the configured defaults with the fields derived for `source`.
    pub fn derive(
        defaults: &MetadataDefaults,
        source: &Path,
        compression: Option<CompressionScheme>,
    ) -> Self {
        let mut extra = defaults.extra.clone();
        extra.retain(|key, _| !DERIVED_KEYS.contains(&key.as_str()));

        Self {
            content_type: Some(content_type::lookup(source).to_string()),
            content_encoding: compression.map(|scheme| scheme.content_encoding().to_string()),
            cache_control: defaults.cache_control.clone(),
            extra,
        }
    }
}

/// An immutable unit of work for the upload pool.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub source: PathBuf,
    pub destination_key: String,
    pub metadata: BlobMetadata,
    pub compress: bool,
}

impl UploadJob {
    pub fn new(
        source: PathBuf,
        destination_key: String,
        defaults: &MetadataDefaults,
        compression: Option<CompressionScheme>,
    ) -> Self {
        let metadata = BlobMetadata::derive(defaults, &source, compression);
        Self {
            source,
            destination_key,
            metadata,
            compress: compression.is_some(),
        }
    }

    pub fn file_name(&self) -> String {
        self.source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.display().to_string())
    }
}

/// Location of a blob inside the storage account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobAddress {
    pub container: String,
    pub key: String,
}

impl BlobAddress {
    pub fn new(container: &str, key: &str) -> Self {
        Self {
            container: container.to_string(),
            key: key.to_string(),
        }
    }
}

impl fmt::Display for BlobAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.container, self.key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchResult {
    pub total_files: usize,
    pub succeeded: usize,
}
