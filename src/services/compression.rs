use crate::error::DeployError;
use crate::utils::advisory::advisory_result;
use flate2::Compression;
use flate2::write::GzEncoder;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::TempPath;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionScheme {
    Gzip,
}

impl CompressionScheme {
    /// Value sent as the blob's Content-Encoding.
    pub fn content_encoding(&self) -> &'static str {
        match self {
            CompressionScheme::Gzip => "gzip",
        }
    }
}

/// A compressed copy of a source file on local disk.
///
/// The file is removed by [`TempArtifact::discard`] or, failing that, on drop.
#[derive(Debug)]
pub struct TempArtifact {
    path: TempPath,
}

impl TempArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Removes the artifact. Failures are logged, never returned.
    pub fn discard(self) {
        let shown = self.path.display().to_string();
        let operation = format!("removing temp artifact {}", shown);
        if advisory_result(&operation, self.path.close()).is_some() {
            tracing::debug!("🧹 Removed temp artifact {}", shown);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compressor {
    level: Compression,
    temp_dir: Option<PathBuf>,
}

impl Compressor {
    pub fn gzip(level: u32) -> Self {
        Self {
            level: Compression::new(level.min(9)),
            temp_dir: None,
        }
    }

    /// Place artifacts in `dir` instead of the system temp directory.
    pub fn with_temp_dir(mut self, dir: Option<PathBuf>) -> Self {
        self.temp_dir = dir;
        self
    }

    /// Streams `source` through the encoder into a uniquely named temp file.
    /// Resolves only once the artifact is fully written and closed.
    pub async fn compress(&self, source: &Path) -> Result<TempArtifact, DeployError> {
        let task_source = source.to_path_buf();
        let level = self.level;
        let temp_dir = self.temp_dir.clone();

        let outcome = tokio::task::spawn_blocking(move || {
            gzip_to_temp(&task_source, level, temp_dir.as_deref())
        })
        .await
        .map_err(|e| DeployError::TaskFailed(format!("compression task: {}", e)))?;

        match outcome {
            Ok(path) => Ok(TempArtifact { path }),
            Err(e) => {
                tracing::error!("❌ Gzipping {} failed: {}", source.display(), e);
                Err(DeployError::Compression {
                    path: source.to_path_buf(),
                    source: e,
                })
            }
        }
    }
}

fn gzip_to_temp(source: &Path, level: Compression, temp_dir: Option<&Path>) -> io::Result<TempPath> {
    let mut input = BufReader::new(File::open(source)?);

    // Keep the source extension.
    let suffix = source
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut builder = tempfile::Builder::new();
    builder.prefix("tmp-").suffix(&suffix);
    let temp = match temp_dir {
        Some(dir) => builder.tempfile_in(dir)?,
        None => builder.tempfile()?,
    };

    // From here on an early return drops `path`, which removes the partial file.
    let (file, path) = temp.into_parts();
    let mut encoder = GzEncoder::new(BufWriter::new(file), level);
    io::copy(&mut input, &mut encoder)?;

    let mut writer = encoder.finish()?;
    writer.flush()?;
    let file = writer.into_inner().map_err(|e| e.into_error())?;
    file.sync_all()?;
    drop(file);

    Ok(path)
}
