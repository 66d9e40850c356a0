use anyhow::Context;
use blob_deploy::config::PublicAccessLevel;
use blob_deploy::infrastructure::storage;
use blob_deploy::{BatchOrchestrator, DeployConfig, FileMapping, StorageCredentials};
use clap::Parser;
use dotenvy::dotenv;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Copy local files to a blob storage container", long_about = None)]
struct Args {
    /// Target container (overrides the options file)
    #[arg(short, long)]
    container: Option<String>,

    /// JSON options file
    #[arg(long)]
    config: Option<PathBuf>,

    /// JSON file list: [{"src": ["path"], "dest": "key"}, ...]
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// File mapping as SRC=DEST (repeatable)
    #[arg(short, long = "file", value_name = "SRC=DEST")]
    files: Vec<String>,

    /// Delete the container before provisioning it
    #[arg(long)]
    delete: bool,

    /// Gzip files before upload
    #[arg(long)]
    gzip: bool,

    /// Log what would be copied without any network calls
    #[arg(long)]
    simulate: bool,

    /// Maximum number of concurrent uploads
    #[arg(long)]
    concurrency: Option<usize>,

    /// Cache-Control applied to every blob
    #[arg(long)]
    cache_control: Option<String>,

    /// Extra metadata as KEY=VALUE (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,

    /// Public access level for a new container (private, blob, container)
    #[arg(long)]
    public_access: Option<PublicAccessLevel>,

    /// Timeout for each create-container call in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,
}

impl Args {
    fn build_config(&self) -> anyhow::Result<DeployConfig> {
        let mut config = match &self.config {
            Some(path) => DeployConfig::from_file(path)?,
            None => DeployConfig::default(),
        }
        .with_env_overrides()?;

        if let Some(container) = &self.container {
            config.container_name = container.clone();
        }
        config.container_delete |= self.delete;
        config.gzip |= self.gzip;
        config.copy_simulation |= self.simulate;
        if let Some(limit) = self.concurrency {
            config.max_number_of_concurrent_uploads = limit;
        }
        if let Some(cache_control) = &self.cache_control {
            config.metadata.cache_control = Some(cache_control.clone());
        }
        for pair in &self.meta {
            let (key, value) = pair
                .split_once('=')
                .with_context(|| format!("metadata '{}' is not KEY=VALUE", pair))?;
            config
                .metadata
                .extra
                .insert(key.trim().to_string(), value.trim().to_string());
        }
        if let Some(level) = self.public_access {
            config.container_options.public_access_level = level;
        }
        if let Some(ms) = self.timeout_ms {
            config.container_options.timeout_interval_in_ms = Some(ms);
        }

        Ok(config)
    }

    fn file_mappings(&self) -> anyhow::Result<Vec<FileMapping>> {
        let mut mappings = match &self.manifest {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read manifest {}", path.display()))?;
                serde_json::from_str::<Vec<FileMapping>>(&raw)
                    .with_context(|| format!("invalid manifest {}", path.display()))?
            }
            None => Vec::new(),
        };

        for pair in &self.files {
            let mapping = FileMapping::parse_pair(pair)
                .with_context(|| format!("file mapping '{}' is not SRC=DEST", pair))?;
            mappings.push(mapping);
        }

        Ok(mappings)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "blob_deploy=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = args.build_config()?;
    let files = args.file_mappings()?;
    let credentials = StorageCredentials::from_env()?;

    info!(
        "🚀 blob-deploy: container={}, files={}, gzip={}, simulate={}, concurrency={}",
        config.container_name,
        files.len(),
        config.gzip,
        config.copy_simulation,
        config.concurrency_limit()
    );

    let gateway = storage::setup_storage(&credentials).await;
    let orchestrator = BatchOrchestrator::new(gateway);

    match orchestrator.execute(&files, &config).await {
        Ok(result) => {
            info!("👋 Copy completed ({}) files", result.succeeded);
            Ok(())
        }
        Err(e) => {
            error!("❌ Error processing container [{}]", config.container_name);
            Err(anyhow::Error::new(e)
                .context(format!("deploy to [{}] failed", config.container_name)))
        }
    }
}
