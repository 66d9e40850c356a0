use crate::config::StorageCredentials;
use crate::services::storage::S3StorageGateway;
use aws_sdk_s3::config::{Credentials, Region};
use std::sync::Arc;
use tracing::info;

pub async fn setup_storage(credentials: &StorageCredentials) -> Arc<S3StorageGateway> {
    match &credentials.endpoint {
        Some(endpoint) => info!(
            "☁️  Object storage: {} (Account: {})",
            endpoint, credentials.account
        ),
        None => info!(
            "☁️  Object storage: default endpoint for {} (Account: {})",
            credentials.region, credentials.account
        ),
    }

    let mut loader = aws_config::from_env()
        .region(Region::new(credentials.region.clone()))
        .credentials_provider(Credentials::new(
            credentials.account.clone(),
            credentials.access_key.clone(),
            None,
            None,
            "static",
        ));
    if let Some(endpoint) = &credentials.endpoint {
        loader = loader.endpoint_url(endpoint);
    }
    let aws_config = loader.load().await;

    // Custom endpoints (MinIO and friends) usually lack virtual-host routing.
    let s3_config = aws_sdk_s3::config::Builder::from(&aws_config)
        .force_path_style(credentials.endpoint.is_some())
        .build();

    let s3_client = aws_sdk_s3::Client::from_conf(s3_config);
    Arc::new(S3StorageGateway::new(s3_client, credentials.region.clone()))
}
