use crate::config::{ContainerOptions, PublicAccessLevel};
use crate::models::{BlobAddress, BlobMetadata};
use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{
    BucketCannedAcl, BucketLocationConstraint, CreateBucketConfiguration, ObjectOwnership,
};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Service error code returned while a bucket with the same name is still being torn down.
pub const CONTAINER_BEING_DELETED_CODE: &str = "OperationAborted";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Container is currently being deleted")]
    ContainerBeingDeleted,

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Storage service error: {0}")]
    Service(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StorageError {
    /// The only provisioning failure worth retrying.
    pub fn is_being_deleted(&self) -> bool {
        matches!(self, StorageError::ContainerBeingDeleted)
    }
}

/// Container lifecycle and blob upload, independent of the backing service.
#[async_trait]
pub trait StorageGateway: Send + Sync {
    async fn delete_container(&self, name: &str, timeout: Duration) -> Result<(), StorageError>;

    /// Must succeed when the container already exists.
    async fn create_container_if_absent(
        &self,
        name: &str,
        options: &ContainerOptions,
    ) -> Result<(), StorageError>;

    async fn upload_blob(
        &self,
        address: &BlobAddress,
        local_path: &Path,
        metadata: &BlobMetadata,
    ) -> Result<(), StorageError>;
}

pub struct S3StorageGateway {
    client: Client,
    region: String,
}

impl S3StorageGateway {
    pub fn new(client: Client, region: String) -> Self {
        Self { client, region }
    }
}

/// How a new bucket is made readable for a given public access level.
///
/// New S3 buckets default to `BucketOwnerEnforced` ownership with Block Public
/// Access on, which rejects any ACL. Public buckets are therefore created with
/// ACLs enabled, then unblocked and given the canned ACL in separate calls.
/// An account-level Block Public Access setting still overrides this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPlan {
    pub ownership: Option<ObjectOwnership>,
    pub public_acl: Option<BucketCannedAcl>,
}

pub fn access_plan(level: PublicAccessLevel) -> AccessPlan {
    match level {
        PublicAccessLevel::Private => AccessPlan {
            ownership: None,
            public_acl: None,
        },
        PublicAccessLevel::Blob | PublicAccessLevel::Container => AccessPlan {
            ownership: Some(ObjectOwnership::BucketOwnerPreferred),
            public_acl: Some(BucketCannedAcl::PublicRead),
        },
    }
}

fn classify<E>(err: SdkError<E>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
{
    if err.code() == Some(CONTAINER_BEING_DELETED_CODE) {
        return StorageError::ContainerBeingDeleted;
    }
    StorageError::Service(DisplayErrorContext(err).to_string())
}

#[async_trait]
impl StorageGateway for S3StorageGateway {
    async fn delete_container(&self, name: &str, timeout: Duration) -> Result<(), StorageError> {
        let request = self.client.delete_bucket().bucket(name).send();

        match tokio::time::timeout(timeout, request).await {
            Err(_) => Err(StorageError::Timeout(timeout)),
            Ok(Err(e)) => Err(classify(e)),
            Ok(Ok(_)) => Ok(()),
        }
    }

    async fn create_container_if_absent(
        &self,
        name: &str,
        options: &ContainerOptions,
    ) -> Result<(), StorageError> {
        let plan = access_plan(options.public_access_level);
        let mut request = self
            .client
            .create_bucket()
            .bucket(name)
            .set_object_ownership(plan.ownership.clone());

        // us-east-1 rejects an explicit location constraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {}
            Err(e)
                if e
                    .as_service_error()
                    .is_some_and(|se| se.is_bucket_already_owned_by_you()) =>
            {
                // Existing buckets keep whatever access they already have.
                tracing::debug!("Bucket '{}' already exists", name);
                return Ok(());
            }
            Err(e) => return Err(classify(e)),
        }

        if let Some(acl) = plan.public_acl {
            self.client
                .delete_public_access_block()
                .bucket(name)
                .send()
                .await
                .map_err(classify)?;
            self.client
                .put_bucket_acl()
                .bucket(name)
                .acl(acl)
                .send()
                .await
                .map_err(classify)?;
            tracing::debug!("Bucket '{}' opened for public read", name);
        }
        Ok(())
    }

    async fn upload_blob(
        &self,
        address: &BlobAddress,
        local_path: &Path,
        metadata: &BlobMetadata,
    ) -> Result<(), StorageError> {
        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| StorageError::Service(format!("cannot stream {}: {}", local_path.display(), e)))?;

        let mut request = self
            .client
            .put_object()
            .bucket(&address.container)
            .key(&address.key)
            .body(body)
            .set_content_type(metadata.content_type.clone())
            .set_content_encoding(metadata.content_encoding.clone())
            .set_cache_control(metadata.cache_control.clone());

        for (key, value) in &metadata.extra {
            request = request.metadata(key, value);
        }

        request.send().await.map_err(classify)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_being_deleted_is_retryable() {
        assert!(StorageError::ContainerBeingDeleted.is_being_deleted());
        assert!(!StorageError::Timeout(Duration::from_secs(1)).is_being_deleted());
        assert!(!StorageError::Service("AccessDenied".into()).is_being_deleted());
    }

    #[test]
    fn test_private_bucket_sends_no_acl() {
        let plan = access_plan(PublicAccessLevel::Private);
        assert!(plan.ownership.is_none());
        assert!(plan.public_acl.is_none());
    }

    #[test]
    fn test_public_bucket_enables_acls_before_applying_one() {
        // the default level must not produce an ACL that BucketOwnerEnforced rejects
        for level in [PublicAccessLevel::default(), PublicAccessLevel::Container] {
            let plan = access_plan(level);
            assert_eq!(plan.ownership, Some(ObjectOwnership::BucketOwnerPreferred));
            assert_eq!(plan.public_acl, Some(BucketCannedAcl::PublicRead));
        }
    }
}
