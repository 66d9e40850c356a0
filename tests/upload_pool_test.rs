mod common;

use blob_deploy::DeployError;
use blob_deploy::config::MetadataDefaults;
use blob_deploy::models::UploadJob;
use blob_deploy::services::compression::{CompressionScheme, Compressor};
use blob_deploy::services::upload_pool::BoundedUploadPool;
use common::{MockGateway, write_files};
use flate2::read::GzDecoder;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

fn jobs_for(paths: &[PathBuf], compression: Option<CompressionScheme>) -> Vec<UploadJob> {
    let defaults = MetadataDefaults::default();
    paths
        .iter()
        .map(|p| {
            let key = format!("static/{}", p.file_name().unwrap().to_string_lossy());
            UploadJob::new(p.clone(), key, &defaults, compression)
        })
        .collect()
}

fn compressor_in(dir: &Path) -> Compressor {
    Compressor::gzip(6).with_temp_dir(Some(dir.to_path_buf()))
}

#[tokio::test]
async fn test_never_exceeds_concurrency_limit() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), 25, "txt");
    let gateway = Arc::new(MockGateway::new().with_upload_delay(Duration::from_millis(20)));
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    let count = pool.run(jobs_for(&files, None), 4).await.unwrap();

    assert_eq!(count, 25);
    assert_eq!(gateway.upload_count(), 25);
    assert!(gateway.max_concurrent_uploads() <= 4);
    // the window is actually used, not drained one at a time
    assert!(gateway.max_concurrent_uploads() > 1);
}

#[tokio::test]
async fn test_zero_limit_still_makes_progress() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), 3, "txt");
    let gateway = Arc::new(MockGateway::new());
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    assert_eq!(pool.run(jobs_for(&files, None), 0).await.unwrap(), 3);
    assert_eq!(gateway.max_concurrent_uploads(), 1);
}

#[tokio::test]
async fn test_empty_job_list() {
    let dir = tempfile::tempdir().unwrap();
    let gateway = Arc::new(MockGateway::new());
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    assert_eq!(pool.run(Vec::new(), 10).await.unwrap(), 0);
    assert_eq!(gateway.upload_count(), 0);
}

#[tokio::test]
async fn test_first_failure_stops_admission() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), 20, "txt");
    let gateway = Arc::new(
        MockGateway::new()
            .with_failing_key("static/file-0.txt")
            .with_upload_delay(Duration::from_millis(10)),
    );
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    let err = pool.run(jobs_for(&files, None), 2).await.unwrap_err();

    match err {
        DeployError::Upload { key, .. } => assert_eq!(key, "static/file-0.txt"),
        other => panic!("unexpected error: {other:?}"),
    }
    // only jobs admitted before the failure was observed ran
    assert!(gateway.upload_count() < 20);
    assert!(gateway.upload_count() >= 2);
}

#[tokio::test]
async fn test_in_flight_jobs_settle_after_failure() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), 3, "txt");
    let gateway = Arc::new(
        MockGateway::new()
            .with_failing_key("static/file-0.txt")
            .with_upload_delay(Duration::from_millis(30)),
    );
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    assert!(pool.run(jobs_for(&files, None), 3).await.is_err());
    // all three were admitted together, all three must have finished
    assert_eq!(gateway.recorded().len(), 3);
}

#[tokio::test]
async fn test_gzip_uploads_compressed_artifact_and_removes_it() {
    let dir = tempfile::tempdir().unwrap();
    let sources = tempfile::tempdir().unwrap();
    let files = write_files(sources.path(), 3, "css");
    let gateway = Arc::new(MockGateway::new());
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    pool.run(jobs_for(&files, Some(CompressionScheme::Gzip)), 2)
        .await
        .unwrap();

    let uploads = gateway.recorded();
    assert_eq!(uploads.len(), 3);
    for upload in &uploads {
        assert_eq!(upload.metadata.content_encoding.as_deref(), Some("gzip"));
        assert_eq!(upload.metadata.content_type.as_deref(), Some("text/css"));
        assert!(upload.path.starts_with(dir.path()));
        assert!(!upload.path.exists(), "temp artifact must be deleted");

        let mut decoded = String::new();
        GzDecoder::new(&upload.content[..])
            .read_to_string(&mut decoded)
            .unwrap();
        assert!(decoded.starts_with("content of file"));
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_gzip_artifact_removed_when_upload_fails() {
    let dir = tempfile::tempdir().unwrap();
    let sources = tempfile::tempdir().unwrap();
    let files = write_files(sources.path(), 1, "js");
    let gateway = Arc::new(MockGateway::new().with_failing_key("static/file-0.js"));
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    let err = pool
        .run(jobs_for(&files, Some(CompressionScheme::Gzip)), 1)
        .await
        .unwrap_err();
    assert!(matches!(err, DeployError::Upload { .. }));

    let uploads = gateway.recorded();
    assert_eq!(uploads.len(), 1);
    assert!(!uploads[0].path.exists());
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_uncompressed_upload_sends_original_file() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), 1, "html");
    let gateway = Arc::new(MockGateway::new());
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()));

    pool.run(jobs_for(&files, None), 1).await.unwrap();

    let upload = &gateway.recorded()[0];
    assert_eq!(upload.path, files[0]);
    assert_eq!(upload.container, "assets");
    assert!(upload.metadata.content_encoding.is_none());
    assert_eq!(upload.content, std::fs::read(&files[0]).unwrap());
}

#[tokio::test]
async fn test_simulation_skips_gateway() {
    let dir = tempfile::tempdir().unwrap();
    let files = write_files(dir.path(), 5, "txt");
    let gateway = Arc::new(MockGateway::new());
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(dir.path()))
        .simulated(true);

    assert_eq!(
        pool.run(jobs_for(&files, Some(CompressionScheme::Gzip)), 2)
            .await
            .unwrap(),
        5
    );
    assert_eq!(gateway.total_calls(), 0);
}

#[tokio::test]
async fn test_compression_failure_fails_only_its_job_and_leaves_no_artifact() {
    let scratch = tempfile::tempdir().unwrap();
    let sources = tempfile::tempdir().unwrap();
    let files = write_files(sources.path(), 3, "txt");
    let jobs = jobs_for(&files, Some(CompressionScheme::Gzip));
    // source vanishes between validation and compression
    std::fs::remove_file(&files[1]).unwrap();

    let gateway = Arc::new(MockGateway::new());
    let pool = BoundedUploadPool::new(gateway.clone(), "assets", compressor_in(scratch.path()));

    let err = pool.run(jobs, 1).await.unwrap_err();

    assert!(err.is_job_error());
    match err {
        DeployError::Compression { path, source } => {
            assert_eq!(path, files[1]);
            assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
        }
        other => panic!("unexpected error: {other:?}"),
    }
    // the job before it was uploaded, the one after was never admitted
    let uploads = gateway.recorded();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].key, "static/file-0.txt");
    assert_eq!(std::fs::read_dir(scratch.path()).unwrap().count(), 0);
}
