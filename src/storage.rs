use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::{
    error::{PortalError, PortalResult},
    validation::Cohort,
};

/// Upload URLs expire after ten minutes.
const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Object storage for resource files uploaded from the CR upload screen. The real
/// client talks to an S3-compatible endpoint; tests use `MockStorageService`.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the configured bucket when missing. Only called for local MinIO setups.
    async fn ensure_bucket_exists(&self) -> PortalResult<()>;

    /// A presigned PUT URL for `key`, bound to `content_type`.
    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> PortalResult<String>;

    /// The stable read URL of an uploaded object. Unlike the presigned PUT it does not expire.
    fn public_url(&self, key: &str) -> String;
}

/// S3StorageClient
///
/// `aws-sdk-s3` client for MinIO locally and the backend's storage gateway in
/// production. Both need path-style addressing.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
    // Prefix for object read URLs, without a trailing slash.
    public_base: String,
}

impl S3StorageClient {
    pub fn new(endpoint: &str, region: &str, access_key: &str, secret_key: &str, bucket: &str) -> Self {
        let credentials = s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
            public_base: format!("{}/{}", endpoint.trim_end_matches('/'), bucket),
        }
    }

    /// Overrides where objects are read from, e.g. the backend's public object API.
    pub fn with_public_base(mut self, public_base: &str) -> Self {
        self.public_base = public_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) -> PortalResult<()> {
        let exists = self
            .client
            .head_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .is_ok();
        if exists {
            return Ok(());
        }

        self.client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("create_bucket error: {:?}", e);
                PortalError::backend(format!("Failed to create bucket {}", self.bucket_name))
            })?;
        tracing::info!(bucket = %self.bucket_name, "storage bucket created");
        Ok(())
    }

    async fn get_presigned_upload_url(&self, key: &str, content_type: &str) -> PortalResult<String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL)
            .map_err(|e| PortalError::backend(e.to_string()))?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| {
                tracing::error!("presign error: {:?}", e);
                PortalError::backend("Could not prepare the upload. Please try again.")
            })?;

        Ok(presigned_req.uri().to_string())
    }

    fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_base, key)
    }
}

/// resource_key
///
/// Object key for a new resource file: `resources/{dept}/{level}-{term}/{uuid}.{ext}`.
/// Client-supplied file names never reach the key.
pub fn resource_key(cohort: &Cohort, extension: &str) -> String {
    format!(
        "resources/{}/{}-{}/{}.{}",
        sanitize_segment(&cohort.department_id),
        cohort.level,
        cohort.term,
        Uuid::new_v4(),
        sanitize_segment(extension)
    )
}

// Keeps one path segment: no separators, no dot-only names.
fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect();
    if cleaned.is_empty() { "_".to_string() } else { cleaned }
}

/// MockStorageService
///
/// Deterministic storage stand-in for tests.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every call fails like an unreachable endpoint.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) -> PortalResult<()> {
        Ok(())
    }

    async fn get_presigned_upload_url(&self, key: &str, _content_type: &str) -> PortalResult<String> {
        if self.should_fail {
            return Err(PortalError::backend("Mock Storage Error: Simulation requested"));
        }
        Ok(format!("http://localhost:9000/mock-bucket/{key}?signature=fake"))
    }

    fn public_url(&self, key: &str) -> String {
        format!("http://localhost:9000/mock-bucket/{key}")
    }
}

/// StorageState
///
/// Shared handle to the storage service held by `AppState`.
pub type StorageState = Arc<dyn StorageService>;
