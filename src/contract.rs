//! # contract: types and seams shared across the ingestion pipeline
//!
//! This module holds the plain data that flows between the scraper, the
//! downloader and the ingestion writer, plus the two traits the pipeline is
//! generic over:
//!
//! - [`ObjectStore`]: the storage capability (bucket/object primitives against an
//!   S3-compatible backend). Implemented by [`crate::object_store::MinioStore`].
//! - [`Clock`]: the time source used to stamp object keys with the upload month.
//!
//! Both traits are annotated for `mockall`, so tests can drive the pipeline
//! without a live backend.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// A dated sub-directory href found on the top-level listing page (e.g. `2024-05/`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryLink(pub String);

impl DirectoryLink {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A downloadable file href found inside a directory listing (e.g. `Empresas0.zip`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink(pub String);

impl FileLink {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring after the last `.`; the whole name when there is no dot.
    pub fn extension(&self) -> &str {
        self.0.rsplit('.').next().unwrap_or(&self.0)
    }
}

/// A file held in memory between download and upload.
#[derive(Debug, Clone)]
pub struct DownloadedFile {
    pub name: String,
    pub content: Bytes,
    pub extension: String,
}

impl DownloadedFile {
    pub fn new(link: &FileLink, content: Bytes) -> Self {
        Self {
            name: link.as_str().to_owned(),
            content,
            extension: link.extension().to_owned(),
        }
    }
}

/// One entry of an object listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectInfo {
    pub key: String,
    pub size: i64,
    /// True for a common prefix returned by a non-recursive listing.
    pub is_prefix: bool,
}

/// Errors raised by an [`ObjectStore`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{operation} failed for {target}: {message}")]
    Backend {
        operation: &'static str,
        target: String,
        message: String,
    },
    #[error("failed to read body of {target}: {message}")]
    Body { target: String, message: String },
    #[error("local file {path} not accessible: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Storage capability over an S3-compatible backend.
///
/// Every call takes the bucket explicitly; implementations keep no
/// "current bucket" state. An empty `prefix` lists the whole bucket.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError>;

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    /// Remove an (empty) bucket.
    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError>;

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError>;

    /// List objects under `prefix`. When `recursive` is false, keys are cut at the
    /// next `/` and returned as prefixes.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<ObjectInfo>, StoreError>;

    /// Upload `body` to `key`; the content length is taken from `body`.
    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError>;

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError>;

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError>;

    /// Server-side copy of `key` from `src_bucket` into `dst_bucket` under the same key.
    async fn copy_object(
        &self,
        src_bucket: &str,
        key: &str,
        dst_bucket: &str,
    ) -> Result<(), StoreError>;
}

/// Time source for object key stamping.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
