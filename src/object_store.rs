//! # object_store: S3-compatible storage client
//!
//! [`MinioStore`] implements [`ObjectStore`] with `aws-sdk-s3`, configured for a
//! MinIO-style endpoint (static credentials, path-style addressing, plain HTTP
//! unless `minio_secure` is set).
//!
//! The free functions below compose the primitive calls into the idempotent
//! operations the ingestion writer relies on (`ensure_bucket`, `ensure_prefix`)
//! and the file-level conveniences of the storage handler (`move_object`,
//! `get_objects`, `upload_file`, `download_file`). They are generic over any
//! [`ObjectStore`], so they run unchanged against `MockObjectStore` in tests.
//!
//! Every failure is returned to the caller; nothing here swallows an error.

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, error, info};

use crate::config::StoreConfig;
use crate::contract::{ObjectInfo, ObjectStore, StoreError};

const CREDENTIALS_PROVIDER: &str = "cnpj-bucket-static";

pub struct MinioStore {
    client: Client,
}

impl MinioStore {
    /// Build a client for the configured endpoint. No request is sent here; the
    /// first storage call opens the connection.
    pub async fn connect(config: &StoreConfig) -> Self {
        let credentials = Credentials::new(
            config.access_key.clone(),
            config.secret_key.clone(),
            None,
            None,
            CREDENTIALS_PROVIDER,
        );
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint())
            .credentials_provider(credentials)
            .load()
            .await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(true)
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired)
            .build();
        info!(endpoint = %config.endpoint(), "Object store client configured");
        Self {
            client: Client::from_conf(s3_config),
        }
    }
}

fn backend_error<E>(operation: &'static str, target: impl Into<String>, err: E) -> StoreError
where
    E: std::error::Error,
{
    let target = target.into();
    let message = DisplayErrorContext(&err).to_string();
    error!(operation, object = %target, error = %message, "Object store call failed");
    StoreError::Backend {
        operation,
        target,
        message,
    }
}

#[async_trait]
impl ObjectStore for MinioStore {
    async fn bucket_exists(&self, bucket: &str) -> Result<bool, StoreError> {
        match self.client.head_bucket().bucket(bucket).send().await {
            Ok(_) => Ok(true),
            Err(err) => {
                let not_found = err
                    .as_service_error()
                    .map(|e| e.is_not_found())
                    .unwrap_or(false)
                    || err.raw_response().map(|r| r.status().as_u16()) == Some(404);
                if not_found {
                    Ok(false)
                } else {
                    Err(backend_error("head_bucket", bucket, err))
                }
            }
        }
    }

    async fn create_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| backend_error("create_bucket", bucket, e))?;
        Ok(())
    }

    async fn delete_bucket(&self, bucket: &str) -> Result<(), StoreError> {
        self.client
            .delete_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| backend_error("delete_bucket", bucket, e))?;
        info!(bucket, "Bucket removed");
        Ok(())
    }

    async fn list_buckets(&self) -> Result<Vec<String>, StoreError> {
        let resp = self
            .client
            .list_buckets()
            .send()
            .await
            .map_err(|e| backend_error("list_buckets", "*", e))?;
        Ok(resp
            .buckets()
            .iter()
            .filter_map(|b| b.name().map(str::to_owned))
            .collect())
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        recursive: bool,
    ) -> Result<Vec<ObjectInfo>, StoreError> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .set_prefix((!prefix.is_empty()).then(|| prefix.to_owned()))
            .set_delimiter((!recursive).then(|| "/".to_owned()))
            .into_paginator()
            .send();

        let mut objects = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| backend_error("list_objects", format!("{bucket}/{prefix}"), e))?;
            objects.extend(page.contents().iter().filter_map(|obj| {
                obj.key().map(|key| ObjectInfo {
                    key: key.to_owned(),
                    size: obj.size().unwrap_or(0),
                    is_prefix: false,
                })
            }));
            objects.extend(page.common_prefixes().iter().filter_map(|cp| {
                cp.prefix().map(|key| ObjectInfo {
                    key: key.to_owned(),
                    size: 0,
                    is_prefix: true,
                })
            }));
        }
        debug!(bucket, prefix, recursive, count = objects.len(), "Listed objects");
        Ok(objects)
    }

    async fn put_object(
        &self,
        bucket: &str,
        key: &str,
        body: Bytes,
        content_type: &str,
    ) -> Result<(), StoreError> {
        let length = body.len();
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_length(length as i64)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| backend_error("put_object", format!("{bucket}/{key}"), e))?;
        info!(bucket, key, bytes = length, content_type, "Object uploaded");
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Bytes, StoreError> {
        let target = format!("{bucket}/{key}");
        let resp = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend_error("get_object", target.clone(), e))?;
        let data = resp.body.collect().await.map_err(|e| {
            error!(object = %target, error = %e, "Failed to read object body");
            StoreError::Body {
                target: target.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(data.into_bytes())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| backend_error("delete_object", format!("{bucket}/{key}"), e))?;
        info!(bucket, key, "Object removed");
        Ok(())
    }

    async fn copy_object(
        &self,
        src_bucket: &str,
        key: &str,
        dst_bucket: &str,
    ) -> Result<(), StoreError> {
        self.client
            .copy_object()
            .copy_source(format!("{src_bucket}/{key}"))
            .bucket(dst_bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                backend_error("copy_object", format!("{src_bucket}/{key} -> {dst_bucket}"), e)
            })?;
        Ok(())
    }
}

/// Create `bucket` unless it already exists. Returns whether it was created.
pub async fn ensure_bucket<S>(store: &S, bucket: &str) -> Result<bool, StoreError>
where
    S: ObjectStore + ?Sized,
{
    if store.bucket_exists(bucket).await? {
        info!(bucket, "Bucket already exists");
        return Ok(false);
    }
    store.create_bucket(bucket).await?;
    info!(bucket, "Bucket created");
    Ok(true)
}

/// Create the zero-length folder marker for `prefix` (a trailing `/` is added
/// when missing) unless an object with exactly that key is already listed.
/// Returns whether the marker was created.
pub async fn ensure_prefix<S>(store: &S, bucket: &str, prefix: &str) -> Result<bool, StoreError>
where
    S: ObjectStore + ?Sized,
{
    let marker = if prefix.ends_with('/') {
        prefix.to_owned()
    } else {
        format!("{prefix}/")
    };

    let listed = store.list_objects(bucket, &marker, false).await?;
    if listed.iter().any(|obj| obj.key == marker) {
        info!(bucket, prefix = %marker, "Prefix marker already exists");
        return Ok(false);
    }

    store
        .put_object(bucket, &marker, Bytes::new(), "application/octet-stream")
        .await?;
    info!(bucket, prefix = %marker, "Prefix marker created");
    Ok(true)
}

/// Copy `key` into `dst_bucket`, then delete it from `src_bucket`.
///
/// Not atomic: when the delete fails the object exists in both buckets.
pub async fn move_object<S>(
    store: &S,
    src_bucket: &str,
    key: &str,
    dst_bucket: &str,
) -> Result<(), StoreError>
where
    S: ObjectStore + ?Sized,
{
    store.copy_object(src_bucket, key, dst_bucket).await?;
    store.delete_object(src_bucket, key).await?;
    info!(key, from = src_bucket, to = dst_bucket, "Object moved");
    Ok(())
}

/// Fetch every object under `prefix`, keyed by object key. Folder markers are skipped.
pub async fn get_objects<S>(
    store: &S,
    bucket: &str,
    prefix: &str,
) -> Result<BTreeMap<String, Bytes>, StoreError>
where
    S: ObjectStore + ?Sized,
{
    let mut out = BTreeMap::new();
    for obj in store.list_objects(bucket, prefix, true).await? {
        if obj.is_prefix || obj.key.ends_with('/') {
            continue;
        }
        let data = store.get_object(bucket, &obj.key).await?;
        out.insert(obj.key, data);
    }
    Ok(out)
}

/// Upload a local file. The key defaults to the file name. Returns the key used.
pub async fn upload_file<S>(
    store: &S,
    bucket: &str,
    path: &Path,
    key: Option<&str>,
) -> Result<String, StoreError>
where
    S: ObjectStore + ?Sized,
{
    let key = match key {
        Some(key) => key.to_owned(),
        None => path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::Io {
                path: path.display().to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name"),
            })?,
    };
    let data = tokio::fs::read(path).await.map_err(|source| StoreError::Io {
        path: path.display().to_string(),
        source,
    })?;
    store
        .put_object(bucket, &key, Bytes::from(data), "application/octet-stream")
        .await?;
    Ok(key)
}

/// Write the object stored at `key` to a local `path`.
pub async fn download_file<S>(
    store: &S,
    bucket: &str,
    key: &str,
    path: &Path,
) -> Result<(), StoreError>
where
    S: ObjectStore + ?Sized,
{
    let data = store.get_object(bucket, key).await?;
    tokio::fs::write(path, &data)
        .await
        .map_err(|source| StoreError::Io {
            path: path.display().to_string(),
            source,
        })?;
    info!(bucket, key, path = %path.display(), "Object downloaded");
    Ok(())
}
