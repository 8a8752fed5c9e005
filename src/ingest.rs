//! Ingestion writer: classifies a downloaded dump file and persists it under a
//! month-stamped key.

use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::contract::{Clock, DownloadedFile, ObjectStore, StoreError, SystemClock};
use crate::object_store::{ensure_bucket, ensure_prefix};

/// Name prefixes with a fixed category; anything else falls back to its lower-cased stem.
const KNOWN_CATEGORIES: [(&str, &str); 3] = [
    ("Empresas", "empresas"),
    ("Estabelecimentos", "estabelecimentos"),
    ("Socios", "socios"),
];

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("{step} failed: {source}")]
    Store {
        step: &'static str,
        #[source]
        source: StoreError,
    },
}

impl IngestError {
    fn at(step: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| IngestError::Store { step, source }
    }
}

/// Text before the first `.` of a file name.
pub fn stem(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

/// Category (destination prefix) for a file name. Total: never fails.
pub fn classify(file_name: &str) -> String {
    KNOWN_CATEGORIES
        .iter()
        .find(|(prefix, _)| file_name.starts_with(prefix))
        .map(|(_, category)| (*category).to_owned())
        .unwrap_or_else(|| stem(file_name).to_lowercase())
}

/// `{category}/{stem}_{YYYY-MM}.{extension}` for the month of `at`.
pub fn object_key(file_name: &str, extension: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}/{}_{}.{}",
        classify(file_name),
        stem(file_name),
        at.format("%Y-%m"),
        extension
    )
}

pub fn content_type(extension: &str) -> String {
    format!("application/{extension}")
}

/// Persists downloaded files into a single bucket.
pub struct IngestionWriter<S, C = SystemClock> {
    store: S,
    clock: C,
    bucket: String,
}

impl<S: ObjectStore, C: Clock> IngestionWriter<S, C> {
    pub fn with_clock(store: S, clock: C, bucket: impl Into<String>) -> Self {
        Self {
            store,
            clock,
            bucket: bucket.into(),
        }
    }

    /// Ensure bucket and category prefix exist, then upload `file`.
    /// Returns the object key written. Nothing is rolled back on failure.
    pub async fn store(&self, file: &DownloadedFile) -> Result<String, IngestError> {
        let bucket = self.bucket.as_str();
        let result = self.store_in(bucket, file).await;
        match &result {
            Ok(key) => info!(file = %file.name, bucket, key = %key, "File stored"),
            Err(e) => error!(file = %file.name, bucket, error = %e, "Failed to store file"),
        }
        result
    }

    async fn store_in(&self, bucket: &str, file: &DownloadedFile) -> Result<String, IngestError> {
        ensure_bucket(&self.store, bucket)
            .await
            .map_err(IngestError::at("ensure_bucket"))?;

        let category = classify(&file.name);
        ensure_prefix(&self.store, bucket, &format!("{category}/"))
            .await
            .map_err(IngestError::at("ensure_prefix"))?;

        let key = object_key(&file.name, &file.extension, self.clock.now());
        self.store
            .put_object(
                bucket,
                &key,
                file.content.clone(),
                &content_type(&file.extension),
            )
            .await
            .map_err(IngestError::at("put_object"))?;
        Ok(key)
    }
}
