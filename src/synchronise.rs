//! Pipeline driver: discover → download → classify → persist.
//!
//! One run walks the dated directories of the top-level listing in page
//! order, up to `max_directories`, and pushes every downloadable file through
//! the [`IngestionWriter`]. Failures are isolated at the narrowest level:
//!
//! - a failed top-level listing ends the run with nothing processed;
//! - a failed directory listing skips that directory;
//! - a failed download or upload skips that file.
//!
//! Every failure is logged and recorded in the [`SynchroniseReport`]; the run
//! itself never returns an error, so the process completes even when every
//! file failed.

use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::IngestConfig;
use crate::contract::{Clock, DirectoryLink, DownloadedFile, FileLink, ObjectStore};
use crate::download::HttpFetcher;
use crate::ingest::IngestionWriter;
use crate::scrape::{discover_directories, discover_files};

#[derive(Debug, Default, Serialize)]
pub struct SynchroniseReport {
    /// Set when the top-level listing could not be fetched.
    pub listing_error: Option<String>,
    pub directories: Vec<DirectoryReport>,
    /// Dated directories left for a later run by `max_directories`.
    pub skipped_directories: usize,
}

impl SynchroniseReport {
    pub fn stored_count(&self) -> usize {
        self.directories.iter().map(|d| d.stored.len()).sum()
    }

    pub fn failed_count(&self) -> usize {
        self.directories.iter().map(|d| d.failed.len()).sum()
    }
}

#[derive(Debug, Serialize)]
pub struct DirectoryReport {
    pub url: String,
    /// Set when the directory listing could not be fetched.
    pub listing_error: Option<String>,
    pub stored: Vec<StoredFileReport>,
    pub failed: Vec<FailedFileReport>,
}

#[derive(Debug, Serialize)]
pub struct StoredFileReport {
    pub file_name: String,
    pub key: String,
}

#[derive(Debug, Serialize)]
pub struct FailedFileReport {
    pub file_name: String,
    pub reason: String,
}

pub async fn synchronise<S, C>(
    config: &IngestConfig,
    fetcher: &HttpFetcher,
    writer: &IngestionWriter<S, C>,
) -> SynchroniseReport
where
    S: ObjectStore,
    C: Clock,
{
    info!(url = %config.cnpj_url, "[SYNC] Starting ingestion run");
    let mut report = SynchroniseReport::default();

    let directories = match discover_directories(fetcher, &config.cnpj_url).await {
        Ok(dirs) => dirs,
        Err(e) => {
            error!(url = %config.cnpj_url, error = %e, "[SYNC][ERROR] Top-level listing unavailable, nothing to do");
            report.listing_error = Some(e.to_string());
            return report;
        }
    };

    report.skipped_directories = directories.len().saturating_sub(config.max_directories);
    if report.skipped_directories > 0 {
        warn!(
            max_directories = config.max_directories,
            skipped = report.skipped_directories,
            "[SYNC] Directory limit reached, remaining directories left for a later run"
        );
    }

    for link in directories.iter().take(config.max_directories) {
        let directory = sync_directory(config, fetcher, writer, link).await;
        report.directories.push(directory);
    }

    info!(
        directories = report.directories.len(),
        stored = report.stored_count(),
        failed = report.failed_count(),
        "[SYNC] Ingestion run complete"
    );
    report
}

async fn sync_directory<S, C>(
    config: &IngestConfig,
    fetcher: &HttpFetcher,
    writer: &IngestionWriter<S, C>,
    link: &DirectoryLink,
) -> DirectoryReport
where
    S: ObjectStore,
    C: Clock,
{
    let url = format!("{}{}", config.base_url, link.as_str());
    info!(url = %url, "[SYNC] Processing directory");
    let mut report = DirectoryReport {
        url: url.clone(),
        listing_error: None,
        stored: Vec::new(),
        failed: Vec::new(),
    };

    let files = match discover_files(fetcher, &url).await {
        Ok(files) => files,
        Err(e) => {
            error!(url = %url, error = %e, "[SYNC][ERROR] Directory listing failed, skipping directory");
            report.listing_error = Some(e.to_string());
            return report;
        }
    };
    info!(url = %url, files = files.len(), "[SYNC] Files found");

    for file in &files {
        match sync_file(fetcher, writer, &url, file).await {
            Ok(key) => report.stored.push(StoredFileReport {
                file_name: file.as_str().to_owned(),
                key,
            }),
            Err(reason) => report.failed.push(FailedFileReport {
                file_name: file.as_str().to_owned(),
                reason,
            }),
        }
    }
    report
}

async fn sync_file<S, C>(
    fetcher: &HttpFetcher,
    writer: &IngestionWriter<S, C>,
    directory_url: &str,
    file: &FileLink,
) -> Result<String, String>
where
    S: ObjectStore,
    C: Clock,
{
    let file_url = format!("{directory_url}{}", file.as_str());
    info!(url = %file_url, "[SYNC] Downloading file");

    let content = fetcher.fetch_bytes(&file_url).await.map_err(|e| {
        error!(url = %file_url, error = %e, "[SYNC][ERROR] Download failed, skipping file");
        e.to_string()
    })?;

    let downloaded = DownloadedFile::new(file, content);
    writer.store(&downloaded).await.map_err(|e| {
        error!(file = %downloaded.name, error = %e, "[SYNC][ERROR] Store failed, skipping file");
        e.to_string()
    })
}
