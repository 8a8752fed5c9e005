use anyhow::Result;
use clap::Parser;
use std::time::Duration;

use crate::contract::SystemClock;
use crate::download::HttpFetcher;
use crate::ingest::IngestionWriter;
use crate::load_config::load_config;
use crate::object_store::MinioStore;
use crate::synchronise::synchronise;

/// CLI for cnpj-bucket: one ingestion run of the public CNPJ dumps into object storage.
///
/// Takes no arguments; everything comes from the environment (or `.env`).
#[derive(Parser, Debug)]
#[clap(
    name = "cnpj-bucket",
    version,
    about = "Download the public CNPJ registry dumps and deposit them in an S3-compatible bucket"
)]
pub struct Cli {}

/// Async entrypoint shared by main() and the integration tests.
pub async fn run(_cli: Cli) -> Result<()> {
    let config = load_config()?;
    config.trace_loaded();

    let fetcher = HttpFetcher::new(Duration::from_secs(config.http_timeout_secs))?;
    let store = MinioStore::connect(&config.store).await;
    let writer = IngestionWriter::with_clock(store, SystemClock, config.bucket.clone());

    println!("Synchronise starting...");
    let report = synchronise(&config, &fetcher, &writer).await;
    println!(
        "Synchronise complete: {} stored, {} failed, {} directories skipped",
        report.stored_count(),
        report.failed_count(),
        report.skipped_directories
    );
    match serde_json::to_string_pretty(&report) {
        Ok(json) => tracing::debug!(json = %json, "Synchronise report"),
        Err(e) => tracing::error!(error = ?e, "Failed to serialize synchronise report"),
    }
    Ok(())
}
