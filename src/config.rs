use serde::Serialize;
use std::fmt;
use tracing::{debug, info};

pub const DEFAULT_BUCKET: &str = "raw";
pub const DEFAULT_REGION: &str = "us-east-1";
/// The reference run stops after the first dated directory.
pub const DEFAULT_MAX_DIRECTORIES: usize = 1;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 600;

/// Everything one ingestion run needs.
#[derive(Debug, Clone, Serialize)]
pub struct IngestConfig {
    /// Top-level listing page with the dated directories.
    pub cnpj_url: String,
    /// Prefix joined with each directory href.
    pub base_url: String,
    /// Destination bucket for every stored file.
    pub bucket: String,
    /// How many dated directories one run processes before stopping.
    pub max_directories: usize,
    pub http_timeout_secs: u64,
    pub store: StoreConfig,
}

impl IngestConfig {
    pub fn trace_loaded(&self) {
        info!(
            cnpj_url = %self.cnpj_url,
            base_url = %self.base_url,
            bucket = %self.bucket,
            max_directories = self.max_directories,
            endpoint = %self.store.endpoint(),
            "Loaded IngestConfig"
        );
        debug!(?self, "IngestConfig loaded (full debug)");
    }
}

/// Connection settings for the S3-compatible backend.
#[derive(Clone, Serialize)]
pub struct StoreConfig {
    pub host: String,
    pub port: String,
    pub access_key: String,
    #[serde(skip)]
    pub secret_key: String,
    /// TLS to the backend; off in the reference deployment.
    pub secure: bool,
    pub region: String,
}

impl StoreConfig {
    pub fn endpoint(&self) -> String {
        let scheme = if self.secure { "https" } else { "http" };
        format!("{scheme}://{}:{}", self.host, self.port)
    }
}

impl fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("secure", &self.secure)
            .field("region", &self.region)
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
