//! cnpj-bucket: scrape the public CNPJ registry dump listing and deposit every
//! file into an S3-compatible bucket under `{category}/{name}_{YYYY-MM}.{ext}`.
//!
//! Pipeline entrypoint: [`synchronise::synchronise`]. Storage seam:
//! [`contract::ObjectStore`].

pub mod cli;
pub mod config;
pub mod contract;
pub mod download;
pub mod ingest;
pub mod load_config;
pub mod object_store;
pub mod scrape;
pub mod synchronise;

pub use cli::{run, Cli};
