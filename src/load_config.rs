use crate::config::{
    ConfigError, IngestConfig, StoreConfig, DEFAULT_BUCKET, DEFAULT_HTTP_TIMEOUT_SECS,
    DEFAULT_MAX_DIRECTORIES, DEFAULT_REGION,
};
use std::str::FromStr;
use tracing::{error, info, warn};

/// Loads the ingestion config from the process environment.
///
/// Call `dotenvy::dotenv()` beforehand to pick up a `.env` file. Connection
/// values (`cnpj_url`, `base_url`, `minio_*`) are not validated here: a missing
/// one is logged and left empty, and surfaces later as a fetch or connection
/// failure. Optional tunables must parse when present.
pub fn load_config() -> Result<IngestConfig, ConfigError> {
    load_config_with(|key| {
        std::env::var(key)
            .or_else(|_| std::env::var(key.to_uppercase()))
            .ok()
    })
}

/// Same as [`load_config`] with an arbitrary key lookup.
pub fn load_config_with<F>(lookup: F) -> Result<IngestConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let required = |key: &'static str| match lookup(key) {
        Some(value) => value,
        None => {
            warn!(key, "Configuration value not set, continuing with empty value");
            String::new()
        }
    };

    let cnpj_url = required("cnpj_url");
    let base_url = required("base_url");
    let store = StoreConfig {
        host: required("minio_host"),
        port: required("minio_port"),
        access_key: required("minio_access_key"),
        secret_key: required("minio_secret_key"),
        secure: optional(&lookup, "minio_secure", false, parse_bool)?,
        region: lookup("minio_region").unwrap_or_else(|| DEFAULT_REGION.to_owned()),
    };

    let config = IngestConfig {
        cnpj_url,
        base_url,
        bucket: lookup("bucket").unwrap_or_else(|| DEFAULT_BUCKET.to_owned()),
        max_directories: optional(
            &lookup,
            "max_directories",
            DEFAULT_MAX_DIRECTORIES,
            parse_number::<usize>,
        )?,
        http_timeout_secs: optional(
            &lookup,
            "http_timeout_secs",
            DEFAULT_HTTP_TIMEOUT_SECS,
            parse_number::<u64>,
        )?,
        store,
    };

    info!(
        bucket = %config.bucket,
        max_directories = config.max_directories,
        "Config loaded from environment"
    );
    Ok(config)
}

fn optional<F, T>(
    lookup: &F,
    key: &'static str,
    default: T,
    parse: fn(&str) -> Result<T, String>,
) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(default),
        Some(raw) => parse(raw.trim()).map_err(|reason| {
            error!(key, value = %raw, %reason, "Invalid configuration value");
            ConfigError::Invalid {
                key,
                value: raw,
                reason,
            }
        }),
    }
}

fn parse_bool(raw: &str) -> Result<bool, String> {
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err("expected a boolean".to_owned()),
    }
}

fn parse_number<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|e| e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_tunables_absent() {
        let config = load_config_with(lookup_from(&[
            ("cnpj_url", "https://example.org/dados_abertos_cnpj/"),
            ("base_url", "https://example.org/dados_abertos_cnpj/"),
            ("minio_host", "localhost"),
            ("minio_port", "9000"),
        ]))
        .unwrap();

        assert_eq!(config.bucket, "raw");
        assert_eq!(config.max_directories, 1);
        assert_eq!(config.http_timeout_secs, DEFAULT_HTTP_TIMEOUT_SECS);
        assert!(!config.store.secure);
        assert_eq!(config.store.region, "us-east-1");
        assert_eq!(config.store.endpoint(), "http://localhost:9000");
    }

    #[test]
    fn missing_connection_values_are_left_empty() {
        let config = load_config_with(lookup_from(&[])).unwrap();
        assert!(config.cnpj_url.is_empty());
        assert!(config.store.access_key.is_empty());
    }

    #[test]
    fn tunables_are_parsed() {
        let config = load_config_with(lookup_from(&[
            ("max_directories", "3"),
            ("minio_secure", "TRUE"),
            ("http_timeout_secs", "30"),
            ("bucket", "landing"),
        ]))
        .unwrap();
        assert_eq!(config.max_directories, 3);
        assert!(config.store.secure);
        assert_eq!(config.http_timeout_secs, 30);
        assert_eq!(config.bucket, "landing");
    }

    #[test]
    fn malformed_tunable_is_rejected() {
        let err = load_config_with(lookup_from(&[("max_directories", "many")])).unwrap_err();
        let ConfigError::Invalid { key, value, .. } = err;
        assert_eq!(key, "max_directories");
        assert_eq!(value, "many");
    }
}
