//! HTTP access to the public listing: listing pages as text, dump files as bytes.

use bytes::Bytes;
use reqwest::{Client, StatusCode};
use std::time::Duration;
use tracing::{debug, error, info};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} answered with status {status}")]
    Status { url: String, status: StatusCode },
    #[error("failed to read response body from {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}

/// Thin wrapper over a shared `reqwest::Client`. One request at a time is
/// the expected usage; the connection pool is released when this is dropped.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// `timeout` bounds connecting and each idle wait for more body data. A
    /// large dump that keeps streaming is never cut off by total elapsed time.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .build()
            .map_err(FetchError::Client)?;
        Ok(Self { client })
    }

    /// GET `url` and return the body as text. Any non-2xx status is an error.
    pub async fn fetch_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.get(url, StatusCode::is_success).await?;
        let body = response.text().await.map_err(|source| {
            error!(url, error = %source, "Failed to decode listing body");
            FetchError::Body {
                url: url.to_owned(),
                source,
            }
        })?;
        debug!(url, bytes = body.len(), "Fetched listing page");
        Ok(body)
    }

    /// GET `url` and return the raw body. Only `200 OK` counts as a download;
    /// a `204` or `206` would otherwise be stored as an empty or partial file.
    pub async fn fetch_bytes(&self, url: &str) -> Result<Bytes, FetchError> {
        let response = self.get(url, |status| *status == StatusCode::OK).await?;
        let body = response.bytes().await.map_err(|source| {
            error!(url, error = %source, "Failed to read download body");
            FetchError::Body {
                url: url.to_owned(),
                source,
            }
        })?;
        info!(url, bytes = body.len(), "Downloaded file");
        Ok(body)
    }

    async fn get(
        &self,
        url: &str,
        accept: impl Fn(&StatusCode) -> bool,
    ) -> Result<reqwest::Response, FetchError> {
        let response = self.client.get(url).send().await.map_err(|source| {
            error!(url, error = %source, "HTTP request failed");
            FetchError::Request {
                url: url.to_owned(),
                source,
            }
        })?;

        let status = response.status();
        if !accept(&status) {
            error!(url, %status, "HTTP request returned unexpected status");
            return Err(FetchError::Status {
                url: url.to_owned(),
                status,
            });
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(Duration::from_secs(5)).expect("http client")
    }

    #[tokio::test]
    async fn partial_content_is_not_a_download() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/Empresas1.zip"))
            .respond_with(ResponseTemplate::new(206).set_body_bytes(b"PK".to_vec()))
            .mount(&server)
            .await;

        let err = fetcher()
            .fetch_bytes(&format!("{}/Empresas1.zip", server.uri()))
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::Status { status, .. } if status == StatusCode::PARTIAL_CONTENT));
    }

    #[tokio::test]
    async fn listing_accepts_any_success_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(203).set_body_string("<a href=\"2024-05/\">"))
            .mount(&server)
            .await;

        let body = fetcher().fetch_text(&server.uri()).await.expect("listing");
        assert!(body.contains("2024-05/"));
    }

    #[tokio::test]
    async fn stalled_server_hits_the_idle_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new(Duration::from_millis(500)).expect("http client");
        let err = fetcher.fetch_bytes(&server.uri()).await.unwrap_err();
        assert!(!matches!(err, FetchError::Status { .. }), "got {err:?}");
    }

    #[test]
    fn client_error_names_the_client_not_a_url() {
        let source = Client::new().get("not a url").build().unwrap_err();
        let message = FetchError::Client(source).to_string();
        assert!(message.starts_with("failed to build HTTP client"));
        assert!(!message.contains("request to"));
    }
}
