use cnpj_bucket::download::{FetchError, HttpFetcher};
use cnpj_bucket::scrape::{discover_directories, discover_files, ScrapeError};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> HttpFetcher {
    HttpFetcher::new(Duration::from_secs(5)).expect("http client")
}

#[tokio::test]
async fn discover_directories_returns_only_dated_links() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/dados_abertos_cnpj/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="../">Parent</a>
               <a href="2023-01/">2023-01/</a>
               <a href="about/">about/</a>
               <a href="2024-05/">2024-05/</a>
               <a href="regime_tributario/">regime_tributario/</a>"#,
        ))
        .mount(&server)
        .await;

    let url = format!("{}/dados_abertos_cnpj/", server.uri());
    let dirs = discover_directories(&fetcher(), &url)
        .await
        .expect("listing should be fetched");
    let dirs: Vec<&str> = dirs.iter().map(|d| d.as_str()).collect();

    assert_eq!(dirs, vec!["2023-01/", "2024-05/"]);
}

#[tokio::test]
async fn discover_files_returns_only_recognised_extensions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/2024-05/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<a href="/dados_abertos_cnpj/">Parent Directory</a>
               <a href="Empresas0.zip">Empresas0.zip</a>
               <a href="index.html">index.html</a>
               <a href="Motivos.csv">Motivos.csv</a>
               <a href="notes.pdf">notes.pdf</a>"#,
        ))
        .mount(&server)
        .await;

    let url = format!("{}/2024-05/", server.uri());
    let files = discover_files(&fetcher(), &url)
        .await
        .expect("directory listing should be fetched");
    let files: Vec<&str> = files.iter().map(|f| f.as_str()).collect();

    assert_eq!(files, vec!["Empresas0.zip", "Motivos.csv"]);
}

#[tokio::test]
async fn listing_with_error_status_is_reported_not_swallowed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = discover_directories(&fetcher(), &format!("{}/", server.uri()))
        .await
        .unwrap_err();

    match err {
        ScrapeError::Fetch(FetchError::Status { status, .. }) => assert_eq!(status.as_u16(), 503),
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_directory_is_a_request_error() {
    let err = discover_files(&fetcher(), "http://127.0.0.1:1/2024-05/")
        .await
        .unwrap_err();

    assert!(
        matches!(err, ScrapeError::Fetch(FetchError::Request { .. })),
        "expected request error, got {err:?}"
    );
}

#[tokio::test]
async fn page_without_anchors_is_empty_not_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>maintenance</body>"))
        .mount(&server)
        .await;

    let dirs = discover_directories(&fetcher(), &format!("{}/", server.uri()))
        .await
        .expect("fetch succeeds");
    assert!(dirs.is_empty());
}
