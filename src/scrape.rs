//! Directory scraper: turns listing pages into dated directory links and
//! downloadable file links.
//!
//! Link extraction is deliberately lenient. Anything in the page that does not
//! look like `<a ... href=...>` is ignored, so malformed markup only ever
//! yields fewer links, never an error. Errors come from fetching alone.

use regex::Regex;
use std::sync::OnceLock;
use tracing::{error, info};

use crate::contract::{DirectoryLink, FileLink};
use crate::download::{FetchError, HttpFetcher};

/// Extensions accepted for download.
pub const FILE_EXTENSIONS: [&str; 3] = ["zip", "txt", "csv"];

#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

fn anchor_href() -> &'static Regex {
    static ANCHOR_HREF: OnceLock<Regex> = OnceLock::new();
    ANCHOR_HREF.get_or_init(|| {
        Regex::new(r#"(?is)<a\s(?:[^>]*?\s)?href\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#)
            .expect("anchor href pattern is valid")
    })
}

/// Every anchor `href` value in document order.
///
/// Values are returned as written in the markup: HTML entities such as
/// `&amp;` are not decoded. Directory and file hrefs on the listing are plain
/// names, so no entity ever reaches the filters.
pub fn extract_hrefs(html: &str) -> Vec<String> {
    anchor_href()
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).or_else(|| caps.get(2)).or_else(|| caps.get(3)))
        .map(|m| m.as_str().trim().to_owned())
        .collect()
}

/// `true` for hrefs such as `2024-05/`: trailing separator and four leading digits.
pub fn is_directory_link(href: &str) -> bool {
    let mut leading = href.chars().take(4);
    href.ends_with('/') && href.chars().count() >= 4 && leading.all(|c| c.is_ascii_digit())
}

/// `true` for hrefs naming a file with one of [`FILE_EXTENSIONS`].
pub fn is_file_link(href: &str) -> bool {
    !href.ends_with('/')
        && FILE_EXTENSIONS
            .iter()
            .any(|ext| href.ends_with(&format!(".{ext}")))
}

pub fn directory_links(html: &str) -> Vec<DirectoryLink> {
    extract_hrefs(html)
        .into_iter()
        .filter(|href| is_directory_link(href))
        .map(DirectoryLink)
        .collect()
}

pub fn file_links(html: &str) -> Vec<FileLink> {
    extract_hrefs(html)
        .into_iter()
        .filter(|href| is_file_link(href))
        .map(FileLink)
        .collect()
}

/// Fetch the top-level listing and return its dated sub-directories.
pub async fn discover_directories(
    fetcher: &HttpFetcher,
    listing_url: &str,
) -> Result<Vec<DirectoryLink>, ScrapeError> {
    let html = fetcher.fetch_text(listing_url).await.map_err(|e| {
        error!(url = listing_url, error = %e, "Failed to fetch top-level listing");
        ScrapeError::from(e)
    })?;
    let links = directory_links(&html);
    info!(url = listing_url, directories = links.len(), "Discovered directories");
    Ok(links)
}

/// Fetch a directory listing and return the downloadable files in it.
pub async fn discover_files(
    fetcher: &HttpFetcher,
    directory_url: &str,
) -> Result<Vec<FileLink>, ScrapeError> {
    let html = fetcher.fetch_text(directory_url).await.map_err(|e| {
        error!(url = directory_url, error = %e, "Failed to fetch directory listing");
        ScrapeError::from(e)
    })?;
    let links = file_links(&html);
    info!(url = directory_url, files = links.len(), "Discovered files");
    Ok(links)
}
