#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Fetching bulletins from the ministry's website.
//!
//! The ministry publishes one listing page per year with links to each
//! weekly bulletin. [`find_document`] downloads the listing pages in order,
//! ranks their links with [`listing::rank_links`], and returns the best
//! candidate; [`fetch_document`] then downloads it. HTML bulletins are
//! reduced to tables and text by [`html`].

pub mod html;
pub mod listing;

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Deserialize;

use crate::listing::{LinkCandidate, LinkRanking, rank_links};

/// Errors that can occur while fetching bulletins.
#[derive(Debug, thiserror::Error)]
pub enum ScrapeError {
    /// An HTTP request failed or returned an error status.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A configured or discovered URL is malformed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Parsing the response body failed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// No listing page contained a link to a bulletin.
    #[error("No bulletin link found on {}", listing_urls.join(", "))]
    NoCandidate {
        /// The listing pages that were searched.
        listing_urls: Vec<String>,
    },
}

/// HTTP client settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    /// Per-request timeout for listing pages.
    pub listing_timeout_secs: u64,
    /// Per-request timeout for the bulletin itself.
    pub document_timeout_secs: u64,
    /// Extra headers sent with every request.
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "CombustiblesRDBot/1.0".to_owned(),
            listing_timeout_secs: 40,
            document_timeout_secs: 60,
            headers: BTreeMap::new(),
        }
    }
}

/// Builds a [`reqwest::Client`] with the configured user agent and headers.
///
/// # Errors
///
/// Returns [`ScrapeError::Parse`] for an invalid header and
/// [`ScrapeError::Http`] if the client cannot be built.
pub fn build_client(config: &HttpConfig) -> Result<reqwest::Client, ScrapeError> {
    let mut header_map = reqwest::header::HeaderMap::new();
    for (key, value) in &config.headers {
        let name = reqwest::header::HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| ScrapeError::Parse(format!("invalid header name '{key}': {e}")))?;
        let val = reqwest::header::HeaderValue::from_str(value)
            .map_err(|e| ScrapeError::Parse(format!("invalid header value '{value}': {e}")))?;
        header_map.insert(name, val);
    }
    reqwest::Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(header_map)
        .build()
        .map_err(ScrapeError::Http)
}

/// Downloads a page as text.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] on network failure or an error status.
pub async fn fetch_text(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<String, ScrapeError> {
    log::debug!("GET {url}");
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?)
}

/// A downloaded bulletin.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// Final URL after redirects.
    pub url: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedDocument {
    /// Returns `true` when the body is a PDF, judged by its magic bytes or
    /// its content type.
    #[must_use]
    pub fn is_pdf(&self) -> bool {
        self.bytes.starts_with(b"%PDF")
            || self
                .content_type
                .as_deref()
                .is_some_and(|ct| ct.to_ascii_lowercase().contains("application/pdf"))
    }

    /// The body decoded as UTF-8, replacing invalid sequences.
    #[must_use]
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.bytes).into_owned()
    }
}

/// Downloads a bulletin.
///
/// # Errors
///
/// Returns [`ScrapeError::Http`] on network failure or an error status.
pub async fn fetch_document(
    client: &reqwest::Client,
    url: &str,
    timeout: Duration,
) -> Result<FetchedDocument, ScrapeError> {
    log::info!("Downloading {url}");
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;

    let final_url = response.url().to_string();
    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned);
    let bytes = response.bytes().await?.to_vec();

    log::debug!(
        "Downloaded {} bytes ({})",
        bytes.len(),
        content_type.as_deref().unwrap_or("no content type")
    );

    Ok(FetchedDocument {
        url: final_url,
        bytes,
        content_type,
    })
}

/// Searches `listing_urls` in order and returns the best-ranked bulletin
/// link of the first page that has any.
///
/// # Errors
///
/// Returns [`ScrapeError::NoCandidate`] when no page links to a bulletin,
/// and propagates HTTP and URL errors for any listing page.
pub async fn find_document(
    client: &reqwest::Client,
    listing_urls: &[String],
    ranking: &LinkRanking,
    year: i32,
    timeout: Duration,
) -> Result<LinkCandidate, ScrapeError> {
    find_document_with(listing_urls, ranking, year, |url| async move {
        fetch_text(client, &url, timeout).await
    })
    .await
}

/// [`find_document`] over an arbitrary page source. `fetch` is called once
/// per listing page, in order, until a page yields a candidate.
///
/// # Errors
///
/// Returns [`ScrapeError::NoCandidate`] when no page links to a bulletin,
/// and propagates errors from `fetch` and from URL parsing.
pub async fn find_document_with<F, Fut>(
    listing_urls: &[String],
    ranking: &LinkRanking,
    year: i32,
    mut fetch: F,
) -> Result<LinkCandidate, ScrapeError>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<String, ScrapeError>>,
{
    for listing_url in listing_urls {
        let base = url::Url::parse(listing_url)?;
        let html = fetch(listing_url.clone()).await?;
        if let Some(best) = best_candidate(listing_url, &html, &base, ranking, year) {
            return Ok(best);
        }
    }

    Err(ScrapeError::NoCandidate {
        listing_urls: listing_urls.to_vec(),
    })
}

fn best_candidate(
    listing_url: &str,
    html: &str,
    base: &url::Url,
    ranking: &LinkRanking,
    year: i32,
) -> Option<LinkCandidate> {
    let candidates = rank_links(html, base, ranking, year);

    log::info!(
        "{} candidate links on {listing_url}",
        candidates.len()
    );

    let best = candidates.into_iter().next()?;
    log::info!(
        "Selected {} (score {}, \"{}\")",
        best.url,
        best.score,
        best.anchor_text
    );
    Some(best)
}
