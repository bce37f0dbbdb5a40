// src/http.rs
// =============================================================================
// HTTP plumbing shared by the search step, the detail workers and the
// cover download.
//
// Key functionality:
// - One reqwest Client, cloned into every worker (the clone shares the
//   connection pool, it is just a reference count)
// - Every request carries its own timeout
// - Transport failures are sorted into a FetchFailure so the log line says
//   what went wrong (timeout, 404, DNS...)
// - Cover probing: HEAD first, GET as a fallback, to learn an image's size
// =============================================================================

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::header::CONTENT_LENGTH;
use reqwest::{Client, StatusCode};

const USER_AGENT: &str = concat!("kyobo-lookup/", env!("CARGO_PKG_VERSION"));

/// Builds the client used for a whole lookup.
pub fn build_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .redirect(reqwest::redirect::Policy::limited(5))
        .build()
        .context("failed to create HTTP client")
}

/// Why a request produced no usable body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// 404 or 410
    NotFound,
    /// Any other non-2xx status
    Status(u16),
    /// Request timed out
    Timeout,
    /// Redirect loop
    TooManyRedirects,
    /// Could not resolve the host
    Dns,
    /// Connection refused, reset...
    Connect,
    /// Anything else, including an unreadable body
    Other(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::NotFound => write!(f, "page not found"),
            FetchFailure::Status(code) => write!(f, "HTTP {}", code),
            FetchFailure::Timeout => write!(f, "request timed out"),
            FetchFailure::TooManyRedirects => write!(f, "too many redirects"),
            FetchFailure::Dns => write!(f, "could not resolve hostname"),
            FetchFailure::Connect => write!(f, "connection failed"),
            FetchFailure::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for FetchFailure {}

/// Sorts a reqwest error into a FetchFailure.
fn categorize_error(error: reqwest::Error) -> FetchFailure {
    let error_string = error.to_string();

    if error.is_timeout() {
        FetchFailure::Timeout
    } else if error.is_redirect() {
        FetchFailure::TooManyRedirects
    } else if error.is_connect() {
        if error_string.contains("dns") {
            FetchFailure::Dns
        } else {
            FetchFailure::Connect
        }
    } else {
        FetchFailure::Other(error_string)
    }
}

fn check_status(status: StatusCode) -> Result<(), FetchFailure> {
    if status.is_success() {
        Ok(())
    } else if matches!(status, StatusCode::NOT_FOUND | StatusCode::GONE) {
        Err(FetchFailure::NotFound)
    } else {
        Err(FetchFailure::Status(status.as_u16()))
    }
}

/// GETs a page and decodes it as text. reqwest picks the charset from the
/// Content-Type header, which matters here: search pages are UTF-8 while
/// product pages are served as EUC-KR.
pub async fn fetch_page(client: &Client, url: &str, timeout: Duration) -> Result<String, FetchFailure> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(categorize_error)?;
    check_status(response.status())?;
    response.text().await.map_err(categorize_error)
}

/// GETs raw bytes (cover images).
pub async fn fetch_bytes(client: &Client, url: &str, timeout: Duration) -> Result<Vec<u8>, FetchFailure> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await
        .map_err(categorize_error)?;
    check_status(response.status())?;
    let bytes = response.bytes().await.map_err(categorize_error)?;
    Ok(bytes.to_vec())
}

/// Size in bytes of the resource at `url`.
///
/// A HEAD request is tried first and its Content-Length header used. When
/// the server refuses HEAD or leaves the header out, the body is downloaded
/// and measured instead.
pub async fn probe_size(client: &Client, url: &str, timeout: Duration) -> Result<u64, FetchFailure> {
    let head = client.head(url).timeout(timeout).send().await;

    if let Ok(response) = head {
        if response.status().is_success() {
            let declared = response
                .headers()
                .get(CONTENT_LENGTH)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            if let Some(size) = declared {
                return Ok(size);
            }
        }
    }

    let body = fetch_bytes(client, url, timeout).await?;
    Ok(body.len() as u64)
}
