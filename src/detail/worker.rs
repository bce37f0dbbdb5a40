// src/detail/worker.rs
// =============================================================================
// One detail worker = one candidate product page.
//
// Steps:
// 1. Fetch the page (per-request timeout)
// 2. Scrape it (page.rs); a page missing title/authors/id is dropped
// 3. Verify the cover: probe each candidate image until one is big enough
// 4. Record the id/ISBN/cover associations in the cache
// 5. Push the finished record into the shared result sink
//
// A worker never returns an error: every failure ends in a log line and the
// candidate simply contributes nothing. The cancellation token is checked
// between steps; a request already in flight is left to finish or time out.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::page::parse_detail_page;
use crate::cache::IdentifierCache;
use crate::config::Prefs;
use crate::http::{fetch_page, probe_size, FetchFailure};
use crate::metadata::Metadata;

/// Images at or below this size are broken links or placeholders.
pub const MIN_COVER_BYTES: u64 = 1000;

pub struct DetailWorker {
    pub url: String,
    pub relevance: usize,
    /// Each worker owns its handle to the client
    pub client: Client,
    pub prefs: Prefs,
    pub timeout: Duration,
    pub cache: Arc<dyn IdentifierCache>,
    pub sink: UnboundedSender<Metadata>,
    pub cancel: CancellationToken,
}

impl DetailWorker {
    pub async fn run(self) {
        if self.cancel.is_cancelled() {
            return;
        }

        let html = match fetch_page(&self.client, &self.url, self.timeout).await {
            Ok(html) => html,
            Err(FetchFailure::NotFound) => {
                error!("URL malformed: {}", self.url);
                return;
            }
            Err(FetchFailure::Timeout) => {
                error!("Kyobobook timed out. Try again later. ({})", self.url);
                return;
            }
            Err(e) => {
                error!("failed to make details query {}: {}", self.url, e);
                return;
            }
        };

        if self.cancel.is_cancelled() {
            return;
        }

        let page = match parse_detail_page(&html, &self.url, &self.prefs) {
            Ok(page) => page,
            Err(e) => {
                error!("failed to parse Kyobobook details page {}: {:#}", self.url, e);
                return;
            }
        };

        let cover_url = self.verify_cover(&page.cover_candidates).await;
        let mut mi = page.into_metadata(cover_url, self.relevance);

        if let Some(id) = mi.identifiers.kyobobook.as_deref() {
            if let Some(isbn) = mi.isbn.as_deref() {
                self.cache.cache_isbn_to_identifier(isbn, id);
            }
            if let Some(cover) = mi.cover_url.as_deref() {
                self.cache.cache_identifier_to_cover_url(id, cover);
            }
        }

        mi.clean();
        info!("found [{}] {} :: {:?}", mi.source_relevance, mi.title, mi.authors);

        if self.sink.send(mi).is_err() {
            debug!("result sink closed before {} finished", self.url);
        }
    }

    /// First candidate whose size checks out. Kyobobook sometimes links
    /// images that do not exist, hence the extra request.
    async fn verify_cover(&self, candidates: &[String]) -> Option<String> {
        for url in candidates {
            if self.cancel.is_cancelled() {
                return None;
            }
            match probe_size(&self.client, url, self.timeout).await {
                Ok(size) if size > MIN_COVER_BYTES => return Some(url.clone()),
                Ok(size) => warn!("broken image ({} bytes) for url: {}", size, url),
                Err(e) => debug!("cover probe failed for {}: {}", url, e),
            }
        }
        None
    }
}
