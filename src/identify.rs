// src/identify.rs
// =============================================================================
// The lookup itself.
//
// identify:
// 1. A known Kyobobook id goes straight to its product page
// 2. Otherwise build the query, fetch the results page, pick candidates
// 3. No candidates but ids were given along with title and authors?
//    Try once more with title/authors only
// 4. Start one worker per candidate, 100ms apart, then wait for all of
//    them or for the cancellation token, whichever comes first
//
// download_cover:
// - Use the cached cover URL when there is one, otherwise run identify and
//   take the best-ranked record that ended up with a cover
// - Download the image and push it to the cover sink
//
// Neither operation returns an error. Every failure is logged where it
// happens and the caller just gets fewer (or no) results.
// =============================================================================

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use futures::stream::{FuturesUnordered, StreamExt};
use reqwest::Client;
use tokio::sync::mpsc::{self, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cache::IdentifierCache;
use crate::config::{Prefs, Settings, Site};
use crate::detail::DetailWorker;
use crate::http::{build_client, fetch_bytes, fetch_page};
use crate::metadata::{sort_by_relevance, LookupRequest, Metadata};
use crate::query::{book_url, check_isbn, create_query};
use crate::search::{parse_search_results, Candidate, SearchKind};

/// Timeout for the search page and cover downloads.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Timeout for each product page and cover probe.
pub const WORKER_TIMEOUT: Duration = Duration::from_secs(20);
/// Delay between worker starts, so requests do not all hit at once.
pub const WORKER_STAGGER: Duration = Duration::from_millis(100);

/// The Kyobobook metadata source.
pub struct Kyobobook {
    client: Client,
    site: Site,
    prefs: Prefs,
    cache: Arc<dyn IdentifierCache>,
    timeout: Duration,
}

impl Kyobobook {
    pub fn new(settings: Settings, cache: Arc<dyn IdentifierCache>, timeout: Duration) -> Result<Self> {
        Ok(Kyobobook {
            client: build_client(timeout)?,
            site: settings.site,
            prefs: settings.prefs,
            cache,
            timeout,
        })
    }

    fn worker_timeout(&self) -> Duration {
        self.timeout.min(WORKER_TIMEOUT)
    }

    /// Looks a book up and pushes one record per matching product page into
    /// `sink`. Returns the number of candidates that were handed to workers.
    pub async fn identify(
        &self,
        request: &LookupRequest,
        sink: &UnboundedSender<Metadata>,
        cancel: &CancellationToken,
    ) -> usize {
        if cancel.is_cancelled() {
            return 0;
        }

        let mut candidates = match self.find_candidates(request).await {
            Ok(candidates) => candidates,
            Err(e) => {
                error!("{:#}", e);
                return 0;
            }
        };

        if cancel.is_cancelled() {
            return 0;
        }

        if candidates.is_empty() {
            if !request.identifiers.is_empty() && request.has_title() && request.has_authors() {
                info!("no matches found with identifiers, retrying using only title and authors");
                candidates = match self.find_candidates(&request.without_identifiers()).await {
                    Ok(candidates) => candidates,
                    Err(e) => {
                        error!("{:#}", e);
                        return 0;
                    }
                };
                if cancel.is_cancelled() {
                    return 0;
                }
            }
            if candidates.is_empty() {
                error!("no matches found for {:?}", request);
                return 0;
            }
        }

        let count = candidates.len();
        self.run_workers(candidates, sink, cancel).await;
        count
    }

    /// identify, then everything the workers produced, best match first.
    pub async fn identify_all(&self, request: &LookupRequest, cancel: &CancellationToken) -> Vec<Metadata> {
        let (tx, mut rx) = mpsc::unbounded_channel();
        self.identify(request, &tx, cancel).await;

        // Workers detached by a cancellation may still hold senders, so only
        // take what is already queued.
        let mut results = Vec::new();
        while let Ok(mi) = rx.try_recv() {
            results.push(mi);
        }
        sort_by_relevance(&mut results);
        results
    }

    /// Finds the cover for a book and pushes its bytes into `sink`.
    pub async fn download_cover(
        &self,
        request: &LookupRequest,
        sink: &UnboundedSender<Vec<u8>>,
        cancel: &CancellationToken,
    ) {
        let mut cover_url = self.cache.cached_cover_url(&request.identifiers);

        if cover_url.is_none() {
            info!("no cached cover found, running identify");
            let results = self.identify_all(request, cancel).await;
            if cancel.is_cancelled() {
                return;
            }
            cover_url = results
                .iter()
                .find_map(|mi| self.cache.cached_cover_url(&mi.identifiers));
        }

        let Some(cover_url) = cover_url else {
            info!("no cover found");
            return;
        };

        if cancel.is_cancelled() {
            return;
        }

        info!("downloading cover from: {}", cover_url);
        match fetch_bytes(&self.client, &cover_url, self.timeout).await {
            Ok(bytes) => {
                if sink.send(bytes).is_err() {
                    warn!("cover sink closed before the download finished");
                }
            }
            Err(e) => error!("failed to download cover from {}: {}", cover_url, e),
        }
    }

    /// Candidate product pages for a request.
    ///
    /// Errors stop the lookup (no query could be built, the search page could
    /// not be fetched). An empty list means the search ran and found nothing.
    async fn find_candidates(&self, request: &LookupRequest) -> Result<Vec<Candidate>> {
        if let Some(id) = request.identifiers.kyobobook.as_deref().filter(|id| !id.trim().is_empty()) {
            let url = book_url(&self.site, id.trim());
            return Ok(vec![Candidate {
                relevance: 0,
                label: id.trim().to_string(),
                url,
            }]);
        }

        let query = create_query(&self.site, request)
            .ok_or_else(|| anyhow!("insufficient metadata to construct query"))?;

        info!("querying: {}", query);
        let html = fetch_page(&self.client, &query, self.timeout)
            .await
            .map_err(|e| anyhow!("failed to make identify query {}: {}", query, e))?;

        if html.trim().is_empty() {
            return Err(anyhow!("failed to get raw result for query: {}", query));
        }

        let isbn = request.identifiers.isbn.as_deref().and_then(check_isbn);
        let kind = match isbn {
            Some(_) => SearchKind::Isbn,
            None => SearchKind::Keywords {
                title: request.title.as_deref(),
                authors: &request.authors,
            },
        };

        Ok(parse_search_results(&html, &self.site.base_url, kind, self.prefs.max_results()))
    }

    /// Spawns the workers and waits for them, or for cancellation.
    async fn run_workers(&self, candidates: Vec<Candidate>, sink: &UnboundedSender<Metadata>, cancel: &CancellationToken) {
        let mut running = FuturesUnordered::new();

        for (i, candidate) in candidates.into_iter().enumerate() {
            if i > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(WORKER_STAGGER) => {}
                }
            }

            info!("fetching candidate [{}] {}: {}", candidate.relevance, candidate.label, candidate.url);
            let worker = DetailWorker {
                url: candidate.url,
                relevance: candidate.relevance,
                client: self.client.clone(),
                prefs: self.prefs.clone(),
                timeout: self.worker_timeout(),
                cache: Arc::clone(&self.cache),
                sink: sink.clone(),
                cancel: cancel.clone(),
            };
            running.push(tokio::spawn(worker.run()));
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    // dropping a JoinHandle detaches the task, it keeps running
                    info!("lookup cancelled, not waiting for the remaining workers");
                    break;
                }
                next = running.next() => match next {
                    None => break,
                    Some(Err(e)) => error!("detail worker failed: {}", e),
                    Some(Ok(())) => {}
                },
            }
        }
    }
}
