// src/search/results.rs
// =============================================================================
// Reads the search results page and decides which product pages to fetch.
//
// How it works:
// 1. Every result row (a <tr> inside div.list_search_result) with a product
//    link in its div.title is a possible candidate
// 2. The row title is cleaned: whitespace collapsed, "(series ...)" removed
// 3. ISBN searches keep the first rows as they come; title/author searches
//    only keep rows that pass the match filter
// 4. Stop once max_results candidates are collected
//
// Rows keep page order; that order becomes each candidate's relevance.
// =============================================================================

use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, info, warn};

use crate::query::{author_tokens, resolve_link, title_tokens};

static ROW: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.list_search_result tr").expect("row selector"));
static TITLE_LINK: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(r#"div.title a[href*="/product/detailView"]"#).expect("title link selector")
});
static AUTHOR_LINK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.author a").expect("author selector"));

/// A product page worth fetching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    /// Rank at discovery time, starting at 0
    pub relevance: usize,
    /// Cleaned title shown on the results page
    pub label: String,
    /// Absolute product page URL
    pub url: String,
}

/// What kind of search produced the page.
#[derive(Debug, Clone, Copy)]
pub enum SearchKind<'a> {
    /// Searched by ISBN: every row is trusted
    Isbn,
    /// Searched by keywords: rows must resemble the request
    Keywords { title: Option<&'a str>, authors: &'a [String] },
}

/// Decides whether a search result looks like the requested book.
///
/// A row passes when (there are no title tokens, or one of them appears in
/// the row title) and (there are no author tokens, or one of them appears in
/// the row's authors). Comparison is case-insensitive substring matching.
#[derive(Debug, Clone)]
pub struct MatchFilter {
    title_tokens: Vec<String>,
    author_tokens: Vec<String>,
}

impl MatchFilter {
    pub fn new(title: Option<&str>, authors: &[String]) -> Self {
        MatchFilter {
            title_tokens: title
                .map(|t| title_tokens(t, true, false))
                .unwrap_or_default()
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
            author_tokens: author_tokens(authors, true)
                .into_iter()
                .map(|t| t.to_lowercase())
                .collect(),
        }
    }

    pub fn accepts(&self, title: &str, authors: &[String]) -> bool {
        let title = title.to_lowercase();
        let authors = authors.join(" ").to_lowercase();

        let title_ok = self.title_tokens.is_empty() || self.title_tokens.iter().any(|t| title.contains(t.as_str()));
        let author_ok =
            self.author_tokens.is_empty() || self.author_tokens.iter().any(|a| authors.contains(a.as_str()));

        title_ok && author_ok
    }
}

/// Collapses whitespace runs and drops a trailing "(...)" annotation.
/// A title that starts with its only parenthetical is kept whole.
///
/// Example: "광장/구운몽\n   (최인훈 전집 1)" -> "광장/구운몽"
pub fn clean_result_title(raw: &str) -> String {
    let title = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    let head = title
        .rfind('(')
        .map(|pos| title[..pos].trim().to_string())
        .filter(|head| !head.is_empty());
    head.unwrap_or(title)
}

/// Extracts candidates from a search results page.
pub fn parse_search_results(html: &str, base_url: &str, kind: SearchKind<'_>, max_results: usize) -> Vec<Candidate> {
    let document = Html::parse_document(html);
    let rows: Vec<ElementRef<'_>> = document.select(&ROW).collect();

    if rows.is_empty() {
        info!("found no results");
        return Vec::new();
    }

    let filter = match kind {
        SearchKind::Isbn => None,
        SearchKind::Keywords { title, authors } => Some(MatchFilter::new(title, authors)),
    };

    let mut candidates = Vec::new();
    let mut seen = HashSet::new();

    for row in rows {
        if candidates.len() >= max_results {
            break;
        }

        let Some(link) = row.select(&TITLE_LINK).next() else {
            continue;
        };

        let title = clean_result_title(&link.text().collect::<String>());
        if title.is_empty() {
            debug!("could not find title in result row");
            continue;
        }

        if let Some(filter) = &filter {
            let authors: Vec<String> = row
                .select(&AUTHOR_LINK)
                .map(|a| a.text().collect::<String>().trim().to_string())
                .filter(|a| !a.is_empty())
                .collect();
            info!("considering search result: {} :: {:?}", title, authors);
            if !filter.accepts(&title, &authors) {
                warn!("rejecting as not close enough match: {} :: {:?}", title, authors);
                continue;
            }
        }

        let Some(url) = link.value().attr("href").and_then(|href| resolve_link(base_url, href)) else {
            debug!("result {:?} has no usable link", title);
            continue;
        };

        // nested tables can surface the same link twice
        if !seen.insert(url.clone()) {
            continue;
        }

        candidates.push(Candidate {
            relevance: candidates.len(),
            label: title,
            url,
        });
    }

    candidates
}
