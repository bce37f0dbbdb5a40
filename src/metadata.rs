// src/metadata.rs
// =============================================================================
// The records that go in and come out of a lookup.
//
// - LookupRequest: what the caller knows about a book (title, authors, ids)
// - Metadata: what one product page told us about it
// =============================================================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Book identifiers known to this source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identifiers {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    /// Product code (`barcode` in the product URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kyobobook: Option<String>,
}

impl Identifiers {
    pub fn is_empty(&self) -> bool {
        self.isbn.is_none() && self.kyobobook.is_none()
    }
}

/// Input of an identify call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LookupRequest {
    pub title: Option<String>,
    pub authors: Vec<String>,
    pub identifiers: Identifiers,
}

impl LookupRequest {
    pub fn has_title(&self) -> bool {
        self.title.as_deref().is_some_and(|t| !t.trim().is_empty())
    }

    pub fn has_authors(&self) -> bool {
        self.authors.iter().any(|a| !a.trim().is_empty())
    }

    /// Same request without identifiers, used for the title/author retry.
    pub fn without_identifiers(&self) -> LookupRequest {
        LookupRequest {
            title: self.title.clone(),
            authors: self.authors.clone(),
            identifiers: Identifiers::default(),
        }
    }
}

/// One scraped product page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_index: Option<f64>,
    pub identifiers: Identifiers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub isbn: Option<String>,
    /// 0..=5 stars
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    /// Sanitized HTML
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_url: Option<String>,
    pub has_cover: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubdate: Option<NaiveDate>,
    /// ISO 639-2 code such as "kor"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    /// Position of the candidate in the search results
    pub source_relevance: usize,
}

impl Metadata {
    pub fn new(title: impl Into<String>, authors: Vec<String>) -> Self {
        Metadata {
            title: title.into(),
            authors,
            series: None,
            series_index: None,
            identifiers: Identifiers::default(),
            isbn: None,
            rating: None,
            comments: None,
            cover_url: None,
            has_cover: false,
            tags: Vec::new(),
            publisher: None,
            pubdate: None,
            language: None,
            source_relevance: 0,
        }
    }

    /// Final tidy-up before a record leaves the worker: trims text fields,
    /// drops empty ones and repeated tags.
    pub fn clean(&mut self) {
        self.title = self.title.trim().to_string();
        for author in &mut self.authors {
            *author = author.trim().to_string();
        }
        self.authors.retain(|a| !a.is_empty());

        let mut seen = std::collections::HashSet::new();
        self.tags.retain(|t| !t.is_empty() && seen.insert(t.clone()));

        if self.publisher.as_deref().is_some_and(|p| p.trim().is_empty()) {
            self.publisher = None;
        }
        if let Some(publisher) = &mut self.publisher {
            *publisher = publisher.trim().to_string();
        }
        if self.comments.as_deref().is_some_and(|c| c.trim().is_empty()) {
            self.comments = None;
        }
        self.has_cover = self.cover_url.is_some();
    }
}

/// Orders records the way they were ranked on the results page.
pub fn sort_by_relevance(records: &mut [Metadata]) {
    records.sort_by_key(|m| m.source_relevance);
}
