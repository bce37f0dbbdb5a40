// src/cache.rs
// =============================================================================
// Identifier caches shared with the caller.
//
// A finished worker records two associations:
// - ISBN -> Kyobobook id
// - Kyobobook id -> verified cover URL
//
// download_cover reads them back so it can skip a second identify run.
// The trait is what a host application implements; MemoryCache is the
// in-process version used by the CLI and the tests.
// =============================================================================

use std::collections::HashMap;
use std::sync::Mutex;

use crate::metadata::Identifiers;

/// Write-through key/value store for identifiers. Shared between tasks, so
/// implementations must be thread safe.
pub trait IdentifierCache: Send + Sync {
    fn cache_isbn_to_identifier(&self, isbn: &str, id: &str);
    fn cached_isbn_to_identifier(&self, isbn: &str) -> Option<String>;
    fn cache_identifier_to_cover_url(&self, id: &str, url: &str);
    fn cached_identifier_to_cover_url(&self, id: &str) -> Option<String>;

    /// Cover URL for a set of identifiers, going through the ISBN mapping
    /// when no Kyobobook id is known.
    fn cached_cover_url(&self, identifiers: &Identifiers) -> Option<String> {
        let id = match &identifiers.kyobobook {
            Some(id) => Some(id.clone()),
            None => identifiers
                .isbn
                .as_deref()
                .and_then(|isbn| self.cached_isbn_to_identifier(isbn)),
        };
        id.and_then(|id| self.cached_identifier_to_cover_url(&id))
    }
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    isbn_to_id: Mutex<HashMap<String, String>>,
    id_to_cover: Mutex<HashMap<String, String>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

// A poisoned lock only means another task panicked mid-insert; the map
// itself is still usable.
fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl IdentifierCache for MemoryCache {
    fn cache_isbn_to_identifier(&self, isbn: &str, id: &str) {
        lock(&self.isbn_to_id).insert(isbn.to_string(), id.to_string());
    }

    fn cached_isbn_to_identifier(&self, isbn: &str) -> Option<String> {
        lock(&self.isbn_to_id).get(isbn).cloned()
    }

    fn cache_identifier_to_cover_url(&self, id: &str, url: &str) {
        lock(&self.id_to_cover).insert(id.to_string(), url.to_string());
    }

    fn cached_identifier_to_cover_url(&self, id: &str) -> Option<String> {
        lock(&self.id_to_cover).get(id).cloned()
    }
}
