// src/lib.rs
// =============================================================================
// kyobo-lookup: book metadata from kyobobook.co.kr
//
// The flow of one lookup:
// 1. query    - turn title/authors/ISBN into a search URL
// 2. search   - pick candidate detail pages out of the results page
// 3. detail   - fetch and scrape every candidate concurrently
// 4. identify - run the whole thing, honour cancellation, drain results
//
// Everything lives in the library so the binary (src/main.rs) and the
// integration tests in tests/ share the same code.
// =============================================================================

pub mod cache;
pub mod config;
pub mod detail;
pub mod http;
pub mod identify;
pub mod logging;
pub mod metadata;
pub mod query;
pub mod search;

pub use cache::{IdentifierCache, MemoryCache};
pub use config::{Prefs, Settings, Site};
pub use identify::Kyobobook;
pub use metadata::{Identifiers, LookupRequest, Metadata};
