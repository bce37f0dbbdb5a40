// src/query/mod.rs
// =============================================================================
// Query construction.
//
// Submodules:
// - tokens: title/author tokenizers and ISBN validation
// - urls: search/product URL building and parsing
// =============================================================================

mod tokens;
mod urls;

pub use tokens::{author_tokens, check_isbn, title_tokens};
pub use urls::{book_url, create_query, is_foreign_book_url, parse_book_id, resolve_link};
