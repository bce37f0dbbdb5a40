// src/detail/mod.rs
// =============================================================================
// Product (detail) page handling.
//
// Submodules:
// - dom: text extraction and HTML sanitizing helpers
// - authors: contributor/role walk and the primary-author filter
// - page: scraping one page into a DetailPage
// - worker: the async unit of work per candidate
// =============================================================================

mod authors;
mod dom;
mod page;
mod worker;

pub use authors::{assign_roles, credit_tokens, parse_authors, select_authors, CreditToken};
pub use page::{parse_detail_page, parse_korean_date, DetailPage};
pub use worker::{DetailWorker, MIN_COVER_BYTES};
