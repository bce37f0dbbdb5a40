// src/search/mod.rs
// Search results page parsing: turns a results page into ranked candidates.

mod results;

pub use results::{clean_result_title, parse_search_results, Candidate, MatchFilter, SearchKind};
