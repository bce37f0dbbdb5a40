// src/query/urls.rs
// =============================================================================
// Building and taking apart Kyobobook URLs.
//
// URL shapes:
//   search:  https://search.kyobobook.co.kr/web/search?vPstrKeyWord=<keyword>
//   product: http://www.kyobobook.co.kr/product/detailViewKor.laf?barcode=<id>
//            (foreign books use detailViewEng.laf)
//
// The product code in `barcode` is the store's identifier. For most books
// it is the same as the ISBN-13.
// =============================================================================

use regex::Regex;
use std::sync::LazyLock;
use url::form_urlencoded::byte_serialize;
use url::Url;

use super::tokens::{author_tokens, check_isbn, title_tokens};
use crate::config::Site;
use crate::metadata::LookupRequest;

static BARCODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&]barcode=([^&]+)").expect("barcode pattern"));

/// Builds the search URL for a lookup.
///
/// A valid ISBN wins: the query is the ISBN alone. Otherwise the title
/// (subtitle stripped, joiners kept) and the first author are tokenized and
/// joined with `+`. Returns None when there is nothing to search for.
pub fn create_query(site: &Site, request: &LookupRequest) -> Option<String> {
    if let Some(isbn) = request.identifiers.isbn.as_deref().and_then(check_isbn) {
        return Some(format!("{}{}", site.search_url, isbn));
    }

    let mut tokens = Vec::new();
    if let Some(title) = request.title.as_deref() {
        tokens.extend(title_tokens(title, false, true));
    }
    tokens.extend(author_tokens(&request.authors, true));

    if tokens.is_empty() {
        return None;
    }

    let keyword = tokens
        .iter()
        .map(|t| byte_serialize(t.as_bytes()).collect::<String>())
        .collect::<Vec<_>>()
        .join("+");
    Some(format!("{}{}", site.search_url, keyword))
}

/// Product page for a known Kyobobook id.
pub fn book_url(site: &Site, id: &str) -> String {
    format!(
        "{}/product/detailViewKor.laf?barcode={}",
        site.base_url.trim_end_matches('/'),
        id
    )
}

/// Pulls the Kyobobook id out of a product URL.
pub fn parse_book_id(url: &str) -> Option<String> {
    BARCODE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|id| !id.is_empty())
}

/// Product pages for foreign books list authors separated by `/`.
pub fn is_foreign_book_url(url: &str) -> bool {
    url.contains("detailViewEng")
}

/// Turns a possibly-relative link into an absolute URL.
///
/// Examples:
///   base = "http://www.kyobobook.co.kr"
///   href = "/product/detailViewKor.laf?barcode=1" -> Some("http://www.kyobobook.co.kr/product/...")
///   href = "https://other.com/x"                  -> Some("https://other.com/x")
///   href = "javascript:void(0)"                   -> None
pub fn resolve_link(base: &str, href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
    {
        return None;
    }

    let url = match Url::parse(href) {
        Ok(url) => url,
        Err(_) => Url::parse(base).ok()?.join(href).ok()?,
    };

    match url.scheme() {
        "http" | "https" => Some(url.to_string()),
        _ => None,
    }
}
