// src/detail/page.rs
// =============================================================================
// Scrapes one product page into a DetailPage.
//
// This is the synchronous half of a worker: it takes the downloaded HTML,
// makes sure it really is a product page, and pulls out every field. The
// result holds only owned data, so the async half (cover probing, pushing the
// record) never keeps the parsed DOM across an await.
//
// Required: Kyobobook id (from the URL), title, at least one author.
// Everything else is optional; a field that fails to parse is logged and
// left empty.
// =============================================================================

use anyhow::{anyhow, bail, Result};
use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::{error, warn};

use super::authors::parse_authors;
use super::dom::{collapse_whitespace, sanitize_children, text_excluding};
use crate::config::Prefs;
use crate::metadata::Metadata;
use crate::query::{is_foreign_book_url, parse_book_id, resolve_link};

/// Suffix of every page title on the store. A page whose title is only the
/// suffix is the "nothing found" placeholder.
const PAGE_TITLE_SUFFIX: &str = "- 인터넷교보문고";

fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

static PAGE_TITLE: LazyLock<Selector> = LazyLock::new(|| selector("title"));
static ERROR_MESSAGE: LazyLock<Selector> = LazyLock::new(|| selector("#errorMessage"));
static TITLE: LazyLock<Selector> = LazyLock::new(|| selector("div.title_icon > h1.title"));
static SERIES: LazyLock<Selector> = LazyLock::new(|| selector("div.title_icon > div.info"));
static BASIC_INFO: LazyLock<Selector> = LazyLock::new(|| selector("div.book_info_basic2"));
static RATING_IMG: LazyLock<Selector> = LazyLock::new(|| selector(r##"a[href="#review"] > img"##));
static DESCRIPTION: LazyLock<Selector> = LazyLock::new(|| selector("dl.book_info_detail > dd.content"));
static SECTION_HEADING: LazyLock<Selector> = LazyLock::new(|| selector("div.book_info > h2.book_d_title"));
static OG_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector(r#"meta[property="og:image"]"#));
static BOX_IMAGE: LazyLock<Selector> = LazyLock::new(|| selector("p.book_img_box > img"));
static CATEGORY: LazyLock<Selector> =
    LazyLock::new(|| selector("div.book_info > div.belong_area > ul.locate > li"));
static PUBLISHER: LazyLock<Selector> = LazyLock::new(|| selector(r#"span[title="출판사"]"#));
static LINK: LazyLock<Selector> = LazyLock::new(|| selector("a"));
static DATE: LazyLock<Selector> = LazyLock::new(|| selector("span.date"));

static ISBN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)isbn(?:-13)?\s?:\s?(\S*)").expect("isbn pattern"));
static RATING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"5점 만점에 (\d)점").expect("rating pattern"));
static FULL_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}년\s*\d{1,2}월\s*\d{1,2}일").expect("date pattern"));
static YEAR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{4})년").expect("year pattern"));
static MONTH: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})월").expect("month pattern"));
static DAY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(\d{1,2})일").expect("day pattern"));
static LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)언어\s?:\s?(\S*)").expect("language pattern"));

// Language names seen on the site -> ISO 639-2 code
static LANGUAGES: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    let table: &[(&str, &[&str])] = &[
        ("eng", &["English", "Englisch", "ENG", "영어"]),
        ("zho", &["Chinese", "chinois", "chi", "중국어"]),
        ("fra", &["French", "Francais", "FRA", "프랑스어"]),
        ("ita", &["Italian", "Italiano", "ITA"]),
        ("dut", &["Dutch", "DUT"]),
        ("deu", &["German", "Deutsch", "GER", "독일어"]),
        ("spa", &["Spanish", "Español", "Espaniol", "SPA"]),
        ("jpn", &["Japanese", "日本語", "JAP", "일본어"]),
        ("por", &["Portuguese", "Portugues", "POR"]),
        ("kor", &["Korean", "한국어", "KOR"]),
    ];
    table
        .iter()
        .flat_map(|(code, names)| names.iter().map(move |name| (*name, *code)))
        .collect()
});

/// Everything scraped from one product page.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailPage {
    pub kyobobook_id: String,
    pub title: String,
    pub series: Option<(String, f64)>,
    pub authors: Vec<String>,
    pub isbn: Option<String>,
    pub rating: Option<u8>,
    pub comments: Option<String>,
    /// Cover URLs in order of preference, not yet verified
    pub cover_candidates: Vec<String>,
    pub tags: Vec<String>,
    pub publisher: Option<String>,
    pub pubdate: Option<NaiveDate>,
    pub language: Option<String>,
}

impl DetailPage {
    /// Builds the outgoing record. `cover_url` is the verified cover, if any.
    pub fn into_metadata(self, cover_url: Option<String>, relevance: usize) -> Metadata {
        let mut mi = Metadata::new(self.title, self.authors);
        if let Some((series, index)) = self.series {
            mi.series = Some(series);
            mi.series_index = Some(index);
        }
        mi.identifiers.kyobobook = Some(self.kyobobook_id);
        mi.identifiers.isbn = self.isbn.clone();
        mi.isbn = self.isbn;
        mi.rating = self.rating;
        mi.comments = self.comments;
        mi.has_cover = cover_url.is_some();
        mi.cover_url = cover_url;
        mi.tags = self.tags;
        mi.publisher = self.publisher;
        mi.pubdate = self.pubdate;
        mi.language = self.language;
        mi.source_relevance = relevance;
        mi
    }
}

/// Logs a failed optional field and moves on without it.
fn optional<T>(field: &str, url: &str, result: Result<Option<T>>) -> Option<T> {
    match result {
        Ok(value) => value,
        Err(e) => {
            error!("error parsing {} for url {}: {:#}", field, url, e);
            None
        }
    }
}

/// Parses a downloaded product page.
///
/// Errors mean the candidate is unusable: not a product page, or missing
/// title, authors or id.
pub fn parse_detail_page(html: &str, url: &str, prefs: &Prefs) -> Result<DetailPage> {
    let document = Html::parse_document(html);
    check_details_page(&document)?;

    let kyobobook_id = parse_book_id(url);
    let title = parse_title(&document);
    let authors = parse_authors(&document, is_foreign_book_url(url), prefs.get_all_authors);

    let (Some(kyobobook_id), Some(title), false) = (kyobobook_id.clone(), title.clone(), authors.is_empty()) else {
        bail!(
            "could not find title/authors/kyobobook id (kyobobook: {:?} title: {:?} authors: {:?})",
            kyobobook_id,
            title,
            authors
        );
    };

    let (publisher, pubdate) = parse_publisher_and_date(&document);

    Ok(DetailPage {
        kyobobook_id,
        title,
        series: parse_series(&document),
        authors,
        isbn: parse_isbn(&document),
        rating: optional("rating", url, parse_rating(&document)),
        comments: parse_comments(&document, prefs.append_toc),
        cover_candidates: cover_candidates(&document, url),
        tags: parse_tags(&document, prefs.get_category),
        publisher,
        pubdate,
        language: parse_language(&document),
    })
}

/// Rejects search placeholders and error pages.
pub fn check_details_page(document: &Html) -> Result<()> {
    if let Some(title) = document.select(&PAGE_TITLE).next() {
        let page_title = title.text().collect::<String>();
        let page_title = page_title.trim();
        let book_part = page_title.strip_suffix(PAGE_TITLE_SUFFIX).unwrap_or(page_title);
        if book_part.trim().is_empty() {
            bail!("page title {:?} is not a product page", page_title);
        }
    }

    if let Some(message) = document.select(&ERROR_MESSAGE).next() {
        let text = collapse_whitespace(&message.text().collect::<String>());
        return Err(anyhow!("store returned an error page: {}", text));
    }

    Ok(())
}

pub fn parse_title(document: &Html) -> Option<String> {
    let node = document.select(&TITLE).next()?;
    let title = collapse_whitespace(&text_excluding(node, &["script", "style"]));
    (!title.is_empty()).then_some(title)
}

/// "역사인물찾기 | 10" -> ("역사인물찾기", 10.0). An index that is not a
/// number drops the whole series.
pub fn parse_series(document: &Html) -> Option<(String, f64)> {
    let info = document.select(&SERIES).next()?.text().collect::<String>();
    let mut parts = info.split('|');
    let name = parts.next()?.trim().to_string();
    let index = parts.next()?.trim().parse::<f64>().ok()?;
    (!name.is_empty()).then_some((name, index))
}

fn basic_info_text(document: &Html) -> Option<String> {
    document
        .select(&BASIC_INFO)
        .next()
        .map(|node| node.text().collect::<String>())
}

pub fn parse_isbn(document: &Html) -> Option<String> {
    let text = basic_info_text(document)?;
    ISBN.captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|isbn| !isbn.is_empty())
}

/// Star rating from the review image alt text "5점 만점에 4점".
pub fn parse_rating(document: &Html) -> Result<Option<u8>> {
    let Some(img) = document.select(&RATING_IMG).next() else {
        return Ok(None);
    };
    let alt = img.value().attr("alt").unwrap_or_default();
    let caps = RATING
        .captures(alt)
        .ok_or_else(|| anyhow!("unexpected rating text {:?}", alt))?;
    let value: u8 = caps[1].parse()?;
    if value > 5 {
        bail!("rating {} out of range", value);
    }
    Ok(Some(value))
}

/// Description, optionally followed by the table of contents.
pub fn parse_comments(document: &Html, append_toc: bool) -> Option<String> {
    static SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r" {2,}").expect("spaces pattern"));

    let mut comments = String::new();
    if let Some(description) = document.select(&DESCRIPTION).next() {
        comments.push_str(&SPACES.replace_all(&sanitize_children(description), " "));
    }

    if append_toc {
        if let Some(toc) = table_of_contents(document) {
            comments.push_str("<h3>[목차]</h3><div id=\"toc\">");
            comments.push_str(&sanitize_children(toc));
            comments.push_str("</div>");
        }
    }

    let comments = comments.trim().to_string();
    (!comments.is_empty()).then_some(comments)
}

// The first <div> after the "목차" heading
fn table_of_contents(document: &Html) -> Option<ElementRef<'_>> {
    let heading = document
        .select(&SECTION_HEADING)
        .find(|h| h.text().collect::<String>().contains("목차"))?;
    heading
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "div")
}

/// Cover URLs worth probing, best first. Placeholder images are skipped.
pub fn cover_candidates(document: &Html, page_url: &str) -> Vec<String> {
    let og_image = document
        .select(&OG_IMAGE)
        .filter_map(|meta| meta.value().attr("content"));
    let box_image = document
        .select(&BOX_IMAGE)
        .filter_map(|img| img.value().attr("src"));

    let mut candidates: Vec<String> = Vec::new();
    for src in og_image.take(1).chain(box_image.take(1)) {
        if src.contains("noimage") {
            continue;
        }
        if let Some(url) = resolve_link(page_url, src) {
            if !candidates.contains(&url) {
                candidates.push(url);
            }
        }
    }
    candidates
}

/// Category breadcrumb as "[국내도서 > 역사/문화 > ...]" tags.
pub fn parse_tags(document: &Html, get_category: bool) -> Vec<String> {
    if !get_category {
        return Vec::new();
    }
    document
        .select(&CATEGORY)
        .map(|li| collapse_whitespace(&li.text().collect::<String>()))
        .filter(|genre| !genre.is_empty())
        .map(|genre| format!("[{}]", genre))
        .collect()
}

pub fn parse_publisher_and_date(document: &Html) -> (Option<String>, Option<NaiveDate>) {
    let Some(span) = document.select(&PUBLISHER).next() else {
        return (None, None);
    };

    let publisher = span
        .select(&LINK)
        .next()
        .map(|a| a.text().collect::<String>().trim().to_string())
        .filter(|p| !p.is_empty());

    let pubdate = span
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| parent.select(&DATE).next())
        .and_then(|date| {
            let text = date.text().collect::<String>();
            match FULL_DATE.find(&text) {
                Some(m) => parse_korean_date(m.as_str()),
                None => {
                    let date = parse_korean_date(&text);
                    if date.is_some() {
                        warn!("partial publication date {:?}", text.trim());
                    }
                    date
                }
            }
        });

    (publisher, pubdate)
}

/// "2011년 05월 02일" -> 2011-05-02. Month and day default to 1 when
/// missing; no year means no date.
pub fn parse_korean_date(text: &str) -> Option<NaiveDate> {
    let capture = |re: &Regex| -> Option<u32> { re.captures(text)?.get(1)?.as_str().parse().ok() };

    let year = capture(&*YEAR)? as i32;
    let (month, day) = match capture(&*MONTH) {
        Some(month) => (month, capture(&*DAY).unwrap_or(1)),
        None => (1, 1),
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Language code from "언어 : 한국어". Korean when the page names none.
pub fn parse_language(document: &Html) -> Option<String> {
    let text = basic_info_text(document)?;
    let raw = LANGUAGE
        .captures(&text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|raw| !raw.is_empty())
        .unwrap_or("Korean");

    if let Some(code) = LANGUAGES.get(raw) {
        return Some(code.to_string());
    }
    // already a code we know
    let lower = raw.to_lowercase();
    LANGUAGES
        .values()
        .find(|code| **code == lower)
        .map(|code| code.to_string())
}
