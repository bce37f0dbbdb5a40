// src/query/tokens.rs
// =============================================================================
// Breaking titles, author names and ISBNs into search-friendly pieces.
//
// The same tokenizers feed two places:
// - the keyword query sent to the search page
// - the match filter that decides which search results are worth a fetch
// =============================================================================

use regex::Regex;
use std::sync::LazyLock;

// Brackets and everything after a subtitle separator
static SUBTITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([(\[{].*?[)\]}]|[/:\\].*$)").expect("subtitle pattern"));

// (title pattern, replacement), applied in order
static TITLE_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        // "(2010)", "(Omnibus)", "[Paperback]"...
        (
            r"(?i)[({\[](\d{4}|omnibus|anthology|hardcover|audiobook|audio\scd|paperback|turtleback|mass\s*market|edition|ed\.)[\])}]",
            "",
        ),
        // any bracketed run mentioning an edition
        (r"(?i)[({\[].*?(edition|ed.).*?[\]})]", ""),
        // thousands separators: 1,000 -> 1000
        (r"(\d+),(\d+)", "${1}${2}"),
        // hyphens only when preceded by whitespace
        (r"(\s-)", " "),
        (r#"[:,;!@$%^&*(){}.`~"\s\[\]/《》「」“”]"#, " "),
    ]
    .into_iter()
    .map(|(pat, repl)| (Regex::new(pat).expect("title pattern"), repl))
    .collect()
});

static AUTHOR_REMOVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[!@#$%^&*()（）「」{}`~"\s\[\]/]"#).expect("author remove pattern"));
static AUTHOR_SPLIT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[-+.:;,，。；：]").expect("author split pattern"));

const JOINERS: &[&str] = &["a", "and", "the", "&"];
const AUTHOR_STOP_WORDS: &[&str] = &["von", "van", "unknown"];

/// Splits a title into tokens.
///
/// `strip_joiners` drops "a", "and", "the" and "&". `strip_subtitle` drops
/// bracketed runs and everything after `/`, `:` or `\`, unless that would
/// leave a single character.
pub fn title_tokens(title: &str, strip_joiners: bool, strip_subtitle: bool) -> Vec<String> {
    let mut title = title.to_string();

    if strip_subtitle {
        let stripped = SUBTITLE.replace_all(&title, "");
        if stripped.chars().count() > 1 {
            title = stripped.into_owned();
        }
    }

    for (pattern, replacement) in TITLE_PATTERNS.iter() {
        title = pattern.replace_all(&title, *replacement).into_owned();
    }

    title
        .split_whitespace()
        .map(|token| token.trim().trim_matches('"').trim_matches('\''))
        .filter(|token| !token.is_empty())
        .filter(|token| !strip_joiners || !JOINERS.contains(&token.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

/// Splits author names into tokens, first author only when asked.
///
/// A comma means "Last, First", so the first part moves to the end. Tokens
/// of one character and the stop-words von/van/unknown are dropped.
pub fn author_tokens(authors: &[String], only_first_author: bool) -> Vec<String> {
    let take = if only_first_author { 1 } else { authors.len() };
    let mut tokens = Vec::new();

    for author in authors.iter().take(take) {
        let has_comma = author.contains(',');
        let replaced = AUTHOR_SPLIT.replace_all(author, " ");
        let mut parts: Vec<&str> = replaced.split_whitespace().collect();
        if has_comma && !parts.is_empty() {
            parts.rotate_left(1);
        }

        for part in parts {
            let token = AUTHOR_REMOVE.replace_all(part, "");
            let token = token.trim();
            if token.chars().count() > 1 && !AUTHOR_STOP_WORDS.contains(&token.to_lowercase().as_str()) {
                tokens.push(token.to_string());
            }
        }
    }

    tokens
}

/// Validates an ISBN-10 or ISBN-13 and returns it with separators removed.
pub fn check_isbn(raw: &str) -> Option<String> {
    let isbn: String = raw
        .to_uppercase()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == 'X')
        .collect();

    if isbn.len() != 10 && isbn.len() != 13 {
        return None;
    }

    // 0000000000, 1111111111111...
    let first = isbn.as_bytes()[0];
    if first.is_ascii_digit() && isbn.bytes().all(|b| b == first) {
        return None;
    }

    let valid = if isbn.len() == 10 {
        check_isbn10(&isbn)
    } else {
        check_isbn13(&isbn)
    };
    valid.then_some(isbn)
}

fn check_isbn10(isbn: &str) -> bool {
    let digits: Vec<u32> = match isbn[..9].chars().map(|c| c.to_digit(10)).collect() {
        Some(d) => d,
        None => return false,
    };
    let sum: u32 = digits.iter().enumerate().map(|(i, d)| (i as u32 + 1) * d).sum();
    let check = sum % 11;
    let expected = if check == 10 { 'X' } else { char::from_digit(check, 10).unwrap_or('?') };
    isbn.ends_with(expected)
}

fn check_isbn13(isbn: &str) -> bool {
    let digits: Vec<u32> = match isbn.chars().map(|c| c.to_digit(10)).collect() {
        Some(d) => d,
        None => return false,
    };
    let sum: u32 = digits[..12]
        .iter()
        .enumerate()
        .map(|(i, d)| if i % 2 == 0 { *d } else { d * 3 })
        .sum();
    let check = (10 - sum % 10) % 10;
    digits[12] == check
}
