// src/detail/authors.rs
// =============================================================================
// Author list reconstruction.
//
// On a product page the contributors sit in front of the publisher span,
// each name followed by its role as plain text:
//
//   <span class="name"><a>A</a>, <a>B</a></span> 엮음
//   <span class="name"><a>C</a></span> 그림 |
//   <span title="출판사">...</span>
//
// A role label applies to the names *before* it, so the walk goes:
// 1. flatten the siblings before the publisher span into tokens,
//    Label(role text) or Value(names), in page order
// 2. fold over the tokens from the end, carrying the current role, and
//    record every name with the role in force
// 3. turn the records back into page order and apply the role filter
// =============================================================================

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::LazyLock;

use super::dom::{collapse_whitespace, text_excluding};

static PUBLISHER: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"span[title="출판사"]"#).expect("publisher selector"));

// "외" (et al.), "편" (edited), 著/編 markers
static NAME_MARKERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\s외|\s편|著 |\[著\]|編 )").expect("name marker pattern"));

/// Roles that make someone a primary author.
const PRIMARY_ROLES: &[&str] = &["지음", "저자"];

/// One sibling of the credit line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreditToken {
    /// Non-blank text between name spans, e.g. "지음" or "옮김 |"
    Label(String),
    /// Text of a `class="name"` element, possibly several names
    Value(String),
}

/// First pass: the siblings in front of the publisher span, in page order.
pub fn credit_tokens(document: &Html) -> Vec<CreditToken> {
    let Some(publisher) = document.select(&PUBLISHER).next() else {
        return Vec::new();
    };

    let mut tokens: Vec<CreditToken> = publisher
        .prev_siblings()
        .filter_map(|node| match node.value() {
            Node::Text(text) => {
                let text = text.trim();
                (!text.is_empty()).then(|| CreditToken::Label(text.to_string()))
            }
            Node::Element(element) if element.attr("class") == Some("name") => {
                let element = ElementRef::wrap(node)?;
                Some(CreditToken::Value(text_excluding(element, &["div", "script", "style"])))
            }
            _ => None,
        })
        .collect();

    // prev_siblings walks outward from the publisher span
    tokens.reverse();
    tokens
}

/// Splits a Value token into cleaned names.
fn split_names(value: &str, separator: char) -> Vec<String> {
    collapse_whitespace(value)
        .replace('／', "/")
        .split(separator)
        .map(|part| {
            let part = match part.rfind('(') {
                Some(pos) => &part[..pos],
                None => part,
            };
            NAME_MARKERS.replace_all(part, "").trim().to_string()
        })
        .collect()
}

/// Second pass: (name, role) pairs in page order.
///
/// Values that come after the last label on the page have no role and are
/// left out. A name credited twice keeps its first position.
pub fn assign_roles(tokens: &[CreditToken], separator: char) -> Vec<(String, String)> {
    let (_, mut credits) = tokens.iter().rev().fold(
        (None::<&str>, Vec::<(String, String)>::new()),
        |(role, mut credits), token| match token {
            CreditToken::Label(label) => (Some(label.as_str()), credits),
            CreditToken::Value(value) => {
                if let Some(role) = role {
                    for name in split_names(value, separator).into_iter().rev() {
                        if name.is_empty() {
                            continue;
                        }
                        credits.retain(|(n, _)| *n != name);
                        credits.push((name, role.to_string()));
                    }
                }
                (role, credits)
            }
        },
    );
    credits.reverse();
    credits
}

/// Role filter.
///
/// With `all_authors` every credited name is returned. Otherwise names with
/// no role or a primary role are kept. When the first kept name has some
/// other role (editor, illustrator...) it becomes the anchor: following names
/// with exactly that role are kept and the first different role ends the
/// list.
pub fn select_authors(credits: Vec<(String, String)>, all_authors: bool) -> Vec<String> {
    if all_authors {
        return credits.into_iter().map(|(name, _)| name).collect();
    }

    let mut authors = Vec::new();
    let mut anchor: Option<String> = None;
    for (name, role) in credits {
        if role.is_empty() || PRIMARY_ROLES.contains(&role.as_str()) {
            authors.push(name);
        } else if authors.is_empty() {
            authors.push(name);
            anchor = Some(role);
        } else if anchor.as_deref() == Some(role.as_str()) {
            authors.push(name);
        } else {
            break;
        }
    }
    authors
}

/// Authors of a product page.
pub fn parse_authors(document: &Html, foreign: bool, all_authors: bool) -> Vec<String> {
    let separator = if foreign { '/' } else { ',' };
    let credits = assign_roles(&credit_tokens(document), separator);
    select_authors(credits, all_authors)
}
