// src/detail/dom.rs
// =============================================================================
// Small helpers on top of scraper's DOM.
//
// - text_excluding: element text without what sits inside <script>, <style>...
// - collapse_whitespace: "a \n\t b" -> "a b"
// - sanitize_children: re-serialize a subtree keeping only harmless
//   formatting tags, no attributes, no scripts
// =============================================================================

use ego_tree::NodeRef;
use scraper::{ElementRef, Node};

// Removed together with everything inside them
const DROPPED: &[&str] = &[
    "script", "style", "iframe", "object", "embed", "form", "input", "button", "select",
    "textarea", "noscript", "head", "title", "meta", "link",
];

// Kept, with attributes stripped. Anything else is replaced by its children.
const KEPT: &[&str] = &[
    "p", "div", "br", "hr", "b", "strong", "i", "em", "u", "s", "sub", "sup", "ul", "ol", "li",
    "dl", "dt", "dd", "h1", "h2", "h3", "h4", "h5", "h6", "blockquote", "pre", "code", "table",
    "thead", "tbody", "tr", "td", "th",
];

const VOID: &[&str] = &["br", "hr"];

/// Text of `element`, skipping text nested inside any of the `skip` tags.
pub fn text_excluding(element: ElementRef<'_>, skip: &[&str]) -> String {
    let mut out = String::new();
    for node in element.descendants() {
        if let Node::Text(text) = node.value() {
            let hidden = node
                .ancestors()
                .take_while(|a| a.id() != element.id())
                .any(|a| matches!(a.value(), Node::Element(e) if skip.contains(&e.name())));
            if !hidden {
                out.push_str(text);
            }
        }
    }
    out
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sanitized HTML of the children of `element` (the element's own tag is
/// not included).
pub fn sanitize_children(element: ElementRef<'_>) -> String {
    let mut out = String::new();
    for child in element.children() {
        write_node(child, &mut out);
    }
    out.trim().to_string()
}

fn write_node(node: NodeRef<'_, Node>, out: &mut String) {
    match node.value() {
        Node::Text(text) => escape_text(text, out),
        Node::Element(element) => {
            let name = element.name();
            if DROPPED.contains(&name) {
                return;
            }
            let keep = KEPT.contains(&name);
            if keep && VOID.contains(&name) {
                out.push('<');
                out.push_str(name);
                out.push_str("/>");
                return;
            }
            if keep {
                out.push('<');
                out.push_str(name);
                out.push('>');
            }
            for child in node.children() {
                write_node(child, out);
            }
            if keep {
                out.push_str("</");
                out.push_str(name);
                out.push('>');
            }
        }
        // document and fragment roots; comments and doctypes have no children
        _ => {
            for child in node.children() {
                write_node(child, out);
            }
        }
    }
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}
