//! Main-content location and text normalization

use scraper::{ElementRef, Html, Node, Selector};

/// Collapses every whitespace run to a single space and trims the ends
///
/// The result feeds content fingerprinting, so it must be deterministic.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Finds the main content element: first matching candidate, then `<body>`,
/// then the document root
pub fn find_main<'a>(document: &'a Html, candidates: &[Selector]) -> ElementRef<'a> {
    for selector in candidates {
        if let Some(element) = document.select(selector).next() {
            return element;
        }
    }

    Selector::parse("body")
        .ok()
        .and_then(|body| document.select(&body).next())
        .unwrap_or_else(|| document.root_element())
}

/// Text of `element` with excluded subtrees skipped, whitespace-normalized
pub fn sanitized_text(element: ElementRef<'_>, exclude: &[Selector]) -> String {
    let mut raw = String::new();
    collect_text(element, exclude, &mut raw);
    normalize_whitespace(&raw)
}

fn collect_text(element: ElementRef<'_>, exclude: &[Selector], out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                out.push_str(text);
                out.push(' ');
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if exclude.iter().any(|s| s.matches(&child_element)) {
                        continue;
                    }
                    collect_text(child_element, exclude, out);
                }
            }
            _ => {}
        }
    }
}

/// Page title from `<title>`, falling back to the first `<h1>`
pub fn extract_title(document: &Html) -> Option<String> {
    ["title", "h1"].iter().find_map(|tag| {
        let selector = Selector::parse(tag).ok()?;
        document
            .select(&selector)
            .map(|element| normalize_whitespace(&element.text().collect::<String>()))
            .find(|s| !s.is_empty())
    })
}
