//! HTML parser for extracting links and script references
//!
//! This module handles parsing HTML content to extract:
//! - Links that may lead to further pages (from <a> tags)
//! - JavaScript resources (from <script src> tags)
//!
//! Everything here is pure: no I/O and no shared state.

use crate::url::{is_followable_href, resolve_url};
use scraper::{Html, Selector};
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default)]
pub struct ParsedPage {
    /// Candidate links, resolved against the page URL
    pub links: Vec<Url>,

    /// JavaScript resources referenced by the page, resolved and deduplicated
    pub scripts: Vec<Url>,
}

/// Parses HTML content and extracts links and script references
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags anywhere in the document
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links (same page anchors)
/// - Anything that is not HTTP(S) after resolution
///
/// Same-origin and extension filtering are left to the caller.
///
/// # Example
///
/// ```
/// use jsfinder::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<script src="/a.js"></script><a href="/p2">Next</a>"#;
/// let base_url = Url::parse("https://x.test/").unwrap();
/// let parsed = parse_html(html, &base_url);
/// assert_eq!(parsed.links[0].as_str(), "https://x.test/p2");
/// assert_eq!(parsed.scripts[0].as_str(), "https://x.test/a.js");
/// ```
pub fn parse_html(html: &str, base_url: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        links: extract_links(&document, base_url),
        scripts: extract_script_references(&document, base_url),
    }
}

/// Extracts all candidate page links from the document
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .filter(|href| is_followable_href(href))
        .filter_map(|href| resolve_http(href, base_url))
        .collect()
}

/// Extracts JavaScript resources referenced through `<script src>`
///
/// A source counts as JavaScript when its path ends in `.js` or `.mjs`; any
/// query string is kept, the fragment is dropped.
pub fn extract_script_references(document: &Html, base_url: &Url) -> Vec<Url> {
    let Ok(selector) = Selector::parse("script[src]") else {
        return Vec::new();
    };

    let mut scripts: Vec<Url> = Vec::new();
    for src in document
        .select(&selector)
        .filter_map(|element| element.value().attr("src"))
    {
        let Some(mut url) = resolve_http(src, base_url) else {
            continue;
        };
        url.set_fragment(None);

        if is_script_path(url.path()) && !scripts.contains(&url) {
            scripts.push(url);
        }
    }
    scripts
}

fn is_script_path(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    path.ends_with(".js") || path.ends_with(".mjs")
}

/// Resolves a reference and keeps it only if it is HTTP(S)
fn resolve_http(reference: &str, base_url: &Url) -> Option<Url> {
    let url = resolve_url(base_url, reference).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}
