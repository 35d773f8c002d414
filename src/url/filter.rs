use url::Url;

/// Href prefixes that never point at a crawlable page
const NON_PAGE_SCHEMES: &[&str] = &["javascript:", "mailto:", "tel:", "data:"];

/// Checks whether a raw href can name a page at all
///
/// Rejects empty hrefs, fragment-only hrefs and pseudo-schemes such as
/// `javascript:` and `mailto:`. Matching is case-insensitive.
///
/// # Examples
///
/// ```
/// use jsfinder::url::is_followable_href;
///
/// assert!(is_followable_href("/about"));
/// assert!(!is_followable_href("#top"));
/// assert!(!is_followable_href("JavaScript:void(0)"));
/// ```
pub fn is_followable_href(href: &str) -> bool {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return false;
    }

    let lower = href.to_ascii_lowercase();
    !NON_PAGE_SCHEMES.iter().any(|scheme| lower.starts_with(scheme))
}

/// Checks whether the URL path ends in one of `extensions`
///
/// Extensions include the leading dot and are compared case-insensitively.
/// The query string is not part of the path.
pub fn has_excluded_extension(url: &Url, extensions: &[String]) -> bool {
    let path = url.path().to_ascii_lowercase();
    extensions
        .iter()
        .any(|ext| path.ends_with(&ext.to_ascii_lowercase()))
}
