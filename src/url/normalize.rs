use crate::{UrlError, UrlResult};
use url::Url;

/// Normalizes a URL into its visited-set key
///
/// # Normalization Steps
///
/// 1. Parse the URL; reject if malformed
/// 2. Reject anything but `http` and `https`
/// 3. Require a host (the parser lowercases it and elides default ports)
/// 4. Remove fragment (everything after #)
/// 5. Remove empty query string (trailing ?)
///
/// Path, query order and scheme are kept as they are: two URLs that differ
/// there may serve different documents.
///
/// # Examples
///
/// ```
/// use jsfinder::url::normalize_url;
///
/// let url = normalize_url("http://EXAMPLE.com:80/page?#top").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/page");
/// ```
pub fn normalize_url(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str).map_err(|e| UrlError::Parse(e.to_string()))?;
    normalize_parsed(url)
}

/// Same as [`normalize_url`] for an already parsed URL
pub fn normalize_parsed(mut url: Url) -> UrlResult<Url> {
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlError::MissingHost);
    }

    url.set_fragment(None);

    if url.query() == Some("") {
        url.set_query(None);
    }

    Ok(url)
}

/// Resolves `reference` against `base` following RFC 3986
pub fn resolve_url(base: &Url, reference: &str) -> UrlResult<Url> {
    base.join(reference.trim())
        .map_err(|e| UrlError::Parse(format!("{reference}: {e}")))
}

/// Parses a seed line, assuming `https://` when no scheme is given
pub fn parse_seed(seed: &str) -> UrlResult<Url> {
    let seed = seed.trim();
    if seed.is_empty() {
        return Err(UrlError::Parse("empty seed".to_string()));
    }

    if seed.contains("://") {
        normalize_url(seed)
    } else {
        normalize_url(&format!("https://{seed}"))
    }
}
