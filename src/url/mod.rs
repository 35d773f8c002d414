//! URL handling module for jsfinder
//!
//! This module provides URL normalization, reference resolution, origin
//! comparison and link filtering.

mod filter;
mod normalize;
mod origin;

pub use filter::{has_excluded_extension, is_followable_href};
pub use normalize::{normalize_parsed, normalize_url, parse_seed, resolve_url};
pub use origin::Origin;

use url::Url;

/// Decides whether a resolved link belongs to the crawl
///
/// A link is followed when it is same-origin with the session seed and its
/// path does not end in an excluded extension. The check runs on the
/// normalized form, so callers can use the returned URL as the visited key.
pub fn crawl_candidate(link: &Url, origin: &Origin, excluded: &[String]) -> Option<Url> {
    let normalized = normalize_parsed(link.clone()).ok()?;

    if !origin.contains(&normalized) {
        return None;
    }

    if has_excluded_extension(&normalized, excluded) {
        return None;
    }

    Some(normalized)
}
