use std::collections::HashSet;
use std::sync::Mutex;

/// Normalized URLs already claimed by a crawl session
///
/// `insert` is an atomic test-and-set: exactly one caller wins for a given
/// URL, so a page is never fetched twice in the same session.
#[derive(Debug, Default)]
pub struct VisitedSet {
    urls: Mutex<HashSet<String>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims `url`, returning true if it was not yet visited
    pub fn insert(&self, url: &str) -> bool {
        let mut urls = self.urls.lock().unwrap_or_else(|p| p.into_inner());
        if urls.contains(url) {
            return false;
        }
        urls.insert(url.to_string())
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(url)
    }

    pub fn len(&self) -> usize {
        self.urls.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
