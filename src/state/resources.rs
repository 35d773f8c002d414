use crate::output::ResourceSink;
use std::collections::HashSet;
use std::io;
use std::sync::{Arc, Mutex};

/// Deduplicated set of discovered resources backed by a sink
///
/// A resource reaches the sink on its first insertion only. The write happens
/// while the set lock is held, so output lines never interleave and are never
/// duplicated.
pub struct ResourceSet {
    seen: Mutex<HashSet<String>>,
    sink: Arc<dyn ResourceSink>,
}

impl ResourceSet {
    pub fn new(sink: Arc<dyn ResourceSink>) -> Self {
        Self {
            seen: Mutex::new(HashSet::new()),
            sink,
        }
    }

    /// Records `resource`, returning true if it was new
    ///
    /// A sink failure is returned after the resource is recorded; retrying
    /// the insert does not write it again.
    pub fn insert(&self, resource: &str) -> io::Result<bool> {
        let mut seen = self.seen.lock().unwrap_or_else(|p| p.into_inner());
        if !seen.insert(resource.to_string()) {
            return Ok(false);
        }
        self.sink.write(resource)?;
        Ok(true)
    }

    pub fn contains(&self, resource: &str) -> bool {
        self.seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(resource)
    }

    pub fn len(&self) -> usize {
        self.seen.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns every resource, sorted
    pub fn snapshot(&self) -> Vec<String> {
        let mut all: Vec<String> = self
            .seen
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .iter()
            .cloned()
            .collect();
        all.sort();
        all
    }

    pub fn flush(&self) -> io::Result<()> {
        self.sink.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::MemorySink;

    #[test]
    fn test_insert_writes_once() {
        let sink = Arc::new(MemorySink::new());
        let set = ResourceSet::new(sink.clone());

        assert!(set.insert("https://x.test/app.js").unwrap());
        assert!(!set.insert("https://x.test/app.js").unwrap());
        assert!(set.insert("https://x.test/vendor.js").unwrap());

        assert_eq!(
            sink.lines(),
            vec!["https://x.test/app.js", "https://x.test/vendor.js"]
        );
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_concurrent_inserts_write_once() {
        let sink = Arc::new(MemorySink::new());
        let set = Arc::new(ResourceSet::new(sink.clone()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || {
                    for i in 0..50 {
                        set.insert(&format!("https://x.test/{i}.js")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(sink.lines().len(), 50);
        assert_eq!(set.snapshot().len(), 50);
    }

    struct FailingSink;

    impl ResourceSink for FailingSink {
        fn write(&self, _resource: &str) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_sink_failure_keeps_resource_recorded() {
        let set = ResourceSet::new(Arc::new(FailingSink));

        assert!(set.insert("https://x.test/app.js").is_err());
        assert!(set.contains("https://x.test/app.js"));
        assert!(!set.insert("https://x.test/app.js").unwrap());
    }
}
