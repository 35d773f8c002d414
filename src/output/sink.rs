use super::ResourceSink;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Writes one resource per line to any writer
///
/// Each line is flushed as it is written so that a consumer reading the
/// stream sees results while the crawl is still running.
pub struct LineSink<W: Write + Send> {
    writer: Mutex<BufWriter<W>>,
}

impl<W: Write + Send> LineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(BufWriter::new(writer)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BufWriter<W>> {
        self.writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl LineSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl LineSink<File> {
    /// Creates or truncates the file at `path`
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        File::create(path).map(Self::new)
    }
}

impl<W: Write + Send> ResourceSink for LineSink<W> {
    fn write(&self, resource: &str) -> io::Result<()> {
        let mut writer = self.lock();
        writeln!(writer, "{resource}")?;
        writer.flush()
    }

    fn flush(&self) -> io::Result<()> {
        self.lock().flush()
    }
}

/// Collects resources in memory, in write order
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<String>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of every resource written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl ResourceSink for MemorySink {
    fn write(&self, resource: &str) -> io::Result<()> {
        self.lines
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(resource.to_string());
        Ok(())
    }
}
