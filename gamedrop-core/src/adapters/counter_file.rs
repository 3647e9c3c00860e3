//! Per-artifact download counters persisted as one JSON document
//!
//! The document is `{ "<artifact id>": <count>, ... }`, pretty-printed, in
//! `downloadCounts.json`. Every access holds an in-process mutex and an
//! exclusive lock on a sidecar `.lock` file; writes go to a temporary file in
//! the same directory which is then renamed over the document.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use fs2::FileExt;
use tempfile::NamedTempFile;

use crate::domain::result::{Error, Result};

pub const COUNTERS_FILE: &str = "downloadCounts.json";

pub type Counters = BTreeMap<String, u64>;

/// Exclusive lock on the sidecar file, released on drop
struct FileLock {
    file: File,
}

impl FileLock {
    fn acquire(path: &Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)?;
        file.lock_exclusive()?;
        Ok(Self { file })
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Single-owner handle on the counters document
pub struct CounterDocument {
    path: PathBuf,
    lock_path: PathBuf,
    guard: Mutex<()>,
}

impl CounterDocument {
    pub fn new(data_dir: &Path) -> Self {
        let path = data_dir.join(COUNTERS_FILE);
        let lock_path = data_dir.join(format!("{}.lock", COUNTERS_FILE));
        Self {
            path,
            lock_path,
            guard: Mutex::new(()),
        }
    }

    /// Read the whole document
    pub fn snapshot(&self) -> Result<Counters> {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::storage("counter lock poisoned"))?;
        let _file_lock = FileLock::acquire(&self.lock_path)?;
        self.read()
    }

    /// Read-modify-write the document as one unit
    ///
    /// `f` sees the current counters; its changes are persisted before the
    /// locks are released. If `f` fails nothing is written.
    pub fn mutate<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Counters) -> Result<T>,
    {
        let _guard = self
            .guard
            .lock()
            .map_err(|_| Error::storage("counter lock poisoned"))?;
        let _file_lock = FileLock::acquire(&self.lock_path)?;

        let mut counters = self.read()?;
        let value = f(&mut counters)?;
        self.write(&counters)?;
        Ok(value)
    }

    fn read(&self) -> Result<Counters> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Counters::new()),
            Err(e) => return Err(e.into()),
        };
        if contents.trim().is_empty() {
            return Ok(Counters::new());
        }
        serde_json::from_str(&contents).map_err(|e| {
            Error::storage(format!("{} is not a valid counter document: {}", self.path.display(), e))
        })
    }

    fn write(&self, counters: &Counters) -> Result<()> {
        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut temp = NamedTempFile::new_in(dir)?;
        let json = serde_json::to_string_pretty(counters)?;
        temp.write_all(json.as_bytes())?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path)
            .map_err(|e| Error::storage(format!("Failed to write {}: {}", self.path.display(), e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let doc = CounterDocument::new(dir.path());
        assert!(doc.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_mutate_persists_pretty_json() {
        let dir = TempDir::new().unwrap();
        let doc = CounterDocument::new(dir.path());

        doc.mutate(|c| {
            *c.entry("g1".to_string()).or_insert(0) += 1;
            Ok(())
        })
        .unwrap();

        let raw = fs::read_to_string(dir.path().join(COUNTERS_FILE)).unwrap();
        assert!(raw.contains("\n"));
        let parsed: Counters = serde_json::from_str(&raw).unwrap();
        assert_eq!(parsed.get("g1"), Some(&1));
    }

    #[test]
    fn test_reads_legacy_document() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(COUNTERS_FILE), r#"{"g1": 4, "g2": 1}"#).unwrap();

        let doc = CounterDocument::new(dir.path());
        let counters = doc.snapshot().unwrap();
        assert_eq!(counters.get("g1"), Some(&4));
        assert_eq!(counters.get("g2"), Some(&1));
    }

    #[test]
    fn test_corrupt_document_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(COUNTERS_FILE), "{not json").unwrap();

        let doc = CounterDocument::new(dir.path());
        assert!(matches!(doc.snapshot(), Err(Error::Storage(_))));
        assert!(doc.mutate(|_| Ok(())).is_err());
        // Left untouched
        assert_eq!(fs::read_to_string(dir.path().join(COUNTERS_FILE)).unwrap(), "{not json");
    }

    #[test]
    fn test_failed_mutation_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let doc = CounterDocument::new(dir.path());
        doc.mutate(|c| {
            c.insert("g1".into(), 2);
            Ok(())
        })
        .unwrap();

        let result: Result<()> = doc.mutate(|c| {
            c.insert("g1".into(), 99);
            Err(Error::storage("abort"))
        });
        assert!(result.is_err());
        assert_eq!(doc.snapshot().unwrap().get("g1"), Some(&2));
    }

    #[test]
    fn test_concurrent_increments_are_not_lost() {
        let dir = TempDir::new().unwrap();
        let doc = Arc::new(CounterDocument::new(dir.path()));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let doc = Arc::clone(&doc);
                thread::spawn(move || {
                    for _ in 0..10 {
                        doc.mutate(|c| {
                            *c.entry("g1".to_string()).or_insert(0) += 1;
                            Ok(())
                        })
                        .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(doc.snapshot().unwrap().get("g1"), Some(&80));
    }
}
