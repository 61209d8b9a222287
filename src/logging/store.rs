//! Destinations for per-invocation log streams.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Which of the two invocation streams a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogKind {
    Log,
    Error,
}

impl LogKind {
    /// Suffix used to name the destination of this stream.
    pub fn suffix(&self) -> &'static str {
        match self {
            LogKind::Log => "logs",
            LogKind::Error => "errors",
        }
    }
}

/// Append-only byte destination for one stream of one invocation.
pub type LogDestination = Box<dyn Write + Send>;

/// Opens log destinations addressed by invocation id.
pub trait LogStore: Send + Sync {
    /// Open (or create) the destination for `kind` of invocation `id`.
    fn open(&self, id: &str, kind: LogKind) -> io::Result<LogDestination>;

    /// Human readable location of a destination, used in error reports.
    fn locate(&self, id: &str, kind: LogKind) -> PathBuf;
}

/// Stores each stream as `{dir}/{id}_{logs|errors}.log`.
#[derive(Debug, Clone)]
pub struct FileLogStore {
    dir: PathBuf,
}

impl FileLogStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl LogStore for FileLogStore {
    fn open(&self, id: &str, kind: LogKind) -> io::Result<LogDestination> {
        let file = OpenOptions::new()
            .append(true)
            .create(true)
            .open(self.locate(id, kind))?;
        Ok(Box::new(file))
    }

    fn locate(&self, id: &str, kind: LogKind) -> PathBuf {
        self.dir.join(format!("{}_{}.log", id, kind.suffix()))
    }
}

type Buffers = Arc<Mutex<HashMap<(String, LogKind), Vec<u8>>>>;

/// In-memory store; contents stay readable after the sink is closed.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogStore {
    buffers: Buffers,
}

impl MemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written to the given stream, lossily decoded.
    pub fn contents(&self, id: &str, kind: LogKind) -> String {
        lock(&self.buffers)
            .get(&(id.to_string(), kind))
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }

    /// Lines written to the given stream.
    pub fn lines(&self, id: &str, kind: LogKind) -> Vec<String> {
        self.contents(id, kind).lines().map(str::to_string).collect()
    }
}

impl LogStore for MemoryLogStore {
    fn open(&self, id: &str, kind: LogKind) -> io::Result<LogDestination> {
        let key = (id.to_string(), kind);
        lock(&self.buffers).entry(key.clone()).or_default();
        Ok(Box::new(MemoryWriter {
            buffers: self.buffers.clone(),
            key,
        }))
    }

    fn locate(&self, id: &str, kind: LogKind) -> PathBuf {
        PathBuf::from(format!("memory://{}_{}", id, kind.suffix()))
    }
}

struct MemoryWriter {
    buffers: Buffers,
    key: (String, LogKind),
}

impl Write for MemoryWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        lock(&self.buffers)
            .entry(self.key.clone())
            .or_default()
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

// A poisoned buffer map is still usable for appends.
fn lock(buffers: &Buffers) -> MutexGuard<'_, HashMap<(String, LogKind), Vec<u8>>> {
    buffers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_store_paths() {
        let store = FileLogStore::new("/mnt/logs");
        assert_eq!(
            store.locate("abc", LogKind::Log),
            PathBuf::from("/mnt/logs/abc_logs.log")
        );
        assert_eq!(
            store.locate("abc", LogKind::Error),
            PathBuf::from("/mnt/logs/abc_errors.log")
        );
    }

    #[test]
    fn test_file_store_appends() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path());

        let mut first = store.open("inv", LogKind::Log).unwrap();
        first.write_all(b"one\n").unwrap();
        drop(first);
        let mut second = store.open("inv", LogKind::Log).unwrap();
        second.write_all(b"two\n").unwrap();
        drop(second);

        let written = std::fs::read_to_string(dir.path().join("inv_logs.log")).unwrap();
        assert_eq!(written, "one\ntwo\n");
    }

    #[test]
    fn test_file_store_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileLogStore::new(dir.path().join("missing"));
        assert!(store.open("inv", LogKind::Error).is_err());
    }

    #[test]
    fn test_memory_store_keeps_streams_apart() {
        let store = MemoryLogStore::new();
        store.open("a", LogKind::Log).unwrap().write_all(b"log\n").unwrap();
        store.open("a", LogKind::Error).unwrap().write_all(b"err\n").unwrap();
        store.open("b", LogKind::Log).unwrap().write_all(b"other\n").unwrap();

        assert_eq!(store.lines("a", LogKind::Log), vec!["log"]);
        assert_eq!(store.lines("a", LogKind::Error), vec!["err"]);
        assert_eq!(store.lines("b", LogKind::Log), vec!["other"]);
        assert!(store.lines("b", LogKind::Error).is_empty());
    }
}
