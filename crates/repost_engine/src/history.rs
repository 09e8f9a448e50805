use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use engine_logging::engine_warn;
use repost_core::HistoryEntry;

use crate::persist::{append_line, AtomicFileWriter, PersistError};

#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    #[error("history storage error: {0}")]
    Persist(#[from] PersistError),
    #[error("history io error: {0}")]
    Io(#[from] io::Error),
    #[error("history entry could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Append-only record of completed runs.
///
/// Appends from concurrent callers must all survive; `list` returns entries in
/// insertion order.
pub trait HistoryLog: Send + Sync {
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError>;

    fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError>;

    fn clear(&self) -> Result<(), HistoryError>;

    /// Removes the entry with `id`; false if there was none.
    fn remove(&self, id: &str) -> Result<bool, HistoryError>;

    /// Up to `limit` entries, newest first.
    fn recent(&self, limit: usize) -> Result<Vec<HistoryEntry>, HistoryError> {
        let mut entries = self.list()?;
        entries.reverse();
        entries.truncate(limit);
        Ok(entries)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HistoryLog for MemoryHistory {
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        lock(&self.entries).push(entry);
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        Ok(lock(&self.entries).clone())
    }

    fn clear(&self) -> Result<(), HistoryError> {
        lock(&self.entries).clear();
        Ok(())
    }

    fn remove(&self, id: &str) -> Result<bool, HistoryError> {
        let mut entries = lock(&self.entries);
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        Ok(entries.len() != before)
    }
}

/// One JSON object per line. Lines that fail to decode are skipped with a warning.
#[derive(Debug)]
pub struct JsonlHistory {
    path: PathBuf,
    guard: Mutex<()>,
}

impl JsonlHistory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut entries = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<HistoryEntry>(line) {
                Ok(entry) => entries.push(entry),
                Err(err) => engine_warn!(
                    "Skipping unreadable history line {} in {}: {}",
                    idx + 1,
                    self.path.display(),
                    err
                ),
            }
        }
        Ok(entries)
    }

    fn rewrite(&self, entries: &[HistoryEntry]) -> Result<(), HistoryError> {
        let mut text = String::new();
        for entry in entries {
            text.push_str(&serde_json::to_string(entry)?);
            text.push('\n');
        }
        let (writer, name) = AtomicFileWriter::for_path(&self.path)?;
        writer.write(&name, &text)?;
        Ok(())
    }
}

impl HistoryLog for JsonlHistory {
    fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let line = serde_json::to_string(&entry)?;
        let _guard = lock(&self.guard);
        append_line(&self.path, &line)?;
        Ok(())
    }

    fn list(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        let _guard = lock(&self.guard);
        self.read_entries()
    }

    fn clear(&self) -> Result<(), HistoryError> {
        let _guard = lock(&self.guard);
        self.rewrite(&[])
    }

    fn remove(&self, id: &str) -> Result<bool, HistoryError> {
        let _guard = lock(&self.guard);
        let mut entries = self.read_entries()?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            return Ok(false);
        }
        self.rewrite(&entries)?;
        Ok(true)
    }
}
