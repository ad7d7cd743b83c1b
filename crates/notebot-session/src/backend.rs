//! Snapshot storage backends.
//!
//! A backend only moves serialized snapshots around. It reports failures as
//! [`StorageError`]; deciding what a failure means is left to
//! [`crate::StorageHandler`].

use notebot_types::StorageError;
use std::path::PathBuf;

/// Somewhere a session snapshot can live between page loads or restarts.
pub trait SnapshotBackend: Send {
    /// Read the stored payload, `None` if nothing has been stored.
    fn read(&self) -> Result<Option<String>, StorageError>;

    /// Replace the stored payload wholesale.
    fn write(&mut self, payload: &str) -> Result<(), StorageError>;

    /// Forget the stored payload. Removing nothing is not an error.
    fn remove(&mut self) -> Result<(), StorageError>;

    /// Backend name for logging.
    fn name(&self) -> &str;
}

/// Session-local storage that disappears with the process.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    payload: Option<String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotBackend for MemoryBackend {
    fn read(&self) -> Result<Option<String>, StorageError> {
        Ok(self.payload.clone())
    }

    fn write(&mut self, payload: &str) -> Result<(), StorageError> {
        self.payload = Some(payload.to_string());
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        self.payload = None;
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}

/// Snapshot stored as a single JSON file.
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SnapshotBackend for FileBackend {
    fn read(&self) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(&self.path) {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Atomic write: .tmp → rename.
    fn write(&mut self, payload: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, payload)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn remove(&mut self) -> Result<(), StorageError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn memory_roundtrip() {
        let mut backend = MemoryBackend::new();
        assert!(backend.read().unwrap().is_none());
        backend.write("{\"chat_history\":[]}").unwrap();
        assert_eq!(
            backend.read().unwrap().as_deref(),
            Some("{\"chat_history\":[]}")
        );
        backend.remove().unwrap();
        assert!(backend.read().unwrap().is_none());
    }

    #[test]
    fn file_missing_reads_as_none() {
        let tmp = TempDir::new().unwrap();
        let backend = FileBackend::new(tmp.path().join("session.json"));
        assert!(backend.read().unwrap().is_none());
    }

    #[test]
    fn file_write_creates_parent_and_leaves_no_tmp() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("session.json");
        let mut backend = FileBackend::new(&path);
        backend.write("{}").unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("tmp").exists());
        assert_eq!(backend.read().unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn file_write_replaces_previous_payload() {
        let tmp = TempDir::new().unwrap();
        let mut backend = FileBackend::new(tmp.path().join("session.json"));
        backend.write("{\"a\":1}").unwrap();
        backend.write("{\"b\":2}").unwrap();
        assert_eq!(backend.read().unwrap().as_deref(), Some("{\"b\":2}"));
    }

    #[test]
    fn file_remove_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let mut backend = FileBackend::new(tmp.path().join("session.json"));
        backend.remove().unwrap();
        backend.write("{}").unwrap();
        backend.remove().unwrap();
        assert!(backend.read().unwrap().is_none());
    }
}
