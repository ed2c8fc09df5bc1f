//! Storage backends for the conversation store.

use std::io::ErrorKind;
use std::path::PathBuf;

use super::error::StoreError;

/// Where the serialized store document lives.
///
/// A backend holds exactly one document. `read` returns `None` when nothing
/// has been written yet.
pub trait StorageBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// Replace the whole document.
    fn write(&self, bytes: &[u8]) -> Result<(), StoreError>;

    /// Drop the document. Removing a missing document succeeds.
    fn remove(&self) -> Result<(), StoreError>;

    /// Human-readable location, for logs and errors.
    fn describe(&self) -> String;
}

/// A JSON file on disk, rewritten atomically on every save.
#[derive(Debug, Clone)]
pub struct FileBackend {
    path: PathBuf,
}

impl FileBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[cfg(test)]
    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "sessions.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::io("reading", &self.path, e)),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::io("creating directory", parent, e))?;
        }

        // Readers see either the old document or the new one, never a torn write.
        let tmp = self.temp_path();
        std::fs::write(&tmp, bytes).map_err(|e| StoreError::io("writing", &tmp, e))?;
        std::fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = std::fs::remove_file(&tmp);
            StoreError::io("replacing", &self.path, e)
        })
    }

    fn remove(&self) -> Result<(), StoreError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io("removing", &self.path, e)),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process backend used by tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemoryBackend {
    document: std::cell::RefCell<Option<Vec<u8>>>,
}

#[cfg(test)]
impl MemoryBackend {
    pub fn with_contents(contents: impl Into<Vec<u8>>) -> Self {
        Self {
            document: std::cell::RefCell::new(Some(contents.into())),
        }
    }

    pub fn contents(&self) -> Option<Vec<u8>> {
        self.document.borrow().clone()
    }
}

#[cfg(test)]
impl StorageBackend for MemoryBackend {
    fn read(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.contents())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StoreError> {
        *self.document.borrow_mut() = Some(bytes.to_vec());
        Ok(())
    }

    fn remove(&self) -> Result<(), StoreError> {
        *self.document.borrow_mut() = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "<memory>".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("sessions.json"));
        assert!(backend.read().unwrap().is_none());
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/sessions.json");
        let backend = FileBackend::new(&path);

        backend.write(b"{}").unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"{}");
        assert!(!backend.temp_path().exists());
    }

    #[test]
    fn test_write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("sessions.json"));

        backend.write(b"first version, longer").unwrap();
        backend.write(b"second").unwrap();
        assert_eq!(backend.read().unwrap().unwrap(), b"second");
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path().join("sessions.json"));

        backend.write(b"{}").unwrap();
        backend.remove().unwrap();
        assert!(!backend.path().exists());
        backend.remove().unwrap();
    }

    #[test]
    fn test_read_directory_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FileBackend::new(dir.path());
        assert!(matches!(
            backend.read(),
            Err(StoreError::Io {
                operation: "reading",
                ..
            })
        ));
    }
}
