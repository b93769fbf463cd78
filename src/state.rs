use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use base64::{engine::general_purpose, Engine as _};
use log::warn;
use tempfile::{Builder, TempPath};
use uuid::Uuid;

use crate::{Error, Result, SharedFile};

/// Temporary files written for shared content, grouped by the presentation
/// that owns them. Files are deleted when their owner is released.
pub struct TempFileRegistry {
    root: PathBuf,
    managed_files: Mutex<HashMap<Uuid, Vec<TempPath>>>,
}

impl TempFileRegistry {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            managed_files: Mutex::new(HashMap::new()),
        }
    }

    /// A registry rooted at `name` inside the system temp dir.
    pub fn in_temp_dir(name: &str) -> Self {
        Self::new(std::env::temp_dir().join(name))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Decodes `file` into a new temp file owned by `owner` and returns its
    /// path.
    pub fn materialize(&self, owner: Uuid, file: &SharedFile) -> Result<PathBuf> {
        let decoded_bytes = general_purpose::STANDARD
            .decode(&file.data)
            .map_err(|_| Error::InvalidArgs("Invalid Base64 data provided".to_string()))?;

        // Only the file name is kept; any directories in it are dropped.
        let sanitized_name = Path::new(&file.name)
            .file_name()
            .ok_or_else(|| Error::InvalidArgs("Invalid file name provided".to_string()))?
            .to_str()
            .ok_or_else(|| Error::InvalidArgs("File name contains invalid UTF-8".to_string()))?;

        std::fs::create_dir_all(&self.root)
            .map_err(|e| Error::TempFile(format!("Failed to create temp dir: {}", e)))?;

        let mut temp_file = Builder::new()
            .prefix(&format!("{}-", Uuid::new_v4()))
            .suffix(&format!("-{}", sanitized_name))
            .tempfile_in(&self.root)
            .map_err(|e| Error::TempFile(format!("Failed to create temp file: {}", e)))?;
        temp_file
            .write_all(&decoded_bytes)
            .map_err(|e| Error::TempFile(format!("Failed to write to temp file: {}", e)))?;

        let temp_path = temp_file.into_temp_path();
        let path = temp_path.to_path_buf();
        self.lock()?.entry(owner).or_default().push(temp_path);
        Ok(path)
    }

    /// Deletes every file owned by `owner`. Returns how many were removed.
    pub fn release(&self, owner: Uuid) -> usize {
        let files = match self.managed_files.lock() {
            Ok(mut guard) => guard.remove(&owner),
            Err(poisoned) => poisoned.into_inner().remove(&owner),
        };
        files.map(delete_all).unwrap_or(0)
    }

    pub fn cleanup_all_managed_files(&self) {
        let files: Vec<TempPath> = match self.managed_files.lock() {
            Ok(mut guard) => guard.drain().flat_map(|(_, files)| files).collect(),
            Err(poisoned) => {
                warn!("temp file registry was poisoned during cleanup");
                poisoned
                    .into_inner()
                    .drain()
                    .flat_map(|(_, files)| files)
                    .collect()
            }
        };
        delete_all(files);
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<Uuid, Vec<TempPath>>>> {
        self.managed_files
            .lock()
            .map_err(|e| Error::TempFile(format!("Failed to lock mutex: {}", e)))
    }
}

fn delete_all(files: Vec<TempPath>) -> usize {
    let mut removed = 0;
    for path in files {
        let display = path.display().to_string();
        match path.close() {
            Ok(()) => removed += 1,
            Err(e) => warn!("failed to delete temp file {}: {}", display, e),
        }
    }
    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, data: &str) -> SharedFile {
        SharedFile {
            data: data.to_string(),
            name: name.to_string(),
            mime_type: "text/plain".to_string(),
        }
    }

    #[test]
    fn materialized_file_lives_until_owner_is_released() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempFileRegistry::new(dir.path().join("shares"));
        let owner = Uuid::new_v4();

        let path = registry.materialize(owner, &file("a.txt", "aGVsbG8=")).unwrap();

        assert!(path.starts_with(registry.root()));
        assert!(path.to_string_lossy().ends_with("-a.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), b"hello");

        assert_eq!(registry.release(Uuid::new_v4()), 0);
        assert!(path.exists());
        assert_eq!(registry.release(owner), 1);
        assert!(!path.exists());
    }

    #[test]
    fn directories_in_file_names_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempFileRegistry::new(dir.path());

        let path = registry
            .materialize(Uuid::new_v4(), &file("../../etc/passwd", "eA=="))
            .unwrap();

        assert_eq!(path.parent(), Some(dir.path()));
        assert!(path.to_string_lossy().ends_with("-passwd"));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempFileRegistry::new(dir.path());
        let err = registry
            .materialize(Uuid::new_v4(), &file("a.txt", "not base64!"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidArgs(_)));
    }

    #[test]
    fn cleanup_removes_files_of_every_owner() {
        let dir = tempfile::tempdir().unwrap();
        let registry = TempFileRegistry::new(dir.path());
        let first = registry.materialize(Uuid::new_v4(), &file("a", "YQ==")).unwrap();
        let second = registry.materialize(Uuid::new_v4(), &file("b", "Yg==")).unwrap();

        registry.cleanup_all_managed_files();

        assert!(!first.exists());
        assert!(!second.exists());
    }
}
