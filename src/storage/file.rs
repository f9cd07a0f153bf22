//! File-backed storage slots.

use super::DurableStorage;
use crate::error::{Result, ViewerError};
use fs2::FileExt;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

/// Extension for slot files.
const SLOT_EXTENSION: &str = "slot";

/// Stores each key as one file inside a directory.
///
/// The directory is locked for exclusive access while the storage is open, so
/// two viewers cannot race on the same slots.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    _lock_file: File,
}

impl FileStorage {
    /// Open the storage directory, creating it if `create_if_missing` is set.
    pub fn open(path: impl AsRef<Path>, create_if_missing: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            if !create_if_missing {
                return Err(ViewerError::NotInitialized(path.display().to_string()));
            }
            fs::create_dir_all(&path)?;
        }

        let lock_file = Self::acquire_lock(&path)?;

        Ok(Self {
            path,
            _lock_file: lock_file,
        })
    }

    /// Get the storage directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = File::create(path.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| ViewerError::Locked)?;

        Ok(lock_file)
    }

    fn slot_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if !valid {
            return Err(ViewerError::InvalidKey(key.to_string()));
        }
        Ok(self.path.join(format!("{key}.{SLOT_EXTENSION}")))
    }
}

impl DurableStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        let slot = self.slot_path(key)?;
        if !slot.exists() {
            return Ok(None);
        }
        Ok(Some(fs::read_to_string(slot)?))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let slot = self.slot_path(key)?;

        // Write next to the slot and rename over it so readers never see a
        // partially written value.
        let tmp = slot.with_extension("tmp");
        let mut file = File::create(&tmp)?;
        file.write_all(value.as_bytes())?;
        file.sync_all()?;
        fs::rename(&tmp, &slot)?;

        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        let slot = self.slot_path(key)?;
        if slot.exists() {
            fs::remove_file(slot)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_remove() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path().join("slots"), true).unwrap();

        assert_eq!(storage.get_item("state").unwrap(), None);

        storage.set_item("state", "{\"a\":1}").unwrap();
        assert_eq!(storage.get_item("state").unwrap().as_deref(), Some("{\"a\":1}"));

        storage.set_item("state", "{}").unwrap();
        assert_eq!(storage.get_item("state").unwrap().as_deref(), Some("{}"));

        storage.remove_item("state").unwrap();
        assert_eq!(storage.get_item("state").unwrap(), None);
        storage.remove_item("state").unwrap();
    }

    #[test]
    fn test_keys_are_independent() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path(), true).unwrap();

        storage.set_item("built-environment-state", "{}").unwrap();
        storage.set_item("built-environment-theme", "dark").unwrap();
        storage.remove_item("built-environment-state").unwrap();

        assert_eq!(
            storage.get_item("built-environment-theme").unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn test_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let storage = FileStorage::open(dir.path(), true).unwrap();

        for key in ["", "../escape", "a/b", ".hidden"] {
            assert!(matches!(
                storage.set_item(key, "x"),
                Err(ViewerError::InvalidKey(_))
            ));
        }
    }

    #[test]
    fn test_missing_directory_without_create() {
        let dir = TempDir::new().unwrap();
        let result = FileStorage::open(dir.path().join("absent"), false);
        assert!(matches!(result, Err(ViewerError::NotInitialized(_))));
    }

    #[test]
    fn test_directory_lock_is_exclusive() {
        let dir = TempDir::new().unwrap();
        let _first = FileStorage::open(dir.path(), true).unwrap();
        let second = FileStorage::open(dir.path(), true);
        assert!(matches!(second, Err(ViewerError::Locked)));
    }
}
