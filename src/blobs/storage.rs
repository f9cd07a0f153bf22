//! File-backed blob storage.

use super::BlobStore;
use crate::error::{Result, ViewerError};
use lru::LruCache;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::{Read, Write};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

/// Magic bytes for blob files.
const BLOB_MAGIC: &[u8; 4] = b"BLB\0";

/// Current blob format version.
const BLOB_VERSION: u8 = 1;

/// Blob storage rooted at `<root>/<namespace>`.
pub struct FileBlobStore {
    /// Base directory for blobs.
    path: PathBuf,

    /// LRU cache for recently accessed blobs.
    cache: Mutex<LruCache<String, Vec<u8>>>,
}

impl FileBlobStore {
    /// Create a new blob store for `namespace` under `root`.
    pub fn new(root: impl AsRef<Path>, namespace: &str, cache_size: usize) -> Result<Self> {
        let path = root.as_ref().join(namespace);
        fs::create_dir_all(&path)?;

        let cache_size = NonZeroUsize::new(cache_size.max(1)).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            path,
            cache: Mutex::new(LruCache::new(cache_size)),
        })
    }

    /// Get the namespace directory.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get total size of all blob files.
    pub fn total_size(&self) -> Result<u64> {
        let mut total = 0u64;
        for blob_path in self.blob_files()? {
            total += fs::metadata(blob_path)?.len();
        }
        Ok(total)
    }

    fn name_digest(name: &str) -> String {
        hex::encode(Sha256::digest(name.as_bytes()))
    }

    /// Get the full path for a blob, sharded by the first digest byte.
    fn blob_path(&self, name: &str) -> PathBuf {
        let digest = Self::name_digest(name);
        self.path.join(&digest[..2]).join(digest)
    }

    fn blob_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                for blob_entry in fs::read_dir(entry.path())? {
                    let blob_entry = blob_entry?;
                    if blob_entry.file_type()?.is_file() {
                        files.push(blob_entry.path());
                    }
                }
            }
        }
        Ok(files)
    }

    /// Read and verify the header, returning the stored name.
    fn read_header(file: &mut File) -> Result<String> {
        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != BLOB_MAGIC {
            return Err(ViewerError::InvalidFormat("Invalid blob magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != BLOB_VERSION {
            return Err(ViewerError::InvalidFormat(format!(
                "Unsupported blob version: {}",
                version[0]
            )));
        }

        let mut name_len_bytes = [0u8; 2];
        file.read_exact(&mut name_len_bytes)?;
        let name_len = u16::from_le_bytes(name_len_bytes) as usize;

        let mut name_bytes = vec![0u8; name_len];
        file.read_exact(&mut name_bytes)?;
        String::from_utf8(name_bytes)
            .map_err(|_| ViewerError::InvalidFormat("Blob name is not UTF-8".into()))
    }
}

impl BlobStore for FileBlobStore {
    fn put(&self, name: &str, content: &[u8]) -> Result<()> {
        let name_bytes = name.as_bytes();
        let name_len = u16::try_from(name_bytes.len())
            .map_err(|_| ViewerError::InvalidFileName(name.to_string()))?;

        let blob_path = self.blob_path(name);
        if let Some(shard_dir) = blob_path.parent() {
            fs::create_dir_all(shard_dir)?;
        }

        let tmp_path = blob_path.with_extension("tmp");
        let mut file = File::create(&tmp_path)?;

        // Write header
        file.write_all(BLOB_MAGIC)?;
        file.write_all(&[BLOB_VERSION])?;
        file.write_all(&name_len.to_le_bytes())?;
        file.write_all(name_bytes)?;

        // Write content
        let content_len = content.len() as u64;
        file.write_all(&content_len.to_le_bytes())?;
        file.write_all(content)?;

        // Write checksum
        let checksum = crc32fast::hash(content);
        file.write_all(&checksum.to_le_bytes())?;

        file.sync_all()?;
        fs::rename(&tmp_path, &blob_path)?;

        self.cache.lock().put(name.to_string(), content.to_vec());
        tracing::debug!(name, bytes = content.len(), "stored blob");

        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        // Check cache first
        if let Some(cached) = self.cache.lock().get(name).cloned() {
            return Ok(Some(cached));
        }

        let blob_path = self.blob_path(name);
        if !blob_path.exists() {
            return Ok(None);
        }

        let mut file = File::open(&blob_path)?;

        let stored_name = Self::read_header(&mut file)?;
        if stored_name != name {
            return Err(ViewerError::InvalidFormat(format!(
                "Blob name mismatch: expected {name:?}, found {stored_name:?}"
            )));
        }

        let mut content_len_bytes = [0u8; 8];
        file.read_exact(&mut content_len_bytes)?;
        let content_len = u64::from_le_bytes(content_len_bytes) as usize;

        let mut content = vec![0u8; content_len];
        file.read_exact(&mut content)?;

        // Read and verify checksum
        let mut checksum_bytes = [0u8; 4];
        file.read_exact(&mut checksum_bytes)?;
        let stored_checksum = u32::from_le_bytes(checksum_bytes);
        let computed_checksum = crc32fast::hash(&content);

        if stored_checksum != computed_checksum {
            return Err(ViewerError::ChecksumMismatch {
                expected: stored_checksum,
                got: computed_checksum,
            });
        }

        self.cache.lock().put(name.to_string(), content.clone());

        Ok(Some(content))
    }

    fn delete(&self, name: &str) -> Result<bool> {
        self.cache.lock().pop(name);

        let blob_path = self.blob_path(name);
        if blob_path.exists() {
            fs::remove_file(&blob_path)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn exists(&self, name: &str) -> Result<bool> {
        if self.cache.lock().contains(name) {
            return Ok(true);
        }
        Ok(self.blob_path(name).exists())
    }

    fn names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for blob_path in self.blob_files()? {
            if blob_path.extension().is_some_and(|ext| ext == "tmp") {
                continue;
            }
            let mut file = File::open(&blob_path)?;
            match Self::read_header(&mut file) {
                Ok(name) => names.push(name),
                Err(e) => {
                    tracing::warn!(path = %blob_path.display(), error = %e, "skipping unreadable blob");
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blobs::OBJECT_NAMESPACE;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> FileBlobStore {
        FileBlobStore::new(dir.path(), OBJECT_NAMESPACE, 100).unwrap()
    }

    #[test]
    fn test_store_and_retrieve() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.put("tower", b"v 0 0 0\n").unwrap();

        assert_eq!(store.get("tower").unwrap().unwrap(), b"v 0 0 0\n");
        assert!(store.get("missing").unwrap().is_none());
    }

    #[test]
    fn test_reads_from_disk_after_reopen() {
        let dir = TempDir::new().unwrap();
        test_store(&dir).put("tower", b"v 1 2 3\n").unwrap();

        let reopened = test_store(&dir);
        assert!(reopened.exists("tower").unwrap());
        assert_eq!(reopened.get("tower").unwrap().unwrap(), b"v 1 2 3\n");
    }

    #[test]
    fn test_names_with_path_characters() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.put("../odd/name", b"x").unwrap();
        store.put("plain", b"y").unwrap();

        assert_eq!(store.names().unwrap(), vec!["../odd/name", "plain"]);
        assert!(store.path().starts_with(dir.path()));
    }

    #[test]
    fn test_delete() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.put("gone", b"bytes").unwrap();
        assert!(store.delete("gone").unwrap());
        assert!(!store.exists("gone").unwrap());
        assert!(!store.delete("gone").unwrap());
    }

    #[test]
    fn test_checksum_detects_corruption() {
        let dir = TempDir::new().unwrap();
        test_store(&dir).put("tower", b"abcdef").unwrap();

        let reopened = test_store(&dir);
        let blob_path = reopened.blob_path("tower");
        let mut bytes = fs::read(&blob_path).unwrap();
        // Flip a content byte (header is 4 + 1 + 2 + 5 + 8 bytes).
        bytes[20] ^= 0xff;
        fs::write(&blob_path, bytes).unwrap();

        assert!(matches!(
            reopened.get("tower"),
            Err(ViewerError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn test_total_size() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        assert_eq!(store.total_size().unwrap(), 0);

        store.put("a", b"1234").unwrap();
        // 4 magic + 1 version + 2 name len + 1 name + 8 len + 4 content + 4 crc
        assert_eq!(store.total_size().unwrap(), 24);
    }
}
