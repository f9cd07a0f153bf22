//! In-memory blob storage.

use super::BlobStore;
use crate::error::Result;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Blob store kept entirely in process memory.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
    puts: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, name: &str, content: &[u8]) -> Result<()> {
        self.blobs.lock().insert(name.to_string(), content.to_vec());
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blobs.lock().get(name).cloned())
    }

    fn delete(&self, name: &str) -> Result<bool> {
        Ok(self.blobs.lock().remove(name).is_some())
    }

    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.blobs.lock().contains_key(name))
    }

    fn names(&self) -> Result<Vec<String>> {
        Ok(self.blobs.lock().keys().cloned().collect())
    }
}
