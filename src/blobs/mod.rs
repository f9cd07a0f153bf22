//! Named binary blob storage for object files.
//!
//! Blobs are addressed by object name within a fixed namespace. On disk each
//! blob is sharded by the SHA-256 of its name, so any name maps to a safe
//! file path.

mod memory;
mod storage;

pub use memory::MemoryBlobStore;
pub use storage::FileBlobStore;

use crate::error::Result;

/// Default namespace for object file blobs.
pub const OBJECT_NAMESPACE: &str = "built-environment/objects";

/// A key-value store for binary blobs.
pub trait BlobStore: Send + Sync {
    /// Store `content` under `name`, replacing any existing blob.
    fn put(&self, name: &str, content: &[u8]) -> Result<()>;

    /// Get the blob stored under `name`.
    fn get(&self, name: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a blob. Returns whether it existed.
    fn delete(&self, name: &str) -> Result<bool>;

    /// Check if a blob exists.
    fn exists(&self, name: &str) -> Result<bool>;

    /// List all blob names.
    fn names(&self) -> Result<Vec<String>>;
}
