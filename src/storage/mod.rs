//! Durable string-keyed storage slots.
//!
//! This is the `localStorage` contract: each key holds one string value and
//! writes replace the whole value. The view state and the theme each own one
//! key and never touch the other's.

#[cfg(not(target_arch = "wasm32"))]
mod file;
mod memory;
#[cfg(target_arch = "wasm32")]
mod browser;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;
pub use memory::MemoryStorage;
#[cfg(target_arch = "wasm32")]
pub use browser::BrowserStorage;

use crate::error::Result;

/// A string-keyed durable storage backend.
pub trait DurableStorage: Send + Sync {
    /// Read the value stored under `key`, if any.
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Replace the value stored under `key`.
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key`. Removing a missing key is not an error.
    fn remove_item(&self, key: &str) -> Result<()>;
}
