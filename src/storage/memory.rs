//! In-memory storage slots.

use super::DurableStorage;
use crate::error::{Result, ViewerError};
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-process storage with an optional byte quota.
///
/// Every successful write is kept in a history so callers can check what was
/// persisted and when.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    items: Mutex<HashMap<String, String>>,
    history: Mutex<Vec<(String, String)>>,
    quota: Option<usize>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Limit the total bytes held across all keys.
    pub fn with_quota(quota: usize) -> Self {
        Self {
            quota: Some(quota),
            ..Default::default()
        }
    }

    /// Seed a value without recording it as a write.
    pub fn preload(&self, key: &str, value: &str) {
        self.items.lock().insert(key.to_string(), value.to_string());
    }

    /// Successful writes in the order they happened.
    pub fn history(&self) -> Vec<(String, String)> {
        self.history.lock().clone()
    }

    /// Successful writes to `key`, oldest first.
    pub fn writes_to(&self, key: &str) -> Vec<String> {
        self.history
            .lock()
            .iter()
            .filter(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
            .collect()
    }
}

impl DurableStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let mut items = self.items.lock();

        if let Some(quota) = self.quota {
            let used: usize = items
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = key.len() + value.len();
            let available = quota.saturating_sub(used);
            if needed > available {
                return Err(ViewerError::QuotaExceeded {
                    key: key.to_string(),
                    needed,
                    available,
                });
            }
        }

        items.insert(key.to_string(), value.to_string());
        self.history
            .lock()
            .push((key.to_string(), value.to_string()));
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().remove(key);
        Ok(())
    }
}
