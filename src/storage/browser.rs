//! `window.localStorage` slots for wasm builds.

use super::DurableStorage;
use crate::error::{Result, ViewerError};

/// Storage backed by the browser's `localStorage`.
#[derive(Debug, Default)]
pub struct BrowserStorage;

impl BrowserStorage {
    pub fn new() -> Result<Self> {
        // Fail early if storage is disabled (private browsing, sandboxed iframes).
        window_local_storage()?;
        Ok(Self)
    }
}

impl DurableStorage for BrowserStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        window_local_storage()?
            .get_item(key)
            .map_err(|e| js_error("get_item", e))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        window_local_storage()?
            .set_item(key, value)
            .map_err(|e| js_error("set_item", e))
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        window_local_storage()?
            .remove_item(key)
            .map_err(|e| js_error("remove_item", e))
    }
}

fn window_local_storage() -> Result<web_sys::Storage> {
    let win = web_sys::window().ok_or(ViewerError::StorageUnavailable)?;
    win.local_storage()
        .map_err(|e| js_error("localStorage", e))?
        .ok_or(ViewerError::StorageUnavailable)
}

fn js_error(op: &str, err: wasm_bindgen::JsValue) -> ViewerError {
    ViewerError::Io(std::io::Error::other(format!("{op} failed: {err:?}")))
}
