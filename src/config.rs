//! Viewer configuration.

use crate::blobs::OBJECT_NAMESPACE;
use crate::state::{THEME_KEY, VIEW_STATE_KEY};
use std::path::PathBuf;

/// Configuration for opening a [`Viewer`](crate::Viewer).
#[derive(Clone, Debug)]
pub struct ViewerConfig {
    /// Base directory for durable storage and blobs.
    pub path: PathBuf,

    /// Whether to create the directory if it doesn't exist.
    pub create_if_missing: bool,

    /// Blob cache size (number of blobs).
    pub blob_cache_size: usize,

    /// Storage key for the view state.
    pub view_state_key: String,

    /// Storage key for the theme color.
    pub theme_key: String,

    /// Namespace object blobs are stored under.
    pub blob_namespace: String,

    /// Buffer size of the reconciler's subscription.
    pub subscription_buffer_size: usize,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./viewer-data"),
            create_if_missing: true,
            blob_cache_size: 64,
            view_state_key: VIEW_STATE_KEY.to_string(),
            theme_key: THEME_KEY.to_string(),
            blob_namespace: OBJECT_NAMESPACE.to_string(),
            subscription_buffer_size: 256,
        }
    }
}
