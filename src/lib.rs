//! # Built Environment
//!
//! State core of a map viewer that overlays satellite imagery and 3-D
//! building extrusions on a base style, switches between a light and a dark
//! theme, and attaches 3-D object files to map coordinates.
//!
//! ## Core Concepts
//!
//! - **View state**: Viewport, attached files, base style and overlay toggles,
//!   updated through deep-merged partial patches and persisted on every change
//! - **Theme**: Light/dark selection persisted under its own key
//! - **Layers**: A reconciler that adds or removes the managed overlays on a
//!   live map so it matches the toggles
//! - **Objects**: Object file bytes in a blob store, placed at the viewport
//!   current when they were attached
//!
//! ## Example
//!
//! ```ignore
//! use built_environment::{HeadlessMap, Viewer, ViewerConfig, PickedFile, basic_style};
//!
//! let mut viewer = Viewer::open(ViewerConfig {
//!     path: "./viewer-data".into(),
//!     ..Default::default()
//! }, HeadlessMap::new(basic_style(), 13.5))?;
//!
//! viewer.initialize();
//! viewer.on_style_load_complete();
//!
//! // Toggle an overlay; the map follows immediately
//! viewer.set_satellite(true)?;
//!
//! // Attach an object at the current viewport
//! viewer.attach_files(vec![PickedFile::new("tower.obj", bytes)]);
//! ```

pub mod blobs;
pub mod config;
pub mod error;
pub mod files;
pub mod layers;
pub mod state;
pub mod storage;
pub mod subscriptions;
pub mod types;
pub mod viewer;

// Re-exports
pub use blobs::{BlobStore, FileBlobStore, MemoryBlobStore, OBJECT_NAMESPACE};
pub use config::ViewerConfig;
pub use error::{Result, ViewerError};
pub use files::{object_name, FileRegistry, PickedFile, Registration, SweepReport};
pub use layers::{
    basic_style, DesiredLayers, FlyTo, HeadlessMap, LayerChange, LayerReconciler, LayerSpec,
    LayerSummary, LayerType, MapCall, MapEngine, ReconcileReport, SourceSpec,
};
pub use state::{deep_merge, ThemeStore, Update, ViewStateStore, THEME_KEY, VIEW_STATE_KEY};
pub use storage::{DurableStorage, MemoryStorage};
#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStorage;
pub use subscriptions::{
    DropReason, SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, SubscriptionId,
    SubscriptionManager, ViewerEvent,
};
pub use types::*;
pub use viewer::{Controls, Viewer};
