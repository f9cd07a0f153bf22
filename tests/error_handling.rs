//! Error handling and edge case tests.

use built_environment::{
    basic_style, BlobStore, Coords, DurableStorage, FileRegistry, FileStorage, HeadlessMap,
    MapEngine, MemoryBlobStore, MemoryStorage, PickedFile, Result, ThemeColor, ThemeStore,
    ViewState, ViewStatePatch, ViewStateStore, Viewer, ViewerConfig, ViewerError, THEME_KEY,
    VIEW_STATE_KEY,
};
use built_environment::layers::{EXTRUSION_LAYER_ID, SATELLITE_LAYER_ID};
use std::sync::Arc;
use tempfile::TempDir;

/// Blob store whose writes or deletes always fail.
#[derive(Default)]
struct FailingBlobStore {
    inner: MemoryBlobStore,
    fail_put: bool,
    fail_delete: bool,
}

impl BlobStore for FailingBlobStore {
    fn put(&self, name: &str, content: &[u8]) -> Result<()> {
        if self.fail_put {
            return Err(ViewerError::StorageUnavailable);
        }
        self.inner.put(name, content)
    }

    fn get(&self, name: &str) -> Result<Option<Vec<u8>>> {
        self.inner.get(name)
    }

    fn delete(&self, name: &str) -> Result<bool> {
        if self.fail_delete {
            return Err(ViewerError::StorageUnavailable);
        }
        self.inner.delete(name)
    }

    fn exists(&self, name: &str) -> Result<bool> {
        self.inner.exists(name)
    }

    fn names(&self) -> Result<Vec<String>> {
        self.inner.names()
    }
}

fn hydrated_store() -> Arc<ViewStateStore> {
    let storage: Arc<dyn DurableStorage> = Arc::new(MemoryStorage::new());
    let store = Arc::new(ViewStateStore::new(storage, VIEW_STATE_KEY));
    store.initialize();
    store
}

// --- Hydration Errors ---

#[test]
fn test_wrong_shape_falls_back_to_default() {
    let storage = Arc::new(MemoryStorage::new());
    storage.preload(VIEW_STATE_KEY, r#"{"coords": "somewhere", "files": []}"#);

    let store = ViewStateStore::new(Arc::clone(&storage) as Arc<dyn DurableStorage>, VIEW_STATE_KEY);
    assert_eq!(*store.initialize(), ViewState::default());
}

#[test]
fn test_unknown_style_falls_back_to_default() {
    let storage = Arc::new(MemoryStorage::new());
    let mut raw = serde_json::to_value(ViewState::default()).unwrap();
    raw["styleId"] = serde_json::json!("mapbox://styles/someone/custom");
    storage.preload(VIEW_STATE_KEY, &raw.to_string());

    let store = ViewStateStore::new(Arc::clone(&storage) as Arc<dyn DurableStorage>, VIEW_STATE_KEY);
    assert_eq!(*store.initialize(), ViewState::default());
}

#[test]
fn test_unknown_theme_keeps_light() {
    let storage = Arc::new(MemoryStorage::new());
    storage.preload(THEME_KEY, "\"dark\"");

    let store = ThemeStore::new(Arc::clone(&storage) as Arc<dyn DurableStorage>, THEME_KEY);
    let theme = store.initialize();

    assert_eq!(theme.color, ThemeColor::Light);
    assert!(!theme.semantic.inverted);
}

// --- Update Errors ---

#[test]
fn test_non_finite_viewport_rejected() {
    let store = hydrated_store();
    let before = store.current();

    let result = store.update(ViewStatePatch::coords(Coords {
        longitude: f64::NAN,
        latitude: 1.0,
        zoom: 10.0,
    }));

    assert!(matches!(result, Err(ViewerError::InvalidPatch(_))));
    assert!(Arc::ptr_eq(&before, &store.current()));
}

#[test]
fn test_negative_zoom_rejected() {
    let store = hydrated_store();
    let result = store.update(ViewStatePatch::zoom(-1.0));
    assert!(matches!(result, Err(ViewerError::InvalidPatch(_))));
}

#[test]
fn test_quota_exceeded_keeps_store_usable() {
    let storage = Arc::new(MemoryStorage::with_quota(4));
    let store = ViewStateStore::new(Arc::clone(&storage) as Arc<dyn DurableStorage>, VIEW_STATE_KEY);
    store.initialize();

    store.update(ViewStatePatch::satellite(true)).unwrap();
    store.update(ViewStatePatch::extrusions(true)).unwrap();

    let state = store.current();
    assert!(state.satellite_enabled && state.extrusions_enabled);
    assert!(storage.history().is_empty());
}

// --- Storage Errors ---

#[test]
fn test_invalid_storage_keys() {
    let dir = TempDir::new().unwrap();
    let storage = FileStorage::open(dir.path().join("slots"), true).unwrap();

    for key in ["", "../escape", ".hidden", "a/b", "spaced key"] {
        assert!(
            matches!(storage.set_item(key, "x"), Err(ViewerError::InvalidKey(_))),
            "key {key:?} should be rejected"
        );
    }
}

#[test]
fn test_unwritable_keys_do_not_break_viewer() {
    let dir = TempDir::new().unwrap();
    let config = ViewerConfig {
        path: dir.path().join("viewer"),
        view_state_key: "bad/key".to_string(),
        ..Default::default()
    };

    let mut viewer = Viewer::open(config, HeadlessMap::new(basic_style(), 16.0)).unwrap();
    viewer.initialize();
    viewer.on_style_load_complete();

    viewer.set_satellite(true).unwrap();
    assert!(viewer.view_state().satellite_enabled);
    assert!(viewer.map().has_layer(SATELLITE_LAYER_ID));
}

// --- File Registration Errors ---

#[test]
fn test_failed_put_leaves_state_untouched() {
    let store = hydrated_store();
    let registry = FileRegistry::new(
        Arc::clone(&store),
        Arc::new(FailingBlobStore {
            fail_put: true,
            ..Default::default()
        }),
    );
    let before = store.current();

    let result = registry.register("tower.obj", b"v");

    assert!(matches!(result, Err(ViewerError::StorageUnavailable)));
    assert!(Arc::ptr_eq(&before, &store.current()));
}

#[test]
fn test_failed_delete_keeps_entry() {
    let store = hydrated_store();
    let blobs = Arc::new(FailingBlobStore {
        fail_delete: true,
        ..Default::default()
    });
    let registry = FileRegistry::new(Arc::clone(&store), Arc::clone(&blobs) as Arc<dyn BlobStore>);
    registry.register("tower.obj", b"v").unwrap();

    assert!(registry.remove("tower").is_err());
    assert!(store.current().files.contains_key("tower"));
    assert!(blobs.exists("tower").unwrap());
}

#[test]
fn test_unsupported_and_unnamed_files() {
    let store = hydrated_store();
    let registry = FileRegistry::new(Arc::clone(&store), Arc::new(MemoryBlobStore::new()));

    let outcomes = registry.register_batch(vec![
        PickedFile::new("scene.gltf", b"g".to_vec()),
        PickedFile::new(".obj", b"o".to_vec()),
        PickedFile::new("dir/.obj", b"o".to_vec()),
    ]);

    assert!(matches!(outcomes[0].1, Err(ViewerError::UnsupportedFile(_))));
    assert!(outcomes[1].1.is_err());
    assert!(outcomes[2].1.is_err());
    assert!(store.current().files.is_empty());
}

#[test]
fn test_missing_object_bytes() {
    let store = hydrated_store();
    let registry = FileRegistry::new(store, Arc::new(MemoryBlobStore::new()));
    assert!(matches!(
        registry.object_bytes("ghost"),
        Err(ViewerError::BlobNotFound(name)) if name == "ghost"
    ));
}

// --- Map Errors ---

#[test]
fn test_rejected_layer_is_logged_not_propagated() {
    let mut map = HeadlessMap::new(basic_style(), 16.0);
    map.reject_layer(EXTRUSION_LAYER_ID);
    let mut viewer = Viewer::with_parts(
        &ViewerConfig::default(),
        Arc::new(MemoryStorage::new()),
        Arc::new(MemoryBlobStore::new()),
        map,
    );
    viewer.initialize();
    viewer.on_style_load_complete();

    let state = viewer.set_extrusions(true).unwrap();

    assert!(state.extrusions_enabled);
    assert!(!viewer.map().has_layer(EXTRUSION_LAYER_ID));

    // Other overlays keep working.
    viewer.set_satellite(true).unwrap();
    assert!(viewer.map().has_layer(SATELLITE_LAYER_ID));
}
