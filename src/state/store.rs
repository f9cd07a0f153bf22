//! Persistent view state store.

use crate::error::{Result, ViewerError};
use crate::storage::DurableStorage;
use crate::subscriptions::{
    SubscriptionConfig, SubscriptionHandle, SubscriptionId, SubscriptionManager, ViewerEvent,
};
use crate::types::{ViewField, ViewState, ViewStatePatch};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default storage key for the view state.
pub const VIEW_STATE_KEY: &str = "built-environment-state";

/// Function computing a patch from the current snapshot.
pub type ComputePatch = Box<dyn FnOnce(&ViewState) -> ViewStatePatch + Send>;

/// An update to the view state: either a literal patch or one computed from
/// the snapshot current at the time the update is applied.
pub enum Update {
    Literal(ViewStatePatch),
    Computed(ComputePatch),
}

impl Update {
    pub fn computed(f: impl FnOnce(&ViewState) -> ViewStatePatch + Send + 'static) -> Self {
        Update::Computed(Box::new(f))
    }

    fn resolve(self, current: &ViewState) -> ViewStatePatch {
        match self {
            Update::Literal(patch) => patch,
            Update::Computed(f) => f(current),
        }
    }
}

impl From<ViewStatePatch> for Update {
    fn from(patch: ViewStatePatch) -> Self {
        Update::Literal(patch)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Literal(patch) => f.debug_tuple("Literal").field(patch).finish(),
            Update::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// Single source of truth for [`ViewState`].
///
/// Every update publishes a new immutable snapshot, notifies subscribers and
/// then writes the full snapshot to durable storage. Writes are gated until
/// [`initialize`](Self::initialize) has hydrated the stored value, so the
/// default never overwrites a saved snapshot.
pub struct ViewStateStore {
    storage: Arc<dyn DurableStorage>,
    key: String,
    current: RwLock<Arc<ViewState>>,
    loaded: AtomicBool,
    subscriptions: Arc<SubscriptionManager>,
    /// Serializes updates so they apply in issue order.
    write_lock: Mutex<()>,
}

impl ViewStateStore {
    /// Create a store with its own subscription manager.
    pub fn new(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        Self::with_subscriptions(storage, key, Arc::new(SubscriptionManager::new()))
    }

    /// Create a store broadcasting into a shared subscription manager.
    pub fn with_subscriptions(
        storage: Arc<dyn DurableStorage>,
        key: impl Into<String>,
        subscriptions: Arc<SubscriptionManager>,
    ) -> Self {
        Self {
            storage,
            key: key.into(),
            current: RwLock::new(Arc::new(ViewState::default())),
            loaded: AtomicBool::new(false),
            subscriptions,
            write_lock: Mutex::new(()),
        }
    }

    /// Hydrate from durable storage and enable persistence.
    ///
    /// Falls back to the default state when nothing is stored or the stored
    /// value does not decode. The effective state is written back once, which
    /// also replaces an unreadable value. Calling this again is a no-op.
    pub fn initialize(&self) -> Arc<ViewState> {
        let _lock = self.write_lock.lock();

        if self.loaded.load(Ordering::SeqCst) {
            return self.current();
        }

        let hydrated = Arc::new(self.hydrate());
        let previous = std::mem::replace(&mut *self.current.write(), Arc::clone(&hydrated));
        self.loaded.store(true, Ordering::SeqCst);

        self.persist(&hydrated);

        let changed = previous.changed_fields(&hydrated);
        if !changed.is_empty() {
            self.subscriptions
                .broadcast_view_state(Arc::clone(&hydrated), changed);
        }

        hydrated
    }

    /// Whether hydration has completed.
    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    /// Get the current snapshot.
    pub fn current(&self) -> Arc<ViewState> {
        Arc::clone(&self.current.read())
    }

    /// Apply an update and return the new snapshot.
    ///
    /// A computed update runs against the snapshot current at apply time; it
    /// must not call back into this store. A patch that changes nothing
    /// publishes nothing and writes nothing.
    pub fn update(&self, update: impl Into<Update>) -> Result<Arc<ViewState>> {
        let _lock = self.write_lock.lock();

        let current = self.current();
        let patch = update.into().resolve(&current);
        let next = current.merged(&patch)?;

        let changed = current.changed_fields(&next);
        if changed.is_empty() {
            return Ok(current);
        }

        let next = Arc::new(next);
        *self.current.write() = Arc::clone(&next);
        tracing::debug!(key = %self.key, ?changed, "view state updated");

        self.subscriptions
            .broadcast_view_state(Arc::clone(&next), changed);
        self.persist(&next);

        Ok(next)
    }

    /// Subscribe to view state changes.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let include_current = config.include_current;
        let handle = self.subscriptions.subscribe(config);
        if include_current {
            let all = vec![
                ViewField::Coords,
                ViewField::Files,
                ViewField::Style,
                ViewField::Satellite,
                ViewField::Extrusions,
            ];
            self.subscriptions.send_to(
                handle.id,
                ViewerEvent::ViewState {
                    state: self.current(),
                    changed: all,
                },
            );
        }
        handle
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.subscriptions.unsubscribe(id);
    }

    /// Storage key this store persists under.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Read the stored snapshot, falling back to the default on any failure.
    fn hydrate(&self) -> ViewState {
        let raw = match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::info!(key = %self.key, "no stored view state, using default");
                return ViewState::default();
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "view state unreadable, using default");
                return ViewState::default();
            }
        };

        let decoded = serde_json::from_str::<ViewState>(&raw)
            .map_err(|e| ViewerError::Deserialization(e.to_string()))
            .and_then(|state| state.validate().map(|()| state));

        match decoded {
            Ok(state) => {
                tracing::info!(key = %self.key, files = state.files.len(), "view state hydrated");
                state
            }
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "discarding stored view state");
                ViewState::default()
            }
        }
    }

    /// Best-effort write of the full snapshot.
    fn persist(&self, state: &ViewState) {
        if !self.loaded.load(Ordering::SeqCst) {
            tracing::debug!(key = %self.key, "not hydrated yet, skipping write");
            return;
        }

        let result = serde_json::to_string(state)
            .map_err(ViewerError::from)
            .and_then(|raw| self.storage.set_item(&self.key, &raw));

        if let Err(e) = result {
            tracing::warn!(key = %self.key, error = %e, "failed to persist view state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::types::{Coords, FileCoord, MapStyle};

    fn store_with(storage: &Arc<MemoryStorage>) -> ViewStateStore {
        ViewStateStore::new(Arc::clone(storage) as Arc<dyn DurableStorage>, VIEW_STATE_KEY)
    }

    #[test]
    fn test_initialize_defaults_when_empty() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);

        let state = store.initialize();
        assert_eq!(*state, ViewState::default());
        assert!(store.is_loaded());
    }

    #[test]
    fn test_initialize_hydrates_saved_state() {
        let storage = Arc::new(MemoryStorage::new());
        let mut saved = ViewState::default();
        saved.satellite_enabled = true;
        saved.style_id = MapStyle::Dark;
        storage.preload(VIEW_STATE_KEY, &serde_json::to_string(&saved).unwrap());

        let store = store_with(&storage);
        assert_eq!(*store.initialize(), saved);
    }

    #[test]
    fn test_corrupt_value_falls_back_and_is_replaced() {
        let storage = Arc::new(MemoryStorage::new());
        storage.preload(VIEW_STATE_KEY, "{not json");

        let store = store_with(&storage);
        assert_eq!(*store.initialize(), ViewState::default());

        let written = storage.writes_to(VIEW_STATE_KEY);
        assert_eq!(written.len(), 1);
        let decoded: ViewState = serde_json::from_str(&written[0]).unwrap();
        assert_eq!(decoded, ViewState::default());
    }

    #[test]
    fn test_no_write_before_initialize() {
        let storage = Arc::new(MemoryStorage::new());
        let mut saved = ViewState::default();
        saved.extrusions_enabled = true;
        let saved_raw = serde_json::to_string(&saved).unwrap();
        storage.preload(VIEW_STATE_KEY, &saved_raw);

        let store = store_with(&storage);
        store.update(ViewStatePatch::zoom(3.0)).unwrap();
        assert!(storage.history().is_empty());

        store.initialize();
        assert_eq!(storage.writes_to(VIEW_STATE_KEY), vec![saved_raw]);
    }

    #[test]
    fn test_update_persists_full_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.initialize();

        store.update(ViewStatePatch::satellite(true)).unwrap();

        let last = storage.writes_to(VIEW_STATE_KEY).pop().unwrap();
        let decoded: ViewState = serde_json::from_str(&last).unwrap();
        assert!(decoded.satellite_enabled);
        assert_eq!(decoded.coords, Coords::default());
    }

    #[test]
    fn test_computed_update_reads_current_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.initialize();
        store
            .update(ViewStatePatch::coords(Coords {
                longitude: 10.0,
                latitude: 20.0,
                zoom: 15.0,
            }))
            .unwrap();

        let next = store
            .update(Update::computed(|current| {
                ViewStatePatch::add_file("tower", FileCoord::from(current.coords))
            }))
            .unwrap();

        assert_eq!(
            next.files.get("tower"),
            Some(&FileCoord {
                longitude: 10.0,
                latitude: 20.0
            })
        );
        assert_eq!(next.coords.zoom, 15.0);
    }

    #[test]
    fn test_noop_patch_publishes_nothing() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.initialize();
        let handle = store.subscribe(SubscriptionConfig::default());
        let writes_before = storage.history().len();

        store.update(ViewStatePatch::satellite(false)).unwrap();

        assert!(handle.drain().is_empty());
        assert_eq!(storage.history().len(), writes_before);
    }

    #[test]
    fn test_persist_failure_keeps_state_in_memory() {
        let storage = Arc::new(MemoryStorage::with_quota(8));
        let store = store_with(&storage);
        store.initialize();

        let next = store.update(ViewStatePatch::extrusions(true)).unwrap();
        assert!(next.extrusions_enabled);
        assert!(store.current().extrusions_enabled);
        assert!(storage.history().is_empty());
    }

    #[test]
    fn test_include_current_delivers_snapshot() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.initialize();

        let handle = store.subscribe(SubscriptionConfig {
            include_current: true,
            ..Default::default()
        });
        let events = handle.drain();
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], ViewerEvent::ViewState { .. }));
    }
}
