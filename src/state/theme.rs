//! Persistent theme store.

use crate::storage::DurableStorage;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionManager, ViewerEvent};
use crate::types::{ThemeColor, ThemeState};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Default storage key for the theme color.
pub const THEME_KEY: &str = "built-environment-theme";

/// Holds the light/dark selection and its derived values.
///
/// Persists the plain color string under its own key, independently of the
/// view state store.
pub struct ThemeStore {
    storage: Arc<dyn DurableStorage>,
    key: String,
    current: RwLock<ThemeState>,
    loaded: AtomicBool,
    subscriptions: Arc<SubscriptionManager>,
    write_lock: Mutex<()>,
}

impl ThemeStore {
    pub fn new(storage: Arc<dyn DurableStorage>, key: impl Into<String>) -> Self {
        Self::with_subscriptions(storage, key, Arc::new(SubscriptionManager::new()))
    }

    pub fn with_subscriptions(
        storage: Arc<dyn DurableStorage>,
        key: impl Into<String>,
        subscriptions: Arc<SubscriptionManager>,
    ) -> Self {
        Self {
            storage,
            key: key.into(),
            current: RwLock::new(ThemeState::default()),
            loaded: AtomicBool::new(false),
            subscriptions,
            write_lock: Mutex::new(()),
        }
    }

    /// Hydrate the stored color, keeping the light default when nothing valid
    /// is stored.
    pub fn initialize(&self) -> ThemeState {
        let stored = {
            let _lock = self.write_lock.lock();
            if self.loaded.swap(true, Ordering::SeqCst) {
                return self.current();
            }
            self.hydrate()
        };

        match stored {
            Some(color) => self.change_theme(color),
            None => self.current(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.load(Ordering::SeqCst)
    }

    pub fn current(&self) -> ThemeState {
        *self.current.read()
    }

    /// Select a theme color; `semantic.inverted` follows from it.
    pub fn change_theme(&self, color: ThemeColor) -> ThemeState {
        let _lock = self.write_lock.lock();

        let theme = ThemeState::from_color(color);
        let previous = std::mem::replace(&mut *self.current.write(), theme);

        if self.loaded.load(Ordering::SeqCst) {
            if let Err(e) = self.storage.set_item(&self.key, color.as_str()) {
                tracing::warn!(key = %self.key, error = %e, "failed to persist theme");
            }
        }

        if previous != theme {
            tracing::debug!(%color, "theme changed");
            self.subscriptions.broadcast_theme(theme);
        }

        theme
    }

    /// Subscribe to theme changes.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let include_current = config.include_current;
        let handle = self.subscriptions.subscribe(config);
        if include_current {
            self.subscriptions.send_to(
                handle.id,
                ViewerEvent::Theme {
                    theme: self.current(),
                },
            );
        }
        handle
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    fn hydrate(&self) -> Option<ThemeColor> {
        match self.storage.get_item(&self.key) {
            Ok(Some(raw)) => match raw.parse::<ThemeColor>() {
                Ok(color) => Some(color),
                Err(e) => {
                    tracing::warn!(key = %self.key, error = %e, "ignoring stored theme");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                tracing::warn!(key = %self.key, error = %e, "theme unreadable, using default");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use crate::subscriptions::SubscriptionFilter;

    fn store_with(storage: &Arc<MemoryStorage>) -> ThemeStore {
        ThemeStore::new(Arc::clone(storage) as Arc<dyn DurableStorage>, THEME_KEY)
    }

    #[test]
    fn test_change_theme_derives_inverted() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.initialize();

        assert!(store.change_theme(ThemeColor::Dark).semantic.inverted);
        assert!(!store.change_theme(ThemeColor::Light).semantic.inverted);
        assert_eq!(
            storage.writes_to(THEME_KEY),
            vec!["dark".to_string(), "light".to_string()]
        );
    }

    #[test]
    fn test_initialize_reads_stored_color() {
        let storage = Arc::new(MemoryStorage::new());
        storage.preload(THEME_KEY, "dark");
        let store = store_with(&storage);

        let theme = store.initialize();
        assert_eq!(theme.color, ThemeColor::Dark);
        assert!(theme.semantic.inverted);
    }

    #[test]
    fn test_unknown_color_keeps_default_without_writing() {
        let storage = Arc::new(MemoryStorage::new());
        storage.preload(THEME_KEY, "sepia");
        let store = store_with(&storage);

        assert_eq!(store.initialize(), ThemeState::default());
        assert!(storage.history().is_empty());
    }

    #[test]
    fn test_no_write_before_initialize() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);

        store.change_theme(ThemeColor::Dark);
        assert!(storage.history().is_empty());
    }

    #[test]
    fn test_broadcasts_theme_change() {
        let storage = Arc::new(MemoryStorage::new());
        let store = store_with(&storage);
        store.initialize();
        let handle = store.subscribe(SubscriptionConfig {
            filter: SubscriptionFilter::theme(),
            ..Default::default()
        });

        store.change_theme(ThemeColor::Dark);
        store.change_theme(ThemeColor::Dark);

        let events = handle.drain();
        assert_eq!(events.len(), 1);
        match &events[0] {
            ViewerEvent::Theme { theme } => assert_eq!(theme.color, ThemeColor::Dark),
            other => panic!("Expected Theme event, got {:?}", other),
        }
    }
}
