//! The viewer: stores, registry and reconciler wired to one map.
//!
//! Every user action is one method call. The action updates a store, and
//! [`Viewer::pump`] then lets the reconciler react to the resulting
//! notifications synchronously. Map errors are logged, never propagated.

use crate::blobs::BlobStore;
use crate::config::ViewerConfig;
use crate::error::{Result, ViewerError};
use crate::files::{FileRegistry, PickedFile, Registration, SweepReport, ACCEPTED_FILE_TYPES};
use crate::layers::{reconciler_subscription, DesiredLayers, LayerReconciler, MapEngine, ReconcileReport};
use crate::state::{ThemeStore, ViewStateStore};
use crate::storage::DurableStorage;
use crate::subscriptions::{SubscriptionConfig, SubscriptionHandle, SubscriptionManager};
use crate::types::{Coords, MapStyle, ThemeColor, ThemeState, ViewState, ViewStatePatch};
use std::sync::Arc;

#[cfg(not(target_arch = "wasm32"))]
use crate::blobs::FileBlobStore;
#[cfg(not(target_arch = "wasm32"))]
use crate::storage::FileStorage;

/// Everything the control panel renders.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Controls {
    pub theme: ThemeColor,
    pub theme_options: &'static [ThemeColor],
    pub satellite_enabled: bool,
    pub extrusions_enabled: bool,
    /// Value for the file picker's `accept` attribute.
    pub accepted_files: &'static str,
    /// The map is (re)loading its style.
    pub loading: bool,
}

pub struct Viewer<M: MapEngine> {
    subscriptions: Arc<SubscriptionManager>,
    state: Arc<ViewStateStore>,
    theme: Arc<ThemeStore>,
    files: FileRegistry,
    reconciler: LayerReconciler,
    buffer_size: usize,
    map: M,
    loading: bool,
}

impl<M: MapEngine> Viewer<M> {
    /// Open file-backed storage and blobs under `config.path`.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn open(config: ViewerConfig, map: M) -> Result<Self> {
        let storage: Arc<dyn DurableStorage> =
            Arc::new(FileStorage::open(&config.path, config.create_if_missing)?);
        let blobs: Arc<dyn BlobStore> = Arc::new(FileBlobStore::new(
            &config.path,
            &config.blob_namespace,
            config.blob_cache_size,
        )?);

        tracing::info!(path = %config.path.display(), "viewer opened");
        Ok(Self::with_parts(&config, storage, blobs, map))
    }

    /// Build a viewer from explicit collaborators.
    ///
    /// Nothing is read or written until [`initialize`](Self::initialize).
    pub fn with_parts(
        config: &ViewerConfig,
        storage: Arc<dyn DurableStorage>,
        blobs: Arc<dyn BlobStore>,
        map: M,
    ) -> Self {
        let subscriptions = Arc::new(SubscriptionManager::new());
        let state = Arc::new(ViewStateStore::with_subscriptions(
            Arc::clone(&storage),
            config.view_state_key.clone(),
            Arc::clone(&subscriptions),
        ));
        let theme = Arc::new(ThemeStore::with_subscriptions(
            storage,
            config.theme_key.clone(),
            Arc::clone(&subscriptions),
        ));
        let reconciler = Self::subscribe_reconciler(
            &subscriptions,
            &state,
            &theme,
            config.subscription_buffer_size,
        );
        let files = FileRegistry::new(Arc::clone(&state), blobs);

        Self {
            subscriptions,
            state,
            theme,
            files,
            reconciler,
            buffer_size: config.subscription_buffer_size,
            map,
            // The first style load is still pending.
            loading: true,
        }
    }

    /// Hydrate both stores and move the map to the stored viewport.
    ///
    /// Layers are applied on the next style load.
    pub fn initialize(&mut self) -> Arc<ViewState> {
        let theme = self.theme.initialize();
        let state = self.state.initialize();
        self.map.jump_to(state.coords);
        tracing::info!(
            theme = %theme.color,
            style = %state.style_id,
            files = state.files.len(),
            "viewer initialized"
        );
        self.pump();
        state
    }

    pub fn view_state(&self) -> Arc<ViewState> {
        self.state.current()
    }

    pub fn theme(&self) -> ThemeState {
        self.theme.current()
    }

    pub fn state_store(&self) -> &Arc<ViewStateStore> {
        &self.state
    }

    pub fn theme_store(&self) -> &Arc<ThemeStore> {
        &self.theme
    }

    /// Subscribe to view state and theme events.
    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.subscriptions.subscribe(config)
    }

    pub fn set_satellite(&mut self, enabled: bool) -> Result<Arc<ViewState>> {
        let state = self.state.update(ViewStatePatch::satellite(enabled))?;
        self.pump();
        Ok(state)
    }

    pub fn set_extrusions(&mut self, enabled: bool) -> Result<Arc<ViewState>> {
        let state = self.state.update(ViewStatePatch::extrusions(enabled))?;
        self.pump();
        Ok(state)
    }

    /// Switch the theme and the matching base style.
    pub fn select_theme(&mut self, color: ThemeColor) -> Result<ThemeState> {
        let theme = self.theme.change_theme(color);
        self.set_map_style(MapStyle::for_theme(color))?;
        self.pump();
        Ok(theme)
    }

    /// Select a base style. The engine must reload it and then call
    /// [`on_style_load_complete`](Self::on_style_load_complete).
    pub fn set_map_style(&mut self, style: MapStyle) -> Result<Arc<ViewState>> {
        let previous = self.state.current().style_id;
        let state = self.state.update(ViewStatePatch::style(style))?;
        if previous != style {
            tracing::debug!(%style, "style changed, waiting for load");
            self.loading = true;
        }
        Ok(state)
    }

    /// Record the viewport after the user moved the map.
    pub fn on_viewport_change(&mut self, coords: Coords) -> Result<Arc<ViewState>> {
        self.state.update(ViewStatePatch::coords(coords))
    }

    /// Re-apply everything after the engine finished loading a style.
    ///
    /// A style load drops every custom layer, so this is a full pass rather
    /// than a diff against the last notification.
    pub fn on_style_load_complete(&mut self) -> Option<ReconcileReport> {
        let report = match self.reconciler.on_style_loaded(&mut self.map) {
            Ok(report) => Some(report),
            Err(ViewerError::SubscriptionDropped) => {
                self.resubscribe();
                self.reconcile_current()
            }
            Err(e) => {
                self.record_failure(e);
                None
            }
        };
        self.loading = false;

        if let Some(report) = &report {
            self.follow_zoom(report);
        }
        report
    }

    /// Run the reconciler on pending store notifications.
    ///
    /// While a style is loading only the desired state is tracked; the
    /// style-load pass applies it.
    pub fn pump(&mut self) -> Option<ReconcileReport> {
        let outcome = if self.loading {
            self.reconciler.absorb().map(|_| None)
        } else {
            self.reconciler.pump(&mut self.map)
        };

        match outcome {
            Ok(Some(report)) => {
                self.follow_zoom(&report);
                Some(report)
            }
            Ok(None) => None,
            Err(ViewerError::SubscriptionDropped) => {
                self.resubscribe();
                if self.loading {
                    None
                } else {
                    self.reconcile_current()
                }
            }
            Err(e) => {
                self.record_failure(e);
                None
            }
        }
    }

    /// Attach the files from one picker interaction.
    pub fn attach_files(&mut self, files: Vec<PickedFile>) -> Vec<(String, Result<Registration>)> {
        self.files.register_batch(files)
    }

    pub fn remove_object(&mut self, name: &str) -> Result<bool> {
        self.files.remove(name)
    }

    pub fn object_bytes(&self, name: &str) -> Result<Vec<u8>> {
        self.files.object_bytes(name)
    }

    /// Check `files` entries against the blob store.
    pub fn sweep(&mut self) -> Result<SweepReport> {
        self.files.sweep()
    }

    pub fn controls(&self) -> Controls {
        let state = self.state.current();
        Controls {
            theme: self.theme.current().color,
            theme_options: &ThemeColor::ALL,
            satellite_enabled: state.satellite_enabled,
            extrusions_enabled: state.extrusions_enabled,
            accepted_files: ACCEPTED_FILE_TYPES,
            loading: self.loading,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn map(&self) -> &M {
        &self.map
    }

    pub fn map_mut(&mut self) -> &mut M {
        &mut self.map
    }

    /// Mirror a reconciler zoom into the stored viewport.
    fn follow_zoom(&self, report: &ReconcileReport) {
        if let Some(zoom) = report.zoomed_to {
            if let Err(e) = self.state.update(ViewStatePatch::zoom(zoom)) {
                tracing::warn!(error = %e, zoom, "failed to record zoom");
            }
        }
    }

    /// Replace a dropped reconciler subscription, seeded from current state.
    fn resubscribe(&mut self) {
        tracing::warn!("reconciler fell behind, resubscribing");
        self.reconciler = Self::subscribe_reconciler(
            &self.subscriptions,
            &self.state,
            &self.theme,
            self.buffer_size,
        );
    }

    fn reconcile_current(&mut self) -> Option<ReconcileReport> {
        let desired = self.reconciler.desired();
        match crate::layers::reconcile(&mut self.map, &desired) {
            Ok(report) => {
                self.follow_zoom(&report);
                Some(report)
            }
            Err(e) => {
                self.record_failure(e);
                None
            }
        }
    }

    /// Log a failed pass, keeping any zoom it applied before failing.
    fn record_failure(&self, error: ViewerError) {
        if let ViewerError::PartialReconcile { report, .. } = &error {
            self.follow_zoom(report);
        }
        tracing::warn!(error = %error, "layer reconciliation failed");
    }

    fn subscribe_reconciler(
        subscriptions: &SubscriptionManager,
        state: &ViewStateStore,
        theme: &ThemeStore,
        buffer_size: usize,
    ) -> LayerReconciler {
        let handle = subscriptions.subscribe(reconciler_subscription(buffer_size));
        let desired = DesiredLayers::from_state(&state.current(), theme.current().color);
        LayerReconciler::new(handle, desired)
    }
}
