//! Reconciles the managed overlay layers with the desired toggle state.
//!
//! Each managed layer is either absent or present on the live map. A pass
//! reads the live layer list, compares it with the desired flag and issues
//! only the add/remove calls needed to close the gap. Re-running a pass with
//! the same flags issues nothing.

use super::engine::{FlyTo, MapEngine};
use super::spec::{
    extrusion_layer, satellite_layer, satellite_source, EXTRUSION_LAYER_ID, EXTRUSION_MIN_ZOOM,
    SATELLITE_LAYER_ID, SATELLITE_SOURCE_ID,
};
use crate::error::{Result, ViewerError};
use crate::subscriptions::{SubscriptionConfig, SubscriptionFilter, SubscriptionHandle, ViewerEvent};
use crate::types::{ThemeColor, ViewField, ViewState};
use crossbeam_channel::TryRecvError;

/// Speed of the zoom-in animation when extrusions are enabled out of range.
pub const FLY_TO_SPEED: f64 = 0.5;

/// The overlay state the map should show.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DesiredLayers {
    pub satellite: bool,
    pub extrusions: bool,
    pub theme: ThemeColor,
}

impl DesiredLayers {
    pub fn from_state(state: &ViewState, theme: ThemeColor) -> Self {
        Self {
            satellite: state.satellite_enabled,
            extrusions: state.extrusions_enabled,
            theme,
        }
    }
}

/// What a pass did to one managed layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LayerChange {
    Added,
    Removed,
    #[default]
    Unchanged,
}

/// Outcome of a reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReconcileReport {
    pub labels_removed: Vec<String>,
    pub extrusions: LayerChange,
    pub satellite: LayerChange,
    /// Zoom the viewport was moved to so new extrusions are visible.
    pub zoomed_to: Option<f64>,
}

impl ReconcileReport {
    pub fn is_noop(&self) -> bool {
        self.labels_removed.is_empty()
            && self.extrusions == LayerChange::Unchanged
            && self.satellite == LayerChange::Unchanged
            && self.zoomed_to.is_none()
    }
}

/// Bring both managed layers in line with `desired`.
///
/// Extrusions go first so that, when both are enabled, the satellite layer
/// ends up above them. A failure on one layer does not skip the other; the
/// first error is returned as [`ViewerError::PartialReconcile`], carrying
/// what the pass did change.
pub fn reconcile<M: MapEngine + ?Sized>(
    map: &mut M,
    desired: &DesiredLayers,
) -> Result<ReconcileReport> {
    let mut report = ReconcileReport::default();
    let mut failure = None;

    match reconcile_extrusions(map, desired.extrusions, desired.theme) {
        Ok((change, zoomed_to)) => {
            report.extrusions = change;
            report.zoomed_to = zoomed_to;
        }
        Err(e) => failure = Some(e),
    }
    match reconcile_satellite(map, desired.satellite) {
        Ok(change) => report.satellite = change,
        Err(e) => {
            failure.get_or_insert(e);
        }
    }

    match failure {
        None => Ok(report),
        Some(source) => Err(ViewerError::PartialReconcile {
            report: Box::new(report),
            source: Box::new(source),
        }),
    }
}

/// Full pass after the style finished (re)loading.
///
/// Label layers are stripped first, since insertion points are computed
/// against the layer list as it stands.
pub fn on_style_loaded<M: MapEngine + ?Sized>(
    map: &mut M,
    desired: &DesiredLayers,
) -> Result<ReconcileReport> {
    let labels_removed = strip_labels(map)?;
    match reconcile(map, desired) {
        Ok(mut report) => {
            report.labels_removed = labels_removed;
            Ok(report)
        }
        Err(ViewerError::PartialReconcile { mut report, source }) => {
            report.labels_removed = labels_removed;
            Err(ViewerError::PartialReconcile { report, source })
        }
        Err(e) => Err(e),
    }
}

/// Remove every base-style label layer.
pub fn strip_labels<M: MapEngine + ?Sized>(map: &mut M) -> Result<Vec<String>> {
    let labels: Vec<String> = map
        .layers()
        .into_iter()
        .filter(|layer| layer.is_label())
        .map(|layer| layer.id)
        .collect();

    for id in &labels {
        map.remove_layer(id)?;
    }

    if !labels.is_empty() {
        tracing::debug!(count = labels.len(), "stripped label layers");
    }
    Ok(labels)
}

pub fn reconcile_satellite<M: MapEngine + ?Sized>(map: &mut M, enabled: bool) -> Result<LayerChange> {
    let present = map.has_layer(SATELLITE_LAYER_ID);

    match (enabled, present) {
        (true, false) => {
            if !map.is_source_loaded(SATELLITE_SOURCE_ID) {
                map.add_source(SATELLITE_SOURCE_ID, &satellite_source())?;
            }
            map.add_layer(&satellite_layer(), None)?;
            tracing::info!("satellite layer added");
            Ok(LayerChange::Added)
        }
        (false, true) => {
            // The source stays attached so re-enabling skips the fetch.
            map.remove_layer(SATELLITE_LAYER_ID)?;
            tracing::info!("satellite layer removed");
            Ok(LayerChange::Removed)
        }
        _ => Ok(LayerChange::Unchanged),
    }
}

/// Returns the change plus the zoom the viewport was moved to, if any.
pub fn reconcile_extrusions<M: MapEngine + ?Sized>(
    map: &mut M,
    enabled: bool,
    theme: ThemeColor,
) -> Result<(LayerChange, Option<f64>)> {
    let layers = map.layers();
    let present = layers.iter().any(|layer| layer.id == EXTRUSION_LAYER_ID);
    let satellite_present = layers.iter().any(|layer| layer.id == SATELLITE_LAYER_ID);

    match (enabled, present) {
        (true, false) => {
            let layer = extrusion_layer(theme);
            let min_zoom = layer.min_zoom.unwrap_or(EXTRUSION_MIN_ZOOM);
            let before = satellite_present.then_some(SATELLITE_LAYER_ID);

            map.add_layer(&layer, before)?;
            tracing::info!(%theme, below_satellite = satellite_present, "extrusion layer added");

            let mut zoomed_to = None;
            if map.zoom() < min_zoom {
                map.set_zoom(min_zoom);
                map.fly_to(FlyTo {
                    zoom: min_zoom,
                    speed: FLY_TO_SPEED,
                });
                zoomed_to = Some(min_zoom);
            }
            Ok((LayerChange::Added, zoomed_to))
        }
        (false, true) => {
            map.remove_layer(EXTRUSION_LAYER_ID)?;
            tracing::info!("extrusion layer removed");
            Ok((LayerChange::Removed, None))
        }
        _ => Ok((LayerChange::Unchanged, None)),
    }
}

/// Subscription a [`LayerReconciler`] needs: overlay toggles and theme changes.
pub fn reconciler_subscription(buffer_size: usize) -> SubscriptionConfig {
    SubscriptionConfig {
        buffer_size,
        include_current: false,
        filter: SubscriptionFilter {
            fields: Some(vec![ViewField::Satellite, ViewField::Extrusions]),
            include_view_state: true,
            include_theme: true,
        },
    }
}

/// Drives reconciliation from store change notifications.
///
/// Notifications are absorbed into the desired overlay state; the map is only
/// touched when [`pump`](Self::pump) or [`on_style_loaded`](Self::on_style_loaded)
/// is called.
pub struct LayerReconciler {
    events: SubscriptionHandle,
    desired: DesiredLayers,
}

impl LayerReconciler {
    pub fn new(events: SubscriptionHandle, desired: DesiredLayers) -> Self {
        Self { events, desired }
    }

    pub fn desired(&self) -> DesiredLayers {
        self.desired
    }

    /// Fold pending notifications into the desired state.
    ///
    /// Returns whether anything relevant arrived. A subscription the manager
    /// dropped for falling behind yields [`ViewerError::SubscriptionDropped`].
    pub fn absorb(&mut self) -> Result<bool> {
        let mut dirty = false;
        loop {
            let event = match self.events.try_recv() {
                Ok(event) => event,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("reconciler subscription disconnected");
                    return Err(ViewerError::SubscriptionDropped);
                }
            };
            match event {
                ViewerEvent::ViewState { state, changed } => {
                    if changed
                        .iter()
                        .any(|f| matches!(f, ViewField::Satellite | ViewField::Extrusions))
                    {
                        self.desired.satellite = state.satellite_enabled;
                        self.desired.extrusions = state.extrusions_enabled;
                        dirty = true;
                    }
                }
                ViewerEvent::Theme { theme } => {
                    self.desired.theme = theme.color;
                    dirty = true;
                }
                ViewerEvent::Dropped { reason } => {
                    tracing::warn!(?reason, "reconciler subscription dropped");
                    return Err(ViewerError::SubscriptionDropped);
                }
            }
        }
        Ok(dirty)
    }

    /// Absorb notifications and reconcile if any arrived.
    pub fn pump<M: MapEngine + ?Sized>(&mut self, map: &mut M) -> Result<Option<ReconcileReport>> {
        if !self.absorb()? {
            return Ok(None);
        }
        reconcile(map, &self.desired).map(Some)
    }

    /// Full pass after a style load, using the latest desired state.
    pub fn on_style_loaded<M: MapEngine + ?Sized>(&mut self, map: &mut M) -> Result<ReconcileReport> {
        self.absorb()?;
        on_style_loaded(map, &self.desired)
    }
}
