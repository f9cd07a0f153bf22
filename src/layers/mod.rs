//! Map layer reconciliation.
//!
//! The satellite raster and the building extrusions are managed overlays on
//! top of a base style. [`LayerReconciler`] follows the stores and decides
//! which of them to add or remove; [`MapEngine`] is the live map it talks to.

pub mod engine;
pub mod headless;
pub mod reconciler;
pub mod spec;

pub use engine::{FlyTo, MapEngine};
pub use headless::{basic_style, HeadlessMap, MapCall};
pub use reconciler::{
    on_style_loaded, reconcile, reconcile_extrusions, reconcile_satellite, reconciler_subscription,
    strip_labels, DesiredLayers, LayerChange, LayerReconciler, ReconcileReport, FLY_TO_SPEED,
};
pub use spec::{
    extrusion_layer, satellite_layer, satellite_source, LayerKind, LayerSpec, LayerSummary,
    LayerType, SourceSpec, EXTRUSION_LAYER_ID, EXTRUSION_MIN_ZOOM, SATELLITE_LAYER_ID,
    SATELLITE_SOURCE_ID,
};
