//! The map rendering engine as consumed by the reconciler.

use super::spec::{LayerSpec, LayerSummary, SourceSpec};
use crate::error::Result;
use crate::types::Coords;

/// Viewport animation target.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FlyTo {
    pub zoom: f64,
    pub speed: f64,
}

/// Layer and source primitives of a live map instance.
///
/// The engine owns its layer list and may rebuild it wholesale (a style
/// change drops every custom layer and source), so callers must query it
/// rather than remember what they added.
pub trait MapEngine {
    /// Currently attached layers, bottom to top.
    fn layers(&self) -> Vec<LayerSummary>;

    fn has_layer(&self, id: &str) -> bool {
        self.layers().iter().any(|layer| layer.id == id)
    }

    /// Add a layer below `before_id`, or on top when `None`.
    fn add_layer(&mut self, layer: &LayerSpec, before_id: Option<&str>) -> Result<()>;

    fn remove_layer(&mut self, id: &str) -> Result<()>;

    fn add_source(&mut self, id: &str, source: &SourceSpec) -> Result<()>;

    fn remove_source(&mut self, id: &str) -> Result<()>;

    fn is_source_loaded(&self, id: &str) -> bool;

    fn zoom(&self) -> f64;

    fn set_zoom(&mut self, zoom: f64);

    /// Move the viewport without animating.
    fn jump_to(&mut self, coords: Coords);

    fn fly_to(&mut self, target: FlyTo);
}
