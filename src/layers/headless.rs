//! In-process map engine without rendering.
//!
//! Keeps an ordered layer list and a source table, records every mutating
//! call, and can simulate a style reload. Used for headless runs and tests.

use super::engine::{FlyTo, MapEngine};
use super::spec::{LayerSpec, LayerSummary, LayerType, SourceSpec};
use crate::error::{Result, ViewerError};
use crate::types::Coords;
use std::collections::{BTreeMap, HashSet};

/// A mutating call made against a [`HeadlessMap`].
#[derive(Clone, Debug, PartialEq)]
pub enum MapCall {
    AddLayer { id: String, before: Option<String> },
    RemoveLayer(String),
    AddSource(String),
    RemoveSource(String),
    SetZoom(f64),
    FlyTo(FlyTo),
    JumpTo(Coords),
}

struct AttachedLayer {
    summary: LayerSummary,
    /// Present for layers added through `add_layer`; base-style layers have none.
    spec: Option<LayerSpec>,
}

pub struct HeadlessMap {
    layers: Vec<AttachedLayer>,
    sources: BTreeMap<String, Option<SourceSpec>>,
    viewport: Coords,
    calls: Vec<MapCall>,
    rejected_layers: HashSet<String>,
}

impl HeadlessMap {
    /// Create a map showing `style` at `zoom` over the default center.
    pub fn new(style: Vec<LayerSummary>, zoom: f64) -> Self {
        let mut map = Self {
            layers: Vec::new(),
            sources: BTreeMap::new(),
            viewport: Coords {
                zoom,
                ..Coords::default()
            },
            calls: Vec::new(),
            rejected_layers: HashSet::new(),
        };
        map.load_style(style);
        map
    }

    /// Replace the style, dropping every custom layer and source.
    pub fn load_style(&mut self, style: Vec<LayerSummary>) {
        self.layers = style
            .into_iter()
            .map(|summary| AttachedLayer {
                summary,
                spec: None,
            })
            .collect();
        self.sources.clear();
        self.sources.insert("composite".to_string(), None);
    }

    /// Make `add_layer` fail for `id`, as an engine would for an invalid spec.
    pub fn reject_layer(&mut self, id: &str) {
        self.rejected_layers.insert(id.to_string());
    }

    pub fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.summary.id.clone()).collect()
    }

    pub fn layer_spec(&self, id: &str) -> Option<&LayerSpec> {
        self.layers
            .iter()
            .find(|l| l.summary.id == id)
            .and_then(|l| l.spec.as_ref())
    }

    pub fn viewport(&self) -> Coords {
        self.viewport
    }

    pub fn calls(&self) -> &[MapCall] {
        &self.calls
    }

    pub fn take_calls(&mut self) -> Vec<MapCall> {
        std::mem::take(&mut self.calls)
    }

    fn position(&self, id: &str) -> Option<usize> {
        self.layers.iter().position(|l| l.summary.id == id)
    }
}

impl MapEngine for HeadlessMap {
    fn layers(&self) -> Vec<LayerSummary> {
        self.layers.iter().map(|l| l.summary.clone()).collect()
    }

    fn add_layer(&mut self, layer: &LayerSpec, before_id: Option<&str>) -> Result<()> {
        if self.rejected_layers.contains(&layer.id) {
            return Err(ViewerError::Map(format!("layer {} rejected", layer.id)));
        }
        if self.position(&layer.id).is_some() {
            return Err(ViewerError::Map(format!("layer {} already exists", layer.id)));
        }
        let index = match before_id {
            Some(before) => self.position(before).ok_or_else(|| {
                ViewerError::Map(format!("layer {before} does not exist"))
            })?,
            None => self.layers.len(),
        };

        self.layers.insert(
            index,
            AttachedLayer {
                summary: layer.summary(),
                spec: Some(layer.clone()),
            },
        );
        self.calls.push(MapCall::AddLayer {
            id: layer.id.clone(),
            before: before_id.map(str::to_string),
        });
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<()> {
        let index = self
            .position(id)
            .ok_or_else(|| ViewerError::Map(format!("layer {id} does not exist")))?;
        self.layers.remove(index);
        self.calls.push(MapCall::RemoveLayer(id.to_string()));
        Ok(())
    }

    fn add_source(&mut self, id: &str, source: &SourceSpec) -> Result<()> {
        if self.sources.contains_key(id) {
            return Err(ViewerError::Map(format!("source {id} already exists")));
        }
        self.sources.insert(id.to_string(), Some(source.clone()));
        self.calls.push(MapCall::AddSource(id.to_string()));
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<()> {
        if self.sources.remove(id).is_none() {
            return Err(ViewerError::Map(format!("source {id} does not exist")));
        }
        self.calls.push(MapCall::RemoveSource(id.to_string()));
        Ok(())
    }

    fn is_source_loaded(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn zoom(&self) -> f64 {
        self.viewport.zoom
    }

    fn set_zoom(&mut self, zoom: f64) {
        self.viewport.zoom = zoom;
        self.calls.push(MapCall::SetZoom(zoom));
    }

    fn fly_to(&mut self, target: FlyTo) {
        self.viewport.zoom = target.zoom;
        self.calls.push(MapCall::FlyTo(target));
    }

    fn jump_to(&mut self, coords: Coords) {
        self.viewport = coords;
        self.calls.push(MapCall::JumpTo(coords));
    }
}

/// A small street style: fills, lines and a mix of label and non-label
/// symbol layers.
pub fn basic_style() -> Vec<LayerSummary> {
    vec![
        LayerSummary::new("land", LayerType::Background),
        LayerSummary::new("water", LayerType::Fill),
        LayerSummary::new("building", LayerType::Fill),
        LayerSummary::new("road-primary", LayerType::Line),
        LayerSummary::new("road-label", LayerType::Symbol),
        LayerSummary::new("road-shield", LayerType::Symbol),
        LayerSummary::new("poi-label", LayerType::Symbol),
        LayerSummary::new("settlement-major-label", LayerType::Symbol),
    ]
}
