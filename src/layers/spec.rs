//! Layer and source definitions for the managed overlays.

use crate::types::ThemeColor;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const SATELLITE_SOURCE_ID: &str = "satellite-source";
pub const SATELLITE_SOURCE_URL: &str = "mapbox://mapbox.satellite";
pub const SATELLITE_TILE_SIZE: u32 = 256;
pub const SATELLITE_LAYER_ID: &str = "satellite-layer";

pub const EXTRUSION_LAYER_ID: &str = "building-extrusions";
pub const EXTRUSION_SOURCE_ID: &str = "composite";
pub const EXTRUSION_SOURCE_LAYER: &str = "building";
/// Extrusions are hidden below this zoom.
pub const EXTRUSION_MIN_ZOOM: f64 = 15.0;
/// Height ramps from 0 at the min zoom to full height here, avoiding a pop.
pub const EXTRUSION_RAMP_END_ZOOM: f64 = 15.05;
pub const EXTRUSION_OPACITY: f64 = 0.6;

/// Style layer types, as reported by the rendering engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayerType {
    Background,
    Fill,
    Line,
    Symbol,
    Circle,
    Heatmap,
    Raster,
    Hillshade,
    FillExtrusion,
    Sky,
}

/// A layer currently attached to the map: id plus type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayerSummary {
    pub id: String,
    pub layer_type: LayerType,
}

impl LayerSummary {
    pub fn new(id: impl Into<String>, layer_type: LayerType) -> Self {
        Self {
            id: id.into(),
            layer_type,
        }
    }

    /// Base-style label layers: symbol layers whose id mentions "label".
    pub fn is_label(&self) -> bool {
        self.layer_type == LayerType::Symbol && self.id.contains("label")
    }
}

/// Source definition handed to the engine.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceSpec {
    Raster {
        url: String,
        #[serde(rename = "tileSize")]
        tile_size: u32,
    },
}

/// Linear ramp from 0 at `start_zoom` to a feature property at `end_zoom`.
#[derive(Clone, Debug, PartialEq)]
pub struct ZoomRamp {
    pub start_zoom: f64,
    pub end_zoom: f64,
    pub property: &'static str,
}

impl ZoomRamp {
    pub fn to_expression(&self) -> Value {
        json!([
            "interpolate",
            ["linear"],
            ["zoom"],
            self.start_zoom,
            0,
            self.end_zoom,
            ["get", self.property]
        ])
    }
}

/// Paint properties for the building extrusion layer.
#[derive(Clone, Debug, PartialEq)]
pub struct ExtrusionPaint {
    pub color: &'static str,
    pub height: ZoomRamp,
    pub base: ZoomRamp,
    pub opacity: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub enum LayerKind {
    Raster,
    FillExtrusion {
        source_layer: &'static str,
        filter: Value,
        paint: ExtrusionPaint,
    },
}

/// Layer definition handed to the engine.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub min_zoom: Option<f64>,
    pub kind: LayerKind,
}

impl LayerSpec {
    pub fn layer_type(&self) -> LayerType {
        match self.kind {
            LayerKind::Raster => LayerType::Raster,
            LayerKind::FillExtrusion { .. } => LayerType::FillExtrusion,
        }
    }

    pub fn summary(&self) -> LayerSummary {
        LayerSummary::new(self.id.clone(), self.layer_type())
    }

    /// Render as a style-spec layer object.
    pub fn to_style_json(&self) -> Value {
        let mut layer = json!({
            "id": self.id,
            "type": self.layer_type(),
            "source": self.source,
        });
        if let Some(min_zoom) = self.min_zoom {
            layer["minzoom"] = json!(min_zoom);
        }
        if let LayerKind::FillExtrusion {
            source_layer,
            filter,
            paint,
        } = &self.kind
        {
            layer["source-layer"] = json!(source_layer);
            layer["filter"] = filter.clone();
            layer["paint"] = json!({
                "fill-extrusion-color": paint.color,
                "fill-extrusion-height": paint.height.to_expression(),
                "fill-extrusion-base": paint.base.to_expression(),
                "fill-extrusion-opacity": paint.opacity,
            });
        }
        layer
    }
}

pub fn satellite_source() -> SourceSpec {
    SourceSpec::Raster {
        url: SATELLITE_SOURCE_URL.to_string(),
        tile_size: SATELLITE_TILE_SIZE,
    }
}

pub fn satellite_layer() -> LayerSpec {
    LayerSpec {
        id: SATELLITE_LAYER_ID.to_string(),
        source: SATELLITE_SOURCE_ID.to_string(),
        min_zoom: None,
        kind: LayerKind::Raster,
    }
}

/// Building footprint color for a theme.
pub fn extrusion_color(theme: ThemeColor) -> &'static str {
    match theme {
        ThemeColor::Light => "#aaa",
        ThemeColor::Dark => "#000",
    }
}

pub fn extrusion_layer(theme: ThemeColor) -> LayerSpec {
    LayerSpec {
        id: EXTRUSION_LAYER_ID.to_string(),
        source: EXTRUSION_SOURCE_ID.to_string(),
        min_zoom: Some(EXTRUSION_MIN_ZOOM),
        kind: LayerKind::FillExtrusion {
            source_layer: EXTRUSION_SOURCE_LAYER,
            filter: json!(["==", "extrude", "true"]),
            paint: ExtrusionPaint {
                color: extrusion_color(theme),
                height: ZoomRamp {
                    start_zoom: EXTRUSION_MIN_ZOOM,
                    end_zoom: EXTRUSION_RAMP_END_ZOOM,
                    property: "height",
                },
                base: ZoomRamp {
                    start_zoom: EXTRUSION_MIN_ZOOM,
                    end_zoom: EXTRUSION_RAMP_END_ZOOM,
                    property: "min_height",
                },
                opacity: EXTRUSION_OPACITY,
            },
        },
    }
}
