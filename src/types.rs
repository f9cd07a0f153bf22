//! Core types for the viewer state.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default viewport: the Wrigley Building, Chicago.
pub const DEFAULT_LONGITUDE: f64 = -87.62441813885201;
pub const DEFAULT_LATITUDE: f64 = 41.89104578239103;
pub const DEFAULT_ZOOM: f64 = 13.5;

/// Map viewport.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub longitude: f64,
    pub latitude: f64,
    pub zoom: f64,
}

impl Default for Coords {
    fn default() -> Self {
        Self {
            longitude: DEFAULT_LONGITUDE,
            latitude: DEFAULT_LATITUDE,
            zoom: DEFAULT_ZOOM,
        }
    }
}

/// Placement coordinate of a stored object file.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FileCoord {
    pub longitude: f64,
    pub latitude: f64,
}

impl From<Coords> for FileCoord {
    fn from(coords: Coords) -> Self {
        Self {
            longitude: coords.longitude,
            latitude: coords.latitude,
        }
    }
}

/// Known base map styles, serialized as their style URL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MapStyle {
    #[default]
    #[serde(rename = "mapbox://styles/mapbox/light-v10")]
    Light,
    #[serde(rename = "mapbox://styles/mapbox/dark-v10")]
    Dark,
    #[serde(rename = "mapbox://styles/mapbox/outdoors-v11")]
    Outdoors,
    #[serde(rename = "mapbox://styles/mapbox/satellite-v9")]
    Satellite,
    #[serde(rename = "mapbox://styles/mapbox/streets-v11")]
    Streets,
}

impl MapStyle {
    pub const ALL: [MapStyle; 5] = [
        MapStyle::Light,
        MapStyle::Dark,
        MapStyle::Outdoors,
        MapStyle::Satellite,
        MapStyle::Streets,
    ];

    /// Style URL handed to the rendering engine.
    pub fn url(&self) -> &'static str {
        match self {
            MapStyle::Light => "mapbox://styles/mapbox/light-v10",
            MapStyle::Dark => "mapbox://styles/mapbox/dark-v10",
            MapStyle::Outdoors => "mapbox://styles/mapbox/outdoors-v11",
            MapStyle::Satellite => "mapbox://styles/mapbox/satellite-v9",
            MapStyle::Streets => "mapbox://styles/mapbox/streets-v11",
        }
    }

    pub fn from_url(url: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.url() == url)
    }

    /// Base style paired with a theme color.
    pub fn for_theme(color: ThemeColor) -> Self {
        match color {
            ThemeColor::Light => MapStyle::Light,
            ThemeColor::Dark => MapStyle::Dark,
        }
    }
}

impl fmt::Display for MapStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.url())
    }
}

/// The persisted application state.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewState {
    pub coords: Coords,
    pub files: BTreeMap<String, FileCoord>,
    pub style_id: MapStyle,
    pub satellite_enabled: bool,
    pub extrusions_enabled: bool,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            coords: Coords::default(),
            files: BTreeMap::new(),
            style_id: MapStyle::default(),
            satellite_enabled: false,
            extrusions_enabled: false,
        }
    }
}

/// Top-level fields of [`ViewState`], used to filter change events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewField {
    Coords,
    Files,
    Style,
    Satellite,
    Extrusions,
}

impl ViewState {
    /// Fields whose value differs between `self` and `other`.
    pub fn changed_fields(&self, other: &ViewState) -> Vec<ViewField> {
        let mut changed = Vec::new();
        if self.coords != other.coords {
            changed.push(ViewField::Coords);
        }
        if self.files != other.files {
            changed.push(ViewField::Files);
        }
        if self.style_id != other.style_id {
            changed.push(ViewField::Style);
        }
        if self.satellite_enabled != other.satellite_enabled {
            changed.push(ViewField::Satellite);
        }
        if self.extrusions_enabled != other.extrusions_enabled {
            changed.push(ViewField::Extrusions);
        }
        changed
    }
}

/// Partial viewport update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct CoordsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zoom: Option<f64>,
}

impl From<Coords> for CoordsPatch {
    fn from(coords: Coords) -> Self {
        Self {
            longitude: Some(coords.longitude),
            latitude: Some(coords.latitude),
            zoom: Some(coords.zoom),
        }
    }
}

/// Partial [`ViewState`] update.
///
/// Omitted fields are left untouched by the merge. A `files` entry set to
/// `None` serializes as `null` and removes that entry.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewStatePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coords: Option<CoordsPatch>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<BTreeMap<String, Option<FileCoord>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style_id: Option<MapStyle>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub satellite_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extrusions_enabled: Option<bool>,
}

impl ViewStatePatch {
    pub fn coords(coords: impl Into<CoordsPatch>) -> Self {
        Self {
            coords: Some(coords.into()),
            ..Default::default()
        }
    }

    pub fn zoom(zoom: f64) -> Self {
        Self::coords(CoordsPatch {
            zoom: Some(zoom),
            ..Default::default()
        })
    }

    pub fn style(style: MapStyle) -> Self {
        Self {
            style_id: Some(style),
            ..Default::default()
        }
    }

    pub fn satellite(enabled: bool) -> Self {
        Self {
            satellite_enabled: Some(enabled),
            ..Default::default()
        }
    }

    pub fn extrusions(enabled: bool) -> Self {
        Self {
            extrusions_enabled: Some(enabled),
            ..Default::default()
        }
    }

    /// Register (or move) an object file at `coord`.
    pub fn add_file(name: impl Into<String>, coord: FileCoord) -> Self {
        Self {
            files: Some(BTreeMap::from([(name.into(), Some(coord))])),
            ..Default::default()
        }
    }

    /// Tombstone an object file entry.
    pub fn remove_file(name: impl Into<String>) -> Self {
        Self {
            files: Some(BTreeMap::from([(name.into(), None)])),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Light or dark application theme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeColor {
    #[default]
    Light,
    Dark,
}

impl ThemeColor {
    pub const ALL: [ThemeColor; 2] = [ThemeColor::Light, ThemeColor::Dark];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeColor::Light => "light",
            ThemeColor::Dark => "dark",
        }
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ThemeColor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "light" => Ok(ThemeColor::Light),
            "dark" => Ok(ThemeColor::Dark),
            other => Err(format!("unknown theme color: {other}")),
        }
    }
}

/// Values derived from the theme color.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemanticTheme {
    pub inverted: bool,
}

/// Theme selection plus its derived values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThemeState {
    pub color: ThemeColor,
    pub semantic: SemanticTheme,
}

impl ThemeState {
    pub fn from_color(color: ThemeColor) -> Self {
        Self {
            color,
            semantic: SemanticTheme {
                inverted: color == ThemeColor::Dark,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_state_json_shape() {
        let json = serde_json::to_value(ViewState::default()).unwrap();
        assert_eq!(json["styleId"], "mapbox://styles/mapbox/light-v10");
        assert_eq!(json["satelliteEnabled"], false);
        assert_eq!(json["extrusionsEnabled"], false);
        assert_eq!(json["coords"]["zoom"], 13.5);
        assert!(json["files"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_style_rejected() {
        let mut json = serde_json::to_value(ViewState::default()).unwrap();
        json["styleId"] = "mapbox://styles/someone/custom".into();
        assert!(serde_json::from_value::<ViewState>(json).is_err());
    }

    #[test]
    fn test_patch_omits_unset_fields() {
        let patch = ViewStatePatch::satellite(true);
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({ "satelliteEnabled": true }));
    }

    #[test]
    fn test_remove_file_serializes_tombstone() {
        let json = serde_json::to_value(ViewStatePatch::remove_file("tower")).unwrap();
        assert_eq!(json, serde_json::json!({ "files": { "tower": null } }));
    }

    #[test]
    fn test_theme_derivation() {
        assert!(ThemeState::from_color(ThemeColor::Dark).semantic.inverted);
        assert!(!ThemeState::from_color(ThemeColor::Light).semantic.inverted);
    }

    #[test]
    fn test_changed_fields() {
        let a = ViewState::default();
        let mut b = a.clone();
        b.satellite_enabled = true;
        b.coords.zoom = 16.0;
        assert_eq!(a.changed_fields(&b), vec![ViewField::Coords, ViewField::Satellite]);
        assert!(a.changed_fields(&a).is_empty());
    }

    #[test]
    fn test_style_url_round_trip() {
        for style in MapStyle::ALL {
            assert_eq!(MapStyle::from_url(style.url()), Some(style));
        }
        assert_eq!(MapStyle::for_theme(ThemeColor::Dark), MapStyle::Dark);
    }
}
