//! Map parameters.
//!
//! Every field has a default, so an empty JSON object is a valid
//! configuration. Style fields hold user overrides only; the effective
//! layers are the overrides merged over the built-in defaults (see
//! [`MapParams::region_style`] and friends).

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::Deserialize;

use crate::render::backend::BackendKind;
use crate::render::style::{StyleLayers, StyleMap, style_map};
use crate::types::AttrValue;

/// Default dataset name
pub const DEFAULT_MAP: &str = "world_mill_en";

pub const DEFAULT_BACKGROUND: &str = "#505050";

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MapParams {
    pub map: String,
    pub backend: BackendKind,
    /// CSS color painted behind the map
    pub background_color: String,
    pub zoom_max: f64,
    pub zoom_min: f64,
    /// Zoom factor of `zoom_in`/`zoom_out`
    pub zoom_step: f64,
    pub zoom_animate: bool,
    pub regions_selectable: bool,
    pub markers_selectable: bool,
    pub regions_selectable_one: bool,
    pub markers_selectable_one: bool,
    pub region_style: StyleLayers,
    pub region_label_style: StyleLayers,
    pub marker_style: StyleLayers,
    pub marker_label_style: StyleLayers,
    pub markers: MarkerList,
    pub series: SeriesConfig,
    pub focus_on: Option<FocusRequest>,
    pub selected_regions: Option<Selection>,
    pub selected_markers: Option<Selection>,
    pub labels: LabelsParams,
}

impl Default for MapParams {
    fn default() -> Self {
        Self {
            map: DEFAULT_MAP.to_string(),
            backend: BackendKind::default(),
            background_color: DEFAULT_BACKGROUND.to_string(),
            zoom_max: 8.0,
            zoom_min: 1.0,
            zoom_step: 1.6,
            zoom_animate: true,
            regions_selectable: false,
            markers_selectable: false,
            regions_selectable_one: false,
            markers_selectable_one: false,
            region_style: StyleLayers::default(),
            region_label_style: StyleLayers::default(),
            marker_style: StyleLayers::default(),
            marker_label_style: StyleLayers::default(),
            markers: MarkerList::default(),
            series: SeriesConfig::default(),
            focus_on: None,
            selected_regions: None,
            selected_markers: None,
            labels: LabelsParams::default(),
        }
    }
}

impl MapParams {
    pub fn new(map: impl Into<String>) -> Self {
        Self {
            map: map.into(),
            ..Self::default()
        }
    }

    /// Parse parameters from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn region_style(&self) -> StyleLayers {
        self.region_style.merged_over(&defaults::region_style())
    }

    pub fn region_label_style(&self) -> StyleLayers {
        self.region_label_style
            .merged_over(&defaults::label_style())
    }

    pub fn marker_style(&self) -> StyleLayers {
        self.marker_style.merged_over(&defaults::marker_style())
    }

    pub fn marker_label_style(&self) -> StyleLayers {
        self.marker_label_style
            .merged_over(&defaults::label_style())
    }
}

/// Built-in style layers
pub mod defaults {
    use super::*;

    pub fn region_style() -> StyleLayers {
        StyleLayers {
            initial: style_map([
                ("fill", AttrValue::from("white")),
                ("fill-opacity", 1.into()),
                ("stroke", "none".into()),
                ("stroke-width", 0.into()),
                ("stroke-opacity", 1.into()),
            ]),
            hover: style_map([
                ("fill-opacity", AttrValue::from(0.8)),
                ("cursor", "pointer".into()),
            ]),
            selected: style_map([("fill", "yellow")]),
            selected_hover: StyleMap::new(),
        }
    }

    pub fn label_style() -> StyleLayers {
        StyleLayers {
            initial: style_map([
                ("font-family", "Verdana"),
                ("font-size", "12"),
                ("font-weight", "bold"),
                ("cursor", "default"),
                ("fill", "black"),
            ]),
            hover: style_map([("cursor", "pointer")]),
            ..StyleLayers::default()
        }
    }

    pub fn marker_style() -> StyleLayers {
        StyleLayers {
            initial: style_map([
                ("fill", AttrValue::from("grey")),
                ("stroke", "#505050".into()),
                ("fill-opacity", 1.into()),
                ("stroke-width", 1.into()),
                ("stroke-opacity", 1.into()),
                ("r", 5.into()),
            ]),
            hover: style_map([
                ("stroke", AttrValue::from("black")),
                ("stroke-width", 2.into()),
                ("cursor", "pointer".into()),
            ]),
            selected: style_map([("fill", "blue")]),
            selected_hover: StyleMap::new(),
        }
    }
}

// ============================================================================
// Markers
// ============================================================================

/// A marker: a geographic or planar position plus optional name and style
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(from = "MarkerRepr")]
pub struct MarkerSpec {
    /// `[lat, lng]`, used when the map has a projection
    pub lat_lng: Option<[f64; 2]>,
    /// Unscaled map coordinates, used when it does not
    pub coords: Option<[f64; 2]>,
    pub name: Option<String>,
    /// Overrides of the marker's initial style layer
    pub style: StyleMap,
}

impl MarkerSpec {
    pub fn at_lat_lng(lat: f64, lng: f64) -> Self {
        Self {
            lat_lng: Some([lat, lng]),
            ..Self::default()
        }
    }

    pub fn at_coords(x: f64, y: f64) -> Self {
        Self {
            coords: Some([x, y]),
            ..Self::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_style(mut self, style: StyleMap) -> Self {
        self.style = style;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MarkerRepr {
    /// Bare `[lat, lng]`
    Point([f64; 2]),
    Full {
        #[serde(default, rename = "latLng")]
        lat_lng: Option<[f64; 2]>,
        #[serde(default)]
        coords: Option<[f64; 2]>,
        #[serde(default)]
        name: Option<String>,
        #[serde(default)]
        style: StyleMap,
    },
}

impl From<MarkerRepr> for MarkerSpec {
    fn from(repr: MarkerRepr) -> Self {
        match repr {
            MarkerRepr::Point(lat_lng) => MarkerSpec {
                lat_lng: Some(lat_lng),
                ..MarkerSpec::default()
            },
            MarkerRepr::Full {
                lat_lng,
                coords,
                name,
                style,
            } => MarkerSpec {
                lat_lng,
                coords,
                name,
                style,
            },
        }
    }
}

/// Markers given as a list (keyed by index) or as a keyed object
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MarkerList {
    List(Vec<MarkerSpec>),
    Keyed(BTreeMap<String, MarkerSpec>),
}

impl Default for MarkerList {
    fn default() -> Self {
        MarkerList::List(Vec::new())
    }
}

impl From<Vec<MarkerSpec>> for MarkerList {
    fn from(list: Vec<MarkerSpec>) -> Self {
        MarkerList::List(list)
    }
}

impl From<BTreeMap<String, MarkerSpec>> for MarkerList {
    fn from(map: BTreeMap<String, MarkerSpec>) -> Self {
        MarkerList::Keyed(map)
    }
}

impl MarkerList {
    /// Markers with their keys; list entries are keyed by index.
    pub fn into_keyed(self) -> Vec<(String, MarkerSpec)> {
        match self {
            MarkerList::List(list) => list
                .into_iter()
                .enumerate()
                .map(|(i, spec)| (i.to_string(), spec))
                .collect(),
            MarkerList::Keyed(map) => map.into_iter().collect(),
        }
    }
}

// ============================================================================
// Series
// ============================================================================

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SeriesConfig {
    pub regions: Vec<SeriesParams>,
    pub markers: Vec<SeriesParams>,
}

/// Normalization named in configuration
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NormalizeKind {
    #[default]
    Linear,
    Polynomial,
}

/// Scale entries: a list of stops or a lookup table
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ScaleParams {
    Stops(Vec<AttrValue>),
    Table(BTreeMap<String, AttrValue>),
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SeriesParams {
    /// Attribute the series drives
    pub attribute: String,
    pub scale: Option<ScaleParams>,
    pub values: BTreeMap<String, AttrValue>,
    pub normalize_function: NormalizeKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Default for SeriesParams {
    fn default() -> Self {
        Self {
            attribute: "fill".to_string(),
            scale: None,
            values: BTreeMap::new(),
            normalize_function: NormalizeKind::Linear,
            min: None,
            max: None,
        }
    }
}

// ============================================================================
// Focus and selection
// ============================================================================

/// Where to move the viewport
#[derive(Clone, Debug, PartialEq)]
pub enum FocusTarget {
    /// Fit the union of these regions' bounding boxes
    Regions(Vec<String>),
    /// Center a geographic point at `scale` times the base scale
    LatLng { lat: f64, lng: f64, scale: f64 },
    /// Center a point given as fractions of the content size
    Point { x: f64, y: f64, scale: f64 },
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "FocusRepr")]
pub struct FocusRequest {
    pub target: FocusTarget,
    pub animate: bool,
}

impl FocusRequest {
    pub fn region(code: impl Into<String>) -> Self {
        Self::regions([code])
    }

    pub fn regions<S: Into<String>>(codes: impl IntoIterator<Item = S>) -> Self {
        Self {
            target: FocusTarget::Regions(codes.into_iter().map(Into::into).collect()),
            animate: false,
        }
    }

    pub fn lat_lng(lat: f64, lng: f64, scale: f64) -> Self {
        Self {
            target: FocusTarget::LatLng { lat, lng, scale },
            animate: false,
        }
    }

    pub fn point(x: f64, y: f64, scale: f64) -> Self {
        Self {
            target: FocusTarget::Point { x, y, scale },
            animate: false,
        }
    }

    pub fn animated(mut self) -> Self {
        self.animate = true;
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum FocusRepr {
    Region(String),
    Regions(Vec<String>),
    Object {
        #[serde(default)]
        region: Option<String>,
        #[serde(default)]
        regions: Option<Vec<String>>,
        #[serde(default)]
        lat: Option<f64>,
        #[serde(default)]
        lng: Option<f64>,
        #[serde(default)]
        x: Option<f64>,
        #[serde(default)]
        y: Option<f64>,
        #[serde(default = "default_focus_scale")]
        scale: f64,
        #[serde(default)]
        animate: bool,
    },
}

fn default_focus_scale() -> f64 {
    1.0
}

impl TryFrom<FocusRepr> for FocusRequest {
    type Error = String;

    fn try_from(repr: FocusRepr) -> Result<Self, Self::Error> {
        match repr {
            FocusRepr::Region(code) => Ok(FocusRequest::region(code)),
            FocusRepr::Regions(codes) => Ok(FocusRequest::regions(codes)),
            FocusRepr::Object {
                region,
                regions,
                lat,
                lng,
                x,
                y,
                scale,
                animate,
            } => {
                let target = if let Some(code) = region {
                    FocusTarget::Regions(vec![code])
                } else if let Some(codes) = regions {
                    FocusTarget::Regions(codes)
                } else if let (Some(lat), Some(lng)) = (lat, lng) {
                    FocusTarget::LatLng { lat, lng, scale }
                } else if let (Some(x), Some(y)) = (x, y) {
                    FocusTarget::Point { x, y, scale }
                } else {
                    return Err("focus needs `region`, `regions`, `lat`/`lng` or `x`/`y`".into());
                };
                Ok(FocusRequest { target, animate })
            }
        }
    }
}

/// A selection: a list of keys to select, a single key, or explicit
/// per-key flags
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Selection {
    One(String),
    List(Vec<String>),
    Flags(BTreeMap<String, bool>),
}

impl Selection {
    pub fn entries(&self) -> Vec<(String, bool)> {
        match self {
            Selection::One(key) => vec![(key.clone(), true)],
            Selection::List(keys) => keys.iter().map(|k| (k.clone(), true)).collect(),
            Selection::Flags(flags) => flags.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        }
    }
}

impl From<&str> for Selection {
    fn from(key: &str) -> Self {
        Selection::One(key.to_string())
    }
}

impl<S: Into<String>> From<Vec<S>> for Selection {
    fn from(keys: Vec<S>) -> Self {
        Selection::List(keys.into_iter().map(Into::into).collect())
    }
}

impl From<BTreeMap<String, bool>> for Selection {
    fn from(flags: BTreeMap<String, bool>) -> Self {
        Selection::Flags(flags)
    }
}

// ============================================================================
// Labels
// ============================================================================

/// Converts a region code or marker key into label text
pub type LabelRenderer = Rc<dyn Fn(&str) -> Option<String>>;

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct LabelsParams {
    pub regions: Option<LabelParams>,
    pub markers: Option<LabelParams>,
}

#[derive(Clone, Default, Deserialize)]
#[serde(default)]
pub struct LabelParams {
    /// `[dx, dy]` per key
    pub offsets: BTreeMap<String, [f64; 2]>,
    /// Label text per key; the region or marker name when absent
    #[serde(skip)]
    pub render: Option<LabelRenderer>,
}

impl LabelParams {
    pub fn with_render(mut self, render: impl Fn(&str) -> Option<String> + 'static) -> Self {
        self.render = Some(Rc::new(render));
        self
    }

    pub fn offset(&self, key: &str) -> [f64; 2] {
        self.offsets.get(key).copied().unwrap_or([0.0, 0.0])
    }

    pub fn text(&self, key: &str, name: Option<&str>) -> Option<String> {
        let text = match &self.render {
            Some(render) => render(key),
            None => name.map(str::to_string),
        };
        text.filter(|text| !text.is_empty())
    }
}

impl fmt::Debug for LabelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LabelParams")
            .field("offsets", &self.offsets)
            .field("render", &self.render.as_ref().map(|_| ".."))
            .finish()
    }
}
