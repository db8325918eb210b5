//! Regions and markers: the map objects built on top of canvas shapes.
//!
//! An object owns one shape and an optional label. Hover and selection
//! flags always move together on both nodes.

use std::collections::BTreeMap;

use glam::DVec2;

use crate::config::{LabelParams, MarkerSpec};
use crate::dataset::PathData;
use crate::render::{Attrs, Canvas, NodeId, Style, StyleLayers, StyleMap};
use crate::series::SeriesTarget;
use crate::types::AttrValue;
use crate::viewport::Transform;

pub const REGION_CLASS: &str = "vectormap-region vectormap-element";
pub const MARKER_CLASS: &str = "vectormap-marker vectormap-element";

/// Horizontal gap between a marker and its label
const MARKER_LABEL_GAP: f64 = 5.0;

/// Where labels go and how their text is produced
#[derive(Clone, Copy)]
pub(crate) struct LabelSetup<'a> {
    pub params: &'a LabelParams,
    pub group: NodeId,
    pub style: &'a StyleLayers,
}

/// Text node attached to a map object
#[derive(Clone, Debug, PartialEq)]
pub struct Label {
    pub node: NodeId,
    /// Position in unscaled map coordinates
    pub anchor: DVec2,
    pub offset: DVec2,
}

/// State shared by regions and markers
pub trait MapObject {
    fn shape(&self) -> NodeId;

    fn label(&self) -> Option<&Label>;

    fn is_selected(&self, canvas: &Canvas) -> bool {
        canvas
            .node(self.shape())
            .and_then(|node| node.style())
            .is_some_and(Style::is_selected)
    }

    fn is_hovered(&self, canvas: &Canvas) -> bool {
        canvas
            .node(self.shape())
            .and_then(|node| node.style())
            .is_some_and(Style::is_hovered)
    }

    /// Returns whether the flag changed.
    fn set_hovered(&self, canvas: &mut Canvas, hovered: bool) -> bool {
        let changed = canvas.set_hovered(self.shape(), hovered);
        if changed {
            if let Some(label) = self.label() {
                canvas.set_hovered(label.node, hovered);
            }
        }
        changed
    }

    /// Returns whether the flag changed.
    fn set_selected(&self, canvas: &mut Canvas, selected: bool) -> bool {
        let changed = canvas.set_selected(self.shape(), selected);
        if changed {
            if let Some(label) = self.label() {
                canvas.set_selected(label.node, selected);
            }
        }
        changed
    }

    fn remove(&self, canvas: &mut Canvas) {
        canvas.remove(self.shape());
        if let Some(label) = self.label() {
            canvas.remove(label.node);
        }
    }
}

// ============================================================================
// Regions
// ============================================================================

#[derive(Clone, Debug)]
pub struct Region {
    code: String,
    name: String,
    shape: NodeId,
    label: Option<Label>,
}

impl Region {
    pub(crate) fn new(
        canvas: &mut Canvas,
        code: &str,
        data: &PathData,
        style: StyleLayers,
        labels: Option<LabelSetup<'_>>,
    ) -> Self {
        let config = Attrs::from([
            ("d".to_string(), AttrValue::from(data.path.as_str())),
            ("data-code".to_string(), code.into()),
        ]);
        let root = canvas.root();
        let shape = canvas.add_path(&config, Style::new(style), Some(root));
        canvas.add_class(shape, REGION_CLASS);

        let label = labels.and_then(|setup| {
            let text = setup.params.text(code, Some(&data.name))?;
            let [dx, dy] = setup.params.offset(code);
            let anchor = canvas.bbox(shape).center() + DVec2::new(dx, dy);
            let config = Attrs::from([
                ("text".to_string(), AttrValue::from(text)),
                ("text-anchor".to_string(), "middle".into()),
                ("alignment-baseline".to_string(), "central".into()),
                ("x".to_string(), anchor.x.into()),
                ("y".to_string(), anchor.y.into()),
                ("data-code".to_string(), code.into()),
            ]);
            let node = canvas.add_text(&config, Style::new(setup.style.clone()), Some(setup.group));
            canvas.add_class(node, REGION_CLASS);
            Some(Label {
                node,
                anchor,
                offset: DVec2::ZERO,
            })
        });

        Self {
            code: code.to_string(),
            name: data.name.clone(),
            shape,
            label,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Move the label to the anchor's screen position under `view`.
    pub(crate) fn update_label_position(&self, canvas: &mut Canvas, view: Transform) {
        if let Some(label) = &self.label {
            let screen = view.apply(label.anchor);
            canvas.set_attr(label.node, "x", screen.x);
            canvas.set_attr(label.node, "y", screen.y);
        }
    }
}

impl MapObject for Region {
    fn shape(&self) -> NodeId {
        self.shape
    }

    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }
}

// ============================================================================
// Markers
// ============================================================================

#[derive(Clone, Debug)]
pub struct Marker {
    key: String,
    spec: MarkerSpec,
    shape: NodeId,
    group: NodeId,
    is_image: bool,
    label: Option<Label>,
}

impl Marker {
    /// Create a marker at screen position `position`.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        canvas: &mut Canvas,
        key: &str,
        spec: MarkerSpec,
        position: DVec2,
        style: StyleLayers,
        group: NodeId,
        labels: Option<LabelSetup<'_>>,
        view: Transform,
    ) -> Self {
        let is_image = style.initial.get("image").is_some_and(Option::is_some);
        let shape = Self::create_shape(canvas, key, position, Style::new(style), group, is_image);

        let label = labels.and_then(|setup| {
            let text = setup.params.text(key, spec.name.as_deref())?;
            let [dx, dy] = setup.params.offset(key);
            let anchor = view.invert(position);
            let config = Attrs::from([
                ("text".to_string(), AttrValue::from(text)),
                ("data-index".to_string(), key.into()),
                ("dy".to_string(), "0.6ex".into()),
                ("x".to_string(), anchor.x.into()),
                ("y".to_string(), anchor.y.into()),
            ]);
            let node = canvas.add_text(&config, Style::new(setup.style.clone()), Some(setup.group));
            canvas.add_class(node, MARKER_CLASS);
            Some(Label {
                node,
                anchor,
                offset: DVec2::new(dx, dy),
            })
        });

        Self {
            key: key.to_string(),
            spec,
            shape,
            group,
            is_image,
            label,
        }
    }

    fn create_shape(
        canvas: &mut Canvas,
        key: &str,
        position: DVec2,
        style: Style,
        group: NodeId,
        is_image: bool,
    ) -> NodeId {
        let config = Attrs::from([
            ("data-index".to_string(), AttrValue::from(key)),
            ("cx".to_string(), position.x.into()),
            ("cy".to_string(), position.y.into()),
        ]);
        let shape = if is_image {
            canvas.add_image(&config, style, Some(group))
        } else {
            canvas.add_circle(&config, style, Some(group))
        };
        canvas.add_class(shape, MARKER_CLASS);
        shape
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn spec(&self) -> &MarkerSpec {
        &self.spec
    }

    pub fn name(&self) -> Option<&str> {
        self.spec.name.as_deref()
    }

    pub fn is_image(&self) -> bool {
        self.is_image
    }

    /// Merge `updates` into the marker's style, then follow up on radius and
    /// image changes.
    pub(crate) fn set_style(&mut self, canvas: &mut Canvas, updates: StyleMap, view: Transform) {
        let radius_changed = updates.contains_key("r");
        canvas.set_style(self.shape, updates);
        self.after_style_change(canvas, radius_changed, view);
    }

    /// Return `key` to its initial value.
    pub(crate) fn restore_style(&mut self, canvas: &mut Canvas, key: &str, view: Transform) {
        canvas.restore_initial(self.shape, key);
        self.after_style_change(canvas, key == "r", view);
    }

    fn after_style_change(&mut self, canvas: &mut Canvas, radius_changed: bool, view: Transform) {
        if radius_changed {
            self.update_label_position(canvas, view);
        }
        let is_image = canvas.get(self.shape, "image").is_some();
        if is_image != self.is_image {
            self.is_image = is_image;
            self.recreate_shape(canvas);
            self.update_label_position(canvas, view);
        }
    }

    /// Swap a circle for an image or back, keeping the style state.
    fn recreate_shape(&mut self, canvas: &mut Canvas) {
        let Some(style) = canvas.node(self.shape).and_then(|n| n.style()).cloned() else {
            return;
        };
        let position = DVec2::new(
            canvas.get(self.shape, "cx").and_then(AttrValue::as_f64).unwrap_or(0.0),
            canvas.get(self.shape, "cy").and_then(AttrValue::as_f64).unwrap_or(0.0),
        );
        canvas.remove(self.shape);
        crate::log::debug!(key = %self.key, image = self.is_image, "recreating marker shape");
        self.shape =
            Self::create_shape(canvas, &self.key, position, style, self.group, self.is_image);
    }

    /// Place the label right of the marker under `view`.
    pub(crate) fn update_label_position(&self, canvas: &mut Canvas, view: Transform) {
        let Some(label) = &self.label else {
            return;
        };
        let extent = match canvas.node(self.shape) {
            Some(node) if self.is_image => node.image_size().map_or(0.0, |size| size.x / 2.0),
            Some(node) => node.get("r").and_then(AttrValue::as_f64).unwrap_or(0.0),
            None => 0.0,
        };
        let screen = view.apply(label.anchor) + label.offset;
        canvas.set_attr(label.node, "x", screen.x + MARKER_LABEL_GAP + extent);
        canvas.set_attr(label.node, "y", screen.y);
    }

    /// Move the shape to a new screen position.
    pub(crate) fn move_to(&mut self, canvas: &mut Canvas, position: DVec2, view: Transform) {
        let updates = StyleMap::from([
            ("cx".to_string(), Some(AttrValue::from(position.x))),
            ("cy".to_string(), Some(AttrValue::from(position.y))),
        ]);
        self.set_style(canvas, updates, view);
    }
}

impl MapObject for Marker {
    fn shape(&self) -> NodeId {
        self.shape
    }

    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }
}

// ============================================================================
// Series targets
// ============================================================================

/// Regions of one map as a series target
pub(crate) struct RegionTarget<'a> {
    pub canvas: &'a mut Canvas,
    pub regions: &'a BTreeMap<String, Region>,
}

impl SeriesTarget for RegionTarget<'_> {
    fn apply_series_value(&mut self, key: &str, attribute: &str, value: AttrValue) {
        if let Some(region) = self.regions.get(key) {
            let updates = StyleMap::from([(attribute.to_string(), Some(value))]);
            self.canvas.set_style(region.shape, updates);
        }
    }

    fn restore_series_value(&mut self, key: &str, attribute: &str) {
        if let Some(region) = self.regions.get(key) {
            self.canvas.restore_initial(region.shape, attribute);
        }
    }
}

/// Markers of one map as a series target
pub(crate) struct MarkerTarget<'a> {
    pub canvas: &'a mut Canvas,
    pub markers: &'a mut BTreeMap<String, Marker>,
    pub view: Transform,
}

impl SeriesTarget for MarkerTarget<'_> {
    fn apply_series_value(&mut self, key: &str, attribute: &str, value: AttrValue) {
        if let Some(marker) = self.markers.get_mut(key) {
            let updates = StyleMap::from([(attribute.to_string(), Some(value))]);
            marker.set_style(self.canvas, updates, self.view);
        }
    }

    fn restore_series_value(&mut self, key: &str, attribute: &str) {
        if let Some(marker) = self.markers.get_mut(key) {
            marker.restore_style(self.canvas, attribute, self.view);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::defaults;
    use crate::render::{BackendKind, style_map};

    fn canvas() -> Canvas {
        Canvas::new(BackendKind::Svg, 200.0, 100.0)
    }

    fn square() -> PathData {
        PathData {
            path: "M10,10L30,10L30,50L10,50Z".to_string(),
            name: "Square".to_string(),
        }
    }

    #[test]
    fn region_label_sits_at_bbox_center() {
        let mut canvas = canvas();
        let group = canvas.add_group(None);
        let params = LabelParams::default();
        let label_style = defaults::label_style();
        let setup = LabelSetup {
            params: &params,
            group,
            style: &label_style,
        };
        let region = Region::new(&mut canvas, "SQ", &square(), defaults::region_style(), Some(setup));
        let label = region.label().unwrap();
        assert_eq!(label.anchor, DVec2::new(20.0, 30.0));
        assert_eq!(canvas.get(label.node, "text"), Some(&"Square".into()));

        region.update_label_position(&mut canvas, Transform::new(2.0, 5.0, 0.0));
        assert_eq!(canvas.get(label.node, "x"), Some(&50.0.into()));
        assert_eq!(canvas.get(label.node, "y"), Some(&60.0.into()));
    }

    #[test]
    fn hover_and_selection_reach_the_label() {
        let mut canvas = canvas();
        let group = canvas.add_group(None);
        let params = LabelParams::default();
        let label_style = defaults::label_style();
        let setup = LabelSetup {
            params: &params,
            group,
            style: &label_style,
        };
        let region = Region::new(&mut canvas, "SQ", &square(), defaults::region_style(), Some(setup));
        assert!(region.set_selected(&mut canvas, true));
        assert!(!region.set_selected(&mut canvas, true));
        assert!(region.is_selected(&canvas));
        assert_eq!(canvas.get(region.shape(), "fill"), Some(&"yellow".into()));

        region.set_hovered(&mut canvas, true);
        let label = region.label().unwrap().node;
        assert_eq!(canvas.get(label, "cursor"), Some(&"pointer".into()));
    }

    #[test]
    fn marker_label_clears_the_radius() {
        let mut canvas = canvas();
        let markers = canvas.add_group(None);
        let labels = canvas.add_group(None);
        let params = LabelParams::default();
        let label_style = defaults::label_style();
        let setup = LabelSetup {
            params: &params,
            group: labels,
            style: &label_style,
        };
        let view = Transform::new(1.0, 0.0, 0.0);
        let mut marker = Marker::new(
            &mut canvas,
            "0",
            MarkerSpec::at_coords(40.0, 20.0).with_name("Pin"),
            DVec2::new(40.0, 20.0),
            defaults::marker_style(),
            markers,
            Some(setup),
            view,
        );
        marker.update_label_position(&mut canvas, view);
        let label = marker.label().unwrap().node;
        assert_eq!(canvas.get(label, "x"), Some(&50.0.into()));

        marker.set_style(&mut canvas, style_map([("r", 10)]), view);
        assert_eq!(canvas.get(label, "x"), Some(&55.0.into()));
    }

    #[test]
    fn setting_an_image_recreates_the_shape() {
        let mut canvas = canvas();
        let group = canvas.add_group(None);
        let view = Transform::new(1.0, 0.0, 0.0);
        let mut marker = Marker::new(
            &mut canvas,
            "0",
            MarkerSpec::at_coords(40.0, 20.0),
            DVec2::new(40.0, 20.0),
            defaults::marker_style(),
            group,
            None,
            view,
        );
        let circle = marker.shape();
        assert!(!marker.is_image());

        marker.set_style(&mut canvas, style_map([("image", "pin.png")]), view);
        assert!(marker.is_image());
        assert_ne!(marker.shape(), circle);
        assert!(canvas.node(circle).is_none());
        assert_eq!(
            canvas.node(marker.shape()).map(|n| n.kind()),
            Some(crate::render::NodeKind::Image)
        );
        assert_eq!(canvas.take_image_requests(), vec!["pin.png".to_string()]);
    }

    #[test]
    fn series_targets_skip_missing_keys() {
        let mut canvas = canvas();
        let region = Region::new(&mut canvas, "SQ", &square(), defaults::region_style(), None);
        let shape = region.shape();
        let regions = BTreeMap::from([("SQ".to_string(), region)]);
        let mut target = RegionTarget {
            canvas: &mut canvas,
            regions: &regions,
        };
        target.apply_series_value("SQ", "fill", "#ff0000".into());
        target.apply_series_value("XX", "fill", "#ff0000".into());
        assert_eq!(canvas.get(shape, "fill"), Some(&"#ff0000".into()));

        let mut target = RegionTarget {
            canvas: &mut canvas,
            regions: &regions,
        };
        target.restore_series_value("SQ", "fill");
        assert_eq!(canvas.get(shape, "fill"), Some(&"white".into()));
    }
}
