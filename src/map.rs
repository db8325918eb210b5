//! The interactive map: regions, markers, data series and the viewport
//! controller that ties them to one canvas.
//!
//! Every mutation is synchronous. Animated zooms are advanced by the host
//! through [`VectorMap::advance`]; notifications are queued and drained
//! through [`VectorMap::drain_events`].

use std::collections::BTreeMap;
use std::time::Duration;

use glam::DVec2;

use crate::animation::{
    ActiveAnimation, FRAME_INTERVAL, FrameTimer, Transition, TransitionOutcome, ZoomAnimation,
};
use crate::config::{FocusRequest, FocusTarget, MapParams, MarkerList, MarkerSpec, ScaleParams, Selection};
use crate::dataset::{MapData, MapRegistry};
use crate::errors::{ImageLoadError, MapError};
use crate::inset::{lat_lng_to_screen, screen_to_lat_lng};
use crate::objects::{LabelSetup, MapObject, Marker, MarkerTarget, Region, RegionTarget};
use crate::render::{Canvas, NodeId, StyleLayers};
use crate::scale::Normalize;
use crate::series::{DataSeries, SeriesTarget};
use crate::types::{AttrValue, BBox, LatLng};
use crate::viewport::{Transform, ViewportState, ZoomLimits};

/// Notifications queued for the host
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    /// A transform was committed; `zoom` is relative to the base scale
    ViewportChange { zoom: f64, trans_x: f64, trans_y: f64 },
    /// A `set_scale` call reached its final transform
    Zoom { zoom: f64 },
    RegionSelected {
        code: String,
        selected: bool,
        selection: Vec<String>,
    },
    MarkerSelected {
        key: String,
        selected: bool,
        selection: Vec<String>,
    },
}

/// The two shape collections a series can bind to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Collection {
    Regions,
    Markers,
}

impl Collection {
    fn name(self) -> &'static str {
        match self {
            Collection::Regions => "regions",
            Collection::Markers => "markers",
        }
    }
}

/// Top-level groups drawn over the map content, in paint order
#[derive(Clone, Copy, Debug)]
struct Layers {
    region_labels: NodeId,
    markers: NodeId,
    marker_labels: NodeId,
}

pub struct VectorMap {
    params: MapParams,
    data: MapData,
    canvas: Canvas,
    viewport: ViewportState,
    layers: Layers,
    regions: BTreeMap<String, Region>,
    markers: BTreeMap<String, Marker>,
    region_series: Vec<DataSeries>,
    marker_series: Vec<DataSeries>,
    animation: Option<ActiveAnimation>,
    timer: FrameTimer,
    events: Vec<MapEvent>,
}

impl VectorMap {
    /// Build a map inside a `width` x `height` container.
    ///
    /// Fails without side effects when the dataset is not registered or a
    /// series scale is malformed.
    pub fn new(
        registry: &MapRegistry,
        params: MapParams,
        width: f64,
        height: f64,
    ) -> Result<Self, MapError> {
        let data = registry.get(&params.map)?.clone();
        let region_series = params
            .series
            .regions
            .iter()
            .map(DataSeries::new)
            .collect::<Result<Vec<_>, _>>()?;
        let marker_series = params
            .series
            .markers
            .iter()
            .map(DataSeries::new)
            .collect::<Result<Vec<_>, _>>()?;

        let mut canvas = Canvas::new(params.backend, width, height);
        canvas.set_background_color(&params.background_color);
        let viewport = ViewportState::new(
            data.size(),
            width,
            height,
            ZoomLimits {
                min: params.zoom_min,
                max: params.zoom_max,
            },
        );
        let layers = Layers {
            region_labels: canvas.add_group(None),
            markers: canvas.add_group(None),
            marker_labels: canvas.add_group(None),
        };

        let mut map = Self {
            params,
            data,
            canvas,
            viewport,
            layers,
            regions: BTreeMap::new(),
            markers: BTreeMap::new(),
            region_series: Vec::new(),
            marker_series: Vec::new(),
            animation: None,
            timer: FrameTimer::default(),
            events: Vec::new(),
        };
        crate::log::debug!(
            map = %map.params.map,
            backend = ?map.params.backend,
            width,
            height,
            "creating map"
        );

        map.create_regions();
        let markers = std::mem::take(&mut map.params.markers);
        map.create_markers(markers);
        map.update_size(width, height);

        if let Some(focus) = map.params.focus_on.clone() {
            // the initial focus is applied immediately or left to `advance`
            drop(map.set_focus(focus)?);
        }
        if let Some(selection) = map.params.selected_regions.clone() {
            map.set_selected_regions(selection)?;
        }
        if let Some(selection) = map.params.selected_markers.clone() {
            map.set_selected_markers(selection)?;
        }

        map.region_series = region_series;
        map.marker_series = marker_series;
        for (index, params) in map.params.series.regions.clone().into_iter().enumerate() {
            map.set_series_values(Collection::Regions, index, params.values)?;
        }
        for (index, params) in map.params.series.markers.clone().into_iter().enumerate() {
            map.set_series_values(Collection::Markers, index, params.values)?;
        }
        Ok(map)
    }

    fn create_regions(&mut self) {
        let style = self.params.region_style();
        let label_style = self.params.region_label_style();
        let labels = self.params.labels.regions.as_ref().map(|params| LabelSetup {
            params,
            group: self.layers.region_labels,
            style: &label_style,
        });
        for (code, path) in &self.data.paths {
            let region = Region::new(&mut self.canvas, code, path, style.clone(), labels);
            self.regions.insert(code.clone(), region);
        }
    }

    /// Create markers at their current screen positions, replacing markers
    /// under the same key.
    fn create_markers(&mut self, markers: MarkerList) {
        let base_style = self.params.marker_style();
        let label_style = self.params.marker_label_style();
        let labels = self.params.labels.markers.as_ref().map(|params| LabelSetup {
            params,
            group: self.layers.marker_labels,
            style: &label_style,
        });
        let view = self.viewport.transform();

        for (key, spec) in markers.into_keyed() {
            let Some(position) = marker_position(&self.data, &spec, view) else {
                crate::log::debug!(key = %key, "marker outside every inset, skipped");
                continue;
            };
            if let Some(previous) = self.markers.remove(&key) {
                previous.remove(&mut self.canvas);
            }
            let style = StyleLayers {
                initial: spec.style.clone(),
                ..StyleLayers::default()
            }
            .merged_over(&base_style);
            let marker = Marker::new(
                &mut self.canvas,
                &key,
                spec,
                position,
                style,
                self.layers.markers,
                labels,
                view,
            );
            marker.update_label_position(&mut self.canvas, view);
            self.markers.insert(key, marker);
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn params(&self) -> &MapParams {
        &self.params
    }

    pub fn data(&self) -> &MapData {
        &self.data
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn transform(&self) -> Transform {
        self.viewport.transform()
    }

    pub fn regions(&self) -> &BTreeMap<String, Region> {
        &self.regions
    }

    pub fn region(&self, code: &str) -> Option<&Region> {
        self.regions.get(code)
    }

    pub fn markers(&self) -> &BTreeMap<String, Marker> {
        &self.markers
    }

    pub fn marker(&self, key: &str) -> Option<&Marker> {
        self.markers.get(key)
    }

    pub fn get_region_name(&self, code: &str) -> Result<&str, MapError> {
        self.regions
            .get(code)
            .map(Region::name)
            .ok_or_else(|| MapError::UnknownRegion {
                code: code.to_string(),
            })
    }

    pub fn background_color(&self) -> &str {
        &self.params.background_color
    }

    /// Change the color painted behind the map.
    pub fn set_background_color(&mut self, color: impl Into<String>) {
        self.params.background_color = color.into();
        self.canvas.set_background_color(&self.params.background_color);
    }

    /// Serialize the current scene.
    pub fn render(&self) -> String {
        self.canvas.render()
    }

    /// Take the queued notifications.
    pub fn drain_events(&mut self) -> Vec<MapEvent> {
        std::mem::take(&mut self.events)
    }

    // ========================================================================
    // Viewport
    // ========================================================================

    /// Zoom to `scale`, clamped to the zoom limits.
    ///
    /// With an `anchor`, the translation keeps that screen point fixed, or
    /// with `centered` moves the negated planar anchor to the viewport
    /// center. Without one the translation is kept. An in-flight animation
    /// is superseded either way.
    pub fn set_scale(
        &mut self,
        scale: f64,
        anchor: Option<DVec2>,
        centered: bool,
        animate: bool,
    ) -> Transition {
        let target = self.viewport.clamp_scale(scale);
        if target != scale {
            crate::log::debug!(requested = scale, clamped = target, "zoom request clamped");
        }
        let current = DVec2::new(self.viewport.trans_x, self.viewport.trans_y);
        let trans = match anchor {
            Some(anchor) if centered => self.viewport.centered_translation(anchor, target),
            Some(anchor) => self.viewport.anchored_translation(anchor, target),
            None => current,
        };

        self.cancel_animation();
        if animate {
            if let Some(animation) = ZoomAnimation::new(self.viewport.scale, current, target, trans)
            {
                crate::log::debug!(
                    from = self.viewport.scale,
                    to = target,
                    frames = animation.frame_total(),
                    "zoom animation started"
                );
                let (transition, completion) = Transition::pending();
                self.animation = Some(ActiveAnimation {
                    animation,
                    completion,
                });
                return transition;
            }
        }

        self.viewport.scale = target;
        self.viewport.trans_x = trans.x;
        self.viewport.trans_y = trans.y;
        self.apply_transform();
        self.events.push(MapEvent::Zoom {
            zoom: target / self.viewport.base_scale,
        });
        Transition::resolved(TransitionOutcome::Finished)
    }

    /// Whether an animated transition is in flight
    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    /// Advance the animation timer by `elapsed` and apply the frames that
    /// became due. Returns how many frames were applied.
    pub fn advance(&mut self, elapsed: Duration) -> u32 {
        let Some(mut active) = self.animation.take() else {
            return 0;
        };
        let due = self.timer.tick(elapsed);
        let mut applied = 0;
        for _ in 0..due {
            let Some(frame) = active.animation.next_frame() else {
                break;
            };
            applied += 1;
            self.viewport.scale = frame.scale;
            self.viewport.trans_x = frame.trans.x;
            self.viewport.trans_y = frame.trans.y;
            self.apply_transform();
            if frame.is_last {
                crate::log::debug!(frames = frame.index, "zoom animation finished");
                self.events.push(MapEvent::Zoom {
                    zoom: active.animation.target_scale() / self.viewport.base_scale,
                });
                self.timer.reset();
                active.completion.resolve(TransitionOutcome::Finished);
                return applied;
            }
        }
        self.animation = Some(active);
        applied
    }

    /// Run an in-flight animation to its end.
    pub fn finish_animation(&mut self) {
        if let Some(active) = &self.animation {
            let elapsed = FRAME_INTERVAL * active.animation.remaining();
            self.advance(elapsed);
        }
    }

    fn cancel_animation(&mut self) {
        if let Some(active) = self.animation.take() {
            crate::log::debug!("zoom animation superseded");
            active.completion.resolve(TransitionOutcome::Superseded);
        }
        self.timer.reset();
    }

    /// Move the viewport to a region set, a geographic point or a point
    /// given as fractions of the content size.
    pub fn set_focus(&mut self, request: FocusRequest) -> Result<Transition, MapError> {
        let animate = request.animate;
        match request.target {
            FocusTarget::Regions(codes) => {
                let mut bbox = BBox::empty();
                for code in &codes {
                    match self.regions.get(code) {
                        Some(region) => bbox = bbox.union(self.canvas.bbox(region.shape())),
                        None => {
                            crate::log::debug!(code = %code, "unknown region in focus request");
                        }
                    }
                }
                if bbox.is_empty() {
                    return Err(MapError::EmptyFocus);
                }
                let scale = (self.viewport.width / bbox.width())
                    .min(self.viewport.height / bbox.height());
                Ok(self.set_scale(scale, Some(-bbox.center()), true, animate))
            }
            FocusTarget::LatLng { lat, lng, scale } => {
                let point = self
                    .lat_lng_to_point(lat, lng)?
                    .ok_or(MapError::OffMap { lat, lng })?;
                let anchor = DVec2::new(self.viewport.trans_x, self.viewport.trans_y)
                    - point / self.viewport.scale;
                let scale = scale * self.viewport.base_scale;
                Ok(self.set_scale(scale, Some(anchor), true, animate))
            }
            FocusTarget::Point { x, y, scale } => {
                let anchor = DVec2::new(
                    x * -self.viewport.default_width,
                    y * -self.viewport.default_height,
                );
                let scale = scale * self.viewport.base_scale;
                Ok(self.set_scale(scale, Some(anchor), true, animate))
            }
        }
    }

    /// Zoom in by the configured step around the viewport center.
    pub fn zoom_in(&mut self) -> Transition {
        self.zoom_by(self.params.zoom_step)
    }

    /// Zoom out by the configured step around the viewport center.
    pub fn zoom_out(&mut self) -> Transition {
        self.zoom_by(1.0 / self.params.zoom_step)
    }

    fn zoom_by(&mut self, factor: f64) -> Transition {
        let center = DVec2::new(self.viewport.width, self.viewport.height) / 2.0;
        self.set_scale(
            self.viewport.scale * factor,
            Some(center),
            false,
            self.params.zoom_animate,
        )
    }

    /// Pan by a screen-space delta.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.viewport.trans_x += dx / self.viewport.scale;
        self.viewport.trans_y += dy / self.viewport.scale;
        self.apply_transform();
    }

    /// Fit the content to a new container size.
    pub fn update_size(&mut self, width: f64, height: f64) {
        self.viewport.resize(width, height);
        self.canvas.set_size(width, height);
        self.apply_transform();
    }

    /// Clear every series and return to the base transform.
    pub fn reset(&mut self) {
        for index in 0..self.region_series.len() {
            let _ = self.with_series(Collection::Regions, index, |series, target| {
                series.clear(target)
            });
        }
        for index in 0..self.marker_series.len() {
            let _ = self.with_series(Collection::Markers, index, |series, target| {
                series.clear(target)
            });
        }
        self.cancel_animation();
        self.viewport.reset();
        self.apply_transform();
    }

    /// Clamp the translation, push the transform to the canvas, reposition
    /// markers and labels, and queue a viewport notification.
    fn apply_transform(&mut self) {
        self.viewport.clamp_translation();
        let view = self.viewport.transform();
        self.canvas.apply_transform(view);

        for marker in self.markers.values_mut() {
            if let Some(position) = marker_position(&self.data, marker.spec(), view) {
                marker.move_to(&mut self.canvas, position, view);
            }
        }
        for region in self.regions.values() {
            region.update_label_position(&mut self.canvas, view);
        }
        for marker in self.markers.values() {
            marker.update_label_position(&mut self.canvas, view);
        }

        self.events.push(MapEvent::ViewportChange {
            zoom: self.viewport.zoom(),
            trans_x: self.viewport.trans_x,
            trans_y: self.viewport.trans_y,
        });
    }

    // ========================================================================
    // Coordinates
    // ========================================================================

    /// Screen position of a geographic point, `None` when it falls outside
    /// every inset.
    pub fn lat_lng_to_point(&self, lat: f64, lng: f64) -> Result<Option<DVec2>, MapError> {
        let projection = self.data.projection.as_ref().ok_or(MapError::NotGeographic)?;
        Ok(lat_lng_to_screen(
            projection,
            &self.data.insets,
            LatLng::new(lat, lng),
            self.viewport.transform(),
        ))
    }

    /// Geographic position of a screen point, `None` when it falls outside
    /// every inset.
    pub fn point_to_lat_lng(&self, x: f64, y: f64) -> Result<Option<LatLng>, MapError> {
        let projection = self.data.projection.as_ref().ok_or(MapError::NotGeographic)?;
        Ok(screen_to_lat_lng(
            projection,
            &self.data.insets,
            DVec2::new(x, y),
            self.viewport.transform(),
        ))
    }

    // ========================================================================
    // Selection and hover
    // ========================================================================

    pub fn selected_regions(&self) -> Vec<String> {
        selected_keys(&self.regions, &self.canvas)
    }

    pub fn selected_markers(&self) -> Vec<String> {
        selected_keys(&self.markers, &self.canvas)
    }

    /// Select the listed regions, or set explicit per-region flags.
    pub fn set_selected_regions(&mut self, selection: impl Into<Selection>) -> Result<(), MapError> {
        let entries = selection.into().entries();
        if let Some((code, _)) = entries.iter().find(|(code, _)| !self.regions.contains_key(code)) {
            return Err(MapError::UnknownRegion { code: code.clone() });
        }
        for (code, selected) in entries {
            self.select_region(&code, selected);
        }
        Ok(())
    }

    pub fn set_selected_markers(&mut self, selection: impl Into<Selection>) -> Result<(), MapError> {
        let entries = selection.into().entries();
        if let Some((key, _)) = entries.iter().find(|(key, _)| !self.markers.contains_key(key)) {
            return Err(MapError::UnknownMarker { key: key.clone() });
        }
        for (key, selected) in entries {
            self.select_marker(&key, selected);
        }
        Ok(())
    }

    pub fn clear_selected_regions(&mut self) {
        for code in self.selected_regions() {
            self.select_region(&code, false);
        }
    }

    pub fn clear_selected_markers(&mut self) {
        for key in self.selected_markers() {
            self.select_marker(&key, false);
        }
    }

    /// Toggle a region the way a click does. Does nothing unless regions
    /// are selectable; single-selection mode clears the others first.
    /// Returns the region's new selection state.
    pub fn toggle_region(&mut self, code: &str) -> Result<bool, MapError> {
        let region = self.regions.get(code).ok_or_else(|| MapError::UnknownRegion {
            code: code.to_string(),
        })?;
        let selected = region.is_selected(&self.canvas);
        if !self.params.regions_selectable {
            return Ok(selected);
        }
        if self.params.regions_selectable_one {
            self.clear_selected_regions();
        }
        self.select_region(code, !selected);
        Ok(!selected)
    }

    pub fn toggle_marker(&mut self, key: &str) -> Result<bool, MapError> {
        let marker = self.markers.get(key).ok_or_else(|| MapError::UnknownMarker {
            key: key.to_string(),
        })?;
        let selected = marker.is_selected(&self.canvas);
        if !self.params.markers_selectable {
            return Ok(selected);
        }
        if self.params.markers_selectable_one {
            self.clear_selected_markers();
        }
        self.select_marker(key, !selected);
        Ok(!selected)
    }

    pub fn set_region_hovered(&mut self, code: &str, hovered: bool) -> Result<bool, MapError> {
        let region = self.regions.get(code).ok_or_else(|| MapError::UnknownRegion {
            code: code.to_string(),
        })?;
        Ok(region.set_hovered(&mut self.canvas, hovered))
    }

    pub fn set_marker_hovered(&mut self, key: &str, hovered: bool) -> Result<bool, MapError> {
        let marker = self.markers.get(key).ok_or_else(|| MapError::UnknownMarker {
            key: key.to_string(),
        })?;
        Ok(marker.set_hovered(&mut self.canvas, hovered))
    }

    fn select_region(&mut self, code: &str, selected: bool) {
        let changed = self
            .regions
            .get(code)
            .is_some_and(|region| region.set_selected(&mut self.canvas, selected));
        if changed {
            let selection = self.selected_regions();
            self.events.push(MapEvent::RegionSelected {
                code: code.to_string(),
                selected,
                selection,
            });
        }
    }

    fn select_marker(&mut self, key: &str, selected: bool) {
        let changed = self
            .markers
            .get(key)
            .is_some_and(|marker| marker.set_selected(&mut self.canvas, selected));
        if changed {
            let selection = self.selected_markers();
            self.events.push(MapEvent::MarkerSelected {
                key: key.to_string(),
                selected,
                selection,
            });
        }
    }

    // ========================================================================
    // Markers
    // ========================================================================

    /// Add one marker. `series_values[i]` goes to marker series `i`.
    pub fn add_marker(
        &mut self,
        key: &str,
        spec: MarkerSpec,
        series_values: &[Option<AttrValue>],
    ) -> Result<(), MapError> {
        let values = series_values
            .iter()
            .map(|value| {
                value
                    .iter()
                    .map(|value| (key.to_string(), value.clone()))
                    .collect()
            })
            .collect();
        self.add_markers(BTreeMap::from([(key.to_string(), spec)]), values)
    }

    /// Add markers, replacing markers under the same keys, then set the
    /// values of marker series `i` from `series_values[i]`.
    pub fn add_markers(
        &mut self,
        markers: impl Into<MarkerList>,
        series_values: Vec<BTreeMap<String, AttrValue>>,
    ) -> Result<(), MapError> {
        if series_values.len() > self.marker_series.len() {
            return Err(MapError::UnknownSeries {
                collection: Collection::Markers.name(),
                index: self.marker_series.len(),
            });
        }
        self.create_markers(markers.into());
        for (index, values) in series_values.into_iter().enumerate() {
            self.set_series_values(Collection::Markers, index, values)?;
        }
        Ok(())
    }

    pub fn remove_markers<S: AsRef<str>>(&mut self, keys: &[S]) -> Result<(), MapError> {
        if let Some(key) = keys.iter().find(|key| !self.markers.contains_key(key.as_ref())) {
            return Err(MapError::UnknownMarker {
                key: key.as_ref().to_string(),
            });
        }
        for key in keys {
            if let Some(marker) = self.markers.remove(key.as_ref()) {
                marker.remove(&mut self.canvas);
            }
        }
        Ok(())
    }

    pub fn remove_all_markers(&mut self) {
        for marker in std::mem::take(&mut self.markers).into_values() {
            marker.remove(&mut self.canvas);
        }
    }

    // ========================================================================
    // Series
    // ========================================================================

    pub fn series(&self, collection: Collection, index: usize) -> Option<&DataSeries> {
        match collection {
            Collection::Regions => self.region_series.get(index),
            Collection::Markers => self.marker_series.get(index),
        }
    }

    pub fn series_count(&self, collection: Collection) -> usize {
        match collection {
            Collection::Regions => self.region_series.len(),
            Collection::Markers => self.marker_series.len(),
        }
    }

    pub fn set_series_values(
        &mut self,
        collection: Collection,
        index: usize,
        values: BTreeMap<String, AttrValue>,
    ) -> Result<(), MapError> {
        self.with_series(collection, index, |series, target| {
            series.set_values(values, target)
        })
    }

    pub fn clear_series(&mut self, collection: Collection, index: usize) -> Result<(), MapError> {
        self.with_series(collection, index, |series, target| series.clear(target))
    }

    pub fn set_series_scale(
        &mut self,
        collection: Collection,
        index: usize,
        scale: &ScaleParams,
    ) -> Result<(), MapError> {
        self.with_series(collection, index, |series, target| {
            series.set_scale(scale, target)
        })??;
        Ok(())
    }

    pub fn set_series_normalize_function(
        &mut self,
        collection: Collection,
        index: usize,
        normalize: Normalize,
    ) -> Result<(), MapError> {
        self.with_series(collection, index, |series, target| {
            series.set_normalize_function(normalize, target)
        })
    }

    /// Run `op` on one series with its collection as the target.
    fn with_series<R>(
        &mut self,
        collection: Collection,
        index: usize,
        op: impl FnOnce(&mut DataSeries, &mut dyn SeriesTarget) -> R,
    ) -> Result<R, MapError> {
        let unknown = MapError::UnknownSeries {
            collection: collection.name(),
            index,
        };
        match collection {
            Collection::Regions => {
                let series = self.region_series.get_mut(index).ok_or(unknown)?;
                let mut target = RegionTarget {
                    canvas: &mut self.canvas,
                    regions: &self.regions,
                };
                Ok(op(series, &mut target))
            }
            Collection::Markers => {
                let series = self.marker_series.get_mut(index).ok_or(unknown)?;
                let mut target = MarkerTarget {
                    canvas: &mut self.canvas,
                    markers: &mut self.markers,
                    view: self.viewport.transform(),
                };
                Ok(op(series, &mut target))
            }
        }
    }

    // ========================================================================
    // Images
    // ========================================================================

    /// Image URLs the host should start loading.
    pub fn take_image_requests(&mut self) -> Vec<String> {
        self.canvas.take_image_requests()
    }

    /// Deliver a loaded image (its natural size) or a load failure.
    pub fn complete_image(&mut self, url: &str, result: Result<DVec2, ImageLoadError>) {
        let touched = self.canvas.complete_image(url, result);
        let view = self.viewport.transform();
        for marker in self.markers.values() {
            if marker.is_image() && touched.contains(&marker.shape()) {
                marker.update_label_position(&mut self.canvas, view);
            }
        }
    }
}

/// Screen position of a marker under `view`: projected on geographic maps,
/// from raw coordinates otherwise.
fn marker_position(data: &MapData, spec: &MarkerSpec, view: Transform) -> Option<DVec2> {
    match &data.projection {
        Some(projection) => lat_lng_to_screen(
            projection,
            &data.insets,
            LatLng::from(spec.lat_lng.unwrap_or([0.0, 0.0])),
            view,
        ),
        None => {
            let [x, y] = spec.coords.unwrap_or([0.0, 0.0]);
            Some(view.apply(DVec2::new(x, y)))
        }
    }
}

fn selected_keys<T: MapObject>(objects: &BTreeMap<String, T>, canvas: &Canvas) -> Vec<String> {
    objects
        .iter()
        .filter(|(_, object)| object.is_selected(canvas))
        .map(|(key, _)| key.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLANE: &str = r#"{
        "width": 100,
        "height": 50,
        "paths": {
            "L": { "path": "M0,0L50,0L50,50L0,50Z", "name": "Left" },
            "R": { "path": "M50,0L100,0L100,50L50,50Z", "name": "Right" },
            "T": { "path": "M60,10L70,10L70,20L60,20Z", "name": "Tiny" }
        }
    }"#;

    fn registry() -> MapRegistry {
        let mut registry = MapRegistry::new();
        registry.register_json("plane", PLANE).unwrap();
        registry
    }

    fn map_with(params: MapParams) -> VectorMap {
        VectorMap::new(&registry(), params, 200.0, 100.0).unwrap()
    }

    fn map() -> VectorMap {
        map_with(MapParams::new("plane"))
    }

    #[test]
    fn unknown_dataset_fails_construction() {
        let err = VectorMap::new(&registry(), MapParams::new("plain"), 200.0, 100.0)
            .err()
            .unwrap();
        assert!(matches!(err, MapError::UnknownMap { .. }));
    }

    #[test]
    fn background_color_is_applied_and_replaced() {
        let mut map = map();
        assert_eq!(map.background_color(), "#505050");
        assert!(map.render().contains("background-color:#505050;"));

        map.set_background_color("black");
        assert_eq!(map.background_color(), "black");
        let out = map.render();
        assert!(out.contains("background-color:black;"));
        assert!(!out.contains("background-color:#505050"));
    }

    #[test]
    fn construction_fits_content() {
        let map = map();
        assert_eq!(map.viewport().base_scale, 2.0);
        assert_eq!(map.transform(), Transform::new(2.0, 0.0, 0.0));
        assert_eq!(map.regions().len(), 3);
        assert_eq!(map.get_region_name("L").unwrap(), "Left");
        assert!(matches!(
            map.get_region_name("X"),
            Err(MapError::UnknownRegion { .. })
        ));
    }

    #[test]
    fn scale_requests_are_clamped() {
        let mut map = map();
        let mut done = map.set_scale(2000.0, None, false, false);
        assert_eq!(done.try_outcome(), Some(TransitionOutcome::Finished));
        assert_eq!(map.viewport().scale, 16.0);

        let _ = map.set_scale(0.01, None, false, false);
        assert_eq!(map.viewport().scale, 2.0);
    }

    #[test]
    fn immediate_zoom_emits_change_then_zoom() {
        let mut map = map();
        map.drain_events();
        let _ = map.set_scale(4.0, Some(DVec2::new(100.0, 50.0)), false, false);
        let events = map.drain_events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], MapEvent::ViewportChange { zoom, .. } if zoom == 2.0));
        assert_eq!(events[1], MapEvent::Zoom { zoom: 2.0 });
    }

    #[test]
    fn animated_zoom_runs_on_frames() {
        let mut map = map();
        map.drain_events();
        let mut transition = map.set_scale(4.0, Some(DVec2::new(100.0, 50.0)), false, true);
        assert!(map.is_animating());
        assert_eq!(map.viewport().scale, 2.0);

        assert_eq!(map.advance(Duration::from_millis(50)), 5);
        assert!(map.viewport().scale > 2.0);
        assert_eq!(transition.try_outcome(), None);

        // 30 frames in total
        assert_eq!(map.advance(Duration::from_secs(1)), 25);
        assert!(!map.is_animating());
        assert!((map.viewport().scale - 4.0).abs() < 1e-9);
        assert_eq!(transition.try_outcome(), Some(TransitionOutcome::Finished));

        let zooms = map
            .drain_events()
            .into_iter()
            .filter(|e| matches!(e, MapEvent::Zoom { .. }))
            .count();
        assert_eq!(zooms, 1);
    }

    #[test]
    fn new_zoom_supersedes_animation() {
        let mut map = map();
        let mut first = map.set_scale(8.0, None, false, true);
        map.advance(Duration::from_millis(30));
        let reached = map.viewport().scale;
        let mut second = map.set_scale(reached, None, false, false);
        assert_eq!(first.try_outcome(), Some(TransitionOutcome::Superseded));
        assert_eq!(second.try_outcome(), Some(TransitionOutcome::Finished));
        assert_eq!(map.viewport().scale, reached);
        assert_eq!(map.advance(Duration::from_secs(1)), 0);
    }

    #[test]
    fn focus_fits_region_bbox() {
        let mut map = map();
        let _ = map.set_focus(FocusRequest::region("T")).unwrap();
        // 10x10 box in a 200x100 viewport: min(20, 10) = 10
        assert_eq!(map.viewport().scale, 10.0);
        let center = map.transform().apply(DVec2::new(65.0, 15.0));
        assert!((center - DVec2::new(100.0, 50.0)).length() < 1e-9);

        assert!(matches!(
            map.set_focus(FocusRequest::region("nowhere")),
            Err(MapError::EmptyFocus)
        ));
    }

    #[test]
    fn lat_lng_needs_projection() {
        let mut map = map();
        assert!(matches!(map.lat_lng_to_point(0.0, 0.0), Err(MapError::NotGeographic)));
        assert!(matches!(
            map.set_focus(FocusRequest::lat_lng(0.0, 0.0, 2.0)),
            Err(MapError::NotGeographic)
        ));
    }

    #[test]
    fn selection_follows_flags_and_emits_events() {
        let mut map = map();
        map.drain_events();
        map.set_selected_regions(vec!["L", "R"]).unwrap();
        assert_eq!(map.selected_regions(), ["L", "R"]);
        let events = map.drain_events();
        assert_eq!(
            events.last(),
            Some(&MapEvent::RegionSelected {
                code: "R".to_string(),
                selected: true,
                selection: vec!["L".to_string(), "R".to_string()],
            })
        );

        map.set_selected_regions(BTreeMap::from([("L".to_string(), false)]))
            .unwrap();
        assert_eq!(map.selected_regions(), ["R"]);
        map.clear_selected_regions();
        assert!(map.selected_regions().is_empty());

        assert!(map.set_selected_regions("X").is_err());
    }

    #[test]
    fn toggling_respects_selectable_flags() {
        let mut map = map();
        assert!(!map.toggle_region("L").unwrap());

        let mut params = MapParams::new("plane");
        params.regions_selectable = true;
        params.regions_selectable_one = true;
        let mut map = map_with(params);
        assert!(map.toggle_region("L").unwrap());
        assert!(map.toggle_region("R").unwrap());
        assert_eq!(map.selected_regions(), ["R"]);
        assert!(!map.toggle_region("R").unwrap());
        assert!(map.selected_regions().is_empty());
    }

    #[test]
    fn markers_follow_the_transform() {
        let mut map = map();
        map.add_markers(vec![MarkerSpec::at_coords(25.0, 25.0)], Vec::new())
            .unwrap();
        let shape = map.marker("0").unwrap().shape();
        assert_eq!(map.canvas().get(shape, "cx"), Some(&50.0.into()));

        let _ = map.set_scale(4.0, None, false, false);
        let view = map.transform();
        let expected = view.apply(DVec2::new(25.0, 25.0));
        assert_eq!(map.canvas().get(shape, "cx"), Some(&expected.x.into()));
    }

    #[test]
    fn marker_keys_are_replaced_and_removed() {
        let mut map = map();
        map.add_marker("pin", MarkerSpec::at_coords(10.0, 10.0), &[])
            .unwrap();
        let first = map.marker("pin").unwrap().shape();
        map.add_marker("pin", MarkerSpec::at_coords(20.0, 20.0), &[])
            .unwrap();
        assert!(map.canvas().node(first).is_none());
        assert_eq!(map.markers().len(), 1);

        assert!(map.remove_markers(&["missing"]).is_err());
        map.remove_markers(&["pin"]).unwrap();
        assert!(map.markers().is_empty());
    }

    #[test]
    fn marker_series_values_need_a_series() {
        let mut map = map();
        let err = map
            .add_marker("pin", MarkerSpec::at_coords(10.0, 10.0), &[Some(3.into())])
            .unwrap_err();
        assert!(matches!(err, MapError::UnknownSeries { collection: "markers", index: 0 }));
    }

    #[test]
    fn reset_clears_series_and_transform() {
        let params: MapParams = serde_json::from_str(
            r##"{ "map": "plane", "series": { "regions": [{
                "scale": ["#000000", "#0000ff"],
                "values": { "L": 0, "R": 10 }
            }] } }"##,
        )
        .unwrap();
        let mut map = map_with(params);
        let right = map.region("R").unwrap().shape();
        assert_eq!(map.canvas().get(right, "fill"), Some(&"#0000ff".into()));

        let _ = map.set_scale(8.0, None, false, false);
        map.reset();
        assert_eq!(map.canvas().get(right, "fill"), Some(&"white".into()));
        assert_eq!(map.transform(), Transform::new(2.0, 0.0, 0.0));
        assert!(map.series(Collection::Regions, 0).unwrap().values().is_empty());
    }

    #[test]
    fn region_labels_track_the_viewport() {
        let mut params = MapParams::new("plane");
        params.labels.regions = Some(crate::config::LabelParams::default());
        let mut map = map_with(params);
        let label = map.region("L").unwrap().label().unwrap().node;
        assert_eq!(map.canvas().get(label, "x"), Some(&50.0.into()));

        map.update_size(400.0, 200.0);
        assert_eq!(map.canvas().get(label, "x"), Some(&100.0.into()));
    }
}
