//! Inset resolution and the geographic <-> screen conversions built on it.
//!
//! A map may be drawn as several disjoint blocks (mainland plus islands).
//! Each inset owns a projected bounding box and the rectangle it is placed
//! into on the unscaled map canvas.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::projection::Projection;
use crate::types::{LatLng, PlanePoint};
use crate::viewport::Transform;

/// Corner of an inset's projected bounding box
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct Corner {
    pub x: f64,
    pub y: f64,
}

impl From<Corner> for DVec2 {
    fn from(c: Corner) -> Self {
        DVec2::new(c.x, c.y)
    }
}

/// A rectangular sub-region of the map with its own placement
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Inset {
    /// Projected bounding box: `[top-left, bottom-right]`
    pub bbox: [Corner; 2],
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl Inset {
    /// Strict containment test against the projected bounding box.
    pub fn contains(&self, p: PlanePoint) -> bool {
        let [lo, hi] = self.bbox;
        p.x > lo.x && p.x < hi.x && p.y > lo.y && p.y < hi.y
    }

    fn bbox_size(&self) -> DVec2 {
        DVec2::from(self.bbox[1]) - DVec2::from(self.bbox[0])
    }

    fn placement_size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    fn placement_origin(&self) -> DVec2 {
        DVec2::new(self.left, self.top)
    }

    /// Rescale a projected point into this inset's placement rectangle
    /// (unscaled map canvas coordinates).
    pub fn to_canvas(&self, p: PlanePoint) -> DVec2 {
        (p - DVec2::from(self.bbox[0])) / self.bbox_size() * self.placement_size()
            + self.placement_origin()
    }

    /// Inverse of [`Inset::to_canvas`].
    pub fn from_canvas(&self, c: DVec2) -> PlanePoint {
        (c - self.placement_origin()) / self.placement_size() * self.bbox_size()
            + DVec2::from(self.bbox[0])
    }
}

/// First inset, in registration order, whose bbox strictly contains `p`.
pub fn resolve_inset(insets: &[Inset], p: PlanePoint) -> Option<&Inset> {
    insets.iter().find(|inset| inset.contains(p))
}

/// Geographic point to screen point under `view`.
///
/// Returns `None` when the projected point lies outside every inset.
pub fn lat_lng_to_screen(
    projection: &Projection,
    insets: &[Inset],
    lat_lng: LatLng,
    view: Transform,
) -> Option<DVec2> {
    let planar = projection.project(lat_lng.lat, lat_lng.lng);
    let inset = resolve_inset(insets, planar)?;
    Some(view.apply(inset.to_canvas(planar)))
}

/// Screen point to geographic point under `view`.
///
/// Each inset inverts the point through its own placement and claims it only
/// when the result falls inside its own bbox; the first such inset wins.
/// `None` when no inset claims it.
pub fn screen_to_lat_lng(
    projection: &Projection,
    insets: &[Inset],
    screen: DVec2,
    view: Transform,
) -> Option<LatLng> {
    let canvas = view.invert(screen);
    insets
        .iter()
        .find_map(|inset| {
            let planar = inset.from_canvas(canvas);
            inset.contains(planar).then_some(planar)
        })
        .map(|planar| projection.unproject(planar))
}
