//! Cartographic projections between geographic and planar coordinates.
//!
//! All families project onto a sphere and are parameterized by a central
//! meridian. Planar y grows downwards (screen convention); every inverse
//! consumes the planar point exactly as the forward projection produced it.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, PI};

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::types::{LatLng, PlanePoint};

/// Sphere radius used by every projection family (meters).
pub const EARTH_RADIUS: f64 = 6381372.0;

/// Supported projection families, named like proj4.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProjectionKind {
    /// Miller cylindrical
    #[default]
    #[serde(rename = "mill")]
    Miller,
    /// Mercator
    #[serde(rename = "merc")]
    Mercator,
    /// Albers equal-area conic, standard parallels 29.5° and 45.5°
    #[serde(rename = "aea")]
    AlbersEqualArea,
    /// Lambert conformal conic, standard parallels 33° and 45°
    #[serde(rename = "lcc")]
    LambertConformalConic,
}

/// Projection of a map dataset
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projection {
    #[serde(rename = "type")]
    pub kind: ProjectionKind,
    #[serde(default)]
    pub central_meridian: f64,
}

impl Projection {
    pub fn new(kind: ProjectionKind, central_meridian: f64) -> Self {
        Self {
            kind,
            central_meridian,
        }
    }

    /// Bring `lng` into `[-180 + c, 180 + c)` by adding a full turn when it
    /// falls below the lower bound.
    pub fn normalize_longitude(&self, lng: f64) -> f64 {
        if lng < -180.0 + self.central_meridian {
            lng + 360.0
        } else {
            lng
        }
    }

    /// Project a geographic point onto the plane.
    pub fn project(&self, lat: f64, lng: f64) -> PlanePoint {
        let lng = self.normalize_longitude(lng);
        let c = self.central_meridian;
        match self.kind {
            ProjectionKind::Miller => DVec2::new(
                EARTH_RADIUS * (lng - c).to_radians(),
                -EARTH_RADIUS * (45.0 + 0.4 * lat).to_radians().tan().ln() / 0.8,
            ),
            ProjectionKind::Mercator => DVec2::new(
                EARTH_RADIUS * (lng - c).to_radians(),
                -EARTH_RADIUS * (FRAC_PI_4 + lat * PI / 360.0).tan().ln(),
            ),
            ProjectionKind::AlbersEqualArea => {
                let cone = AlbersCone::new();
                let theta = cone.n * (lng.to_radians() - c.to_radians());
                let ro = (cone.c - 2.0 * cone.n * lat.to_radians().sin()).sqrt() / cone.n;
                DVec2::new(
                    ro * theta.sin() * EARTH_RADIUS,
                    -(cone.ro0 - ro * theta.cos()) * EARTH_RADIUS,
                )
            }
            ProjectionKind::LambertConformalConic => {
                let cone = LambertCone::new();
                let theta = cone.n * (lng.to_radians() - c.to_radians());
                let ro = cone.f * (1.0 / (FRAC_PI_4 + lat.to_radians() / 2.0).tan()).powf(cone.n);
                DVec2::new(
                    ro * theta.sin() * EARTH_RADIUS,
                    -(cone.ro0 - ro * theta.cos()) * EARTH_RADIUS,
                )
            }
        }
    }

    /// Inverse of [`Projection::project`].
    pub fn unproject(&self, point: PlanePoint) -> LatLng {
        let c = self.central_meridian;
        // The forward projections flip y; undo that before inverting.
        let x = point.x;
        let y = -point.y;
        match self.kind {
            ProjectionKind::Miller => LatLng::new(
                (2.5 * (0.8 * y / EARTH_RADIUS).exp().atan() - 5.0 * PI / 8.0).to_degrees(),
                (c.to_radians() + x / EARTH_RADIUS).to_degrees(),
            ),
            ProjectionKind::Mercator => LatLng::new(
                (2.0 * (y / EARTH_RADIUS).exp().atan() - FRAC_PI_2).to_degrees(),
                (c.to_radians() + x / EARTH_RADIUS).to_degrees(),
            ),
            ProjectionKind::AlbersEqualArea => {
                let cone = AlbersCone::new();
                let (x, y) = (x / EARTH_RADIUS, y / EARTH_RADIUS);
                let ro = (x * x + (cone.ro0 - y) * (cone.ro0 - y)).sqrt();
                let theta = (x / (cone.ro0 - y)).atan();
                LatLng::new(
                    ((cone.c - ro * ro * cone.n * cone.n) / (2.0 * cone.n))
                        .asin()
                        .to_degrees(),
                    (c.to_radians() + theta / cone.n).to_degrees(),
                )
            }
            ProjectionKind::LambertConformalConic => {
                let cone = LambertCone::new();
                let (x, y) = (x / EARTH_RADIUS, y / EARTH_RADIUS);
                let ro = cone.n.signum() * (x * x + (cone.ro0 - y) * (cone.ro0 - y)).sqrt();
                let theta = (x / (cone.ro0 - y)).atan();
                LatLng::new(
                    (2.0 * (cone.f / ro).powf(1.0 / cone.n).atan() - FRAC_PI_2).to_degrees(),
                    (c.to_radians() + theta / cone.n).to_degrees(),
                )
            }
        }
    }
}

/// Constants of the Albers cone (origin latitude 0).
struct AlbersCone {
    n: f64,
    c: f64,
    ro0: f64,
}

impl AlbersCone {
    fn new() -> Self {
        let fi1 = 29.5_f64.to_radians();
        let fi2 = 45.5_f64.to_radians();
        let n = (fi1.sin() + fi2.sin()) / 2.0;
        let c = fi1.cos() * fi1.cos() + 2.0 * n * fi1.sin();
        let ro0 = c.sqrt() / n;
        Self { n, c, ro0 }
    }
}

/// Constants of the Lambert cone (origin latitude 0).
struct LambertCone {
    n: f64,
    f: f64,
    ro0: f64,
}

impl LambertCone {
    fn new() -> Self {
        let fi1 = 33.0_f64.to_radians();
        let fi2 = 45.0_f64.to_radians();
        let n = (fi1.cos() / fi2.cos()).ln()
            / ((FRAC_PI_4 + fi2 / 2.0).tan() / (FRAC_PI_4 + fi1 / 2.0).tan()).ln();
        let f = fi1.cos() * (FRAC_PI_4 + fi1 / 2.0).tan().powf(n) / n;
        // tan(pi/4) == 1 at the origin latitude
        let ro0 = f;
        Self { n, f, ro0 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KINDS: [ProjectionKind; 4] = [
        ProjectionKind::Miller,
        ProjectionKind::Mercator,
        ProjectionKind::AlbersEqualArea,
        ProjectionKind::LambertConformalConic,
    ];

    fn assert_latlng_close(actual: LatLng, expected: LatLng) {
        const EPSILON: f64 = 1e-9;
        assert!(
            (actual.lat - expected.lat).abs() < EPSILON,
            "lat mismatch: {} != {}",
            actual.lat,
            expected.lat
        );
        assert!(
            (actual.lng - expected.lng).abs() < EPSILON,
            "lng mismatch: {} != {}",
            actual.lng,
            expected.lng
        );
    }

    #[test]
    fn round_trip_every_family() {
        let samples = [(0.0, 0.0), (48.85, 2.35), (-33.9, 151.2), (64.1, -21.9)];
        for kind in KINDS {
            let proj = Projection::new(kind, 11.5);
            for (lat, lng) in samples {
                let p = proj.project(lat, lng);
                assert_latlng_close(proj.unproject(p), LatLng::new(lat, lng));
            }
        }
    }

    #[test]
    fn miller_equator_at_central_meridian_is_origin() {
        let proj = Projection::new(ProjectionKind::Miller, 0.0);
        let p = proj.project(0.0, 0.0);
        assert!(p.x.abs() < 1e-9);
        assert!(p.y.abs() < 1e-6);
    }

    #[test]
    fn north_is_up() {
        for kind in KINDS {
            let proj = Projection::new(kind, 0.0);
            assert!(proj.project(50.0, 0.0).y < proj.project(10.0, 0.0).y, "{kind:?}");
        }
    }

    #[test]
    fn longitude_below_seam_wraps_once() {
        let proj = Projection::new(ProjectionKind::Miller, 11.5);
        assert_eq!(proj.normalize_longitude(-170.0), 190.0);
        assert_eq!(proj.normalize_longitude(-168.5), -168.5);
        // only the lower bound is normalized
        assert_eq!(proj.normalize_longitude(200.0), 200.0);
        let wrapped = proj.project(10.0, -170.0);
        let direct = proj.project(10.0, 190.0);
        assert_eq!(wrapped, direct);
    }

    #[test]
    fn deserializes_dataset_projection() {
        let proj: Projection =
            serde_json::from_str(r#"{"type":"aea","centralMeridian":-96}"#).unwrap();
        assert_eq!(proj.kind, ProjectionKind::AlbersEqualArea);
        assert_eq!(proj.central_meridian, -96.0);
    }
}
