//! Core value types shared by the projection, viewport, scale and render layers.

use std::fmt;

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// A point on the map plane or on screen.
pub type PlanePoint = DVec2;

/// Geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, PartialEq, Default, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self { lat, lng }
    }
}

/// Axis-aligned bounding box
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BBox {
    pub min: DVec2,
    pub max: DVec2,
}

impl Default for BBox {
    fn default() -> Self {
        Self::empty()
    }
}

impl BBox {
    /// Create an empty bounding box (will expand on first point)
    pub const fn empty() -> Self {
        BBox {
            min: DVec2::new(f64::MAX, f64::MAX),
            max: DVec2::new(f64::MIN, f64::MIN),
        }
    }

    /// Create a box from its top-left corner and size
    pub fn from_rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        BBox {
            min: DVec2::new(x, y),
            max: DVec2::new(x + width, y + height),
        }
    }

    /// Check if the bbox is empty (never expanded)
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y
    }

    /// Expand to include a point
    pub fn expand_point(&mut self, p: DVec2) {
        self.min = self.min.min(p);
        self.max = self.max.max(p);
    }

    /// Axis-aligned union of two boxes
    pub fn union(self, other: BBox) -> BBox {
        if self.is_empty() {
            return other;
        }
        if other.is_empty() {
            return self;
        }
        BBox {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn x(&self) -> f64 {
        self.min.x
    }

    pub fn y(&self) -> f64 {
        self.min.y
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f64 {
        self.max.y - self.min.y
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) / 2.0
    }
}

/// Format a number the way markup attributes expect it: integral values
/// without a fractional part, everything else in shortest round-trip form.
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // covers -0.0
        "0".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "Infinity" } else { "-Infinity" };
        text.to_string()
    } else {
        format!("{value}")
    }
}

/// Round half up (towards positive infinity), the rounding markup
/// consumers expect for coordinate and color components.
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// An attribute or data value: either numeric or textual.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Number(f64),
    Text(String),
}

impl AttrValue {
    /// Numeric view of the value. Text is parsed from its leading numeric prefix.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            AttrValue::Number(n) => Some(*n),
            AttrValue::Text(s) => parse_leading_float(s),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            AttrValue::Text(s) => Some(s),
            AttrValue::Number(_) => None,
        }
    }

    /// Whether the value counts as present: zero, NaN and empty text do not.
    pub fn is_truthy(&self) -> bool {
        match self {
            AttrValue::Number(n) => *n != 0.0 && !n.is_nan(),
            AttrValue::Text(s) => !s.is_empty(),
        }
    }
}

impl fmt::Display for AttrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttrValue::Number(n) => f.write_str(&format_number(*n)),
            AttrValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for AttrValue {
    fn from(n: f64) -> Self {
        AttrValue::Number(n)
    }
}

impl From<i32> for AttrValue {
    fn from(n: i32) -> Self {
        AttrValue::Number(f64::from(n))
    }
}

impl From<&str> for AttrValue {
    fn from(s: &str) -> Self {
        AttrValue::Text(s.to_string())
    }
}

impl From<String> for AttrValue {
    fn from(s: String) -> Self {
        AttrValue::Text(s)
    }
}

/// Parse the longest leading decimal literal of `s` (after leading whitespace).
fn parse_leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;
    if end < bytes.len() && (bytes[end] == b'-' || bytes[end] == b'+') {
        end += 1;
    }
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end < bytes.len() && bytes[end] == b'.' {
        end += 1;
        while end < bytes.len() && bytes[end].is_ascii_digit() {
            end += 1;
        }
    }
    if end == digits_start || &s[digits_start..end] == "." {
        return None;
    }
    // Optional exponent, only when followed by digits
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp_end = end + 1;
        if exp_end < bytes.len() && (bytes[exp_end] == b'-' || bytes[exp_end] == b'+') {
            exp_end += 1;
        }
        let exp_digits = exp_end;
        while exp_end < bytes.len() && bytes[exp_end].is_ascii_digit() {
            exp_end += 1;
        }
        if exp_end > exp_digits {
            end = exp_end;
        }
    }
    s[..end].parse().ok()
}
