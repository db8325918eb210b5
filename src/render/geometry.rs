//! Geometry queries: bounding boxes of shapes in their own (untransformed)
//! coordinate space.
//!
//! Both backends share these, so focus and label placement behave the same
//! whatever markup is produced.

use glam::{DVec2, dvec2};

use super::element::{Node, NodeKind};
use super::path_data::parse_path_data;
use crate::types::BBox;

/// Proportional character widths in hundredths of the table's nominal
/// character width, for printable ASCII starting at `' '`.
#[rustfmt::skip]
pub const AW_CHAR: [u8; 95] = [
    45,  55,  62, 115,  90, 132, 125,  40,
    55,  55,  71, 115,  45,  48,  45,  50,
    91,  91,  91,  91,  91,  91,  91,  91,
    91,  91,  50,  50, 120, 120, 120,  78,
   142, 102, 105, 110, 115, 105,  98, 105,
   125,  58,  58, 107,  95, 145, 125, 115,
    95, 115, 107,  95,  97, 118, 102, 150,
   100,  93, 100,  58,  50,  58, 119,  72,
    72,  86,  92,  80,  92,  85,  52,  92,
    92,  47,  47,  88,  48, 135,  92,  86,
    92,  92,  69,  75,  58,  92,  80, 121,
    81,  80,  76,  91,  49,  91, 118,
];

/// Nominal character width of [`AW_CHAR`] relative to the font size
const TABLE_EM: f64 = 0.08 / 0.14;

/// Font size assumed for text without a numeric `font-size`
const DEFAULT_FONT_SIZE: f64 = 12.0;

/// Sum of proportional widths of `text`, in hundredths.
pub fn text_length(text: &str) -> u32 {
    text.chars()
        .map(|c| {
            if (' '..='~').contains(&c) {
                u32::from(AW_CHAR[(c as usize) - 0x20])
            } else {
                100
            }
        })
        .sum()
}

/// Estimated advance width of `text` at `font_size`.
pub fn text_width(text: &str, font_size: f64) -> f64 {
    f64::from(text_length(text)) * 0.01 * font_size * TABLE_EM
}

/// Bounding box of a shape node. Groups are resolved by the canvas.
pub fn shape_bbox(node: &Node) -> BBox {
    match node.kind() {
        NodeKind::Group => BBox::empty(),
        NodeKind::Path => node.text("d").map(|d| path_bbox(&d)).unwrap_or_default(),
        NodeKind::Circle => {
            let r = node.number("r");
            let center = dvec2(node.number("cx"), node.number("cy"));
            BBox {
                min: center - r,
                max: center + r,
            }
        }
        NodeKind::Image => {
            let center = dvec2(node.number("cx"), node.number("cy"));
            let size = node.image_size().unwrap_or(DVec2::ZERO);
            BBox {
                min: center - size / 2.0,
                max: center + size / 2.0,
            }
        }
        NodeKind::Text => text_bbox(node),
    }
}

fn text_bbox(node: &Node) -> BBox {
    let text = node.text("text").unwrap_or_default();
    let font_size = node
        .get("font-size")
        .and_then(|v| v.as_f64())
        .unwrap_or(DEFAULT_FONT_SIZE);
    let width = text_width(&text, font_size);
    let height = font_size;

    let x = node.number("x");
    let left = match node.get("text-anchor").and_then(|v| v.as_str()) {
        Some("middle") => x - width / 2.0,
        Some("end") => x - width,
        _ => x,
    };
    let y = node.number("y");
    let top = match node.get("alignment-baseline").and_then(|v| v.as_str()) {
        Some("central") | Some("middle") => y - height / 2.0,
        _ => y - height * 0.8,
    };
    BBox::from_rect(left, top, width, height)
}

/// Bounding box of path data, including the true extrema of curves.
///
/// Arcs contribute their endpoints only.
pub fn path_bbox(d: &str) -> BBox {
    let mut bbox = BBox::empty();
    let mut current = DVec2::ZERO;
    let mut start = DVec2::ZERO;
    // Previous control point for smooth curve reflection, per curve family
    let mut cubic_control: Option<DVec2> = None;
    let mut quad_control: Option<DVec2> = None;

    for segment in parse_path_data(d) {
        let values: Vec<f64> = segment.values().collect();
        let relative = segment.command.is_ascii_lowercase();
        let origin = |current: DVec2| if relative { current } else { DVec2::ZERO };
        let mut next_cubic = None;
        let mut next_quad = None;

        match segment.command.to_ascii_uppercase() {
            'M' => {
                for (i, p) in values.chunks_exact(2).enumerate() {
                    current = origin(current) + dvec2(p[0], p[1]);
                    if i == 0 {
                        start = current;
                    }
                    bbox.expand_point(current);
                }
            }
            'L' => {
                for p in values.chunks_exact(2) {
                    current = origin(current) + dvec2(p[0], p[1]);
                    bbox.expand_point(current);
                }
            }
            'H' => {
                for &x in &values {
                    current.x = if relative { current.x + x } else { x };
                    bbox.expand_point(current);
                }
            }
            'V' => {
                for &y in &values {
                    current.y = if relative { current.y + y } else { y };
                    bbox.expand_point(current);
                }
            }
            'C' => {
                for c in values.chunks_exact(6) {
                    let o = origin(current);
                    let c1 = o + dvec2(c[0], c[1]);
                    let c2 = o + dvec2(c[2], c[3]);
                    let end = o + dvec2(c[4], c[5]);
                    expand_cubic(&mut bbox, current, c1, c2, end);
                    next_cubic = Some(c2);
                    current = end;
                }
            }
            'S' => {
                for c in values.chunks_exact(4) {
                    let o = origin(current);
                    let c1 = current * 2.0 - next_cubic.or(cubic_control).unwrap_or(current);
                    let c2 = o + dvec2(c[0], c[1]);
                    let end = o + dvec2(c[2], c[3]);
                    expand_cubic(&mut bbox, current, c1, c2, end);
                    next_cubic = Some(c2);
                    current = end;
                }
            }
            'Q' => {
                for c in values.chunks_exact(4) {
                    let o = origin(current);
                    let control = o + dvec2(c[0], c[1]);
                    let end = o + dvec2(c[2], c[3]);
                    expand_quad(&mut bbox, current, control, end);
                    next_quad = Some(control);
                    current = end;
                }
            }
            'T' => {
                for p in values.chunks_exact(2) {
                    let control = current * 2.0 - next_quad.or(quad_control).unwrap_or(current);
                    let end = origin(current) + dvec2(p[0], p[1]);
                    expand_quad(&mut bbox, current, control, end);
                    next_quad = Some(control);
                    current = end;
                }
            }
            'A' => {
                for a in values.chunks_exact(7) {
                    current = origin(current) + dvec2(a[5], a[6]);
                    bbox.expand_point(current);
                }
            }
            'Z' => current = start,
            _ => {}
        }
        cubic_control = next_cubic;
        quad_control = next_quad;
    }
    bbox
}

fn expand_cubic(bbox: &mut BBox, p0: DVec2, p1: DVec2, p2: DVec2, p3: DVec2) {
    bbox.expand_point(p0);
    bbox.expand_point(p3);
    let point_at = |t: f64| {
        let mt = 1.0 - t;
        p0 * (mt * mt * mt) + p1 * (3.0 * mt * mt * t) + p2 * (3.0 * mt * t * t) + p3 * (t * t * t)
    };
    for axis in 0..2 {
        let (a0, a1, a2, a3) = (p0[axis], p1[axis], p2[axis], p3[axis]);
        // derivative: a t^2 + b t + c
        let a = 3.0 * (-a0 + 3.0 * a1 - 3.0 * a2 + a3);
        let b = 6.0 * (a0 - 2.0 * a1 + a2);
        let c = 3.0 * (a1 - a0);
        for t in quadratic_roots(a, b, c) {
            if t > 0.0 && t < 1.0 {
                bbox.expand_point(point_at(t));
            }
        }
    }
}

fn expand_quad(bbox: &mut BBox, p0: DVec2, p1: DVec2, p2: DVec2) {
    bbox.expand_point(p0);
    bbox.expand_point(p2);
    for axis in 0..2 {
        let denom = p0[axis] - 2.0 * p1[axis] + p2[axis];
        if denom.abs() < f64::EPSILON {
            continue;
        }
        let t = (p0[axis] - p1[axis]) / denom;
        if t > 0.0 && t < 1.0 {
            let mt = 1.0 - t;
            bbox.expand_point(p0 * (mt * mt) + p1 * (2.0 * mt * t) + p2 * (t * t));
        }
    }
}

fn quadratic_roots(a: f64, b: f64, c: f64) -> Vec<f64> {
    if a.abs() < 1e-12 {
        if b.abs() < 1e-12 {
            return Vec::new();
        }
        return vec![-c / b];
    }
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        return Vec::new();
    }
    let root = discriminant.sqrt();
    vec![(-b + root) / (2.0 * a), (-b - root) / (2.0 * a)]
}
