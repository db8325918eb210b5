//! Translation of path data into the VML path grammar.
//!
//! | path data | VML  | notes                                   |
//! |-----------|------|-----------------------------------------|
//! | `M` / `m` | `m` / `t` | absolute / relative move           |
//! | `L` / `l` | `l` / `r` | absolute / relative line           |
//! | `H` / `h` | `l` / `r` | expanded to a full coordinate pair |
//! | `V` / `v` | `l` / `r` | expanded to a full coordinate pair |
//! | `C` / `c` | `c` / `v` | cubic curve                        |
//! | `S` / `s` | `c` / `v` | reflected first control point      |
//! | `Z` / `z` | `e`  | close                                   |
//!
//! VML coordinates are integers, so every coordinate is scaled by 100 and
//! rounded half up; shapes carry a 0.01 skew matrix to undo the scaling.
//! Exponential literals are written as `0`. Other commands (arcs,
//! quadratic curves) are dropped together with their arguments.

use glam::I64Vec2;

use super::path_data::{PathSegment, parse_path_data};
use crate::types::round_half_up;

/// Factor applied to every coordinate
pub const COORD_FACTOR: f64 = 100.0;

/// Translate path data into a VML `path` attribute value.
pub fn svg_path_to_vml(d: &str) -> String {
    let mut translator = Translator::default();
    for segment in parse_path_data(d) {
        translator.segment(&segment);
    }
    translator.out
}

#[derive(Default)]
struct Translator {
    out: String,
    current: I64Vec2,
    /// Second control point of the previous cubic, absolute
    control: Option<I64Vec2>,
    subpath_start: I64Vec2,
}

impl Translator {
    fn segment(&mut self, segment: &PathSegment) {
        let coords: Vec<i64> = segment
            .args
            .iter()
            .map(|n| {
                if n.exponent {
                    0
                } else {
                    round_half_up(n.value * COORD_FACTOR) as i64
                }
            })
            .collect();

        let mut emitted = Vec::with_capacity(coords.len() + 2);
        let mut next_control = None;
        let letter = match segment.command {
            'M' => {
                for p in coords.chunks_exact(2) {
                    self.current = I64Vec2::new(p[0], p[1]);
                    emitted.extend_from_slice(p);
                }
                self.subpath_start = self.current;
                'm'
            }
            'm' => {
                for p in coords.chunks_exact(2) {
                    self.current += I64Vec2::new(p[0], p[1]);
                    emitted.extend_from_slice(p);
                }
                self.subpath_start = self.current;
                't'
            }
            'L' => {
                for p in coords.chunks_exact(2) {
                    self.current = I64Vec2::new(p[0], p[1]);
                    emitted.extend_from_slice(p);
                }
                'l'
            }
            'l' => {
                for p in coords.chunks_exact(2) {
                    self.current += I64Vec2::new(p[0], p[1]);
                    emitted.extend_from_slice(p);
                }
                'r'
            }
            'H' => {
                for &x in &coords {
                    self.current.x = x;
                    emitted.extend([x, self.current.y]);
                }
                'l'
            }
            'h' => {
                for &dx in &coords {
                    self.current.x += dx;
                    emitted.extend([dx, 0]);
                }
                'r'
            }
            'V' => {
                for &y in &coords {
                    self.current.y = y;
                    emitted.extend([self.current.x, y]);
                }
                'l'
            }
            'v' => {
                for &dy in &coords {
                    self.current.y += dy;
                    emitted.extend([0, dy]);
                }
                'r'
            }
            'C' => {
                for c in coords.chunks_exact(6) {
                    next_control = Some(I64Vec2::new(c[2], c[3]));
                    self.current = I64Vec2::new(c[4], c[5]);
                    emitted.extend_from_slice(c);
                }
                'c'
            }
            'c' => {
                for c in coords.chunks_exact(6) {
                    next_control = Some(self.current + I64Vec2::new(c[2], c[3]));
                    self.current += I64Vec2::new(c[4], c[5]);
                    emitted.extend_from_slice(c);
                }
                'v'
            }
            'S' => {
                for c in coords.chunks_exact(4) {
                    let previous = next_control.or(self.control).unwrap_or(self.current);
                    let reflected = self.current * 2 - previous;
                    emitted.extend([reflected.x, reflected.y]);
                    emitted.extend_from_slice(c);
                    next_control = Some(I64Vec2::new(c[0], c[1]));
                    self.current = I64Vec2::new(c[2], c[3]);
                }
                'c'
            }
            's' => {
                for c in coords.chunks_exact(4) {
                    let previous = next_control.or(self.control).unwrap_or(self.current);
                    let reflected = self.current - previous;
                    emitted.extend([reflected.x, reflected.y]);
                    emitted.extend_from_slice(c);
                    next_control = Some(self.current + I64Vec2::new(c[0], c[1]));
                    self.current += I64Vec2::new(c[2], c[3]);
                }
                'v'
            }
            'Z' | 'z' => {
                self.current = self.subpath_start;
                'e'
            }
            _ => {
                crate::log::debug!(command = %segment.command, "dropping unsupported path command");
                return;
            }
        };
        self.control = next_control;

        self.out.push(letter);
        let joined: Vec<String> = emitted.iter().map(i64::to_string).collect();
        self.out.push_str(&joined.join(","));
    }
}
