//! Scales: conversion of raw data values into renderable attribute values.
//!
//! - [`OrdinalScale`] looks values up in a fixed table.
//! - [`Scale::Simple`] passes values through.
//! - [`NumericScale`] interpolates along a polyline of vectors.
//! - [`ColorScale`] is a numeric scale over RGB vectors rendered as `#rrggbb`.
//!
//! Numeric scales walk the polyline by arc length: the segment lengths are
//! rescaled so they sum to `max - min`, and a value is placed at distance
//! `value - min` along the path.

use std::fmt;
use std::rc::Rc;

use crate::errors::ScaleError;
use crate::types::{AttrValue, format_number, round_half_up};

/// Monotonic normalization applied to values and to the scale bounds
#[derive(Clone, Default)]
pub enum Normalize {
    #[default]
    Linear,
    /// `x^0.2`
    Polynomial,
    Custom(Rc<dyn Fn(f64) -> f64>),
}

impl Normalize {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Normalize::Linear => value,
            Normalize::Polynomial => value.powf(0.2),
            Normalize::Custom(f) => f(value),
        }
    }
}

impl fmt::Debug for Normalize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Normalize::Linear => f.write_str("Linear"),
            Normalize::Polynomial => f.write_str("Polynomial"),
            Normalize::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Legend entry
#[derive(Clone, Debug, PartialEq)]
pub struct Tick {
    pub label: String,
    pub value: AttrValue,
}

// ============================================================================
// Ordinal
// ============================================================================

/// Exact-match lookup table, in entry order
#[derive(Clone, Debug, Default, PartialEq)]
pub struct OrdinalScale {
    entries: Vec<(String, AttrValue)>,
}

impl OrdinalScale {
    pub fn new<K: Into<String>>(entries: impl IntoIterator<Item = (K, AttrValue)>) -> Self {
        Self {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn ticks(&self) -> Vec<Tick> {
        self.entries
            .iter()
            .map(|(label, value)| Tick {
                label: label.clone(),
                value: value.clone(),
            })
            .collect()
    }
}

// ============================================================================
// Numeric
// ============================================================================

/// Piecewise-linear interpolation along a list of vectors
#[derive(Clone, Debug, Default)]
pub struct NumericScale {
    vectors: Vec<Vec<f64>>,
    normalize: Normalize,
    /// Bounds as configured, before normalization
    min: Option<f64>,
    max: Option<f64>,
}

impl NumericScale {
    /// Scale over scalar stops (one-component vectors).
    pub fn new(stops: impl IntoIterator<Item = f64>) -> Self {
        Self::from_vectors(stops.into_iter().map(|s| vec![s]))
    }

    pub fn from_vectors(vectors: impl IntoIterator<Item = Vec<f64>>) -> Self {
        Self {
            vectors: vectors.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn with_normalize(mut self, normalize: Normalize) -> Self {
        self.normalize = normalize;
        self
    }

    pub fn vectors(&self) -> &[Vec<f64>] {
        &self.vectors
    }

    pub fn set_vectors(&mut self, vectors: Vec<Vec<f64>>) {
        self.vectors = vectors;
    }

    pub fn normalize(&self) -> &Normalize {
        &self.normalize
    }

    pub fn set_normalize(&mut self, normalize: Normalize) {
        self.normalize = normalize;
    }

    pub fn set_min(&mut self, min: f64) {
        self.min = Some(min);
    }

    pub fn set_max(&mut self, max: f64) {
        self.max = Some(max);
    }

    /// Configured lower bound
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    /// Configured upper bound
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    /// Interpolated vector for `value`, folded into a single number.
    ///
    /// Values at or below the minimum give the first vector and values at
    /// or above the maximum give the last one.
    pub fn get_value(&self, value: f64) -> f64 {
        let Some(first) = self.vectors.first() else {
            return 0.0;
        };
        let last = &self.vectors[self.vectors.len() - 1];
        let (Some(min), Some(max)) = (self.min, self.max) else {
            return vector_to_num(first);
        };
        let (min, max) = (self.normalize.apply(min), self.normalize.apply(max));
        let value = self.normalize.apply(value);

        if !(value > min) {
            return vector_to_num(first);
        }
        if value >= max {
            return vector_to_num(last);
        }

        let mut lengths: Vec<f64> = self
            .vectors
            .windows(2)
            .map(|pair| distance(&pair[0], &pair[1]))
            .collect();
        let full: f64 = lengths.iter().sum();
        if full == 0.0 {
            return vector_to_num(first);
        }
        let ratio = (max - min) / full;
        for length in &mut lengths {
            *length *= ratio;
        }

        let mut rest = value - min;
        let mut i = 0;
        while i < lengths.len() && rest - lengths[i] >= 0.0 {
            rest -= lengths[i];
            i += 1;
        }
        if i >= lengths.len() {
            return vector_to_num(last);
        }

        let t = rest / lengths[i];
        let interpolated: Vec<f64> = self.vectors[i]
            .iter()
            .zip(&self.vectors[i + 1])
            .map(|(a, b)| a + (b - a) * t)
            .collect();
        vector_to_num(&interpolated)
    }

    /// Roughly five evenly spaced ticks covering `[min, max]`, snapped
    /// outwards to a round step. The first and last ticks evaluate the
    /// configured bounds exactly.
    pub fn ticks_with(&self, render: impl Fn(f64) -> AttrValue) -> Vec<Tick> {
        let (Some(lo), Some(hi)) = (self.min, self.max) else {
            return Vec::new();
        };
        let span = hi - lo;
        if !(span > 0.0) || !span.is_finite() {
            return vec![Tick {
                label: format_number(lo),
                value: render(lo),
            }];
        }

        const TARGET: f64 = 5.0;
        let exponent = (span / TARGET).log10().floor() as i32;
        let err = TARGET / span * 10f64.powi(exponent);
        let multiplier: i64 = if err <= 0.15 {
            10
        } else if err <= 0.35 {
            5
        } else if err <= 0.75 {
            2
        } else {
            1
        };

        // Ticks are built from integer multiples so decimal steps stay exact
        let tick_at = |k: i64| {
            let units = (k * multiplier) as f64;
            if exponent >= 0 {
                units * 10f64.powi(exponent)
            } else {
                units / 10f64.powi(-exponent)
            }
        };
        let step = tick_at(1);
        let first = (lo / step).floor() as i64;
        let last = (hi / step).ceil() as i64;

        (first..=last)
            .map(|k| {
                let tick = tick_at(k);
                let value = if k == first {
                    lo
                } else if k == last {
                    hi
                } else {
                    tick
                };
                Tick {
                    label: format_number(tick),
                    value: render(value),
                }
            })
            .collect()
    }

    pub fn ticks(&self) -> Vec<Tick> {
        self.ticks_with(|v| AttrValue::Number(self.get_value(v)))
    }
}

fn distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(a, b)| (b - a) * (b - a))
        .sum::<f64>()
        .sqrt()
}

/// Fold a vector into one number, each rounded component being a base-256
/// digit, most significant first.
pub fn vector_to_num(vector: &[f64]) -> f64 {
    vector
        .iter()
        .fold(0.0, |acc, component| acc * 256.0 + round_half_up(*component))
}

// ============================================================================
// Color
// ============================================================================

/// Numeric scale over RGB vectors
#[derive(Clone, Debug, Default)]
pub struct ColorScale {
    numeric: NumericScale,
}

impl ColorScale {
    pub fn new<S: AsRef<str>>(colors: impl IntoIterator<Item = S>) -> Result<Self, ScaleError> {
        let vectors = colors
            .into_iter()
            .map(|c| parse_color(c.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            numeric: NumericScale::from_vectors(vectors),
        })
    }

    pub fn numeric(&self) -> &NumericScale {
        &self.numeric
    }

    pub fn numeric_mut(&mut self) -> &mut NumericScale {
        &mut self.numeric
    }

    pub fn get_value(&self, value: f64) -> String {
        num_to_color(self.numeric.get_value(value))
    }

    pub fn ticks(&self) -> Vec<Tick> {
        self.numeric
            .ticks_with(|v| AttrValue::Text(self.get_value(v)))
    }
}

/// `#rrggbb` to an RGB vector.
pub fn parse_color(color: &str) -> Result<Vec<f64>, ScaleError> {
    let invalid = || ScaleError::InvalidColor {
        value: color.to_string(),
    };
    let hex = color.strip_prefix('#').ok_or_else(invalid)?;
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(invalid());
    }
    (0..3)
        .map(|i| {
            u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16)
                .map(f64::from)
                .map_err(|_| invalid())
        })
        .collect()
}

/// Packed RGB integer to a zero-padded `#rrggbb` string.
pub fn num_to_color(num: f64) -> String {
    format!("#{:06x}", num.max(0.0) as u64)
}

// ============================================================================
// Scale
// ============================================================================

/// A scale bound to a data series
#[derive(Clone, Debug)]
pub enum Scale {
    Ordinal(OrdinalScale),
    Simple,
    Numeric(NumericScale),
    Color(ColorScale),
}

impl Scale {
    /// Attribute value for a data value, or `None` when the shape should
    /// fall back to its initial attribute (non-numeric input on a numeric
    /// scale, falsy or unmapped input otherwise).
    pub fn value(&self, value: &AttrValue) -> Option<AttrValue> {
        match self {
            Scale::Numeric(scale) => numeric_input(value).map(|v| scale.get_value(v).into()),
            Scale::Color(scale) => numeric_input(value).map(|v| scale.get_value(v).into()),
            Scale::Ordinal(scale) if value.is_truthy() => scale.get(&value.to_string()).cloned(),
            Scale::Simple if value.is_truthy() => Some(value.clone()),
            Scale::Ordinal(_) | Scale::Simple => None,
        }
    }

    /// Numeric core of numeric and color scales
    pub fn numeric(&self) -> Option<&NumericScale> {
        match self {
            Scale::Numeric(scale) => Some(scale),
            Scale::Color(scale) => Some(scale.numeric()),
            _ => None,
        }
    }

    pub fn numeric_mut(&mut self) -> Option<&mut NumericScale> {
        match self {
            Scale::Numeric(scale) => Some(scale),
            Scale::Color(scale) => Some(scale.numeric_mut()),
            _ => None,
        }
    }

    pub fn ticks(&self) -> Vec<Tick> {
        match self {
            Scale::Ordinal(scale) => scale.ticks(),
            Scale::Simple => Vec::new(),
            Scale::Numeric(scale) => scale.ticks(),
            Scale::Color(scale) => scale.ticks(),
        }
    }
}

fn numeric_input(value: &AttrValue) -> Option<f64> {
    value.as_f64().filter(|n| !n.is_nan())
}
