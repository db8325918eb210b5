//! Error types with diagnostics using miette
//!
//! Clamps and off-map points are not errors; they are reported through
//! `Option` return values instead.

use miette::Diagnostic;
use thiserror::Error;

// ============================================================================
// Map Errors
// ============================================================================

/// Errors raised by map construction and the public map operations
#[derive(Error, Diagnostic, Debug)]
pub enum MapError {
    #[error("attempt to use map which was not loaded: {name}")]
    #[diagnostic(code(vectormap::map::unknown_map))]
    UnknownMap {
        name: String,
        #[help]
        suggestion: Option<String>,
    },

    #[error("invalid map dataset")]
    #[diagnostic(code(vectormap::map::invalid_dataset))]
    InvalidDataset {
        #[source]
        source: serde_json::Error,
    },

    #[error("unknown region: {code}")]
    #[diagnostic(code(vectormap::map::unknown_region))]
    UnknownRegion { code: String },

    #[error("unknown marker: {key}")]
    #[diagnostic(code(vectormap::map::unknown_marker))]
    UnknownMarker { key: String },

    #[error("map has no projection")]
    #[diagnostic(
        code(vectormap::map::not_geographic),
        help("pixel-coordinate maps place markers with `coords` instead of `latLng`")
    )]
    NotGeographic,

    #[error("focus request names no known region")]
    #[diagnostic(code(vectormap::map::empty_focus))]
    EmptyFocus,

    #[error("point ({lat}, {lng}) lies outside every inset")]
    #[diagnostic(code(vectormap::map::off_map))]
    OffMap { lat: f64, lng: f64 },

    #[error("no {collection} series at index {index}")]
    #[diagnostic(code(vectormap::series::unknown_series))]
    UnknownSeries {
        collection: &'static str,
        index: usize,
    },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Scale(#[from] ScaleError),
}

impl MapError {
    /// Build an `UnknownMap` error, suggesting the closest registered name.
    pub fn unknown_map<'a>(name: &str, known: impl IntoIterator<Item = &'a str>) -> Self {
        let suggestion = known
            .into_iter()
            .map(|candidate| (edit_distance(name, candidate), candidate))
            .filter(|(distance, _)| *distance <= 3)
            .min_by_key(|(distance, _)| *distance)
            .map(|(_, candidate)| format!("did you mean `{candidate}`?"));
        MapError::UnknownMap {
            name: name.to_string(),
            suggestion,
        }
    }
}

fn edit_distance(a: &str, b: &str) -> usize {
    let b: Vec<char> = b.chars().collect();
    let mut prev: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.chars().enumerate() {
        let mut row = vec![i + 1; b.len() + 1];
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            row[j + 1] = (prev[j] + cost).min(prev[j + 1] + 1).min(row[j] + 1);
        }
        prev = row;
    }
    prev[b.len()]
}

// ============================================================================
// Scale Errors
// ============================================================================

/// Errors that occur while building scales
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
pub enum ScaleError {
    #[error("invalid hex color: {value}")]
    #[diagnostic(
        code(vectormap::scale::invalid_color),
        help("color scales expect `#rrggbb` entries")
    )]
    InvalidColor { value: String },

    #[error("scale stop is not a number: {value}")]
    #[diagnostic(code(vectormap::scale::invalid_stop))]
    InvalidStop { value: String },
}

// ============================================================================
// Image Errors
// ============================================================================

/// Failure reported by the host when an image could not be loaded
#[derive(Error, Diagnostic, Debug, Clone, PartialEq)]
#[error("failed to load image {url}: {reason}")]
#[diagnostic(code(vectormap::render::image_load))]
pub struct ImageLoadError {
    pub url: String,
    pub reason: String,
}

impl ImageLoadError {
    pub fn new(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            reason: reason.into(),
        }
    }
}
