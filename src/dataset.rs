//! Static map datasets and the registry maps are built from.
//!
//! A dataset is injected data: the unscaled canvas size, an optional
//! projection with its insets, and one SVG path per region code.

use std::collections::BTreeMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::errors::MapError;
use crate::inset::Inset;
use crate::projection::Projection;

/// Outline and display name of one region
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathData {
    /// SVG path data in unscaled map coordinates
    pub path: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapData {
    pub width: f64,
    pub height: f64,
    /// Absent on pixel-coordinate maps
    #[serde(default)]
    pub projection: Option<Projection>,
    #[serde(default)]
    pub insets: Vec<Inset>,
    pub paths: BTreeMap<String, PathData>,
}

impl MapData {
    pub fn from_json(json: &str) -> Result<Self, MapError> {
        serde_json::from_str(json).map_err(|source| MapError::InvalidDataset { source })
    }

    /// Unscaled content size
    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }

    pub fn is_geographic(&self) -> bool {
        self.projection.is_some()
    }
}

/// Named datasets available to map construction
#[derive(Clone, Debug, Default)]
pub struct MapRegistry {
    maps: BTreeMap<String, MapData>,
}

impl MapRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `data` under `name`, replacing any previous dataset.
    pub fn register(&mut self, name: impl Into<String>, data: MapData) {
        let name = name.into();
        crate::log::debug!(name = %name, regions = data.paths.len(), "registered map dataset");
        self.maps.insert(name, data);
    }

    /// Decode a JSON dataset and register it.
    pub fn register_json(&mut self, name: impl Into<String>, json: &str) -> Result<(), MapError> {
        let data = MapData::from_json(json)?;
        self.register(name, data);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&MapData, MapError> {
        self.maps
            .get(name)
            .ok_or_else(|| MapError::unknown_map(name, self.names()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.maps.keys().map(String::as_str)
    }
}
