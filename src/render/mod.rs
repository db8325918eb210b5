//! Backend-agnostic scene graph
//!
//! This module is organized into submodules:
//! - `canvas`: the node arena, style application and document output
//! - `element`: node handles and node data
//! - `style`: layered styles and the hover/selection state machine
//! - `backend`: the backend contract, with `svg` and `vml` implementations
//! - `markup`: markup nodes and the XML writer
//! - `image`: the per-canvas image cache
//! - `geometry`: bounding boxes of shapes
//! - `path_data` / `vml_path`: path data parsing and its VML translation

pub mod backend;
pub mod canvas;
pub mod element;
pub mod geometry;
pub mod image;
pub mod markup;
pub mod path_data;
pub mod style;
pub mod svg;
pub mod vml;
pub mod vml_path;

pub use backend::{Backend, BackendKind, RenderBackend};
pub use canvas::Canvas;
pub use element::{Node, NodeId, NodeKind};
pub use image::ImagePurpose;
pub use style::{Attrs, Style, StyleDiff, StyleLayers, StyleMap, style_map};
pub use vml_path::svg_path_to_vml;
