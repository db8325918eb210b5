//! Interactive vector maps.
//!
//! A [`VectorMap`] turns a registered dataset (region outlines, an optional
//! projection and its insets) into a scene rendered through an SVG or VML
//! backend, and drives it through pan, zoom, focus, selection and data
//! series.
//!
//! ```
//! use vectormap::{MapParams, MapRegistry, VectorMap};
//!
//! let mut registry = MapRegistry::new();
//! registry
//!     .register_json(
//!         "plane",
//!         r#"{ "width": 100, "height": 50,
//!              "paths": { "A": { "path": "M0,0L100,0L100,50Z", "name": "Alpha" } } }"#,
//!     )
//!     .unwrap();
//!
//! let mut map = VectorMap::new(&registry, MapParams::new("plane"), 200.0, 100.0).unwrap();
//! let _ = map.zoom_in();
//! map.finish_animation();
//! assert!(map.render().starts_with("<svg"));
//! ```

pub mod animation;
pub mod config;
pub mod dataset;
pub mod errors;
pub mod inset;
pub mod log;
pub mod map;
pub mod objects;
pub mod projection;
pub mod render;
pub mod scale;
pub mod series;
pub mod types;
pub mod viewport;

pub use animation::{Transition, TransitionOutcome};
pub use config::{FocusRequest, FocusTarget, MapParams, MarkerSpec, Selection, SeriesParams};
pub use dataset::{MapData, MapRegistry};
pub use errors::{ImageLoadError, MapError, ScaleError};
pub use map::{Collection, MapEvent, VectorMap};
pub use render::{BackendKind, Canvas, svg_path_to_vml};
pub use types::{AttrValue, BBox, LatLng};
pub use viewport::{Transform, ViewportState};
