//! The contract both markup backends implement.
//!
//! The canvas owns the node arena and calls into the active backend to turn
//! logical attribute changes into markup. Backends never hold node state of
//! their own, so the same canvas code drives either output format.

use enum_dispatch::enum_dispatch;
use glam::DVec2;
use serde::{Deserialize, Serialize};

use super::element::{Node, NodeId, NodeKind};
use super::image::{ImageCache, ImagePurpose};
use super::markup::{Markup, XmlWriter};
use super::svg::SvgBackend;
use super::vml::VmlBackend;
use crate::viewport::Transform;

/// Which markup family a canvas produces
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Path-native backend
    #[default]
    Svg,
    /// Legacy-geometry backend
    Vml,
}

#[enum_dispatch]
pub trait RenderBackend {
    fn kind(&self) -> BackendKind;

    /// Document element of the canvas
    fn canvas_markup(&self) -> Markup;

    /// Markup of a freshly created node
    fn create(&self, kind: NodeKind, canvas_size: DVec2) -> Markup;

    /// Translate the logical attribute `name` of `node` into markup. The
    /// value is read from the node's properties; a missing value clears it.
    fn apply_attr(&self, node: &mut Node, id: NodeId, name: &str, images: &mut ImageCache);

    /// An image this node was waiting for has loaded.
    fn image_ready(
        &self,
        node: &mut Node,
        purpose: ImagePurpose,
        url: &str,
        size: DVec2,
        images: &mut ImageCache,
    );

    /// Propagate a canvas size change.
    fn apply_size(&self, canvas: &mut Markup, nodes: &mut [Option<Node>], size: DVec2);

    /// Encode the viewport transform on the root group.
    fn apply_transform(&self, root: &mut Markup, canvas_size: DVec2, transform: Transform);

    /// Shared definitions written ahead of the scene (image patterns).
    fn write_defs(&self, w: &mut XmlWriter, images: &ImageCache);
}

/// Static dispatch over the available backends
#[enum_dispatch(RenderBackend)]
#[derive(Clone, Debug)]
pub enum Backend {
    SvgBackend,
    VmlBackend,
}

impl From<BackendKind> for Backend {
    fn from(kind: BackendKind) -> Self {
        match kind {
            BackendKind::Svg => SvgBackend.into(),
            BackendKind::Vml => VmlBackend.into(),
        }
    }
}

/// `12px`-style CSS length
pub(crate) fn px(value: f64) -> String {
    format!("{}px", crate::types::format_number(value))
}

/// Opacity as a whole percentage, as VML expects it
pub(crate) fn percent(value: f64) -> String {
    format!(
        "{}%",
        crate::types::format_number(crate::types::round_half_up(value * 100.0))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_round_trips_through_dispatch() {
        assert_eq!(Backend::from(BackendKind::Svg).kind(), BackendKind::Svg);
        assert_eq!(Backend::from(BackendKind::Vml).kind(), BackendKind::Vml);
    }

    #[test]
    fn deserializes_lowercase_names() {
        let kind: BackendKind = serde_json::from_str(r#""vml""#).unwrap();
        assert_eq!(kind, BackendKind::Vml);
    }

    #[test]
    fn css_helpers() {
        assert_eq!(px(12.0), "12px");
        assert_eq!(px(-2.5), "-2.5px");
        assert_eq!(percent(0.8), "80%");
        assert_eq!(percent(0.333), "33%");
    }
}
