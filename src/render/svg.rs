//! SVG generation
//!
//! Attributes map one to one onto SVG attributes, with three exceptions:
//! image URLs used as `fill` become pattern references, `image`/`cx`/`cy`
//! on image shapes become `xlink:href` and a centered `x`/`y`, and `text`
//! becomes character data.

use glam::DVec2;

use super::backend::{BackendKind, RenderBackend};
use super::element::{Node, NodeId, NodeKind};
use super::image::{ImageCache, ImageLookup, ImagePurpose, Waiter, is_image_url};
use super::markup::{Markup, XmlWriter, no_children};
use crate::types::format_number;
use crate::viewport::Transform;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// Path-native backend
#[derive(Clone, Copy, Debug, Default)]
pub struct SvgBackend;

fn pattern_ref(id: u32) -> String {
    format!("url(#image{id})")
}

impl SvgBackend {
    /// Offset an image shape so its logical center sits on `cx`/`cy`.
    fn place_image(node: &mut Node) {
        let Some(size) = node.image_size else {
            return;
        };
        let x = node.number("cx") - size.x / 2.0;
        let y = node.number("cy") - size.y / 2.0;
        node.markup.attrs.set("x", format_number(x));
        node.markup.attrs.set("y", format_number(y));
    }

    /// Drop the loaded source and its geometry from an image shape.
    fn clear_image(node: &mut Node) {
        for attr in ["xlink:href", "width", "height", "x", "y"] {
            node.markup.attrs.remove(attr);
        }
        node.image_size = None;
    }
}

impl RenderBackend for SvgBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Svg
    }

    fn canvas_markup(&self) -> Markup {
        Markup::new("svg")
            .with_attr("xmlns", SVG_NS)
            .with_attr("xmlns:xlink", XLINK_NS)
    }

    fn create(&self, kind: NodeKind, _canvas_size: DVec2) -> Markup {
        match kind {
            NodeKind::Group => Markup::new("g"),
            NodeKind::Path => Markup::new("path").with_attr("fill-rule", "evenodd"),
            NodeKind::Circle => Markup::new("circle"),
            NodeKind::Image => Markup::new("image"),
            NodeKind::Text => Markup::new("text"),
        }
    }

    fn apply_attr(&self, node: &mut Node, id: NodeId, name: &str, images: &mut ImageCache) {
        let Some(value) = node.text(name) else {
            match (node.kind, name) {
                (NodeKind::Text, "text") => node.markup.text = None,
                (NodeKind::Image, "image") => Self::clear_image(node),
                (NodeKind::Image, "cx") => {
                    node.markup.attrs.remove("x");
                }
                (NodeKind::Image, "cy") => {
                    node.markup.attrs.remove("y");
                }
                _ => {
                    node.markup.attrs.remove(name);
                }
            }
            return;
        };

        match (node.kind, name) {
            (_, "fill") if is_image_url(&value) => {
                let waiter = Waiter {
                    node: id,
                    purpose: ImagePurpose::PatternFill,
                };
                if let ImageLookup::Ready(_) = images.lookup(&value, waiter) {
                    if let Some(pattern) = images.pattern_id(&value) {
                        node.markup.attrs.set("fill", pattern_ref(pattern));
                    }
                }
            }
            (NodeKind::Image, "image") => {
                let waiter = Waiter {
                    node: id,
                    purpose: ImagePurpose::ImageSource,
                };
                match images.lookup(&value, waiter) {
                    ImageLookup::Ready(size) => {
                        self.image_ready(node, ImagePurpose::ImageSource, &value, size, images);
                    }
                    ImageLookup::Pending | ImageLookup::Failed => Self::clear_image(node),
                }
            }
            (NodeKind::Image, "cx" | "cy") => Self::place_image(node),
            (NodeKind::Text, "text") => node.markup.text = Some(value),
            _ => node.markup.attrs.set(name, value),
        }
    }

    fn image_ready(
        &self,
        node: &mut Node,
        purpose: ImagePurpose,
        url: &str,
        size: DVec2,
        images: &mut ImageCache,
    ) {
        match purpose {
            ImagePurpose::PatternFill => {
                if let Some(pattern) = images.pattern_id(url) {
                    node.markup.attrs.set("fill", pattern_ref(pattern));
                }
            }
            ImagePurpose::ImageSource => {
                node.image_size = Some(size);
                node.markup.attrs.set("xlink:href", url);
                node.markup.attrs.set("width", format_number(size.x));
                node.markup.attrs.set("height", format_number(size.y));
                Self::place_image(node);
            }
        }
    }

    fn apply_size(&self, canvas: &mut Markup, _nodes: &mut [Option<Node>], size: DVec2) {
        canvas.attrs.set("width", format_number(size.x));
        canvas.attrs.set("height", format_number(size.y));
    }

    fn apply_transform(&self, root: &mut Markup, _canvas_size: DVec2, transform: Transform) {
        root.attrs.set(
            "transform",
            format!(
                "scale({}) translate({}, {})",
                format_number(transform.scale),
                format_number(transform.trans.x),
                format_number(transform.trans.y)
            ),
        );
    }

    fn write_defs(&self, w: &mut XmlWriter, images: &ImageCache) {
        let mut defs = Markup::new("defs");
        for pattern in images.patterns() {
            let (width, height) = (format_number(pattern.size.x), format_number(pattern.size.y));
            let image = Markup::new("image")
                .with_attr("x", "0")
                .with_attr("y", "0")
                .with_attr("width", width.as_str())
                .with_attr("height", height.as_str())
                .with_attr("xlink:href", pattern.url.as_str());
            defs.parts.push(
                Markup::new("pattern")
                    .with_attr("id", format!("image{}", pattern.id))
                    .with_attr("x", "0")
                    .with_attr("y", "0")
                    .with_attr("width", format_number(pattern.size.x / 2.0))
                    .with_attr("height", format_number(pattern.size.y / 2.0))
                    .with_attr("viewBox", format!("0 0 {width} {height}"))
                    .with_attr("patternUnits", "userSpaceOnUse")
                    .with_part(image),
            );
        }
        w.element(&defs, 0, no_children);
    }
}
