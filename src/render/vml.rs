//! VML generation for legacy-geometry hosts.
//!
//! Shapes are positioned through inline CSS inside a coordinate space set by
//! `coordsize`/`coordorigin`. Paths are translated with
//! [`svg_path_to_vml`], and colors, opacities and image fills live on
//! `fill`/`stroke` sub-elements.

use glam::DVec2;

use super::backend::{BackendKind, RenderBackend, percent, px};
use super::element::{Node, NodeId, NodeKind};
use super::image::{ImageCache, ImageLookup, ImagePurpose, Waiter, is_image_url};
use super::markup::{Markup, XmlWriter};
use super::vml_path::svg_path_to_vml;
use crate::types::format_number;
use crate::viewport::Transform;

const VML_NS: &str = "urn:schemas-microsoft-com:vml";
const CLASS: &str = "rvml";

const FILL: &str = "rvml:fill";
const STROKE: &str = "rvml:stroke";
const SKEW: &str = "rvml:skew";

/// Legacy-geometry backend
#[derive(Clone, Copy, Debug, Default)]
pub struct VmlBackend;

fn element(tag: &str) -> Markup {
    let mut markup = Markup::new(tag);
    markup.add_class(CLASS);
    markup
}

fn coordsize(size: DVec2) -> String {
    format!("{} {}", format_number(size.x), format_number(size.y))
}

fn stroke_weight_visible(value: f64) -> &'static str {
    if value.trunc() != 0.0 { "true" } else { "false" }
}

impl VmlBackend {
    /// Re-derive the box of a circle from `cx`, `cy` and `r`.
    fn place_oval(node: &mut Node) {
        let r = node.number("r");
        let (cx, cy) = (node.number("cx"), node.number("cy"));
        let css = &mut node.markup.css;
        css.set("width", px(r * 2.0));
        css.set("height", px(r * 2.0));
        css.set("left", px(cx - r));
        css.set("top", px(cy - r));
    }

    /// Center an image shape on `cx`/`cy` once its size is known.
    fn place_image(node: &mut Node) {
        let Some(size) = node.image_size else {
            return;
        };
        let (cx, cy) = (node.number("cx"), node.number("cy"));
        let css = &mut node.markup.css;
        css.set("left", px(cx - size.x / 2.0));
        css.set("top", px(cy - size.y / 2.0));
    }

    fn clear_attr(node: &mut Node, name: &str) {
        let markup = &mut node.markup;
        match (node.kind, name) {
            (NodeKind::Text, "text") => markup.text = None,
            (NodeKind::Text, "fill") => {
                markup.css.remove("color");
            }
            (NodeKind::Text, "x") => {
                markup.css.remove("left");
            }
            (NodeKind::Text, "y") => {
                markup.css.remove("top");
            }
            (NodeKind::Text, "font-family" | "font-size" | "font-weight") => {
                markup.css.remove(name);
            }
            (_, "fill") => {
                markup.attrs.remove("fillcolor");
                let fill = markup.part_mut(FILL);
                fill.attrs.remove("type");
                fill.attrs.remove("src");
            }
            (_, "fill-opacity") => {
                markup.part_mut(FILL).attrs.remove("opacity");
            }
            (_, "stroke") => {
                markup.attrs.remove("strokecolor");
                markup.attrs.set("stroked", "false");
            }
            (_, "stroke-opacity") => {
                markup.part_mut(STROKE).attrs.remove("opacity");
            }
            (_, "stroke-width") => {
                markup.attrs.remove("strokeweight");
                markup.attrs.set("stroked", "false");
            }
            (_, "d") => {
                markup.attrs.remove("path");
            }
            (_, "cursor") => {
                markup.css.remove("cursor");
            }
            (NodeKind::Circle, "r" | "cx" | "cy") => Self::place_oval(node),
            (NodeKind::Image, "image") => {
                markup.attrs.remove("src");
                for key in ["width", "height", "left", "top"] {
                    markup.css.remove(key);
                }
                node.image_size = None;
            }
            (NodeKind::Image, "cx" | "cy") => {}
            _ => {
                markup.attrs.remove(name);
            }
        }
    }
}

impl RenderBackend for VmlBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Vml
    }

    fn canvas_markup(&self) -> Markup {
        element("rvml:group")
            .with_attr("xmlns:rvml", VML_NS)
            .with_attr("coordorigin", "0 0")
            .with_css("position", "absolute")
    }

    fn create(&self, kind: NodeKind, canvas_size: DVec2) -> Markup {
        match kind {
            NodeKind::Group => element("rvml:group")
                .with_attr("coordorigin", "0 0")
                .with_attr("coordsize", coordsize(canvas_size))
                .with_css("position", "absolute")
                .with_css("left", "0px")
                .with_css("top", "0px")
                .with_css("width", px(canvas_size.x))
                .with_css("height", px(canvas_size.y)),
            NodeKind::Path => element("rvml:shape")
                .with_attr("coordorigin", "0 0")
                .with_attr("coordsize", coordsize(canvas_size))
                .with_attr("stroked", "false")
                .with_css("position", "absolute")
                .with_css("width", px(canvas_size.x))
                .with_css("height", px(canvas_size.y))
                .with_part(
                    element(SKEW)
                        .with_attr("on", "true")
                        .with_attr("matrix", "0.01,0,0,0.01,0,0")
                        .with_attr("offset", "0,0"),
                )
                .with_part(element(FILL))
                .with_part(element(STROKE)),
            NodeKind::Circle => element("rvml:oval")
                .with_attr("stroked", "false")
                .with_css("position", "absolute")
                .with_part(element(FILL))
                .with_part(element(STROKE)),
            NodeKind::Image => element("rvml:image").with_css("position", "absolute"),
            NodeKind::Text => element("rvml:textbox").with_css("position", "absolute"),
        }
    }

    fn apply_attr(&self, node: &mut Node, id: NodeId, name: &str, images: &mut ImageCache) {
        let Some(value) = node.text(name) else {
            Self::clear_attr(node, name);
            return;
        };
        let number = node.get(name).and_then(|v| v.as_f64());
        let markup = &mut node.markup;

        match (node.kind, name) {
            (NodeKind::Text, "text") => markup.text = Some(value),
            (NodeKind::Text, "fill") => markup.css.set("color", value),
            (NodeKind::Text, "x") => markup.css.set("left", px(number.unwrap_or(0.0))),
            (NodeKind::Text, "y") => markup.css.set("top", px(number.unwrap_or(0.0))),
            (NodeKind::Text, "font-size") => match number {
                Some(size) => markup.css.set("font-size", px(size)),
                None => markup.css.set("font-size", value),
            },
            (NodeKind::Text, "font-family" | "font-weight") => markup.css.set(name, value),
            (NodeKind::Image, "image") => {
                let waiter = Waiter {
                    node: id,
                    purpose: ImagePurpose::ImageSource,
                };
                match images.lookup(&value, waiter) {
                    ImageLookup::Ready(size) => {
                        self.image_ready(node, ImagePurpose::ImageSource, &value, size, images);
                    }
                    ImageLookup::Pending | ImageLookup::Failed => Self::clear_attr(node, "image"),
                }
            }
            (NodeKind::Image, "cx" | "cy") => Self::place_image(node),
            (NodeKind::Circle, "r" | "cx" | "cy") => Self::place_oval(node),
            (_, "fill") if is_image_url(&value) => {
                let fill = markup.part_mut(FILL);
                fill.attrs.set("type", "tile");
                fill.attrs.set("src", value);
            }
            (_, "fill") => {
                let fill = markup.part_mut(FILL);
                fill.attrs.remove("type");
                fill.attrs.remove("src");
                markup.attrs.set("fillcolor", value);
            }
            (_, "fill-opacity") => {
                markup
                    .part_mut(FILL)
                    .attrs
                    .set("opacity", percent(number.unwrap_or(0.0)));
            }
            (_, "stroke") => {
                let stroked = if value == "none" { "false" } else { "true" };
                markup.attrs.set("stroked", stroked);
                markup.attrs.set("strokecolor", value);
            }
            (_, "stroke-opacity") => {
                markup
                    .part_mut(STROKE)
                    .attrs
                    .set("opacity", percent(number.unwrap_or(0.0)));
            }
            (_, "stroke-width") => {
                let width = number.unwrap_or(0.0);
                markup.attrs.set("stroked", stroke_weight_visible(width));
                markup.attrs.set("strokeweight", value);
            }
            (_, "d") => markup.attrs.set("path", svg_path_to_vml(&value)),
            (_, "cursor") => markup.css.set("cursor", value),
            _ => markup.attrs.set(name, value),
        }
    }

    fn image_ready(
        &self,
        node: &mut Node,
        purpose: ImagePurpose,
        url: &str,
        size: DVec2,
        _images: &mut ImageCache,
    ) {
        // Image fills are tiled synchronously and never wait
        if purpose != ImagePurpose::ImageSource {
            return;
        }
        node.image_size = Some(size);
        node.markup.attrs.set("src", url);
        node.markup.css.set("width", px(size.x));
        node.markup.css.set("height", px(size.y));
        Self::place_image(node);
    }

    fn apply_size(&self, canvas: &mut Markup, nodes: &mut [Option<Node>], size: DVec2) {
        for markup in std::iter::once(canvas).chain(
            nodes
                .iter_mut()
                .flatten()
                .filter(|node| matches!(node.kind, NodeKind::Group | NodeKind::Path))
                .map(|node| &mut node.markup),
        ) {
            markup.attrs.set("coordsize", coordsize(size));
            markup.css.set("width", px(size.x));
            markup.css.set("height", px(size.y));
        }
    }

    fn apply_transform(&self, root: &mut Markup, canvas_size: DVec2, transform: Transform) {
        let DVec2 { x: w, y: h } = canvas_size;
        let origin = DVec2::new(
            w - transform.trans.x - w / 100.0,
            h - transform.trans.y - h / 100.0,
        );
        root.attrs.set(
            "coordorigin",
            format!("{},{}", format_number(origin.x), format_number(origin.y)),
        );
        root.attrs.set(
            "coordsize",
            format!(
                "{},{}",
                format_number(w / transform.scale),
                format_number(h / transform.scale)
            ),
        );
    }

    fn write_defs(&self, _w: &mut XmlWriter, _images: &ImageCache) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::canvas::Canvas;
    use crate::render::style::{Attrs, Style, StyleLayers, style_map};
    use crate::types::AttrValue;

    fn attrs<const N: usize>(entries: [(&str, AttrValue); N]) -> Attrs {
        entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
    }

    fn vml_canvas() -> Canvas {
        Canvas::new(BackendKind::Vml, 200.0, 100.0)
    }

    #[test]
    fn renders_region_shape() {
        let mut canvas = vml_canvas();
        canvas.add_path(
            &attrs([("d", "M0,0 L10,10 Z".into())]),
            Style::new(StyleLayers {
                initial: style_map([
                    ("fill", AttrValue::from("white")),
                    ("fill-opacity", 0.8.into()),
                    ("stroke", "none".into()),
                ]),
                ..StyleLayers::default()
            }),
            None,
        );
        insta::assert_snapshot!(canvas.render(), @r#"
        <rvml:group class="rvml" xmlns:rvml="urn:schemas-microsoft-com:vml" coordorigin="0 0" coordsize="200 100" style="position:absolute;width:200px;height:100px;">
          <rvml:group class="rvml" coordorigin="198,99" coordsize="200,100" style="position:absolute;left:0px;top:0px;width:200px;height:100px;">
            <rvml:shape class="rvml" coordorigin="0 0" coordsize="200 100" stroked="false" path="m0,0l1000,1000e" fillcolor="white" strokecolor="none" style="position:absolute;width:200px;height:100px;">
              <rvml:skew class="rvml" on="true" matrix="0.01,0,0,0.01,0,0" offset="0,0"/>
              <rvml:fill class="rvml" opacity="80%"/>
              <rvml:stroke class="rvml"/>
            </rvml:shape>
          </rvml:group>
        </rvml:group>
        "#);
    }

    #[test]
    fn stroke_width_toggles_stroked() {
        let mut canvas = vml_canvas();
        let id = canvas.add_path(&attrs([]), Style::default(), None);
        canvas.set_attr(id, "stroke-width", 0.5);
        let markup = canvas.node(id).unwrap().markup().clone();
        assert_eq!(markup.attrs.get("stroked"), Some("false"));
        assert_eq!(markup.attrs.get("strokeweight"), Some("0.5"));

        canvas.set_attr(id, "stroke-width", 2);
        assert_eq!(canvas.node(id).unwrap().markup().attrs.get("stroked"), Some("true"));

        canvas.set_attr(id, "stroke", "#505050");
        let markup = canvas.node(id).unwrap().markup().clone();
        assert_eq!(markup.attrs.get("stroked"), Some("true"));
        assert_eq!(markup.attrs.get("strokecolor"), Some("#505050"));
    }

    #[test]
    fn image_fill_is_tiled_without_loading() {
        let mut canvas = vml_canvas();
        let id = canvas.add_path(&attrs([]), Style::default(), None);
        canvas.set_attr(id, "fill", "flag.png");
        let fill = canvas.node(id).unwrap().markup().part(FILL).cloned().unwrap();
        assert_eq!(fill.attrs.get("type"), Some("tile"));
        assert_eq!(fill.attrs.get("src"), Some("flag.png"));
        assert!(canvas.take_image_requests().is_empty());

        canvas.set_attr(id, "fill", "red");
        let markup = canvas.node(id).unwrap().markup().clone();
        assert_eq!(markup.attrs.get("fillcolor"), Some("red"));
        assert_eq!(markup.part(FILL).unwrap().attrs.get("src"), None);
    }

    #[test]
    fn switching_image_source_drops_the_old_one_while_loading() {
        let mut canvas = vml_canvas();
        let id = canvas.add_image(
            &attrs([("cx", 50.into()), ("cy", 20.into())]),
            Style::new(StyleLayers {
                initial: style_map([("image", "pin.png")]),
                ..StyleLayers::default()
            }),
            None,
        );
        canvas.complete_image("pin.png", Ok(DVec2::new(10.0, 30.0)));
        assert_eq!(canvas.node(id).unwrap().markup().attrs.get("src"), Some("pin.png"));

        canvas.set_attr(id, "image", "flag.png");
        let markup = canvas.node(id).unwrap().markup().clone();
        assert_eq!(markup.attrs.get("src"), None);
        for key in ["width", "height", "left", "top"] {
            assert_eq!(markup.css.get(key), None, "{key}");
        }

        canvas.complete_image("flag.png", Ok(DVec2::new(20.0, 10.0)));
        let markup = canvas.node(id).unwrap().markup().clone();
        assert_eq!(markup.attrs.get("src"), Some("flag.png"));
        assert_eq!(markup.css.get("left"), Some("40px"));
        assert_eq!(markup.css.get("top"), Some("15px"));
    }

    #[test]
    fn oval_box_follows_center_and_radius() {
        let mut canvas = vml_canvas();
        let id = canvas.add_circle(
            &attrs([("cx", 30.into()), ("cy", 40.into()), ("r", 5.into())]),
            Style::default(),
            None,
        );
        let css = canvas.node(id).unwrap().markup().css.clone();
        assert_eq!(css.get("left"), Some("25px"));
        assert_eq!(css.get("top"), Some("35px"));
        assert_eq!(css.get("width"), Some("10px"));

        canvas.set_attr(id, "r", 10);
        let css = canvas.node(id).unwrap().markup().css.clone();
        assert_eq!(css.get("left"), Some("20px"));
        assert_eq!(css.get("height"), Some("20px"));
    }

    #[test]
    fn resize_updates_shapes_and_groups() {
        let mut canvas = vml_canvas();
        let id = canvas.add_path(&attrs([]), Style::default(), None);
        let circle = canvas.add_circle(&attrs([("r", 1.into())]), Style::default(), None);
        canvas.set_size(300.0, 150.0);
        let markup = canvas.node(id).unwrap().markup().clone();
        assert_eq!(markup.attrs.get("coordsize"), Some("300 150"));
        assert_eq!(markup.css.get("width"), Some("300px"));
        assert_eq!(canvas.node(circle).unwrap().markup().attrs.get("coordsize"), None);
    }

    #[test]
    fn root_transform_moves_coordinate_origin() {
        let mut canvas = vml_canvas();
        canvas.apply_transform(Transform::new(2.0, 10.0, 20.0));
        let root = canvas.node(canvas.root()).unwrap().markup().clone();
        assert_eq!(root.attrs.get("coordorigin"), Some("188,79"));
        assert_eq!(root.attrs.get("coordsize"), Some("100,50"));
    }

    #[test]
    fn textbox_uses_css_position_and_font() {
        let mut canvas = vml_canvas();
        let id = canvas.add_text(
            &attrs([("text", "Label".into()), ("x", 4.into()), ("y", 6.into())]),
            Style::new(StyleLayers {
                initial: style_map([
                    ("font-family", AttrValue::from("Verdana")),
                    ("font-size", "12".into()),
                ]),
                ..StyleLayers::default()
            }),
            None,
        );
        let markup = canvas.node(id).unwrap().markup().clone();
        assert_eq!(markup.tag, "rvml:textbox");
        assert_eq!(markup.text.as_deref(), Some("Label"));
        assert_eq!(markup.css.get("left"), Some("4px"));
        assert_eq!(markup.css.get("font-size"), Some("12px"));
        assert_eq!(markup.css.get("font-family"), Some("Verdana"));
    }
}
