//! The retained scene graph of one map.
//!
//! A canvas owns every node, the image cache and the active backend. Regions
//! live under the root group, which carries the viewport transform; markers
//! and labels go in top-level groups drawn in screen space on top of it.

use glam::DVec2;

use super::backend::{Backend, BackendKind, RenderBackend};
use super::element::{Node, NodeId, NodeKind};
use super::geometry::shape_bbox;
use super::image::{ImageCache, ImagePurpose};
use super::markup::{Markup, XmlWriter};
use super::style::{Attrs, Style, StyleMap};
use crate::errors::ImageLoadError;
use crate::types::{AttrValue, BBox};
use crate::viewport::Transform;

#[derive(Debug)]
pub struct Canvas {
    backend: Backend,
    nodes: Vec<Option<Node>>,
    /// Top-level groups in paint order; the root group comes first
    top: Vec<NodeId>,
    root: NodeId,
    markup: Markup,
    size: DVec2,
    transform: Transform,
    images: ImageCache,
}

impl Canvas {
    pub fn new(kind: BackendKind, width: f64, height: f64) -> Self {
        let backend = Backend::from(kind);
        let size = DVec2::new(width, height);
        let markup = backend.canvas_markup();
        let root_markup = backend.create(NodeKind::Group, size);
        let mut canvas = Self {
            backend,
            nodes: vec![Some(Node::new(NodeKind::Group, None, root_markup))],
            top: vec![NodeId(0)],
            root: NodeId(0),
            markup,
            size,
            transform: Transform::new(1.0, 0.0, 0.0),
            images: ImageCache::new(),
        };
        canvas.set_size(width, height);
        canvas
    }

    pub fn backend(&self) -> BackendKind {
        self.backend.kind()
    }

    /// The group holding map-space content
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn size(&self) -> DVec2 {
        self.size
    }

    pub fn transform(&self) -> Transform {
        self.transform
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.size = DVec2::new(width, height);
        self.backend
            .apply_size(&mut self.markup, &mut self.nodes, self.size);
        // size changes reset the root coordinate space on some backends
        self.apply_transform(self.transform);
    }

    /// Paint `color` behind the whole scene.
    pub fn set_background_color(&mut self, color: &str) {
        self.markup.css.set("background-color", color);
    }

    /// Encode the viewport transform on the root group.
    pub fn apply_transform(&mut self, transform: Transform) {
        self.transform = transform;
        let size = self.size;
        if let Some(Some(root)) = self.nodes.get_mut(self.root.0) {
            self.backend
                .apply_transform(&mut root.markup, size, transform);
        }
    }

    /// Create a group. Without a parent it becomes a new top-level group,
    /// drawn in screen space above everything created before it.
    pub fn add_group(&mut self, parent: Option<NodeId>) -> NodeId {
        let markup = self.backend.create(NodeKind::Group, self.size);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(NodeKind::Group, parent, markup)));
        match parent.and_then(|p| self.node_mut(p)) {
            Some(parent) => parent.children.push(id),
            None => self.top.push(id),
        }
        id
    }

    pub fn add_path(&mut self, config: &Attrs, style: Style, group: Option<NodeId>) -> NodeId {
        self.add_shape(NodeKind::Path, config, style, group)
    }

    pub fn add_circle(&mut self, config: &Attrs, style: Style, group: Option<NodeId>) -> NodeId {
        self.add_shape(NodeKind::Circle, config, style, group)
    }

    pub fn add_image(&mut self, config: &Attrs, style: Style, group: Option<NodeId>) -> NodeId {
        self.add_shape(NodeKind::Image, config, style, group)
    }

    pub fn add_text(&mut self, config: &Attrs, style: Style, group: Option<NodeId>) -> NodeId {
        self.add_shape(NodeKind::Text, config, style, group)
    }

    fn add_shape(
        &mut self,
        kind: NodeKind,
        config: &Attrs,
        style: Style,
        group: Option<NodeId>,
    ) -> NodeId {
        let parent = group
            .filter(|g| self.node(*g).is_some())
            .unwrap_or(self.root);
        let markup = self.backend.create(kind, self.size);
        let id = NodeId(self.nodes.len());
        self.nodes.push(Some(Node::new(kind, Some(parent), markup)));
        if let Some(parent) = self.node_mut(parent) {
            parent.children.push(id);
        }
        self.set(id, config);
        if let Some(node) = self.node_mut(id) {
            node.style = Some(style);
        }
        self.update_style(id);
        id
    }

    /// Set several attributes at once.
    pub fn set(&mut self, id: NodeId, attrs: &Attrs) {
        for (name, value) in attrs {
            self.set_attr(id, name, value.clone());
        }
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<AttrValue>) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::as_mut) else {
            return;
        };
        node.properties.insert(name.to_string(), value.into());
        self.backend.apply_attr(node, id, name, &mut self.images);
    }

    pub fn get(&self, id: NodeId, name: &str) -> Option<&AttrValue> {
        self.node(id)?.get(name)
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::as_mut) else {
            return;
        };
        if node.properties.remove(name).is_some() {
            self.backend.apply_attr(node, id, name, &mut self.images);
        }
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) {
        if let Some(node) = self.node_mut(id) {
            node.markup.add_class(class);
        }
    }

    /// Bounding box in the node's own coordinate space. Groups report the
    /// union of their children.
    pub fn bbox(&self, id: NodeId) -> BBox {
        let Some(node) = self.node(id) else {
            return BBox::empty();
        };
        match node.kind {
            NodeKind::Group => node
                .children
                .iter()
                .fold(BBox::empty(), |acc, child| acc.union(self.bbox(*child))),
            _ => shape_bbox(node),
        }
    }

    /// Remove a node and its subtree. The root group cannot be removed.
    pub fn remove(&mut self, id: NodeId) {
        if id == self.root {
            return;
        }
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::take) else {
            return;
        };
        match node.parent.and_then(|p| self.node_mut(p)) {
            Some(parent) => parent.children.retain(|c| *c != id),
            None => self.top.retain(|c| *c != id),
        }
        let mut pending = node.children;
        while let Some(child) = pending.pop() {
            if let Some(child) = self.nodes.get_mut(child.0).and_then(Option::take) {
                pending.extend(child.children);
            }
        }
    }

    /// Merge `updates` into the shape's current style layer and apply.
    pub fn set_style(&mut self, id: NodeId, updates: StyleMap) {
        if let Some(style) = self.node_mut(id).and_then(|n| n.style.as_mut()) {
            style.set(updates);
            self.update_style(id);
        }
    }

    /// Reset `key` of the current layer to its initial value, or drop it when
    /// the initial layer has none.
    pub fn restore_initial(&mut self, id: NodeId, key: &str) {
        if let Some(style) = self.node_mut(id).and_then(|n| n.style.as_mut()) {
            match style.initial(key).cloned() {
                Some(value) => style.set(StyleMap::from([(key.to_string(), Some(value))])),
                None => style.unset_current(key),
            }
            self.update_style(id);
        }
    }

    /// Returns whether the hover flag changed.
    pub fn set_hovered(&mut self, id: NodeId, hovered: bool) -> bool {
        let changed = self
            .node_mut(id)
            .and_then(|n| n.style.as_mut())
            .is_some_and(|style| style.set_hovered(hovered));
        if changed {
            self.update_style(id);
        }
        changed
    }

    /// Returns whether the selection flag changed.
    pub fn set_selected(&mut self, id: NodeId, selected: bool) -> bool {
        let changed = self
            .node_mut(id)
            .and_then(|n| n.style.as_mut())
            .is_some_and(|style| style.set_selected(selected));
        if changed {
            self.update_style(id);
        }
        changed
    }

    /// Resolve the shape's style and push the differences to the backend.
    fn update_style(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.0).and_then(Option::as_mut) else {
            return;
        };
        let Some(style) = node.style.as_mut() else {
            return;
        };
        let diff = style.commit();
        for key in diff.removed {
            if node.properties.remove(&key).is_some() {
                self.backend.apply_attr(node, id, &key, &mut self.images);
            }
        }
        for (key, value) in diff.set {
            if node.properties.get(&key) == Some(&value) {
                continue;
            }
            node.properties.insert(key.clone(), value);
            self.backend.apply_attr(node, id, &key, &mut self.images);
        }
    }

    /// Drain the image URLs the host should load.
    pub fn take_image_requests(&mut self) -> Vec<String> {
        self.images.take_requests()
    }

    /// Deliver the host's answer for an image request and return the nodes
    /// that were updated.
    ///
    /// Waiters whose node is gone, or whose fill or source moved on to a
    /// different value while the image was loading, are skipped.
    pub fn complete_image(
        &mut self,
        url: &str,
        result: Result<DVec2, ImageLoadError>,
    ) -> Vec<NodeId> {
        let size = result.as_ref().ok().copied();
        let waiters = self.images.complete(url, result);
        let Some(size) = size else {
            return Vec::new();
        };
        let mut touched = Vec::new();
        for waiter in waiters {
            let Some(node) = self.nodes.get_mut(waiter.node.0).and_then(Option::as_mut) else {
                continue;
            };
            let property = match waiter.purpose {
                ImagePurpose::PatternFill => "fill",
                ImagePurpose::ImageSource => "image",
            };
            if node.text(property).as_deref() != Some(url) {
                crate::log::trace!(url, node = waiter.node.0, "skipping stale image waiter");
                continue;
            }
            self.backend
                .image_ready(node, waiter.purpose, url, size, &mut self.images);
            touched.push(waiter.node);
        }
        touched
    }

    /// Serialize the whole scene.
    pub fn render(&self) -> String {
        let mut w = XmlWriter::new();
        w.element(&self.markup, self.top.len() + 1, |w| {
            self.backend.write_defs(w, &self.images);
            for id in &self.top {
                self.write_node(w, *id);
            }
        });
        w.finish()
    }

    fn write_node(&self, w: &mut XmlWriter, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        w.element(&node.markup, node.children.len(), |w| {
            for child in &node.children {
                self.write_node(w, *child);
            }
        });
    }
}
