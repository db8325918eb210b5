//! Scene graph nodes.
//!
//! Nodes live in an arena owned by the canvas and are addressed by
//! [`NodeId`]. Ids are never reused, so a stale id held by a caller (a
//! series or a pending image waiter) resolves to nothing instead of to an
//! unrelated node.

use glam::DVec2;

use super::markup::Markup;
use super::style::{Attrs, Style};
use crate::types::AttrValue;

/// Handle to a node of one canvas
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Node variants of the scene graph
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Path,
    Circle,
    Image,
    Text,
}

impl NodeKind {
    /// Shapes carry a style resolver; groups do not.
    pub fn is_shape(self) -> bool {
        !matches!(self, NodeKind::Group)
    }
}

/// One retained node
#[derive(Clone, Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    /// Logical attributes as last set by callers
    pub(crate) properties: Attrs,
    /// Backend output for this node
    pub(crate) markup: Markup,
    pub(crate) style: Option<Style>,
    /// Natural size of an image shape once its source has loaded
    pub(crate) image_size: Option<DVec2>,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, parent: Option<NodeId>, markup: Markup) -> Self {
        Self {
            kind,
            parent,
            children: Vec::new(),
            properties: Attrs::new(),
            markup,
            style: None,
            image_size: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn markup(&self) -> &Markup {
        &self.markup
    }

    pub fn style(&self) -> Option<&Style> {
        self.style.as_ref()
    }

    pub fn image_size(&self) -> Option<DVec2> {
        self.image_size
    }

    pub fn get(&self, name: &str) -> Option<&AttrValue> {
        self.properties.get(name)
    }

    /// Numeric property, `0` when absent or not numeric
    pub(crate) fn number(&self, name: &str) -> f64 {
        self.get(name).and_then(AttrValue::as_f64).unwrap_or(0.0)
    }

    pub(crate) fn text(&self, name: &str) -> Option<String> {
        self.get(name).map(ToString::to_string)
    }
}
