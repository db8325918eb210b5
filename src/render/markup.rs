//! Backend-neutral markup nodes and the XML writer that serializes them.
//!
//! Both backends translate logical attributes into a [`Markup`] per scene
//! node: a tag, its attributes, inline CSS properties, fixed sub-elements
//! (VML `fill`/`stroke`/`skew`) and optional text content.

/// Ordered attribute list. Setting an existing name replaces it in place so
/// output order is stable across updates.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AttrList(Vec<(String, String)>);

impl AttrList {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.0.iter_mut().find(|(key, _)| key == name) {
            Some(slot) => slot.1 = value,
            None => self.0.push((name.to_string(), value)),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        let index = self.0.iter().position(|(key, _)| key == name)?;
        Some(self.0.remove(index).1)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// One element of backend output
#[derive(Clone, Debug, PartialEq)]
pub struct Markup {
    pub tag: String,
    pub attrs: AttrList,
    /// Inline style properties, written as a `style` attribute
    pub css: AttrList,
    /// Fixed sub-elements written before any child nodes
    pub parts: Vec<Markup>,
    pub text: Option<String>,
}

impl Markup {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            attrs: AttrList::new(),
            css: AttrList::new(),
            parts: Vec::new(),
            text: None,
        }
    }

    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.attrs.set(name, value);
        self
    }

    pub fn with_css(mut self, name: &str, value: impl Into<String>) -> Self {
        self.css.set(name, value);
        self
    }

    pub fn with_part(mut self, part: Markup) -> Self {
        self.parts.push(part);
        self
    }

    pub fn part(&self, tag: &str) -> Option<&Markup> {
        self.parts.iter().find(|p| p.tag == tag)
    }

    /// Sub-element with `tag`, created on first access.
    pub fn part_mut(&mut self, tag: &str) -> &mut Markup {
        let index = match self.parts.iter().position(|p| p.tag == tag) {
            Some(index) => index,
            None => {
                self.parts.push(Markup::new(tag));
                self.parts.len() - 1
            }
        };
        &mut self.parts[index]
    }

    /// Append `class` to the space-separated class list.
    pub fn add_class(&mut self, class: &str) {
        let merged = match self.attrs.get("class") {
            Some(existing) if existing.split_whitespace().any(|c| c == class) => return,
            Some(existing) if !existing.is_empty() => format!("{existing} {class}"),
            _ => class.to_string(),
        };
        self.attrs.set("class", merged);
    }
}

/// Escape text for use in XML attribute values and character data.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Child callback for elements with no nested scene nodes.
pub fn no_children(_: &mut XmlWriter) {}

/// Indenting XML writer
#[derive(Debug, Default)]
pub struct XmlWriter {
    out: String,
    depth: usize,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `markup`, calling `children` to emit nested nodes when
    /// `child_count` is non-zero.
    pub fn element(&mut self, markup: &Markup, child_count: usize, children: impl FnOnce(&mut Self)) {
        self.indent();
        self.out.push('<');
        self.out.push_str(&markup.tag);
        for (name, value) in markup.attrs.iter() {
            self.push_attr(name, value);
        }
        if !markup.css.is_empty() {
            let style: String = markup
                .css
                .iter()
                .map(|(name, value)| format!("{name}:{value};"))
                .collect();
            self.push_attr("style", &style);
        }

        let nested = child_count > 0 || !markup.parts.is_empty();
        match (&markup.text, nested) {
            (None, false) => {
                self.out.push_str("/>\n");
                return;
            }
            (Some(text), false) => {
                self.out.push('>');
                self.out.push_str(&escape_xml(text));
            }
            (text, true) => {
                self.out.push_str(">\n");
                self.depth += 1;
                for part in &markup.parts {
                    self.element(part, 0, no_children);
                }
                if let Some(text) = text {
                    self.indent();
                    self.out.push_str(&escape_xml(text));
                    self.out.push('\n');
                }
                children(self);
                self.depth -= 1;
                self.indent();
            }
        }
        self.out.push_str("</");
        self.out.push_str(&markup.tag);
        self.out.push_str(">\n");
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn push_attr(&mut self, name: &str, value: &str) {
        self.out.push(' ');
        self.out.push_str(name);
        self.out.push_str("=\"");
        self.out.push_str(&escape_xml(value));
        self.out.push('"');
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }
}
