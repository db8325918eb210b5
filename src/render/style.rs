//! Layered shape styles and the interaction state that selects between them.
//!
//! A shape owns four layer dictionaries plus a `current` override layer set
//! through `set_style`. The rendered attribute set is always the merge of
//! the layers active for the shape's hover and selection flags:
//!
//! ```text
//! initial <- current <- hover? <- selected? <- selectedHover? (hover && selected)
//! ```
//!
//! A `None` value in any layer removes the key from the running result.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::types::AttrValue;

/// One style dictionary. `None` is an explicit unset.
pub type StyleMap = BTreeMap<String, Option<AttrValue>>;

/// Resolved attribute set
pub type Attrs = BTreeMap<String, AttrValue>;

/// The four state layers of a shape style
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleLayers {
    pub initial: StyleMap,
    pub hover: StyleMap,
    pub selected: StyleMap,
    pub selected_hover: StyleMap,
}

impl StyleLayers {
    /// Layer-by-layer merge of `self` over `base`; keys in `self` win.
    pub fn merged_over(&self, base: &StyleLayers) -> StyleLayers {
        fn merge(base: &StyleMap, over: &StyleMap) -> StyleMap {
            let mut merged = base.clone();
            merged.extend(over.iter().map(|(k, v)| (k.clone(), v.clone())));
            merged
        }
        StyleLayers {
            initial: merge(&base.initial, &self.initial),
            hover: merge(&base.hover, &self.hover),
            selected: merge(&base.selected, &self.selected),
            selected_hover: merge(&base.selected_hover, &self.selected_hover),
        }
    }
}

/// Build a [`StyleMap`] from literal pairs.
pub fn style_map<K, V>(entries: impl IntoIterator<Item = (K, V)>) -> StyleMap
where
    K: Into<String>,
    V: Into<AttrValue>,
{
    entries
        .into_iter()
        .map(|(k, v)| (k.into(), Some(v.into())))
        .collect()
}

/// Changes to push to a node after a style transition
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StyleDiff {
    pub set: Attrs,
    /// Keys applied by the previous resolution that are no longer present
    pub removed: Vec<String>,
}

/// Style resolver owned by a shape
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Style {
    layers: StyleLayers,
    current: StyleMap,
    hovered: bool,
    selected: bool,
    applied: BTreeSet<String>,
}

impl Style {
    pub fn new(layers: StyleLayers) -> Self {
        Self {
            layers,
            ..Self::default()
        }
    }

    pub fn layers(&self) -> &StyleLayers {
        &self.layers
    }

    pub fn current(&self) -> &StyleMap {
        &self.current
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    /// Value of `key` in the initial layer
    pub fn initial(&self, key: &str) -> Option<&AttrValue> {
        self.layers.initial.get(key).and_then(Option::as_ref)
    }

    /// Merge `updates` into the current override layer.
    pub fn set(&mut self, updates: StyleMap) {
        self.current.extend(updates);
    }

    /// Drop `key` from the current override layer.
    pub fn unset_current(&mut self, key: &str) {
        self.current.remove(key);
    }

    /// Returns whether the flag changed.
    pub fn set_hovered(&mut self, hovered: bool) -> bool {
        std::mem::replace(&mut self.hovered, hovered) != hovered
    }

    /// Returns whether the flag changed.
    pub fn set_selected(&mut self, selected: bool) -> bool {
        std::mem::replace(&mut self.selected, selected) != selected
    }

    /// Merge the active layers.
    pub fn resolve(&self) -> Attrs {
        let mut active: Vec<&StyleMap> = vec![&self.layers.initial, &self.current];
        if self.hovered {
            active.push(&self.layers.hover);
        }
        if self.selected {
            active.push(&self.layers.selected);
            if self.hovered {
                active.push(&self.layers.selected_hover);
            }
        }

        let mut attrs = Attrs::new();
        for layer in active {
            for (key, value) in layer {
                match value {
                    Some(value) => {
                        attrs.insert(key.clone(), value.clone());
                    }
                    None => {
                        attrs.remove(key);
                    }
                }
            }
        }
        attrs
    }

    /// Resolve and record which keys are now applied, returning what the
    /// node must set and clear.
    pub(crate) fn commit(&mut self) -> StyleDiff {
        let set = self.resolve();
        let removed = self
            .applied
            .iter()
            .filter(|key| !set.contains_key(*key))
            .cloned()
            .collect();
        self.applied = set.keys().cloned().collect();
        StyleDiff { set, removed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layers() -> StyleLayers {
        StyleLayers {
            initial: style_map([("fill", "white"), ("stroke", "none")]),
            hover: style_map([("fill-opacity", 0.8)]),
            selected: style_map([("fill", "yellow")]),
            selected_hover: style_map([("fill", "orange")]),
        }
    }

    fn fill(style: &Style) -> Option<AttrValue> {
        style.resolve().get("fill").cloned()
    }

    #[test]
    fn merge_order_follows_state_flags() {
        let mut style = Style::new(layers());
        assert_eq!(fill(&style), Some("white".into()));

        style.set_hovered(true);
        assert_eq!(fill(&style), Some("white".into()));
        assert_eq!(style.resolve().get("fill-opacity"), Some(&AttrValue::from(0.8)));

        style.set_selected(true);
        assert_eq!(fill(&style), Some("orange".into()));

        style.set_hovered(false);
        assert_eq!(fill(&style), Some("yellow".into()));
        assert!(!style.resolve().contains_key("fill-opacity"));
    }

    #[test]
    fn current_overrides_initial_but_not_state_layers() {
        let mut style = Style::new(layers());
        style.set(style_map([("fill", "red")]));
        assert_eq!(fill(&style), Some("red".into()));
        style.set_selected(true);
        assert_eq!(fill(&style), Some("yellow".into()));
    }

    #[test]
    fn null_values_unset_keys() {
        let mut style = Style::new(layers());
        style.set(StyleMap::from([("stroke".to_string(), None)]));
        assert!(!style.resolve().contains_key("stroke"));
    }

    #[test]
    fn commit_reports_keys_to_clear() {
        let mut style = Style::new(layers());
        style.set_hovered(true);
        let diff = style.commit();
        assert!(diff.removed.is_empty());
        assert!(diff.set.contains_key("fill-opacity"));

        style.set_hovered(false);
        let diff = style.commit();
        assert_eq!(diff.removed, vec!["fill-opacity".to_string()]);
    }

    #[test]
    fn setting_same_value_twice_is_idempotent() {
        let mut once = Style::new(layers());
        once.set(style_map([("a", 1)]));
        let mut twice = Style::new(layers());
        twice.set(style_map([("a", 1)]));
        twice.set(style_map([("a", 1)]));
        assert_eq!(once.resolve(), twice.resolve());
    }

    #[test]
    fn user_layers_merge_over_defaults() {
        let user = StyleLayers {
            initial: style_map([("fill", "red")]),
            ..StyleLayers::default()
        };
        let merged = user.merged_over(&layers());
        assert_eq!(merged.initial.get("fill"), Some(&Some("red".into())));
        assert_eq!(merged.initial.get("stroke"), Some(&Some("none".into())));
        assert_eq!(merged.selected, layers().selected);
    }

    #[test]
    fn flag_setters_report_changes() {
        let mut style = Style::new(layers());
        assert!(style.set_hovered(true));
        assert!(!style.set_hovered(true));
        assert!(style.set_selected(true));
        assert!(style.is_selected());
    }
}
