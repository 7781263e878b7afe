//! The two node variants of a hierarchy dump.
//!
//! [`NodeKind`] is a closed set: a [`RootWindow`] container carrying the
//! window name and rotation, or a [`UiElement`] widget carrying the XML
//! attributes verbatim plus the bounds and label derived from them.

use std::fmt;

use serde::Serialize;

use super::Rect;
use crate::errors::HierarchyError;

/// Attribute holding the element's screen rectangle.
pub const BOUNDS_ATTRIBUTE: &str = "bounds";

/// Attribute flagging a node as not accessibility friendly.
pub const NAF_ATTRIBUTE: &str = "NAF";

/// Key under which the root window exposes its name.
pub const WINDOW_NAME_KEY: &str = "window-name";

/// Package prefixes removed from class names in labels.
const CLASS_PREFIXES: &[&str] = &["android.widget.", "android.view."];

/// A key/value entry as shown in an attribute table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttributePair {
    pub key: String,
    pub value: String,
}

impl AttributePair {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Variant-specific payload of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    RootWindow(RootWindow),
    UiElement(UiElement),
}

impl NodeKind {
    /// Short machine-readable name of the variant.
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::RootWindow(_) => "root_window",
            NodeKind::UiElement(_) => "ui_element",
        }
    }

    /// Rectangle usable for hit-testing.  Root windows never have one.
    pub fn bounds(&self) -> Option<Rect> {
        match self {
            NodeKind::RootWindow(_) => None,
            NodeKind::UiElement(element) => element.bounds(),
        }
    }

    pub(crate) fn attribute_pairs(&self) -> Vec<AttributePair> {
        match self {
            NodeKind::RootWindow(window) => {
                vec![AttributePair::new(WINDOW_NAME_KEY, window.window_name())]
            }
            NodeKind::UiElement(element) => element
                .attributes()
                .map(|(k, v)| AttributePair::new(k, v))
                .collect(),
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeKind::RootWindow(window) => f.write_str(window.window_name()),
            NodeKind::UiElement(element) => fmt::Display::fmt(element, f),
        }
    }
}

// ---------------------------------------------------------------------------
// RootWindow
// ---------------------------------------------------------------------------

/// The window container at the top of a dump.
///
/// `rotation` is the device orientation in quarter turns (0..=3).  It is
/// carried as metadata only; nothing in the core compensates for it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootWindow {
    window_name: String,
    rotation: u8,
}

impl RootWindow {
    pub fn new(window_name: impl Into<String>, rotation: u8) -> Self {
        Self {
            window_name: window_name.into(),
            rotation,
        }
    }

    pub fn window_name(&self) -> &str {
        &self.window_name
    }

    pub fn rotation(&self) -> u8 {
        self.rotation
    }
}

// ---------------------------------------------------------------------------
// UiElement
// ---------------------------------------------------------------------------

/// A concrete widget from the dump.
///
/// Attributes keep document order.  Re-adding an existing key replaces the
/// value in place, so the key keeps its first position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UiElement {
    attributes: Vec<(String, String)>,
    bounds: Option<Rect>,
    label: Option<String>,
}

impl UiElement {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an attribute and refresh the label.
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter().position(|(k, _)| *k == key) {
            Some(i) => self.attributes[i].1 = value,
            None => self.attributes.push((key, value)),
        }
        self.update_label();
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Attributes in document order.
    pub fn attributes(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn attribute_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn bounds(&self) -> Option<Rect> {
        self.bounds
    }

    /// Derived label, unset while any of the label attributes is missing.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// True when the element carries `NAF="true"`.
    pub fn is_naf(&self) -> bool {
        self.attribute(NAF_ATTRIBUTE) == Some("true")
    }

    /// Parse the `bounds` attribute, if any, into the hit-test rectangle.
    pub fn resolve_bounds(&mut self) -> Result<(), HierarchyError> {
        self.bounds = match self.attribute(BOUNDS_ATTRIBUTE) {
            Some(raw) => Some(Rect::parse_bounds(raw)?),
            None => None,
        };
        Ok(())
    }

    fn update_label(&mut self) {
        let (Some(class), Some(text), Some(desc), Some(index), Some(bounds)) = (
            self.attribute("class"),
            self.attribute("text"),
            self.attribute("content-desc"),
            self.attribute("index"),
            self.attribute(BOUNDS_ATTRIBUTE),
        ) else {
            return;
        };

        let class = CLASS_PREFIXES
            .iter()
            .fold(class.to_owned(), |name, prefix| name.replace(prefix, ""));

        let mut label = format!("({index}) {class}");
        if !text.is_empty() {
            label.push(':');
            label.push_str(text);
        }
        if !desc.is_empty() {
            label.push_str(" {");
            label.push_str(desc);
            label.push('}');
        }
        label.push(' ');
        label.push_str(bounds);
        self.label = Some(label);
    }
}

impl fmt::Display for UiElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.label, self.attribute("class")) {
            (Some(label), _) => f.write_str(label),
            (None, Some(class)) => f.write_str(class),
            (None, None) => f.write_str("node"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
