//! UI hierarchy dump parsing via `quick-xml`.
//!
//! [`HierarchyParser::parse`] walks the document depth-first in document
//! order.  The `hierarchy` element becomes the [`RootWindow`]; every other
//! element becomes a [`UiElement`] carrying all of its XML attributes.
//! Each element is attached to its parent when its end tag is read.
//!
//! Parsing is all-or-nothing: the first error discards everything built so
//! far.  Nesting deeper than [`MAX_TREE_DEPTH`] is rejected as malformed.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::errors::HierarchyError;
use crate::tree::node::{NodeKind, RootWindow, UiElement};
use crate::tree::{HierarchyTree, NodeId, Rect, MAX_TREE_DEPTH};

/// Element name of the window container.
pub const ROOT_ELEMENT: &str = "hierarchy";

const WINDOW_NAME_ATTRIBUTE: &str = "windowName";
const ROTATION_ATTRIBUTE: &str = "rotation";

/// Everything produced from one dump.
#[derive(Debug)]
pub struct ParsedHierarchy {
    pub tree: HierarchyTree,
    /// Every node in document order, root first.
    pub all_nodes: Vec<NodeId>,
    /// Bounds of the nodes flagged `NAF="true"`, in document order.
    pub naf_rects: Vec<Rect>,
}

/// Stateless dump parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchyParser;

impl HierarchyParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a complete dump held in memory.
    pub fn parse(&self, xml: &[u8]) -> Result<ParsedHierarchy, HierarchyError> {
        let mut reader = Reader::from_reader(xml);
        reader.trim_text(true);

        let mut builder = Builder::default();
        let mut buf = Vec::new();

        loop {
            match reader.read_event_into(&mut buf)? {
                Event::Start(ref e) => {
                    let id = builder.open(e)?;
                    builder.stack.push(id);
                }
                Event::Empty(ref e) => {
                    let id = builder.open(e)?;
                    builder.close(id)?;
                }
                Event::End(_) => {
                    let id = builder.stack.pop().ok_or_else(|| {
                        HierarchyError::MalformedDocument("unexpected end tag".into())
                    })?;
                    builder.close(id)?;
                }
                Event::Text(ref t) => {
                    if builder.stack.is_empty() && !t.iter().all(u8::is_ascii_whitespace) {
                        return Err(HierarchyError::MalformedDocument(format!(
                            "text outside the root element at byte {}",
                            reader.buffer_position()
                        )));
                    }
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        builder.finish()
    }
}

/// Parse `xml` with a default [`HierarchyParser`].
pub fn parse(xml: &[u8]) -> Result<ParsedHierarchy, HierarchyError> {
    HierarchyParser::new().parse(xml)
}

// ---------------------------------------------------------------------------
// Tree construction
// ---------------------------------------------------------------------------

#[derive(Default)]
struct Builder {
    tree: Option<HierarchyTree>,
    stack: Vec<NodeId>,
    all_nodes: Vec<NodeId>,
    naf_rects: Vec<Rect>,
}

impl Builder {
    fn open(&mut self, start: &BytesStart<'_>) -> Result<NodeId, HierarchyError> {
        if self.stack.len() > MAX_TREE_DEPTH {
            return Err(HierarchyError::MalformedDocument(format!(
                "elements nested deeper than {MAX_TREE_DEPTH} levels"
            )));
        }
        let kind = self.node_kind(start)?;

        let id = if let Some(tree) = self.tree.as_mut() {
            if self.stack.is_empty() {
                return Err(HierarchyError::MalformedDocument(
                    "more than one top-level element".into(),
                ));
            }
            tree.push(kind)
        } else {
            let tree = HierarchyTree::new(kind);
            let root = tree.root();
            self.tree = Some(tree);
            root
        };

        self.all_nodes.push(id);
        Ok(id)
    }

    fn close(&mut self, id: NodeId) -> Result<(), HierarchyError> {
        match (self.tree.as_mut(), self.stack.last()) {
            (Some(tree), Some(&parent)) => tree.add_child(parent, id),
            _ => Ok(()),
        }
    }

    fn node_kind(&mut self, start: &BytesStart<'_>) -> Result<NodeKind, HierarchyError> {
        let attributes = read_attributes(start)?;

        if start.name().as_ref() == ROOT_ELEMENT.as_bytes() {
            let lookup = |name: &str| {
                attributes
                    .iter()
                    .rev()
                    .find(|(k, _)| k == name)
                    .map(|(_, v)| v.as_str())
            };
            let window_name = lookup(WINDOW_NAME_ATTRIBUTE).unwrap_or_default();
            let rotation = parse_rotation(lookup(ROTATION_ATTRIBUTE));
            return Ok(NodeKind::RootWindow(RootWindow::new(window_name, rotation)));
        }

        let mut element = UiElement::new();
        for (key, value) in attributes {
            element.add_attribute(key, value);
        }
        element.resolve_bounds()?;

        if let Some(rect) = element.bounds().filter(|_| element.is_naf()) {
            self.naf_rects.push(rect);
        }
        Ok(NodeKind::UiElement(element))
    }

    fn finish(self) -> Result<ParsedHierarchy, HierarchyError> {
        if let Some(&open) = self.stack.last() {
            return Err(HierarchyError::MalformedDocument(format!(
                "document ended inside element {open}"
            )));
        }
        let tree = self.tree.ok_or(HierarchyError::EmptyDocument)?;

        log::debug!(
            "parsed hierarchy: {} nodes, {} NAF rects",
            self.all_nodes.len(),
            self.naf_rects.len()
        );

        Ok(ParsedHierarchy {
            tree,
            all_nodes: self.all_nodes,
            naf_rects: self.naf_rects,
        })
    }
}

/// Read every attribute of `start` in document order.  Duplicate keys are
/// kept; later values override earlier ones when recorded.
fn read_attributes(start: &BytesStart<'_>) -> Result<Vec<(String, String)>, HierarchyError> {
    let mut attributes = start.attributes();
    attributes.with_checks(false);

    let mut out = Vec::new();
    for attr in attributes {
        let attr = attr.map_err(|err| HierarchyError::MalformedDocument(err.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .map_err(|err| HierarchyError::MalformedDocument(format!("attribute name: {err}")))?
            .to_owned();
        let value = attr.unescape_value()?.into_owned();
        out.push((key, value));
    }
    Ok(out)
}

/// Rotation in quarter turns.  Anything but an integer in 0..=3 becomes 0.
fn parse_rotation(raw: Option<&str>) -> u8 {
    let Some(raw) = raw else {
        return 0;
    };
    match raw.trim().parse::<u8>() {
        Ok(rotation) if rotation <= 3 => rotation,
        _ => {
            log::warn!("ignoring invalid rotation value {raw:?}");
            0
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?>
<hierarchy rotation="1" windowName="com.example/.Main">
  <node index="0" text="" class="android.widget.FrameLayout" content-desc="" bounds="[0,0][1080,1920]">
    <node index="0" text="Settings" class="android.widget.TextView" content-desc="" bounds="[0,0][540,100]"/>
    <node index="1" text="" class="android.widget.ImageView" content-desc="" NAF="true" bounds="[540,0][1080,100]"/>
  </node>
  <node index="1" class="android.view.View"/>
</hierarchy>"#;

    #[test]
    fn test_parse_builds_tree_in_document_order() {
        let parsed = parse(DUMP.as_bytes()).unwrap();
        let tree = &parsed.tree;
        assert_eq!(tree.len(), 5);
        assert_eq!(
            parsed.all_nodes,
            (0..5).map(NodeId).collect::<Vec<_>>()
        );

        let root = &tree[tree.root()];
        assert_eq!(root.children(), &[NodeId(1), NodeId(4)]);
        assert_eq!(tree[NodeId(1)].children(), &[NodeId(2), NodeId(3)]);
        assert_eq!(tree[NodeId(3)].parent(), Some(NodeId(1)));
    }

    #[test]
    fn test_parse_root_window() {
        let parsed = parse(DUMP.as_bytes()).unwrap();
        match parsed.tree[parsed.tree.root()].kind() {
            NodeKind::RootWindow(window) => {
                assert_eq!(window.window_name(), "com.example/.Main");
                assert_eq!(window.rotation(), 1);
            }
            other => panic!("expected root window, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_elements_and_naf() {
        let parsed = parse(DUMP.as_bytes()).unwrap();
        let text = parsed.tree[NodeId(2)].as_ui_element().unwrap();
        assert_eq!(text.attribute("text"), Some("Settings"));
        assert_eq!(text.bounds(), Some(Rect::new(0, 0, 540, 100)));
        assert_eq!(text.label(), Some("(0) TextView:Settings [0,0][540,100]"));

        assert_eq!(parsed.naf_rects, vec![Rect::new(540, 0, 540, 100)]);
        assert!(!parsed.tree[NodeId(4)].has_bounds());
    }

    #[test]
    fn test_naf_needs_true_flag_and_bounds() {
        let xml = br#"<hierarchy>
  <node NAF="true"/>
  <node NAF="false" bounds="[0,0][10,10]"/>
  <node NAF="TRUE" bounds="[0,0][20,20]"/>
  <node NAF="true" bounds="[5,5][15,25]"/>
</hierarchy>"#;
        let parsed = parse(xml).unwrap();
        assert_eq!(parsed.all_nodes.len(), 5);
        assert!(!parsed.tree[NodeId(1)].has_bounds());
        assert_eq!(parsed.naf_rects, vec![Rect::new(5, 5, 10, 20)]);
    }

    #[test]
    fn test_naf_without_bounds_is_not_collected() {
        let parsed = parse(br#"<hierarchy><node NAF="true"/></hierarchy>"#).unwrap();
        assert_eq!(parsed.all_nodes, vec![NodeId(0), NodeId(1)]);
        assert!(parsed.tree[NodeId(1)].as_ui_element().unwrap().is_naf());
        assert!(parsed.naf_rects.is_empty());
    }

    fn nested(levels: usize) -> String {
        let mut xml = String::from("<hierarchy>");
        xml.push_str(&r#"<node bounds="[0,0][10,10]">"#.repeat(levels));
        xml.push_str(&"</node>".repeat(levels));
        xml.push_str("</hierarchy>");
        xml
    }

    #[test]
    fn test_nesting_limit() {
        let parsed = parse(nested(MAX_TREE_DEPTH).as_bytes()).unwrap();
        let deepest = *parsed.all_nodes.last().unwrap();
        assert_eq!(parsed.tree.depth(deepest), MAX_TREE_DEPTH);

        assert!(matches!(
            parse(nested(MAX_TREE_DEPTH + 1).as_bytes()),
            Err(HierarchyError::MalformedDocument(_))
        ));
        assert!(matches!(
            parse(nested(20_000).as_bytes()),
            Err(HierarchyError::MalformedDocument(_))
        ));
    }

    #[test]
    fn test_parse_keeps_attribute_order() {
        let parsed = parse(DUMP.as_bytes()).unwrap();
        let keys: Vec<_> = parsed.tree[NodeId(3)]
            .attribute_pairs()
            .iter()
            .map(|p| p.key.as_str())
            .collect();
        assert_eq!(keys, ["index", "text", "class", "content-desc", "NAF", "bounds"]);
    }

    #[test]
    fn test_duplicate_attribute_last_wins() {
        let parsed = parse(br#"<node text="a" bounds="[0,0][1,1]" text="b"/>"#).unwrap();
        let e = parsed.tree[parsed.tree.root()].as_ui_element().unwrap();
        assert_eq!(e.attribute("text"), Some("b"));
        assert_eq!(e.attribute_count(), 2);
    }

    #[test]
    fn test_unescapes_attribute_values() {
        let parsed = parse(br#"<node text="Tom &amp; Jerry"/>"#).unwrap();
        let e = parsed.tree[parsed.tree.root()].as_ui_element().unwrap();
        assert_eq!(e.attribute("text"), Some("Tom & Jerry"));
    }

    #[test]
    fn test_invalid_bounds_aborts_parse() {
        let xml = br#"<hierarchy><node bounds="[0,0][10,10]"/><node bounds="10,10,100,100"/></hierarchy>"#;
        assert_eq!(
            parse(xml).unwrap_err(),
            HierarchyError::InvalidBounds("10,10,100,100".into())
        );
    }

    #[test]
    fn test_empty_document() {
        assert_eq!(parse(b"").unwrap_err(), HierarchyError::EmptyDocument);
        assert_eq!(
            parse(b"<?xml version='1.0'?>\n  ").unwrap_err(),
            HierarchyError::EmptyDocument
        );
    }

    #[test]
    fn test_malformed_documents() {
        let cases: [&[u8]; 5] = [
            b"<hierarchy><node></hierarchy>",
            b"<hierarchy><node/>",
            b"<a/><b/>",
            b"not xml at all",
            b"<hierarchy></node>",
        ];
        for xml in cases {
            assert!(
                matches!(parse(xml), Err(HierarchyError::MalformedDocument(_))),
                "{:?} should be malformed",
                String::from_utf8_lossy(xml)
            );
        }
    }

    #[test]
    fn test_rotation_fallback() {
        assert_eq!(parse_rotation(None), 0);
        assert_eq!(parse_rotation(Some("3")), 3);
        assert_eq!(parse_rotation(Some("7")), 0);
        assert_eq!(parse_rotation(Some("left")), 0);
    }

    #[test]
    fn test_parse_is_deterministic() {
        let a = parse(DUMP.as_bytes()).unwrap();
        let b = parse(DUMP.as_bytes()).unwrap();
        assert_eq!(a.all_nodes, b.all_nodes);
        assert_eq!(a.naf_rects, b.naf_rects);
        for id in a.tree.node_ids() {
            assert_eq!(a.tree[id].kind(), b.tree[id].kind());
            assert_eq!(a.tree[id].children(), b.tree[id].children());
        }
    }
}
