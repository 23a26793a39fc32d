//! Mutable working copy of a skin's vector markup
//!
//! The rasterizer needs to draw the same document many times with different
//! parts switched off. [`SourceTree`] keeps the parsed markup as a flat arena of
//! nodes in document order, each with a `hidden` flag, and writes it back out as
//! SVG text with hidden nodes suppressed.
//!
//! Only SVG content survives serialization: elements from foreign namespaces
//! (editor metadata and the like) and attributes from unknown namespaces are
//! kept for inspection but never written back.

use super::error::SkinError;

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// Elements that draw something and can therefore be switched off
const VISUAL_ELEMENTS: &[&str] = &[
    "a", "circle", "ellipse", "g", "image", "line", "path", "polygon", "polyline", "rect", "svg",
    "switch", "text", "use",
];

/// Index of a node inside a [`SourceTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone)]
enum NodeData {
    Element {
        name: String,
        attributes: Vec<Attribute>,
        foreign: bool,
    },
    Text(String),
}

#[derive(Debug, Clone)]
struct SourceNode {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    hidden: bool,
}

#[derive(Debug, Clone)]
pub struct SourceTree {
    nodes: Vec<SourceNode>,
}

impl SourceTree {
    /// Parses markup text into a tree rooted at the document element
    pub fn parse(text: &str) -> Result<Self, SkinError> {
        let options = roxmltree::ParsingOptions {
            allow_dtd: true,
            ..roxmltree::ParsingOptions::default()
        };
        let document = roxmltree::Document::parse_with_options(text, options)?;

        let mut tree = Self { nodes: Vec::new() };
        tree.append(document.root_element(), None);
        Ok(tree)
    }

    fn append(&mut self, node: roxmltree::Node<'_, '_>, parent: Option<NodeId>) {
        let data = if node.is_element() {
            let tag = node.tag_name();
            NodeData::Element {
                name: tag.name().to_owned(),
                attributes: node
                    .attributes()
                    .filter_map(|attr| {
                        qualified_name(attr.namespace(), attr.name()).map(|name| Attribute {
                            name,
                            value: attr.value().to_owned(),
                        })
                    })
                    .collect(),
                foreign: !matches!(tag.namespace(), None | Some(SVG_NS)),
            }
        } else if node.is_text() {
            NodeData::Text(node.text().unwrap_or_default().to_owned())
        } else {
            // comments and processing instructions
            return;
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(SourceNode {
            data,
            parent,
            children: Vec::new(),
            hidden: false,
        });
        if let Some(parent) = parent {
            self.nodes[parent.0].children.push(id);
        }

        for child in node.children() {
            self.append(child, Some(id));
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node ids in document (depth-first, pre-order) order
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len()).map(NodeId)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.0)
            .map(|node| node.children.as_slice())
            .unwrap_or_default()
    }

    /// Local element name, `None` for text nodes
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element { name, .. } => Some(name),
            NodeData::Text(_) => None,
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element { attributes, .. } => attributes
                .iter()
                .find(|attr| attr.name == name)
                .map(|attr| attr.value.as_str()),
            NodeData::Text(_) => None,
        }
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    pub fn attributes_mut(&mut self, id: NodeId) -> Option<&mut Vec<Attribute>> {
        match &mut self.nodes.get_mut(id.0)?.data {
            NodeData::Element { attributes, .. } => Some(attributes),
            NodeData::Text(_) => None,
        }
    }

    pub fn text_mut(&mut self, id: NodeId) -> Option<&mut String> {
        match &mut self.nodes.get_mut(id.0)?.data {
            NodeData::Text(text) => Some(text),
            NodeData::Element { .. } => None,
        }
    }

    /// Whether the node draws something of its own. The document root never
    /// counts, hiding it would hide everything.
    pub fn is_visual(&self, id: NodeId) -> bool {
        if id == self.root() {
            return false;
        }
        match self.nodes.get(id.0).map(|node| &node.data) {
            Some(NodeData::Element { name, foreign, .. }) => {
                !foreign && VISUAL_ELEMENTS.contains(&name.as_str())
            }
            _ => false,
        }
    }

    pub fn is_hidden(&self, id: NodeId) -> bool {
        self.nodes.get(id.0).is_some_and(|node| node.hidden)
    }

    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        if self.is_visual(id) {
            self.nodes[id.0].hidden = !visible;
        }
    }

    /// Applies visibility to `id` and every node below it
    pub fn set_visible_recursive(&mut self, id: NodeId, visible: bool) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            self.set_visible(current, visible);
            pending.extend_from_slice(self.children(current));
        }
    }

    /// Applies visibility to `id` and each of its ancestors
    pub fn set_visible_to_root(&mut self, id: NodeId, visible: bool) {
        let mut current = Some(id);
        while let Some(node) = current {
            self.set_visible(node, visible);
            current = self.parent(node);
        }
    }

    pub fn show_all(&mut self) {
        for node in &mut self.nodes {
            node.hidden = false;
        }
    }

    pub fn hide_all(&mut self) {
        self.set_visible_recursive(self.root(), false);
    }

    /// Writes the tree back out as standalone SVG markup
    pub fn to_svg_string(&self) -> String {
        let mut out = String::with_capacity(self.nodes.len() * 64);
        if !self.nodes.is_empty() {
            self.write_node(self.root(), &mut out);
        }
        out
    }

    fn write_node(&self, id: NodeId, out: &mut String) {
        let node = &self.nodes[id.0];
        let (name, attributes) = match &node.data {
            NodeData::Text(text) => {
                escape_into(text, false, out);
                return;
            }
            NodeData::Element { foreign: true, .. } => return,
            NodeData::Element {
                name, attributes, ..
            } => (name, attributes),
        };

        out.push('<');
        out.push_str(name);
        if id == self.root() {
            out.push_str(" xmlns=\"");
            out.push_str(SVG_NS);
            out.push_str("\" xmlns:xlink=\"");
            out.push_str(XLINK_NS);
            out.push('"');
        }

        let mut wrote_style = false;
        for attr in attributes {
            if node.hidden && attr.name == "display" {
                continue;
            }
            out.push(' ');
            out.push_str(&attr.name);
            out.push_str("=\"");
            escape_into(&attr.value, true, out);
            if node.hidden && attr.name == "style" {
                // A later declaration wins over an earlier `display:inline`
                out.push_str(";display:none");
                wrote_style = true;
            }
            out.push('"');
        }
        if node.hidden && !wrote_style {
            out.push_str(" style=\"display:none\"");
        }

        if node.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &node.children {
            self.write_node(*child, out);
        }
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}

fn qualified_name(namespace: Option<&str>, name: &str) -> Option<String> {
    match namespace {
        None | Some(SVG_NS) => Some(name.to_owned()),
        Some(XLINK_NS) => Some(format!("xlink:{name}")),
        Some(XML_NS) => Some(format!("xml:{name}")),
        Some(_) => None,
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
}
