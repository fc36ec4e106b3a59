//! Owned, mutable arena copy of a parsed HTML subtree.
//!
//! `scraper` does the parsing; the extractor and the Markdown converter need to
//! remove nodes, rewrite text and strip attributes, so the relevant subtree is
//! copied into a flat `Vec` where parents and children are plain indices.
//! Detached nodes stay in the arena but are unreachable from the root.

use std::collections::HashSet;

use ego_tree::NodeRef;
use scraper::node::Node;
use scraper::{ElementRef, Html};

pub type NodeId = usize;

/// Tag of the synthetic element wrapping converter input.
const WRAPPER_TAG: &str = "x-copydown";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct DomNode {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<DomNode>,
    root: NodeId,
}

impl Dom {
    /// Parses `fragment` inside a single wrapper element so the parser cannot
    /// hoist top-level siblings into `<head>`.
    pub fn parse_wrapped(fragment: &str) -> Dom {
        let document = Html::parse_document(&format!(
            "<{WRAPPER_TAG} id=\"copydown-root\">{fragment}</{WRAPPER_TAG}>"
        ));
        let wrapper = document
            .root_element()
            .descendants()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == WRAPPER_TAG);
        match wrapper {
            Some(element) => Dom::from_element(element, &HashSet::new()),
            None => Dom::empty(WRAPPER_TAG),
        }
    }

    /// Copies `element` and its subtree, leaving out every node in `skip`
    /// together with its descendants.
    pub fn from_element(element: ElementRef<'_>, skip: &HashSet<ego_tree::NodeId>) -> Dom {
        let mut dom = Dom {
            nodes: Vec::new(),
            root: 0,
        };
        if let Some(root) = dom.copy_subtree(*element, None, skip) {
            dom.root = root;
        }
        dom
    }

    fn empty(tag: &str) -> Dom {
        Dom {
            nodes: vec![DomNode {
                kind: NodeKind::Element(ElementData {
                    name: tag.to_string(),
                    attrs: Vec::new(),
                }),
                parent: None,
                children: Vec::new(),
            }],
            root: 0,
        }
    }

    fn copy_subtree(
        &mut self,
        node: NodeRef<'_, Node>,
        parent: Option<NodeId>,
        skip: &HashSet<ego_tree::NodeId>,
    ) -> Option<NodeId> {
        if skip.contains(&node.id()) {
            return None;
        }
        let kind = match node.value() {
            Node::Element(el) => NodeKind::Element(ElementData {
                name: el.name().to_ascii_lowercase(),
                attrs: el
                    .attrs()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
            }),
            Node::Text(text) => NodeKind::Text(text.to_string()),
            Node::Comment(comment) => NodeKind::Comment(comment.to_string()),
            _ => return None,
        };
        let id = self.nodes.len();
        self.nodes.push(DomNode {
            kind,
            parent,
            children: Vec::new(),
        });
        for child in node.children() {
            if let Some(child_id) = self.copy_subtree(child, Some(id), skip) {
                self.nodes[id].children.push(child_id);
            }
        }
        Some(id)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Lowercase tag name, `None` for text and comments.
    pub fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element(el) => Some(el.name.as_str()),
            _ => None,
        }
    }

    pub fn is_tag(&self, id: NodeId, name: &str) -> bool {
        self.tag(id) == Some(name)
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id].kind, NodeKind::Element(_))
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Attribute value; missing attributes read as `None`.
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes[id].kind {
            NodeKind::Element(el) => el
                .attrs
                .iter()
                .find(|(key, _)| key == name)
                .map(|(_, value)| value.as_str()),
            _ => None,
        }
    }

    /// Attribute value or the empty string.
    pub fn attr_or_empty(&self, id: NodeId, name: &str) -> &str {
        self.attr(id, name).unwrap_or("")
    }

    pub fn attr_count(&self, id: NodeId) -> usize {
        match &self.nodes[id].kind {
            NodeKind::Element(el) => el.attrs.len(),
            _ => 0,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .filter(move |child| self.is_element(*child))
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id].children.first().copied()
    }

    fn sibling_offset(&self, id: NodeId, offset: isize) -> Option<NodeId> {
        let parent = self.nodes[id].parent?;
        let siblings = &self.nodes[parent].children;
        let index = siblings.iter().position(|child| *child == id)?;
        let target = index.checked_add_signed(offset)?;
        siblings.get(target).copied()
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_offset(id, 1)
    }

    pub fn previous_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.sibling_offset(id, -1)
    }

    /// Concatenation of every descendant text node, like DOM `textContent`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        match &self.nodes[id].kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element(_) => {
                for child in &self.nodes[id].children {
                    self.collect_text(*child, out);
                }
            }
            NodeKind::Comment(_) => {}
        }
    }

    /// Text content with whitespace runs collapsed to one space and trimmed.
    pub fn normalized_text(&self, id: NodeId) -> String {
        self.text_content(id)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Every node below `id` in document order, `id` itself excluded.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.nodes[id].children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.nodes[next].children.iter().rev().copied());
        }
        out
    }

    pub fn has_descendant_tag(&self, id: NodeId, tags: &[&str]) -> bool {
        self.descendants(id)
            .into_iter()
            .any(|node| self.tag(node).is_some_and(|tag| tags.contains(&tag)))
    }

    pub fn set_text(&mut self, id: NodeId, value: String) {
        if let NodeKind::Text(text) = &mut self.nodes[id].kind {
            *text = value;
        }
    }

    /// Unlinks `id` from its parent. The subtree below it is kept intact.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id].parent.take() {
            self.nodes[parent].children.retain(|child| *child != id);
        }
    }

    pub fn retain_attrs(&mut self, id: NodeId, keep: impl Fn(&str) -> bool) {
        if let NodeKind::Element(el) = &mut self.nodes[id].kind {
            el.attrs.retain(|(name, _)| keep(name));
        }
    }
}
