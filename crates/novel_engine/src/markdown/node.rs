use crate::dom::{Dom, NodeId};

pub(crate) const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "command", "embed", "hr", "img", "input", "keygen", "link",
    "meta", "param", "source", "track", "wbr",
];

pub(crate) const MEANINGFUL_WHEN_BLANK_ELEMENTS: &[&str] = &[
    "a", "table", "thead", "tbody", "tfoot", "th", "td", "iframe", "script", "audio", "video",
];

pub(crate) const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas", "center", "dd",
    "dir", "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "frameset",
    "h1", "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "html", "isindex", "li",
    "main", "menu", "nav", "noframes", "noscript", "ol", "output", "p", "pre", "section",
    "table", "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

fn tag_in(dom: &Dom, id: NodeId, set: &[&str]) -> bool {
    dom.tag(id).is_some_and(|tag| set.contains(&tag))
}

pub(crate) fn is_void(dom: &Dom, id: NodeId) -> bool {
    tag_in(dom, id, VOID_ELEMENTS)
}

pub(crate) fn is_block(dom: &Dom, id: NodeId) -> bool {
    tag_in(dom, id, BLOCK_ELEMENTS)
}

pub(crate) fn is_meaningful_when_blank(dom: &Dom, id: NodeId) -> bool {
    tag_in(dom, id, MEANINGFUL_WHEN_BLANK_ELEMENTS)
}

pub(crate) fn is_pre(dom: &Dom, id: NodeId) -> bool {
    dom.is_tag(id, "pre")
}

/// Blank elements carry no visible content and can be dropped or replaced by
/// a paragraph break.
pub(crate) fn is_blank(dom: &Dom, id: NodeId) -> bool {
    !is_void(dom, id)
        && !is_meaningful_when_blank(dom, id)
        && dom.text_content(id).trim().is_empty()
        && !dom.has_descendant_tag(id, VOID_ELEMENTS)
        && !dom.has_descendant_tag(id, MEANINGFUL_WHEN_BLANK_ELEMENTS)
}

/// True when `id` is a `code` element or sits anywhere below one.
pub(crate) fn is_code(dom: &Dom, id: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(node) = current {
        if dom.is_tag(node, "code") {
            return true;
        }
        current = dom.parent(node);
    }
    false
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) struct FlankingWhitespace {
    pub leading: &'static str,
    pub trailing: &'static str,
}

impl FlankingWhitespace {
    pub fn is_empty(self) -> bool {
        self.leading.is_empty() && self.trailing.is_empty()
    }
}

/// Whitespace that has to move outside the delimiters of an inline element,
/// unless a neighbouring sibling already provides it.
pub(crate) fn flanking_whitespace(dom: &Dom, id: NodeId) -> FlankingWhitespace {
    if is_block(dom, id) {
        return FlankingWhitespace::default();
    }
    let content = dom.text_content(id);
    let has_leading = content.starts_with(char::is_whitespace);
    let has_trailing = content.ends_with(char::is_whitespace);
    let blank_with_spaces = has_leading && has_trailing && is_blank(dom, id);

    let mut flanks = FlankingWhitespace::default();
    if has_leading && !sibling_flanks(dom, dom.previous_sibling(id), |s| s.ends_with(' ')) {
        flanks.leading = " ";
    }
    if !blank_with_spaces
        && has_trailing
        && !sibling_flanks(dom, dom.next_sibling(id), |s| s.starts_with(' '))
    {
        flanks.trailing = " ";
    }
    flanks
}

fn sibling_flanks(dom: &Dom, sibling: Option<NodeId>, test: impl Fn(&str) -> bool) -> bool {
    match sibling {
        Some(node) => match dom.text(node) {
            Some(text) => test(text),
            None if dom.is_element(node) => test(&dom.text_content(node)),
            None => false,
        },
        None => false,
    }
}
