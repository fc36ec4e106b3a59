//! Collapses insignificant whitespace in a DOM subtree the way a browser
//! would render it, so that the rules only ever see meaningful spaces.
//!
//! Adapted from the `collapse-whitespace` algorithm by Luc Thevenard (MIT).

use crate::dom::{Dom, NodeId};

use super::node::{is_block, is_pre, is_void};

/// Mutates text nodes below `root` in place and removes the ones that end up
/// empty. Comments are removed as well. `pre` subtrees are left untouched.
pub(crate) fn collapse_whitespace(dom: &mut Dom, root: NodeId) {
    if dom.children(root).is_empty() || is_pre(dom, root) {
        return;
    }

    let mut prev_text: Option<NodeId> = None;
    let mut keep_leading = false;
    let mut prev: Option<NodeId> = None;
    let mut node = next_node(dom, prev, root);

    while let Some(current) = node {
        if current == root {
            break;
        }
        if let Some(raw) = dom.text(current) {
            let mut value = collapse_runs(raw);
            let prev_ends_with_space = match prev_text {
                Some(text_id) => dom.text(text_id).is_some_and(|t| t.ends_with(' ')),
                None => true,
            };
            if prev_ends_with_space && !keep_leading && value.starts_with(' ') {
                value.remove(0);
            }
            if value.is_empty() {
                node = remove(dom, current);
                continue;
            }
            dom.set_text(current, value);
            prev_text = Some(current);
            keep_leading = false;
        } else if dom.is_element(current) {
            if is_block(dom, current) || dom.is_tag(current, "br") {
                if let Some(text_id) = prev_text {
                    trim_trailing_space(dom, text_id);
                }
                prev_text = None;
                keep_leading = false;
            } else if is_void(dom, current) {
                // Inline void elements such as images keep the space after them.
                prev_text = None;
                keep_leading = true;
            }
        } else {
            node = remove(dom, current);
            continue;
        }
        let following = next_node(dom, prev, current);
        prev = Some(current);
        node = following;
    }

    if let Some(text_id) = prev_text {
        trim_trailing_space(dom, text_id);
        if dom.text(text_id).is_some_and(|t| t.trim().is_empty()) {
            dom.detach(text_id);
        }
    }
}

fn collapse_runs(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut in_run = false;
    for ch in raw.chars() {
        if matches!(ch, ' ' | '\r' | '\n' | '\t') {
            if !in_run {
                out.push(' ');
            }
            in_run = true;
        } else {
            out.push(ch);
            in_run = false;
        }
    }
    out
}

fn trim_trailing_space(dom: &mut Dom, text_id: NodeId) {
    let trimmed = dom
        .text(text_id)
        .and_then(|text| text.strip_suffix(' '))
        .map(str::to_string);
    if let Some(value) = trimmed {
        dom.set_text(text_id, value);
    }
}

/// Detaches `node` and returns where the walk continues: its next sibling,
/// else its parent.
fn remove(dom: &mut Dom, node: NodeId) -> Option<NodeId> {
    let following = dom.next_sibling(node).or_else(|| dom.parent(node));
    dom.detach(node);
    following
}

fn next_node(dom: &Dom, prev: Option<NodeId>, current: NodeId) -> Option<NodeId> {
    let returning_from_child = prev.is_some_and(|p| dom.parent(p) == Some(current));
    if returning_from_child || is_pre(dom, current) {
        return dom.next_sibling(current).or_else(|| dom.parent(current));
    }
    if let Some(child) = dom.first_child(current) {
        return Some(child);
    }
    dom.next_sibling(current).or_else(|| dom.parent(current))
}
