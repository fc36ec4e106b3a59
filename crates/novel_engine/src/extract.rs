//! Content extraction: turns a chapter container element into a flat list of
//! `<p>line<p>` paragraphs ready for the Markdown converter.
//!
//! Inline tags keep their name on both sides of the line (`<em>text<em>`),
//! not a closing `</em>`. Downstream parsing is tolerant of that shape and
//! chapters already stored depend on it.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

use crate::dom::{Dom, NodeId};
use crate::filter::{parse_selector, HtmlFilter};
use crate::types::ConfigError;

/// Marker separating lines while the body is linearized.
pub const LINE_SEP: &str = "<br>";

/// Control and format characters (soft hyphens, zero-width joiners, bidi
/// marks). Ordinary spaces are not in either class.
static NON_PRINTABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{Cc}\p{Cf}]").expect("non-printable pattern"));

/// Cleans `element` according to `filter` and linearizes it. The source
/// document is not modified.
pub fn extract_contents(element: ElementRef<'_>, filter: &HtmlFilter) -> String {
    let mut skip: HashSet<ego_tree::NodeId> = filter
        .bad_selectors()
        .iter()
        .flat_map(|selector| element.select(selector))
        .map(|bad| bad.id())
        .collect();
    skip.remove(&element.id());

    let mut dom = Dom::from_element(element, &skip);
    clean_contents(&mut dom, filter);

    let body = linearize(&dom, dom.root(), filter).join(" ");
    body.split(LINE_SEP)
        .map(str::trim)
        .filter(|line| !filter.is_blacklisted(line))
        .map(|line| format!("<p>{line}<p>"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parses `html`, finds the first element matching the CSS selector `css`
/// and extracts it. `Ok(None)` when nothing matches.
pub fn extract_from_html(
    html: &str,
    css: &str,
    filter: &HtmlFilter,
) -> Result<Option<String>, ConfigError> {
    let selector = parse_selector(css)?;
    let document = Html::parse_document(html);
    let extracted = document
        .select(&selector)
        .next()
        .map(|container| extract_contents(container, filter));
    Ok(extracted)
}

fn clean_contents(dom: &mut Dom, filter: &HtmlFilter) {
    let root = dom.root();
    for id in dom.descendants(root) {
        if !dom.is_element(id) {
            if dom.text(id).is_none() {
                dom.detach(id);
            }
            continue;
        }
        if dom.is_tag(id, "br") {
            if let Some(next) = dom.next_sibling(id).filter(|next| dom.is_tag(*next, "br")) {
                dom.detach(next);
            }
        } else if dom.tag(id).is_some_and(|tag| filter.is_bad_tag(tag)) {
            dom.detach(id);
        } else if dom.attr_count(id) > 0 {
            dom.retain_attrs(id, |name| name == "src");
        }
    }
    dom.retain_attrs(root, |_| false);
}

fn clean_text(raw: &str, filter: &HtmlFilter) -> String {
    let normalized = raw
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    let mut text = NON_PRINTABLE.replace_all(&normalized, "").into_owned();
    for (from, to) in filter.substitutions() {
        if text.contains(from.as_str()) {
            text = text.replace(from.as_str(), to);
        }
    }
    text
}

fn linearize(dom: &Dom, parent: NodeId, filter: &HtmlFilter) -> Vec<String> {
    let mut body: Vec<String> = Vec::new();

    for elem in dom.element_children(parent) {
        let name = dom.tag(elem).unwrap_or_default();
        if filter.is_unchanged(name) {
            body.push(dom.normalized_text(elem));
            continue;
        }
        if name == "hr" || name == "br" {
            body.push(LINE_SEP.to_string());
            continue;
        }

        // Own text first, then whatever the children produce.
        for &child in dom.children(elem) {
            if let Some(text) = dom.text(child) {
                body.push(clean_text(text, filter));
            }
        }

        let is_block = filter.is_block(name);
        let is_plain = filter.is_plain(name);
        let content = linearize(dom, elem, filter).join(" ");

        if is_block {
            body.push(LINE_SEP.to_string());
        }
        for raw_line in content.split(LINE_SEP) {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            if is_plain || is_block {
                body.push(line.to_string());
            } else {
                body.push(format!("<{name}>{line}<{name}>"));
            }
            body.push(LINE_SEP.to_string());
        }

        if !is_block && body.last().is_some_and(|last| last == LINE_SEP) {
            body.pop();
        }
    }

    for entry in &mut body {
        let trimmed = entry.trim();
        if trimmed.len() != entry.len() {
            *entry = trimmed.to_string();
        }
    }
    body
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::HtmlFilterConfig;

    #[test]
    fn invisible_characters_are_stripped() {
        let filter = HtmlFilterConfig::default().compile().unwrap();
        assert_eq!(
            clean_text("  zero\u{200b}width\u{feff} \u{7}bell\u{a0}kept ", &filter),
            "zerowidth bell\u{a0}kept"
        );
    }

    #[test]
    fn format_marks_vanish_but_letters_stay() {
        let filter = HtmlFilterConfig::default().compile().unwrap();
        assert_eq!(
            clean_text("co\u{ad}op \u{200e}\u{202e}caf\u{e9}\u{2066}", &filter),
            "coop caf\u{e9}"
        );
    }

    #[test]
    fn substitutions_apply_in_order() {
        let filter = HtmlFilterConfig::default().compile().unwrap();
        assert_eq!(
            clean_text("Tom\u{201d}s a & b u003cc", &filter),
            "Tom's a &amp; b &lt;c"
        );
    }
}
