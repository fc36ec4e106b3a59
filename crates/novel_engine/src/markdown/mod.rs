//! Rule-based HTML to Markdown conversion.
//!
//! A port of the turndown approach: whitespace is collapsed first, every
//! element is converted bottom-up by the first matching [`rules::Rule`], and
//! fragments are joined so that no boundary carries more than one blank line.

mod escape;
mod node;
mod options;
mod rules;
mod whitespace;

use engine_logging::engine_trace;

use crate::dom::{Dom, NodeId};

use escape::escape_markdown;
use node::{flanking_whitespace, is_code};
use rules::{find_rule, ConversionContext, RULES};
use whitespace::collapse_whitespace;

pub use options::{
    CodeBlockStyle, ConversionOptions, ConversionOptionsBuilder, HeadingStyle,
    LinkReferenceStyle, LinkStyle,
};

/// Anything that turns an HTML fragment into Markdown text.
pub trait Converter: Send + Sync {
    fn to_markdown(&self, html: &str) -> String;
}

/// Stateless between calls, so one instance can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct MarkdownConverter {
    options: ConversionOptions,
}

impl MarkdownConverter {
    pub fn new(options: ConversionOptions) -> Self {
        Self { options }
    }

    pub fn convert(&self, html: &str) -> String {
        let mut dom = Dom::parse_wrapped(html);
        let root = dom.root();
        collapse_whitespace(&mut dom, root);

        let mut ctx = ConversionContext::default();
        let mut output = self.process(&dom, root, &mut ctx);
        for rule in RULES {
            if let Some(tail) = rule.append(&ctx) {
                join_into(&mut output, &tail);
            }
        }
        output
            .trim_start_matches(['\t', '\n', '\r'])
            .trim_end()
            .to_string()
    }

    fn process(&self, dom: &Dom, parent: NodeId, ctx: &mut ConversionContext) -> String {
        let mut result = String::new();
        for &child in dom.children(parent) {
            let replacement = if let Some(text) = dom.text(child) {
                if is_code(dom, child) {
                    text.to_string()
                } else {
                    escape_markdown(text)
                }
            } else if dom.is_element(child) {
                self.replacement_for_element(dom, child, ctx)
            } else {
                String::new()
            };
            join_into(&mut result, &replacement);
        }
        result
    }

    fn replacement_for_element(
        &self,
        dom: &Dom,
        id: NodeId,
        ctx: &mut ConversionContext,
    ) -> String {
        let mut content = self.process(dom, id, ctx);
        let flanks = flanking_whitespace(dom, id);
        if !flanks.is_empty() {
            content = content.trim().to_string();
        }
        let rule = find_rule(dom, id, &self.options);
        engine_trace!("<{}> converted by {}", dom.tag(id).unwrap_or_default(), rule.name());
        let replaced = rule.replacement(&content, dom, id, &self.options, ctx);
        format!("{}{replaced}{}", flanks.leading, flanks.trailing)
    }
}

impl Converter for MarkdownConverter {
    fn to_markdown(&self, html: &str) -> String {
        self.convert(html)
    }
}

/// Appends `right` to `acc`, replacing the newlines on both sides of the seam
/// with `min(2, max(left, right))` newlines.
fn join_into(acc: &mut String, right: &str) {
    let kept = acc.trim_end_matches('\n').len();
    let trailing = acc.len() - kept;
    let body = right.trim_start_matches('\n');
    let leading = right.len() - body.len();

    acc.truncate(kept);
    for _ in 0..trailing.max(leading).min(2) {
        acc.push('\n');
    }
    acc.push_str(body);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joined(left: &str, right: &str) -> String {
        let mut acc = left.to_string();
        join_into(&mut acc, right);
        acc
    }

    #[test]
    fn join_keeps_at_most_one_blank_line() {
        assert_eq!(joined("a\n\n\n\n", "\n\nb"), "a\n\nb");
        assert_eq!(joined("a\n", "b"), "a\nb");
        assert_eq!(joined("a", "\n\n\nb"), "a\n\nb");
        assert_eq!(joined("", "\n\nb"), "\n\nb");
        assert_eq!(joined("a", ""), "a");
    }

    #[test]
    fn empty_input_converts_to_empty_output() {
        let converter = MarkdownConverter::default();
        assert_eq!(converter.convert(""), "");
        assert_eq!(converter.convert(&converter.convert("")), "");
    }
}
