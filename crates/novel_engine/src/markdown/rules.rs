use std::sync::LazyLock;

use regex::Regex;

use crate::dom::{Dom, NodeId};

use super::node::{is_blank, is_block};
use super::options::{
    CodeBlockStyle, ConversionOptions, HeadingStyle, LinkReferenceStyle, LinkStyle,
};

static ATTRIBUTE_NEWLINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\n+\s*)+").expect("attribute newline pattern"));

static LANGUAGE_CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"language-(\S+)").expect("language class pattern"));

/// State owned by a single `convert` call.
#[derive(Debug, Default)]
pub(crate) struct ConversionContext {
    references: Vec<String>,
}

impl ConversionContext {
    fn push_reference(&mut self, reference: String) -> usize {
        self.references.push(reference);
        self.references.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Rule {
    Blank,
    Paragraph,
    LineBreak,
    Heading,
    Blockquote,
    List,
    ListItem,
    IndentedCodeBlock,
    FencedCodeBlock,
    HorizontalRule,
    InlineLink,
    ReferenceLink,
    Emphasis,
    Strong,
    InlineCode,
    Image,
    Default,
}

/// Evaluation order. The first rule whose filter accepts an element wins;
/// `Default` accepts everything.
pub(crate) const RULES: [Rule; 17] = [
    Rule::Blank,
    Rule::Paragraph,
    Rule::LineBreak,
    Rule::Heading,
    Rule::Blockquote,
    Rule::List,
    Rule::ListItem,
    Rule::IndentedCodeBlock,
    Rule::FencedCodeBlock,
    Rule::HorizontalRule,
    Rule::InlineLink,
    Rule::ReferenceLink,
    Rule::Emphasis,
    Rule::Strong,
    Rule::InlineCode,
    Rule::Image,
    Rule::Default,
];

pub(crate) fn find_rule(dom: &Dom, id: NodeId, options: &ConversionOptions) -> Rule {
    RULES
        .into_iter()
        .find(|rule| rule.matches(dom, id, options))
        .unwrap_or(Rule::Default)
}

impl Rule {
    pub fn name(self) -> &'static str {
        match self {
            Rule::Blank => "blankReplacement",
            Rule::Paragraph => "paragraph",
            Rule::LineBreak => "br",
            Rule::Heading => "heading",
            Rule::Blockquote => "blockquote",
            Rule::List => "list",
            Rule::ListItem => "listItem",
            Rule::IndentedCodeBlock => "indentedCodeBlock",
            Rule::FencedCodeBlock => "fencedCodeBlock",
            Rule::HorizontalRule => "horizontalRule",
            Rule::InlineLink => "inlineLink",
            Rule::ReferenceLink => "referenceLink",
            Rule::Emphasis => "emphasis",
            Rule::Strong => "strong",
            Rule::InlineCode => "code",
            Rule::Image => "img",
            Rule::Default => "default",
        }
    }

    pub fn matches(self, dom: &Dom, id: NodeId, options: &ConversionOptions) -> bool {
        let Some(tag) = dom.tag(id) else {
            return false;
        };
        match self {
            Rule::Blank => is_blank(dom, id),
            Rule::Paragraph => tag == "p",
            Rule::LineBreak => tag == "br",
            Rule::Heading => heading_level(tag).is_some(),
            Rule::Blockquote => tag == "blockquote",
            Rule::List => tag == "ul" || tag == "ol",
            Rule::ListItem => tag == "li",
            Rule::IndentedCodeBlock => {
                options.code_block_style() == CodeBlockStyle::Indented && is_code_block(dom, id)
            }
            Rule::FencedCodeBlock => {
                options.code_block_style() == CodeBlockStyle::Fenced && is_code_block(dom, id)
            }
            Rule::HorizontalRule => tag == "hr",
            Rule::InlineLink => {
                options.link_style() == LinkStyle::Inlined && is_link(dom, id, tag)
            }
            Rule::ReferenceLink => {
                options.link_style() == LinkStyle::Referenced && is_link(dom, id, tag)
            }
            Rule::Emphasis => tag == "em" || tag == "i",
            Rule::Strong => tag == "strong" || tag == "b",
            Rule::InlineCode => tag == "code" && !is_code_block_child(dom, id),
            Rule::Image => tag == "img",
            Rule::Default => true,
        }
    }

    pub fn replacement(
        self,
        content: &str,
        dom: &Dom,
        id: NodeId,
        options: &ConversionOptions,
        ctx: &mut ConversionContext,
    ) -> String {
        match self {
            Rule::Blank => {
                if is_block(dom, id) {
                    "\n\n".to_string()
                } else {
                    String::new()
                }
            }
            Rule::Paragraph => format!("\n\n{content}\n\n"),
            Rule::LineBreak => format!("{}\n", options.br()),
            Rule::Heading => heading(content, dom.tag(id).and_then(heading_level), options),
            Rule::Blockquote => {
                let quoted = content
                    .trim_matches('\n')
                    .split('\n')
                    .map(|line| format!("> {line}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                format!("\n\n{quoted}\n\n")
            }
            Rule::List => {
                let continues_item = dom.parent(id).is_some_and(|parent| {
                    dom.is_tag(parent, "li") && dom.element_children(parent).last() == Some(id)
                });
                if continues_item {
                    format!("\n{content}")
                } else {
                    format!("\n\n{content}\n\n")
                }
            }
            Rule::ListItem => list_item(content, dom, id, options),
            Rule::IndentedCodeBlock => {
                let code = code_block_text(dom, id).replace('\n', "\n    ");
                format!("\n\n    {code}\n\n")
            }
            Rule::FencedCodeBlock => fenced_code_block(dom, id, options),
            Rule::HorizontalRule => format!("\n\n{}\n\n", options.hr()),
            Rule::InlineLink => {
                let href = dom.attr_or_empty(id, "href");
                let title = title_part(dom.attr_or_empty(id, "title"));
                format!("[{content}]({href}{title})")
            }
            Rule::ReferenceLink => reference_link(content, dom, id, options, ctx),
            Rule::Emphasis => delimited(content, options.em_delimiter()),
            Rule::Strong => delimited(content, options.strong_delimiter()),
            Rule::InlineCode => inline_code(content),
            Rule::Image => {
                let src = dom.attr_or_empty(id, "src");
                if src.is_empty() {
                    return String::new();
                }
                let alt = clean_attribute(dom.attr_or_empty(id, "alt"));
                let title = title_part(dom.attr_or_empty(id, "title"));
                format!("![{alt}]({src}{title})")
            }
            Rule::Default => {
                if is_block(dom, id) {
                    format!("\n\n{content}\n\n")
                } else {
                    content.to_string()
                }
            }
        }
    }

    /// Trailing output contributed once, after the whole document.
    pub fn append(self, ctx: &ConversionContext) -> Option<String> {
        match self {
            Rule::ReferenceLink if !ctx.references.is_empty() => {
                Some(format!("\n\n{}\n\n", ctx.references.join("\n")))
            }
            Rule::ReferenceLink => Some(String::new()),
            _ => None,
        }
    }
}

fn heading_level(tag: &str) -> Option<usize> {
    match tag.as_bytes() {
        [b'h', level @ b'1'..=b'6'] => Some(usize::from(level - b'0')),
        _ => None,
    }
}

fn heading(content: &str, level: Option<usize>, options: &ConversionOptions) -> String {
    let level = level.unwrap_or(1);
    if options.heading_style() == HeadingStyle::Setext && level < 3 {
        let mark = if level == 1 { "=" } else { "-" };
        let underline = mark.repeat(content.chars().count());
        format!("\n\n{content}\n{underline}\n\n")
    } else {
        format!("\n\n{} {content}\n\n", "#".repeat(level))
    }
}

fn list_item(content: &str, dom: &Dom, id: NodeId, options: &ConversionOptions) -> String {
    let mut body = content.trim_start_matches('\n').to_string();
    if body.ends_with('\n') {
        body.truncate(body.trim_end_matches('\n').len());
        body.push('\n');
    }
    let body = body.replace('\n', "\n    ");

    let parent = dom.parent(id);
    let prefix = match parent {
        Some(list) if dom.is_tag(list, "ol") => {
            let start = dom
                .attr(list, "start")
                .and_then(|value| value.trim().parse::<i64>().ok())
                .unwrap_or(1);
            let index = dom
                .element_children(list)
                .position(|child| child == id)
                .unwrap_or(0);
            format!("{}.  ", start.saturating_add(index as i64))
        }
        _ => format!("{}   ", options.bullet_list_marker()),
    };

    let separator = if dom.next_sibling(id).is_some() && !body.ends_with('\n') {
        "\n"
    } else {
        ""
    };
    format!("{prefix}{body}{separator}")
}

/// A `pre` whose first child node is a `code` element.
fn is_code_block(dom: &Dom, id: NodeId) -> bool {
    dom.is_tag(id, "pre")
        && dom
            .first_child(id)
            .is_some_and(|child| dom.is_tag(child, "code"))
}

fn is_code_block_child(dom: &Dom, id: NodeId) -> bool {
    let has_siblings = dom.previous_sibling(id).is_some() || dom.next_sibling(id).is_some();
    dom.parent(id).is_some_and(|parent| dom.is_tag(parent, "pre")) && !has_siblings
}

fn code_block_text(dom: &Dom, pre: NodeId) -> String {
    dom.first_child(pre)
        .map(|code| dom.text_content(code))
        .unwrap_or_default()
}

fn fenced_code_block(dom: &Dom, pre: NodeId, options: &ConversionOptions) -> String {
    let language = dom
        .first_child(pre)
        .and_then(|code| dom.attr(code, "class"))
        .and_then(|class| LANGUAGE_CLASS.captures(class))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_default();

    let mut code = code_block_text(dom, pre);
    let fence_char = options.fence_char();
    let fence_len = longest_run(&code, fence_char).saturating_add(1).max(3);
    let fence: String = std::iter::repeat(fence_char).take(fence_len).collect();
    if code.ends_with('\n') {
        code.pop();
    }
    format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
}

fn longest_run(text: &str, target: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for ch in text.chars() {
        if ch == target {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

fn is_link(dom: &Dom, id: NodeId, tag: &str) -> bool {
    tag == "a" && !dom.attr_or_empty(id, "href").is_empty()
}

fn clean_attribute(value: &str) -> String {
    ATTRIBUTE_NEWLINES.replace_all(value, "\n").into_owned()
}

fn title_part(raw_title: &str) -> String {
    let title = clean_attribute(raw_title);
    if title.is_empty() {
        title
    } else {
        format!(" \"{title}\"")
    }
}

fn reference_link(
    content: &str,
    dom: &Dom,
    id: NodeId,
    options: &ConversionOptions,
    ctx: &mut ConversionContext,
) -> String {
    let href = dom.attr_or_empty(id, "href");
    let title = title_part(dom.attr_or_empty(id, "title"));
    match options.link_reference_style() {
        LinkReferenceStyle::Collapsed => {
            ctx.push_reference(format!("[{content}]: {href}{title}"));
            format!("[{content}][]")
        }
        LinkReferenceStyle::Shortcut => {
            ctx.push_reference(format!("[{content}]: {href}{title}"));
            format!("[{content}]")
        }
        LinkReferenceStyle::Full => {
            let number = ctx.references.len() + 1;
            ctx.push_reference(format!("[{number}]: {href}{title}"));
            format!("[{content}][{number}]")
        }
    }
}

fn delimited(content: &str, delimiter: &str) -> String {
    if content.trim().is_empty() {
        String::new()
    } else {
        format!("{delimiter}{content}{delimiter}")
    }
}

fn inline_code(content: &str) -> String {
    if content.trim().is_empty() {
        return String::new();
    }
    let delimiter = "`".repeat(longest_run(content, '`') + 1);
    let leading = if content.starts_with('`') { " " } else { "" };
    let trailing = if content.ends_with('`') { " " } else { "" };
    format!("{delimiter}{leading}{content}{trailing}{delimiter}")
}
