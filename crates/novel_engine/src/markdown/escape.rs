use std::sync::LazyLock;

use regex::Regex;

struct Escape {
    pattern: Regex,
    replacement: &'static str,
}

/// Applied in order. Anchored patterns only look at the start of the text
/// node, never at the start of inner lines.
static ESCAPES: LazyLock<Vec<Escape>> = LazyLock::new(|| {
    [
        (r"\\", r"\\"),
        (r"\*", r"\*"),
        (r"^-", r"\-"),
        (r"^\+ ", r"\+ "),
        (r"^(=+)", r"\$1"),
        (r"^(#{1,6}) ", r"\$1 "),
        (r"`", r"\`"),
        (r"^~~~", r"\~~~"),
        (r"\[", r"\["),
        (r"\]", r"\]"),
        (r"^>", r"\>"),
        (r"_", r"\_"),
        (r"^(\d+)\. ", r"$1\. "),
    ]
    .into_iter()
    .map(|(pattern, replacement)| Escape {
        pattern: Regex::new(pattern).expect("markdown escape pattern"),
        replacement,
    })
    .collect()
});

/// Backslash-escapes Markdown control characters in a text node.
pub(crate) fn escape_markdown(text: &str) -> String {
    let mut result = text.to_string();
    for escape in ESCAPES.iter() {
        if escape.pattern.is_match(&result) {
            result = escape
                .pattern
                .replace_all(&result, escape.replacement)
                .into_owned();
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_inline_control_characters() {
        assert_eq!(escape_markdown("*hi*"), r"\*hi\*");
        assert_eq!(escape_markdown("a_b [c] `d`"), r"a\_b \[c\] \`d\`");
        assert_eq!(escape_markdown(r"back\slash"), r"back\\slash");
    }

    #[test]
    fn escapes_line_start_markers_only_at_the_start() {
        assert_eq!(escape_markdown("- item"), r"\- item");
        assert_eq!(escape_markdown("a - b"), "a - b");
        assert_eq!(escape_markdown("+ plus"), r"\+ plus");
        assert_eq!(escape_markdown("== title"), r"\== title");
        assert_eq!(escape_markdown("## heading"), r"\## heading");
        assert_eq!(escape_markdown("####### seven"), "####### seven");
        assert_eq!(escape_markdown("~~~ fence"), r"\~~~ fence");
        assert_eq!(escape_markdown("> quote"), r"\> quote");
        assert_eq!(escape_markdown("1984. A year"), r"1984\. A year");
        assert_eq!(escape_markdown("in 1984. A year"), "in 1984. A year");
    }
}
