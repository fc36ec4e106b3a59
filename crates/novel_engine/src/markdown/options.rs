use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use crate::types::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HeadingStyle {
    #[default]
    Setext,
    Atx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodeBlockStyle {
    #[default]
    Indented,
    Fenced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkStyle {
    #[default]
    Inlined,
    Referenced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkReferenceStyle {
    #[default]
    Full,
    Collapsed,
    Shortcut,
}

macro_rules! option_enum_from_str {
    ($ty:ident, $option:literal, { $($text:literal => $variant:ident),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ConfigError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value.trim().to_ascii_lowercase().as_str() {
                    $($text => Ok($ty::$variant),)+
                    _ => Err(ConfigError::InvalidOption {
                        option: $option,
                        value: value.to_string(),
                    }),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $($ty::$variant => f.write_str($text),)+
                }
            }
        }
    };
}

option_enum_from_str!(HeadingStyle, "heading_style", { "setext" => Setext, "atx" => Atx });
option_enum_from_str!(CodeBlockStyle, "code_block_style", {
    "indented" => Indented,
    "fenced" => Fenced,
});
option_enum_from_str!(LinkStyle, "link_style", {
    "inlined" => Inlined,
    "referenced" => Referenced,
});
option_enum_from_str!(LinkReferenceStyle, "link_reference_style", {
    "full" => Full,
    "collapsed" => Collapsed,
    "shortcut" => Shortcut,
});

/// Validated, immutable settings for [`super::MarkdownConverter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    br: String,
    hr: String,
    em_delimiter: String,
    strong_delimiter: String,
    bullet_list_marker: String,
    fence: String,
    heading_style: HeadingStyle,
    code_block_style: CodeBlockStyle,
    link_style: LinkStyle,
    link_reference_style: LinkReferenceStyle,
}

impl ConversionOptions {
    pub fn builder() -> ConversionOptionsBuilder {
        ConversionOptionsBuilder::default()
    }

    pub fn br(&self) -> &str {
        &self.br
    }

    pub fn hr(&self) -> &str {
        &self.hr
    }

    pub fn em_delimiter(&self) -> &str {
        &self.em_delimiter
    }

    pub fn strong_delimiter(&self) -> &str {
        &self.strong_delimiter
    }

    pub fn bullet_list_marker(&self) -> &str {
        &self.bullet_list_marker
    }

    pub fn fence(&self) -> &str {
        &self.fence
    }

    /// First character of the fence, the one counted when sizing fences.
    pub fn fence_char(&self) -> char {
        self.fence.chars().next().unwrap_or('`')
    }

    pub fn heading_style(&self) -> HeadingStyle {
        self.heading_style
    }

    pub fn code_block_style(&self) -> CodeBlockStyle {
        self.code_block_style
    }

    pub fn link_style(&self) -> LinkStyle {
        self.link_style
    }

    pub fn link_reference_style(&self) -> LinkReferenceStyle {
        self.link_reference_style
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        ConversionOptionsBuilder::default().into_options()
    }
}

/// Unvalidated option set. Also the shape accepted from configuration files,
/// where every field is optional.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ConversionOptionsBuilder {
    pub br: String,
    pub hr: String,
    pub em_delimiter: String,
    pub strong_delimiter: String,
    pub bullet_list_marker: String,
    pub fence: String,
    pub heading_style: HeadingStyle,
    pub code_block_style: CodeBlockStyle,
    pub link_style: LinkStyle,
    pub link_reference_style: LinkReferenceStyle,
}

impl Default for ConversionOptionsBuilder {
    fn default() -> Self {
        Self {
            br: "  ".to_string(),
            hr: "* * *".to_string(),
            em_delimiter: "_".to_string(),
            strong_delimiter: "**".to_string(),
            bullet_list_marker: "*".to_string(),
            fence: "```".to_string(),
            heading_style: HeadingStyle::default(),
            code_block_style: CodeBlockStyle::default(),
            link_style: LinkStyle::default(),
            link_reference_style: LinkReferenceStyle::default(),
        }
    }
}

impl ConversionOptionsBuilder {
    pub fn br(mut self, marker: impl Into<String>) -> Self {
        self.br = marker.into();
        self
    }

    pub fn hr(mut self, marker: impl Into<String>) -> Self {
        self.hr = marker.into();
        self
    }

    pub fn em_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.em_delimiter = delimiter.into();
        self
    }

    pub fn strong_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.strong_delimiter = delimiter.into();
        self
    }

    pub fn bullet_list_marker(mut self, marker: impl Into<String>) -> Self {
        self.bullet_list_marker = marker.into();
        self
    }

    pub fn fence(mut self, fence: impl Into<String>) -> Self {
        self.fence = fence.into();
        self
    }

    pub fn heading_style(mut self, style: HeadingStyle) -> Self {
        self.heading_style = style;
        self
    }

    pub fn code_block_style(mut self, style: CodeBlockStyle) -> Self {
        self.code_block_style = style;
        self
    }

    pub fn link_style(mut self, style: LinkStyle) -> Self {
        self.link_style = style;
        self
    }

    pub fn link_reference_style(mut self, style: LinkReferenceStyle) -> Self {
        self.link_reference_style = style;
        self
    }

    /// Rejects markers that would produce Markdown a reader cannot parse back.
    pub fn build(self) -> Result<ConversionOptions, ConfigError> {
        check("em_delimiter", &self.em_delimiter, &["_", "*"])?;
        check("strong_delimiter", &self.strong_delimiter, &["**", "__"])?;
        check("bullet_list_marker", &self.bullet_list_marker, &["*", "-", "+"])?;
        check("fence", &self.fence, &["```", "~~~"])?;
        if self.hr.trim().is_empty() {
            return Err(ConfigError::InvalidOption {
                option: "hr",
                value: self.hr,
            });
        }
        if !self.br.chars().all(|c| c == ' ' || c == '\\') {
            return Err(ConfigError::InvalidOption {
                option: "br",
                value: self.br,
            });
        }
        Ok(self.into_options())
    }

    fn into_options(self) -> ConversionOptions {
        ConversionOptions {
            br: self.br,
            hr: self.hr,
            em_delimiter: self.em_delimiter,
            strong_delimiter: self.strong_delimiter,
            bullet_list_marker: self.bullet_list_marker,
            fence: self.fence,
            heading_style: self.heading_style,
            code_block_style: self.code_block_style,
            link_style: self.link_style,
            link_reference_style: self.link_reference_style,
        }
    }
}

fn check(option: &'static str, value: &str, allowed: &[&str]) -> Result<(), ConfigError> {
    if allowed.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::InvalidOption {
            option,
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_turndown() {
        let options = ConversionOptions::default();
        assert_eq!(options.br(), "  ");
        assert_eq!(options.hr(), "* * *");
        assert_eq!(options.bullet_list_marker(), "*");
        assert_eq!(options.heading_style(), HeadingStyle::Setext);
        assert_eq!(options.code_block_style(), CodeBlockStyle::Indented);
        assert_eq!(options.link_reference_style(), LinkReferenceStyle::Full);
    }

    #[test]
    fn enum_options_parse_case_insensitively() {
        assert_eq!("ATX".parse::<HeadingStyle>().unwrap(), HeadingStyle::Atx);
        assert_eq!(
            "collapsed".parse::<LinkReferenceStyle>().unwrap(),
            LinkReferenceStyle::Collapsed
        );
        assert_eq!(LinkStyle::Referenced.to_string(), "referenced");
    }

    #[test]
    fn unknown_reference_style_fails_fast() {
        let err = "numbered".parse::<LinkReferenceStyle>().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOption { option: "link_reference_style", .. }
        ));
    }

    #[test]
    fn bad_markers_are_rejected_at_build_time() {
        assert!(ConversionOptions::builder().fence("''").build().is_err());
        assert!(ConversionOptions::builder().bullet_list_marker("o").build().is_err());
        assert!(ConversionOptions::builder().hr("  ").build().is_err());
        assert!(ConversionOptions::builder()
            .fence("~~~")
            .em_delimiter("*")
            .build()
            .is_ok());
    }
}
