use std::collections::BTreeSet;

use regex::Regex;
use scraper::Selector;
use serde::Deserialize;

use crate::types::ConfigError;

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|item| item.to_string()).collect()
}

/// Tag and selector sets steering the content extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlFilterConfig {
    /// Elements removed together with their content.
    pub bad_tags: BTreeSet<String>,
    /// CSS selectors removed before anything else runs.
    pub bad_css: Vec<String>,
    /// Tags that start a new line.
    pub block_tags: BTreeSet<String>,
    /// Tags whose text is emitted as one unit, without looking inside.
    pub unchanged_tags: BTreeSet<String>,
    /// Inline tags emitted without their `<tag>` markers.
    pub plain_text_tags: BTreeSet<String>,
    /// Literal replacements applied to every text node, in order.
    pub substitutions: Vec<(String, String)>,
    /// Lines matching any of these are dropped from the output.
    pub blacklist_patterns: Vec<String>,
}

impl Default for HtmlFilterConfig {
    fn default() -> Self {
        Self {
            bad_tags: set(&[
                "noscript", "script", "style", "iframe", "ins", "header", "footer", "button",
                "input", "amp-auto-ads", "pirate", "figcaption", "address", "tfoot", "object",
                "video", "audio", "source", "nav", "output", "select", "textarea", "form", "map",
            ]),
            bad_css: [
                ".code-block",
                ".adsbygoogle",
                ".sharedaddy",
                ".inline-ad-slot",
                ".ads-middle",
                ".jp-relatedposts",
                ".ezoic-adpicker-ad",
                ".ezoic-ad-adaptive",
                ".ezoic-ad",
                ".cb_p6_patreon_button",
                "a[href*=\"patreon.com\"]",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            block_tags: set(&[
                "p", "h1", "h2", "h3", "h4", "h5", "h6", "main", "aside", "article", "div",
                "section",
            ]),
            unchanged_tags: set(&["pre", "canvas", "img"]),
            plain_text_tags: set(&["span", "a", "abbr", "acronym", "label", "time"]),
            substitutions: [
                ("\"s", "'s"),
                ("\u{201c}s", "'s"),
                ("\u{201d}s", "'s"),
                ("&", "&amp;"),
                ("u003c", "<"),
                ("u003e", ">"),
                ("<", "&lt;"),
                (">", "&gt;"),
            ]
            .iter()
            .map(|(from, to)| (from.to_string(), to.to_string()))
            .collect(),
            blacklist_patterns: Vec::new(),
        }
    }
}

/// Per-source additions to [`HtmlFilterConfig::default`]. Every list only
/// ever adds entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HtmlFilterOverrides {
    pub bad_tags: Vec<String>,
    pub bad_css: Vec<String>,
    pub block_tags: Vec<String>,
    pub unchanged_tags: Vec<String>,
    pub plain_text_tags: Vec<String>,
    pub substitutions: Vec<(String, String)>,
    pub blacklist_patterns: Vec<String>,
}

impl HtmlFilterConfig {
    /// Merges `overrides` into this set. A substitution whose key already
    /// exists replaces the old value in place, keeping its position.
    pub fn with_overrides(mut self, overrides: &HtmlFilterOverrides) -> Self {
        self.bad_tags.extend(overrides.bad_tags.iter().cloned());
        for css in &overrides.bad_css {
            if !self.bad_css.contains(css) {
                self.bad_css.push(css.clone());
            }
        }
        self.block_tags.extend(overrides.block_tags.iter().cloned());
        self.unchanged_tags
            .extend(overrides.unchanged_tags.iter().cloned());
        self.plain_text_tags
            .extend(overrides.plain_text_tags.iter().cloned());
        for (from, to) in &overrides.substitutions {
            match self.substitutions.iter_mut().find(|(key, _)| key == from) {
                Some(existing) => existing.1 = to.clone(),
                None => self.substitutions.push((from.clone(), to.clone())),
            }
        }
        self.blacklist_patterns
            .extend(overrides.blacklist_patterns.iter().cloned());
        self
    }

    /// Parses every selector and pattern up front.
    pub fn compile(&self) -> Result<HtmlFilter, ConfigError> {
        let bad_selectors = self
            .bad_css
            .iter()
            .map(|css| parse_selector(css))
            .collect::<Result<Vec<_>, _>>()?;
        let blacklist = self
            .blacklist_patterns
            .iter()
            .map(|pattern| {
                Regex::new(pattern).map_err(|source| ConfigError::InvalidRegex {
                    pattern: pattern.clone(),
                    source,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(HtmlFilter {
            config: self.clone(),
            bad_selectors,
            blacklist,
        })
    }
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector, ConfigError> {
    Selector::parse(css).map_err(|err| ConfigError::InvalidSelector {
        selector: css.to_string(),
        message: err.to_string(),
    })
}

/// Compiled form of [`HtmlFilterConfig`], fixed for one crawl session.
#[derive(Debug, Clone)]
pub struct HtmlFilter {
    config: HtmlFilterConfig,
    bad_selectors: Vec<Selector>,
    blacklist: Vec<Regex>,
}

impl HtmlFilter {
    pub(crate) fn bad_selectors(&self) -> &[Selector] {
        &self.bad_selectors
    }

    pub(crate) fn is_bad_tag(&self, tag: &str) -> bool {
        self.config.bad_tags.contains(tag)
    }

    pub(crate) fn is_block(&self, tag: &str) -> bool {
        self.config.block_tags.contains(tag)
    }

    pub(crate) fn is_unchanged(&self, tag: &str) -> bool {
        self.config.unchanged_tags.contains(tag)
    }

    pub(crate) fn is_plain(&self, tag: &str) -> bool {
        self.config.plain_text_tags.contains(tag)
    }

    pub(crate) fn substitutions(&self) -> &[(String, String)] {
        &self.config.substitutions
    }

    /// Empty lines always count as blacklisted.
    pub(crate) fn is_blacklisted(&self, line: &str) -> bool {
        line.is_empty() || self.blacklist.iter().any(|re| re.is_match(line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_compiles() {
        let filter = HtmlFilterConfig::default().compile().unwrap();
        assert!(filter.is_bad_tag("script"));
        assert!(filter.is_block("div"));
        assert!(filter.is_plain("span"));
        assert!(filter.is_unchanged("pre"));
        assert_eq!(filter.bad_selectors().len(), 11);
    }

    #[test]
    fn overrides_are_additive() {
        let overrides = HtmlFilterOverrides {
            bad_tags: vec!["aside".into()],
            bad_css: vec![".adsbox".into(), ".ezoic-ad".into()],
            substitutions: vec![("&".into(), "and".into()), ("--".into(), "\u{2014}".into())],
            blacklist_patterns: vec!["(?i)translator".into()],
            ..HtmlFilterOverrides::default()
        };
        let config = HtmlFilterConfig::default().with_overrides(&overrides);
        assert!(config.bad_tags.contains("aside"));
        assert!(config.bad_tags.contains("script"));
        assert_eq!(config.bad_css.len(), 12);
        assert_eq!(config.substitutions[3], ("&".to_string(), "and".to_string()));
        assert_eq!(config.substitutions.len(), 9);

        let filter = config.compile().unwrap();
        assert!(filter.is_blacklisted("Translator: someone"));
        assert!(filter.is_blacklisted(""));
        assert!(!filter.is_blacklisted("Chapter text"));
    }

    #[test]
    fn bad_selector_fails_at_compile_time() {
        let config = HtmlFilterConfig {
            bad_css: vec!["p[".into()],
            ..HtmlFilterConfig::default()
        };
        let err = config.compile().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSelector { .. }));
    }

    #[test]
    fn bad_blacklist_pattern_fails_at_compile_time() {
        let config = HtmlFilterConfig {
            blacklist_patterns: vec!["(unclosed".into()],
            ..HtmlFilterConfig::default()
        };
        assert!(matches!(
            config.compile().unwrap_err(),
            ConfigError::InvalidRegex { .. }
        ));
    }
}
