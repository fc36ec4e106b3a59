use serde::Deserialize;

use crate::filter::HtmlFilterOverrides;
use crate::markdown::ConversionOptionsBuilder;

/// CSS selectors locating each piece of a source's pages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceSelectors {
    pub novel_title: String,
    pub novel_author: String,
    pub novel_cover: String,
    /// "Skip to last page" link on the chapter list.
    pub last_page_link: String,
    /// Items of the pagination list; the second to last one points at the
    /// last page when the skip link is missing.
    pub pagination_items: String,
    pub chapter_link: String,
    /// Looked up inside each chapter link.
    pub chapter_title: String,
    pub chapter_body: String,
    pub search_result: String,
    /// Looked up inside each search result.
    pub search_info: String,
}

/// Declarative description of one novel site.
///
/// URL templates use `{novel}` for the novel URL without a trailing slash,
/// `{page}` for a 1-based page number, `{home}` for the site root and
/// `{query}` for a search query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub base_urls: Vec<String>,
    pub search_url: String,
    pub chapter_list_url: String,
    /// First capture group is the page number, read from the last match.
    pub page_number_pattern: String,
    pub selectors: SourceSelectors,
    #[serde(default)]
    pub filter: HtmlFilterOverrides,
    #[serde(default)]
    pub conversion: ConversionOptionsBuilder,
}

impl SourceConfig {
    /// Built-in configuration for LightNovelPub and its mirrors.
    pub fn light_novel_pub() -> Self {
        Self {
            name: "LightNovelPub".to_string(),
            base_urls: vec![
                "https://www.lightnovelpub.com/".to_string(),
                "https://www.lightnovelworld.com/".to_string(),
            ],
            search_url: "{home}/search?title={query}".to_string(),
            chapter_list_url: "{novel}/chapters/page-{page}".to_string(),
            page_number_pattern: r"/page-(\d+)".to_string(),
            selectors: SourceSelectors {
                novel_title: ".novel-info .novel-title".to_string(),
                novel_author: ".author a[href*=\"/author/\"] span".to_string(),
                novel_cover: ".glass-background img".to_string(),
                last_page_link: ".PagedList-skipToLast a".to_string(),
                pagination_items: ".pagination li".to_string(),
                chapter_link: "ul.chapter-list li a".to_string(),
                chapter_title: ".chapter-title".to_string(),
                chapter_body: "#chapter-container".to_string(),
                search_result: ".novel-list .novel-item a".to_string(),
                search_info: ".novel-stats".to_string(),
            },
            filter: HtmlFilterOverrides {
                bad_css: vec![
                    ".adsbox".to_string(),
                    "p[class]".to_string(),
                    ".ad".to_string(),
                    "p:nth-child(1) > strong".to_string(),
                ],
                ..HtmlFilterOverrides::default()
            },
            conversion: ConversionOptionsBuilder::default(),
        }
    }

    pub fn chapter_list_page_url(&self, novel_url: &str, page: u32) -> String {
        self.chapter_list_url
            .replace("{novel}", novel_url.trim_end_matches('/'))
            .replace("{page}", &page.to_string())
    }

    /// `home_url` is the site root of the novel being crawled.
    pub fn search_page_url(&self, home_url: &str, query: &str) -> String {
        let query = query.trim().to_lowercase().replace(' ', "+");
        self.search_url
            .replace("{home}", home_url.trim_end_matches('/'))
            .replace("{query}", &query)
    }

    /// True when `url` lives on one of this source's hosts.
    pub fn handles(&self, url: &str) -> bool {
        let Some(host) = host_of(url) else {
            return false;
        };
        self.base_urls
            .iter()
            .filter_map(|base| host_of(base))
            .any(|base| base == host)
    }
}

fn host_of(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(host.trim_start_matches("www.").to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn templates_expand() {
        let source = SourceConfig::light_novel_pub();
        assert_eq!(
            source.chapter_list_page_url("https://www.lightnovelpub.com/novel/abc/", 3),
            "https://www.lightnovelpub.com/novel/abc/chapters/page-3"
        );
        assert_eq!(
            source.search_page_url("https://www.lightnovelpub.com/", "Martial Peak"),
            "https://www.lightnovelpub.com/search?title=martial+peak"
        );
    }

    #[test]
    fn handles_mirrors_with_or_without_www() {
        let source = SourceConfig::light_novel_pub();
        assert!(source.handles("https://lightnovelworld.com/novel/x"));
        assert!(source.handles("https://www.lightnovelpub.com/novel/x"));
        assert!(!source.handles("https://example.com/novel/x"));
        assert!(!source.handles("not a url"));
    }
}
