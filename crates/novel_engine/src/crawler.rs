//! Site crawling on top of a [`Scraper`]: novel metadata, paginated chapter
//! lists, chapter bodies and search, all driven by a [`SourceConfig`].

use std::sync::Arc;

use engine_logging::{engine_debug, engine_info};
use novel_core::{ChapterInfo, ChapterListInfo, NovelInfo, SearchHit};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::extract::extract_contents;
use crate::fetch::Scraper;
use crate::filter::{parse_selector, HtmlFilter, HtmlFilterConfig};
use crate::source::SourceConfig;
use crate::types::{ConfigError, CrawlError};

/// Site-specific operations the jobs rely on.
#[async_trait::async_trait]
pub trait SourceCrawler: Send + Sync {
    fn name(&self) -> &str;

    fn same_novel(&self, a: &str, b: &str) -> bool {
        novel_core::same_novel(a, b)
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CrawlError>;

    async fn novel_info(&self, novel_url: &str) -> Result<NovelInfo, CrawlError>;

    /// Reads page 1 of the chapter list and the number of pages.
    async fn chapter_list_info(&self, novel_url: &str) -> Result<ChapterListInfo, CrawlError>;

    /// Chapters on one 1-based page, numbered within that page.
    async fn chapter_list_page(
        &self,
        novel_url: &str,
        page: u32,
    ) -> Result<Vec<ChapterInfo>, CrawlError>;

    /// Extracted `<p>` paragraphs of a chapter, `None` when the page has no
    /// chapter body.
    async fn download_chapter(&self, chapter_url: &str) -> Result<Option<String>, CrawlError>;
}

#[derive(Debug)]
struct Selectors {
    novel_title: Selector,
    novel_author: Selector,
    novel_cover: Selector,
    last_page_link: Selector,
    pagination_items: Selector,
    chapter_link: Selector,
    chapter_title: Selector,
    chapter_body: Selector,
    search_result: Selector,
    search_info: Selector,
}

/// [`SourceCrawler`] driven entirely by a [`SourceConfig`].
pub struct SelectorCrawler {
    source: SourceConfig,
    selectors: Selectors,
    page_number: Regex,
    filter: HtmlFilter,
    scraper: Arc<dyn Scraper>,
}

impl SelectorCrawler {
    /// Compiles every selector, pattern and filter of `source`.
    pub fn new(source: SourceConfig, scraper: Arc<dyn Scraper>) -> Result<Self, ConfigError> {
        if source.base_urls.is_empty() {
            return Err(ConfigError::InvalidSource(format!(
                "source `{}` lists no base urls",
                source.name
            )));
        }
        let s = &source.selectors;
        let selectors = Selectors {
            novel_title: parse_selector(&s.novel_title)?,
            novel_author: parse_selector(&s.novel_author)?,
            novel_cover: parse_selector(&s.novel_cover)?,
            last_page_link: parse_selector(&s.last_page_link)?,
            pagination_items: parse_selector(&s.pagination_items)?,
            chapter_link: parse_selector(&s.chapter_link)?,
            chapter_title: parse_selector(&s.chapter_title)?,
            chapter_body: parse_selector(&s.chapter_body)?,
            search_result: parse_selector(&s.search_result)?,
            search_info: parse_selector(&s.search_info)?,
        };
        let page_number =
            Regex::new(&source.page_number_pattern).map_err(|err| ConfigError::InvalidRegex {
                pattern: source.page_number_pattern.clone(),
                source: err,
            })?;
        let filter = HtmlFilterConfig::default()
            .with_overrides(&source.filter)
            .compile()?;
        Ok(Self {
            source,
            selectors,
            page_number,
            filter,
            scraper,
        })
    }

    pub fn source(&self) -> &SourceConfig {
        &self.source
    }

    fn parse_novel_info(&self, html: &str, page_url: &str) -> NovelInfo {
        let document = Html::parse_document(html);
        let title = first_text(&document, &self.selectors.novel_title);
        let author = first_text(&document, &self.selectors.novel_author);
        let cover_url = document
            .select(&self.selectors.novel_cover)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(|src| absolute_url(src, page_url))
            .filter(|src| !src.is_empty());
        NovelInfo {
            title,
            author,
            cover_url,
        }
    }

    fn parse_chapters(&self, document: &Html, page_url: &str) -> Vec<ChapterInfo> {
        document
            .select(&self.selectors.chapter_link)
            .enumerate()
            .map(|(index, link)| {
                let title = link
                    .select(&self.selectors.chapter_title)
                    .next()
                    .map(normalized_text)
                    .unwrap_or_else(|| normalized_text(link));
                let url = absolute_url(link.value().attr("href").unwrap_or_default(), page_url);
                ChapterInfo {
                    id: index as u64 + 1,
                    title,
                    url,
                }
            })
            .collect()
    }

    /// Page count from the "skip to last" link, else from the second to last
    /// pagination item. Zero when neither yields a number.
    fn parse_page_count(&self, document: &Html) -> u32 {
        let last_page = document
            .select(&self.selectors.last_page_link)
            .next()
            .or_else(|| {
                let items: Vec<_> = document.select(&self.selectors.pagination_items).collect();
                match items.len() {
                    0 => None,
                    1 => Some(items[0]),
                    n => Some(items[n - 2]),
                }
            });
        last_page
            .and_then(|element| {
                let markup = element.html();
                self.page_number
                    .captures_iter(&markup)
                    .last()
                    .and_then(|caps| caps.get(1))
                    .and_then(|m| m.as_str().parse().ok())
            })
            .unwrap_or(0)
    }

    fn parse_chapter_list_info(&self, html: &str, page_url: &str) -> ChapterListInfo {
        let document = Html::parse_document(html);
        let chapters = self.parse_chapters(&document, page_url);
        let mut total_pages = self.parse_page_count(&document);
        if total_pages == 0 && !chapters.is_empty() {
            // Short lists come without any pagination.
            total_pages = 1;
        }
        ChapterListInfo {
            total_pages,
            first_page_chapters: (!chapters.is_empty()).then_some(chapters),
        }
    }

    fn parse_search(&self, html: &str, page_url: &str) -> Vec<SearchHit> {
        let document = Html::parse_document(html);
        let hits = document
            .select(&self.selectors.search_result)
            .map(|hit| {
                let title = hit
                    .value()
                    .attr("title")
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| normalized_text(hit));
                let info = hit
                    .select(&self.selectors.search_info)
                    .next()
                    .map(normalized_text)
                    .unwrap_or_default();
                SearchHit {
                    title,
                    url: absolute_url(hit.value().attr("href").unwrap_or_default(), page_url),
                    info,
                }
            })
            .collect();
        hits
    }

    fn parse_chapter_page(&self, html: &str, page_url: &str) -> Vec<ChapterInfo> {
        let document = Html::parse_document(html);
        self.parse_chapters(&document, page_url)
    }

    fn parse_chapter_body(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let body = document.select(&self.selectors.chapter_body).next()?;
        Some(extract_contents(body, &self.filter))
    }
}

#[async_trait::async_trait]
impl SourceCrawler for SelectorCrawler {
    fn name(&self) -> &str {
        &self.source.name
    }

    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, CrawlError> {
        let url = self
            .source
            .search_page_url(&self.source.base_urls[0], query);
        let html = self.scraper.load_page(&url).await?;
        let hits = self.parse_search(&html, &url);
        engine_info!("Search {:?} on {} found {} novels", query, self.name(), hits.len());
        Ok(hits)
    }

    async fn novel_info(&self, novel_url: &str) -> Result<NovelInfo, CrawlError> {
        engine_debug!("Reading novel info from {}", novel_url);
        let html = self.scraper.load_page(novel_url).await?;
        Ok(self.parse_novel_info(&html, novel_url))
    }

    async fn chapter_list_info(&self, novel_url: &str) -> Result<ChapterListInfo, CrawlError> {
        let url = self.source.chapter_list_page_url(novel_url, 1);
        let html = self.scraper.load_page(&url).await?;
        let info = self.parse_chapter_list_info(&html, &url);
        engine_debug!("Chapter list of {} has {} pages", novel_url, info.total_pages);
        Ok(info)
    }

    async fn chapter_list_page(
        &self,
        novel_url: &str,
        page: u32,
    ) -> Result<Vec<ChapterInfo>, CrawlError> {
        let url = self.source.chapter_list_page_url(novel_url, page);
        let html = self.scraper.load_page(&url).await?;
        Ok(self.parse_chapter_page(&html, &url))
    }

    async fn download_chapter(&self, chapter_url: &str) -> Result<Option<String>, CrawlError> {
        let html = self.scraper.load_page(chapter_url).await?;
        let body = self.parse_chapter_body(&html);
        if body.is_none() {
            engine_debug!("No chapter body at {}", chapter_url);
        }
        Ok(body)
    }
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(normalized_text)
        .filter(|text| !text.is_empty())
}

fn normalized_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Resolves a link found on `page_url`. Protocol-relative, root-relative and
/// page-relative references are supported; `data:` URLs, absolute URLs and
/// anything that cannot be resolved come back trimmed but unchanged.
pub fn absolute_url(raw: &str, page_url: &str) -> String {
    let url = raw.trim();
    if url.is_empty() || url.len() > 1000 || url.starts_with("data:") {
        return url.to_string();
    }
    Url::parse(page_url)
        .and_then(|base| base.join(url))
        .map(String::from)
        .unwrap_or_else(|_| url.to_string())
}
