//! Novel engine: HTML cleanup, Markdown conversion, crawling and the job
//! scheduler that ties them together.
mod crawler;
mod decode;
mod dom;
mod extract;
mod fetch;
mod filter;
mod job;
mod markdown;
mod persist;
mod repository;
mod scheduler;
mod source;
mod types;

pub use crawler::{absolute_url, SelectorCrawler, SourceCrawler};
pub use decode::{decode_html, DecodedHtml};
pub use extract::{extract_contents, extract_from_html, LINE_SEP};
pub use fetch::{FetchSettings, HttpScraper, Scraper};
pub use filter::{HtmlFilter, HtmlFilterConfig, HtmlFilterOverrides};
pub use job::{JobContext, NovelJob};
pub use markdown::{
    CodeBlockStyle, ConversionOptions, ConversionOptionsBuilder, Converter, HeadingStyle,
    LinkReferenceStyle, LinkStyle, MarkdownConverter,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use repository::NovelRepository;
pub use scheduler::NovelScheduler;
pub use source::{SourceConfig, SourceSelectors};
pub use types::{ConfigError, CrawlError, FailureKind, FetchMetadata, FetchOutput, ScrapeError};
