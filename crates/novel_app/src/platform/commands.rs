use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context};
use engine_logging::{engine_info, engine_warn};
use novel_core::{ChapterId, JobKind, NovelId, NovelRef, SearchHit};
use novel_engine::{
    decode_html, extract_from_html, CodeBlockStyle, ConversionOptionsBuilder, FetchSettings,
    HeadingStyle, HtmlFilterConfig, HttpScraper, JobContext, LinkReferenceStyle, LinkStyle,
    MarkdownConverter, NovelJob, NovelScheduler, SelectorCrawler, SourceCrawler,
};
use tokio::runtime::Runtime;

use super::repository::{FileRepository, Tally};
use super::source_file::{load_ron, load_source};

/// Option values given on the command line; they win over the options file.
#[derive(Debug, Default, Clone)]
pub(crate) struct StyleOverrides {
    pub heading_style: Option<HeadingStyle>,
    pub code_block_style: Option<CodeBlockStyle>,
    pub link_style: Option<LinkStyle>,
    pub link_reference_style: Option<LinkReferenceStyle>,
}

impl StyleOverrides {
    fn apply(&self, mut builder: ConversionOptionsBuilder) -> ConversionOptionsBuilder {
        if let Some(style) = self.heading_style {
            builder = builder.heading_style(style);
        }
        if let Some(style) = self.code_block_style {
            builder = builder.code_block_style(style);
        }
        if let Some(style) = self.link_style {
            builder = builder.link_style(style);
        }
        if let Some(style) = self.link_reference_style {
            builder = builder.link_reference_style(style);
        }
        builder
    }
}

/// What a crawl left on disk.
#[derive(Debug)]
pub(crate) struct CrawlSummary {
    pub novel: NovelRef,
    pub directory: PathBuf,
    pub listed: usize,
    pub stored: usize,
    pub chapter_jobs: Tally,
}

fn read_html(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(decode_html(&bytes, None).html)
}

/// Converts an HTML file to Markdown.
pub(crate) fn convert(
    file: &Path,
    options_file: Option<&Path>,
    overrides: &StyleOverrides,
) -> anyhow::Result<String> {
    let builder = match options_file {
        Some(path) => load_ron(path)?,
        None => ConversionOptionsBuilder::default(),
    };
    let converter = MarkdownConverter::new(overrides.apply(builder).build()?);
    Ok(converter.convert(&read_html(file)?))
}

/// Runs the content extractor over the element of `file` matching
/// `selector`. Returns the `<p>` paragraphs when `keep_html` is set,
/// Markdown otherwise.
pub(crate) fn extract(
    file: &Path,
    selector: &str,
    source_file: Option<&Path>,
    keep_html: bool,
) -> anyhow::Result<String> {
    let source = load_source(source_file)?;
    let filter = HtmlFilterConfig::default()
        .with_overrides(&source.filter)
        .compile()?;
    let html = read_html(file)?;
    let Some(extracted) = extract_from_html(&html, selector, &filter)? else {
        bail!("nothing in {} matches `{}`", file.display(), selector);
    };
    if keep_html {
        return Ok(extracted);
    }
    let converter = MarkdownConverter::new(source.conversion.build()?);
    Ok(converter.convert(&extracted))
}

fn http_crawler(source_file: Option<&Path>) -> anyhow::Result<SelectorCrawler> {
    let source = load_source(source_file)?;
    let scraper = Arc::new(HttpScraper::new(FetchSettings::default()));
    Ok(SelectorCrawler::new(source, scraper)?)
}

pub(crate) fn search(
    runtime: &Runtime,
    query: &str,
    source_file: Option<&Path>,
) -> anyhow::Result<Vec<SearchHit>> {
    let crawler = http_crawler(source_file)?;
    Ok(runtime.block_on(crawler.search(query))?)
}

/// Downloads metadata, the chapter list and every chapter not yet stored
/// below `out_dir`.
pub(crate) fn crawl(
    runtime: &Runtime,
    novel_url: &str,
    out_dir: &Path,
    source_file: Option<&Path>,
) -> anyhow::Result<CrawlSummary> {
    let crawler = Arc::new(http_crawler(source_file)?);
    if !crawler.source().handles(novel_url) {
        engine_warn!("{} is not a {} url, crawling anyway", novel_url, crawler.name());
    }
    let options = crawler.source().conversion.clone().build()?;

    let repository = Arc::new(FileRepository::open(out_dir)?);
    let novel = repository.novel_for_url(novel_url, |a, b| crawler.same_novel(a, b))?;

    let ctx = JobContext {
        crawler,
        repository: repository.clone(),
        converter: Arc::new(MarkdownConverter::new(options)),
    };
    let scheduler = NovelScheduler::new(ctx, runtime.handle().clone());
    scheduler.set_active_novel(Some(novel.id));

    scheduler.schedule(NovelJob::novel_info(novel.clone()));
    scheduler.schedule(NovelJob::chapter_list(novel.clone()));
    runtime.block_on(scheduler.wait_idle());

    let novel = NovelRef {
        title: repository.title(novel.id).unwrap_or(novel.title),
        ..novel
    };
    let chapters = repository.chapters(novel.id);
    let mut queued = 0usize;
    for chapter in chapters.iter().filter(|c| !repository.has_chapter(novel.id, c.id)) {
        scheduler.enqueue(NovelJob::chapter(novel.clone(), chapter.clone()));
        queued += 1;
    }
    engine_info!(
        "{}: {} chapters listed, {} to download",
        novel.title,
        chapters.len(),
        queued
    );
    runtime.block_on(scheduler.drain());

    let stored = chapters
        .iter()
        .filter(|c| repository.has_chapter(novel.id, c.id))
        .count();
    Ok(CrawlSummary {
        directory: out_dir.join(novel.id.to_string()),
        novel,
        listed: chapters.len(),
        stored,
        chapter_jobs: repository.tally(JobKind::ChapterContent),
    })
}

/// Stored text of one chapter, or the placeholder when it is missing.
pub(crate) fn read_chapter(
    out_dir: &Path,
    novel_id: NovelId,
    chapter_id: ChapterId,
) -> anyhow::Result<String> {
    let repository = FileRepository::open(out_dir)?;
    Ok(repository.read_chapter(novel_id, chapter_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::repository::NOT_DOWNLOADED;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn convert_applies_command_line_styles() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "page.html", b"<h1>Title</h1><p>Body</p>");
        let overrides = StyleOverrides {
            heading_style: Some(HeadingStyle::Atx),
            ..StyleOverrides::default()
        };
        assert_eq!(
            convert(&file, None, &overrides).unwrap(),
            "# Title\n\nBody"
        );
    }

    #[test]
    fn convert_reads_options_file() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "page.html", b"<ul><li>one</li></ul>");
        let options = write(&dir, "options.ron", b"(bullet_list_marker: \"+\")");
        assert_eq!(
            convert(&file, Some(&options), &StyleOverrides::default()).unwrap(),
            "+   one"
        );
    }

    #[test]
    fn convert_decodes_legacy_files() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "latin.html",
            b"<meta charset=\"windows-1252\"><p>caf\xe9</p>",
        );
        assert_eq!(
            convert(&file, None, &StyleOverrides::default()).unwrap(),
            "caf\u{e9}"
        );
    }

    #[test]
    fn extract_keeps_markers_or_converts() {
        let dir = TempDir::new().unwrap();
        let file = write(
            &dir,
            "chapter.html",
            b"<div id=\"chapter-container\"><p>One</p><p class=\"ad\">ad</p><p>Two</p></div>",
        );
        assert_eq!(
            extract(&file, "#chapter-container", None, true).unwrap(),
            "<p>One<p>\n<p>Two<p>"
        );
        assert_eq!(
            extract(&file, "#chapter-container", None, false).unwrap(),
            "One\n\nTwo"
        );
    }

    #[test]
    fn extract_without_match_fails() {
        let dir = TempDir::new().unwrap();
        let file = write(&dir, "chapter.html", b"<p>none</p>");
        let err = extract(&file, "#chapter-container", None, false).unwrap_err();
        assert!(err.to_string().contains("#chapter-container"));
    }

    #[test]
    fn reading_a_missing_chapter_gives_the_placeholder() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_chapter(dir.path(), 1, 1).unwrap(), NOT_DOWNLOADED);
    }
}
