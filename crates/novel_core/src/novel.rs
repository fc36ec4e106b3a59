use url::Url;

pub type NovelId = i64;
pub type ChapterId = u64;

/// Identity of a novel as seen by jobs. Never carries mutable library state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NovelRef {
    pub id: NovelId,
    pub url: String,
    pub title: String,
}

impl NovelRef {
    pub fn new(id: NovelId, url: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id,
            url: url.into(),
            title: title.into(),
        }
    }
}

/// Metadata scraped from a novel's landing page. Every field may be missing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NovelInfo {
    pub title: Option<String>,
    pub author: Option<String>,
    pub cover_url: Option<String>,
}

impl NovelInfo {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.cover_url.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterInfo {
    pub id: ChapterId,
    pub title: String,
    pub url: String,
}

/// Result of reading the first chapter-list page of a novel.
///
/// `total_pages == 0` means the list could not be read at all.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChapterListInfo {
    pub total_pages: u32,
    pub first_page_chapters: Option<Vec<ChapterInfo>>,
}

/// One entry of a source search result page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub url: String,
    pub info: String,
}

/// True when both URLs point at the same novel: same host (ignoring `www.`)
/// and same path (ignoring a trailing slash). Query and fragment are ignored.
pub fn same_novel(a: &str, b: &str) -> bool {
    match (novel_key(a), novel_key(b)) {
        (Some(left), Some(right)) => left == right,
        _ => a.trim() == b.trim(),
    }
}

fn novel_key(raw: &str) -> Option<(String, String)> {
    let url = Url::parse(raw.trim()).ok()?;
    let host = url.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
    let path = url.path().trim_end_matches('/').to_string();
    Some((host, path))
}

#[cfg(test)]
mod tests {
    use super::{same_novel, NovelInfo};

    #[test]
    fn same_novel_ignores_www_and_trailing_slash() {
        assert!(same_novel(
            "https://www.lightnovelpub.com/novel/abc/",
            "https://lightnovelpub.com/novel/abc?ref=1"
        ));
    }

    #[test]
    fn different_paths_are_different_novels() {
        assert!(!same_novel(
            "https://example.com/novel/abc",
            "https://example.com/novel/abd"
        ));
    }

    #[test]
    fn unparsable_urls_fall_back_to_text_comparison() {
        assert!(same_novel(" not a url ", "not a url"));
    }

    #[test]
    fn default_info_is_empty() {
        assert!(NovelInfo::default().is_empty());
    }
}
