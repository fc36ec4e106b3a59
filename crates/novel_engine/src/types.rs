use thiserror::Error;

/// Rejected configuration. Raised while options, filters or sources are
/// built, never during a conversion or a crawl.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value {value:?} for option `{option}`")]
    InvalidOption { option: &'static str, value: String },
    #[error("invalid css selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },
    #[error("invalid regex {pattern:?}")]
    InvalidRegex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("invalid source configuration: {0}")]
    InvalidSource(String),
}

/// What the HTTP layer learned about a download besides its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    /// Address after redirects.
    pub final_url: String,
    pub redirect_count: usize,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

/// A page could not be produced. Callers branch on `kind`; `message`
/// carries the detail for logs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct ScrapeError {
    pub kind: FailureKind,
    pub message: String,
}

impl ScrapeError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FailureKind {
    #[error("invalid url")]
    InvalidUrl,
    #[error("http status {0}")]
    HttpStatus(u16),
    #[error("timeout")]
    Timeout,
    #[error("redirect limit exceeded")]
    RedirectLimitExceeded,
    #[error("response too large (max {max_bytes}, actual {actual:?})")]
    TooLarge { max_bytes: u64, actual: Option<u64> },
    #[error("unsupported content type {content_type}")]
    UnsupportedContentType { content_type: String },
    #[error("no page loaded")]
    NoPageLoaded,
    /// The scraper cannot do this at all, e.g. run scripts over plain HTTP.
    #[error("unsupported operation")]
    Unsupported,
    #[error("network error")]
    Network,
}

/// Failure of one crawler call. Jobs treat every variant as "no data this
/// step".
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),
    /// A page that must carry some element did not.
    #[error("nothing matched `{selector}` for {what} at {url}")]
    Missing {
        what: &'static str,
        selector: String,
        url: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scrape_error_display_includes_kind_and_message() {
        let err = ScrapeError::new(FailureKind::HttpStatus(404), "Not Found");
        assert_eq!(err.to_string(), "http status 404: Not Found");
    }

    #[test]
    fn crawl_error_wraps_scrape_error_transparently() {
        let err: CrawlError = ScrapeError::new(FailureKind::Timeout, "slow").into();
        assert_eq!(err.to_string(), "timeout: slow");
    }

    #[test]
    fn missing_element_names_the_selector() {
        let err = CrawlError::Missing {
            what: "chapter list",
            selector: ".chapter-list".to_string(),
            url: "https://example.com/n".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "nothing matched `.chapter-list` for chapter list at https://example.com/n"
        );
    }
}
