use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use futures_util::StreamExt;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;

use crate::decode::decode_html;
use crate::types::{FailureKind, FetchMetadata, FetchOutput, ScrapeError};

/// Mobile Chrome; the novel sites serve their lighter layout to it.
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Linux; Android 6.0.1; SM-G920V Build/MMB29K) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/52.0.2743.98 Mobile Safari/537.36";

/// Transport limits of [`HttpScraper`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub user_agent: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    /// Media types accepted, compared without parameters.
    pub allowed_content_types: Vec<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: ["text/html", "application/xhtml+xml"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl FetchSettings {
    fn accepts(&self, content_type: &str) -> bool {
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
    }

    fn too_large(&self, actual: u64) -> ScrapeError {
        ScrapeError::new(
            FailureKind::TooLarge {
                max_bytes: self.max_bytes,
                actual: Some(actual),
            },
            format!("{actual} bytes is over the {} byte limit", self.max_bytes),
        )
    }
}

/// Source of raw page HTML. Implementations own timeouts and transport.
#[async_trait::async_trait]
pub trait Scraper: Send + Sync {
    /// Loads `url`, remembers it as the current page and returns its HTML.
    async fn load_page(&self, url: &str) -> Result<String, ScrapeError>;

    /// HTML of the page most recently loaded.
    async fn current_page_html(&self) -> Result<String, ScrapeError>;

    /// Runs a script in the context of the current page.
    async fn execute_js(&self, script: &str) -> Result<String, ScrapeError>;
}

/// [`Scraper`] over plain HTTP. It cannot run scripts.
#[derive(Debug)]
pub struct HttpScraper {
    settings: FetchSettings,
    current: Mutex<Option<String>>,
}

impl HttpScraper {
    pub fn new(settings: FetchSettings) -> Self {
        Self {
            settings,
            current: Mutex::new(None),
        }
    }

    /// A client whose redirect policy reports the hop count into `hops`.
    fn client(&self, hops: Arc<AtomicUsize>) -> Result<reqwest::Client, ScrapeError> {
        let limit = self.settings.redirect_limit;
        let policy = Policy::custom(move |attempt| {
            let seen = attempt.previous().len();
            hops.store(seen, Ordering::Relaxed);
            if seen < limit {
                attempt.follow()
            } else {
                attempt.error("too many redirects")
            }
        });
        reqwest::Client::builder()
            .user_agent(self.settings.user_agent.as_str())
            .connect_timeout(self.settings.connect_timeout)
            .timeout(self.settings.request_timeout)
            .redirect(policy)
            .build()
            .map_err(|err| ScrapeError::new(FailureKind::Network, err.to_string()))
    }

    /// Downloads `url`, enforcing status, media type and size limits.
    pub async fn fetch(&self, url: &str) -> Result<FetchOutput, ScrapeError> {
        let target = reqwest::Url::parse(url)
            .map_err(|err| ScrapeError::new(FailureKind::InvalidUrl, err.to_string()))?;
        let hops = Arc::new(AtomicUsize::new(0));
        let response = self
            .client(hops.clone())?
            .get(target)
            .send()
            .await
            .map_err(scrape_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::new(
                FailureKind::HttpStatus(status.as_u16()),
                format!("{url} answered {status}"),
            ));
        }
        if let Some(declared) = response.content_length() {
            if declared > self.settings.max_bytes {
                return Err(self.settings.too_large(declared));
            }
        }
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        if let Some(content_type) = content_type.as_deref() {
            if !self.settings.accepts(content_type) {
                return Err(ScrapeError::new(
                    FailureKind::UnsupportedContentType {
                        content_type: content_type.to_string(),
                    },
                    format!("{url} is not an HTML page"),
                ));
            }
        }
        let final_url = response.url().to_string();

        let mut body = Vec::new();
        let mut chunks = response.bytes_stream();
        while let Some(chunk) = chunks.next().await {
            let chunk = chunk.map_err(scrape_error)?;
            let total = (body.len() + chunk.len()) as u64;
            if total > self.settings.max_bytes {
                return Err(self.settings.too_large(total));
            }
            body.extend_from_slice(&chunk);
        }

        let metadata = FetchMetadata {
            original_url: url.to_string(),
            final_url,
            redirect_count: hops.load(Ordering::Relaxed),
            content_type,
            byte_len: body.len() as u64,
        };
        engine_debug!(
            "GET {} -> {} bytes after {} redirects",
            metadata.final_url,
            metadata.byte_len,
            metadata.redirect_count
        );
        Ok(FetchOutput {
            bytes: body,
            metadata,
        })
    }

    fn current(&self) -> MutexGuard<'_, Option<String>> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait::async_trait]
impl Scraper for HttpScraper {
    async fn load_page(&self, url: &str) -> Result<String, ScrapeError> {
        let output = self.fetch(url).await.inspect_err(|err| {
            engine_warn!("Could not load {}: {}", url, err);
        })?;
        let html = decode_html(&output.bytes, output.metadata.content_type.as_deref()).html;
        *self.current() = Some(html.clone());
        Ok(html)
    }

    async fn current_page_html(&self) -> Result<String, ScrapeError> {
        self.current()
            .clone()
            .ok_or_else(|| ScrapeError::new(FailureKind::NoPageLoaded, "no page loaded yet"))
    }

    async fn execute_js(&self, _script: &str) -> Result<String, ScrapeError> {
        Err(ScrapeError::new(
            FailureKind::Unsupported,
            "plain HTTP pages cannot run scripts",
        ))
    }
}

fn scrape_error(err: reqwest::Error) -> ScrapeError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_redirect() {
        FailureKind::RedirectLimitExceeded
    } else {
        FailureKind::Network
    };
    ScrapeError::new(kind, err.to_string())
}
