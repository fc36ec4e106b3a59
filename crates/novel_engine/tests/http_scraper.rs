use novel_engine::{FailureKind, FetchSettings, HttpScraper, Scraper};
use pretty_assertions::assert_eq;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn serve(server: &MockServer, at: &str, response: ResponseTemplate) -> String {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(response)
        .mount(server)
        .await;
    format!("{}{at}", server.uri())
}

fn html(body: impl Into<Vec<u8>>, content_type: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into(), content_type)
}

#[tokio::test]
async fn fetch_reports_what_it_downloaded() {
    let server = MockServer::start().await;
    let url = serve(&server, "/novel/1", html("<h1>Novel</h1>", "text/html; charset=utf-8")).await;

    let output = HttpScraper::new(FetchSettings::default())
        .fetch(&url)
        .await
        .unwrap();
    assert_eq!(output.bytes, b"<h1>Novel</h1>");
    assert_eq!(output.metadata.original_url, url);
    assert_eq!(output.metadata.final_url, url);
    assert_eq!(output.metadata.redirect_count, 0);
    assert_eq!(output.metadata.byte_len, 14);
    assert_eq!(
        output.metadata.content_type.as_deref(),
        Some("text/html; charset=utf-8")
    );
}

#[tokio::test]
async fn load_page_identifies_itself_and_remembers_the_page() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chapter"))
        .and(header("user-agent", "novel-test/1.0"))
        .respond_with(html("<p>chapter</p>", "text/html"))
        .mount(&server)
        .await;

    let scraper = HttpScraper::new(FetchSettings {
        user_agent: "novel-test/1.0".to_string(),
        ..FetchSettings::default()
    });
    let page = scraper
        .load_page(&format!("{}/chapter", server.uri()))
        .await
        .unwrap();
    assert_eq!(page, "<p>chapter</p>");
    assert_eq!(scraper.current_page_html().await.unwrap(), page);
}

#[tokio::test]
async fn load_page_decodes_legacy_charsets() {
    let server = MockServer::start().await;
    // "café" in windows-1252
    let url = serve(
        &server,
        "/latin",
        html(b"<p>caf\xe9</p>".to_vec(), "text/html; charset=windows-1252"),
    )
    .await;

    let page = HttpScraper::new(FetchSettings::default())
        .load_page(&url)
        .await
        .unwrap();
    assert_eq!(page, "<p>café</p>");
}

#[tokio::test]
async fn a_failed_load_keeps_the_previous_page() {
    let server = MockServer::start().await;
    let good = serve(&server, "/good", html("<p>good</p>", "text/html")).await;
    let gone = serve(&server, "/gone", ResponseTemplate::new(404)).await;

    let scraper = HttpScraper::new(FetchSettings::default());
    scraper.load_page(&good).await.unwrap();
    let err = scraper.load_page(&gone).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::HttpStatus(404));
    assert_eq!(scraper.current_page_html().await.unwrap(), "<p>good</p>");
}

#[tokio::test]
async fn nothing_loaded_yet_is_an_error() {
    let scraper = HttpScraper::new(FetchSettings::default());
    let err = scraper.current_page_html().await.unwrap_err();
    assert_eq!(err.kind, FailureKind::NoPageLoaded);
}

#[tokio::test]
async fn scripts_are_unsupported() {
    let scraper = HttpScraper::new(FetchSettings::default());
    let err = scraper.execute_js("document.title").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::Unsupported);
}

#[tokio::test]
async fn images_are_not_pages() {
    let server = MockServer::start().await;
    let url = serve(&server, "/cover.png", html(vec![0u8; 8], "image/png")).await;

    let err = HttpScraper::new(FetchSettings::default())
        .fetch(&url)
        .await
        .unwrap_err();
    assert_eq!(
        err.kind,
        FailureKind::UnsupportedContentType {
            content_type: "image/png".to_string()
        }
    );
}

#[tokio::test]
async fn oversized_pages_are_cut_off() {
    let server = MockServer::start().await;
    let url = serve(&server, "/big", html(vec![b'a'; 64], "text/html")).await;

    let scraper = HttpScraper::new(FetchSettings {
        max_bytes: 16,
        ..FetchSettings::default()
    });
    let err = scraper.fetch(&url).await.unwrap_err();
    assert!(matches!(err.kind, FailureKind::TooLarge { max_bytes: 16, .. }));
}

#[tokio::test]
async fn redirects_are_followed_up_to_the_limit() {
    let server = MockServer::start().await;
    let moved = serve(
        &server,
        "/old",
        ResponseTemplate::new(301).insert_header("location", "/new"),
    )
    .await;
    let target = serve(&server, "/new", html("<p>moved</p>", "text/html")).await;
    let looping = serve(
        &server,
        "/loop",
        ResponseTemplate::new(302).insert_header("location", "/loop"),
    )
    .await;

    let scraper = HttpScraper::new(FetchSettings::default());
    let output = scraper.fetch(&moved).await.unwrap();
    assert_eq!(output.metadata.final_url, target);
    assert_eq!(output.metadata.redirect_count, 1);

    let err = scraper.fetch(&looping).await.unwrap_err();
    assert_eq!(err.kind, FailureKind::RedirectLimitExceeded);
}

#[tokio::test]
async fn invalid_url_is_rejected_before_any_request() {
    let scraper = HttpScraper::new(FetchSettings::default());
    let err = scraper.fetch("not a url").await.unwrap_err();
    assert_eq!(err.kind, FailureKind::InvalidUrl);
}

#[tokio::test]
async fn a_stray_invalid_byte_does_not_lose_the_page() {
    let server = MockServer::start().await;
    let url = serve(
        &server,
        "/chapter-9",
        html(b"<p>Hello \xff world</p>".to_vec(), "text/html; charset=utf-8"),
    )
    .await;

    let page = HttpScraper::new(FetchSettings::default())
        .load_page(&url)
        .await
        .unwrap();
    assert_eq!(page, "<p>Hello \u{fffd} world</p>");
}
