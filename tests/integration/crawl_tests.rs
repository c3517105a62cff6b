//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! crawl cycle end-to-end against a temporary output directory.

use async_trait::async_trait;
use site_harvest::config::{parse_config, Config};
use site_harvest::crawler::{ContentKind, Coordinator, CrawlSummary, Fetcher, HarvestJob, Scheduler};
use site_harvest::extract::{CapabilityProvider, ExtractError, ExtractionPipeline, Strategy, TextEngine};
use site_harvest::state::CrawlStateStore;
use site_harvest::storage::{SqliteStorage, Storage};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const APPROVED: &str = "Your benefit has been approved, please continue.";

/// Creates a test configuration seeded at `/map/index.html` on the mock server
fn create_test_config(server: &MockServer, root: &Path) -> Config {
    let host = url::Url::parse(&server.uri())
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();

    parse_config(&format!(
        r#"
[crawl]
seed = "{uri}/map/index.html"
boundary-host = "{host}"
request-timeout-secs = 5
connect-timeout-secs = 2
request-delay-ms = 0
max-concurrent-fetches = 3
user-agent = "TestHarvester/1.0"

[output]
root = "{root}"

[schedule]
interval-days = 30

[extraction]
max-workers = 2
"#,
        uri = server.uri(),
        host = host,
        root = root.display()
    ))
    .expect("test config should be valid")
}

fn html(body: &str) -> ResponseTemplate {
    // set_body_string would force text/plain
    ResponseTemplate::new(200).set_body_raw(
        format!("<html><body>{}</body></html>", body),
        "text/html; charset=utf-8",
    )
}

fn pdf(bytes: &[u8]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(bytes.to_vec(), "application/pdf")
}

fn redirect(to: &str) -> ResponseTemplate {
    ResponseTemplate::new(301).insert_header("location", to)
}

fn files_in(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

async fn mount_page(server: &MockServer, at: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(at))
        .respond_with(html(body))
        .expect(1)
        .mount(server)
        .await;
}

async fn crawl(config: &Config, pipeline: ExtractionPipeline) -> CrawlSummary {
    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    let fetcher = Fetcher::from_config(&config.crawl).unwrap();

    Coordinator::new(config, storage, fetcher, Arc::new(pipeline))
        .unwrap()
        .with_config_hash("test")
        .run(CancellationToken::new())
        .await
        .expect("crawl should not fail")
}

/// Native text available, OCR not; always returns the same text layer
struct TextLayer(&'static str);

impl CapabilityProvider for TextLayer {
    fn native_text_available(&self) -> bool {
        true
    }

    fn ocr_available(&self) -> bool {
        false
    }
}

#[async_trait]
impl TextEngine for TextLayer {
    async fn native_text(&self, path: &Path) -> Result<String, ExtractError> {
        assert!(path.is_file(), "document should be on disk before extraction");
        Ok(format!("{}\n\x0c", self.0))
    }

    async fn optical_text(&self, _path: &Path, _kind: ContentKind) -> Result<String, ExtractError> {
        Err(ExtractError::Unavailable)
    }
}

#[tokio::test]
async fn test_only_in_boundary_links_are_followed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    mount_page(
        &server,
        "/map/index.html",
        &format!(
            r#"<a href="a.html">In boundary</a>
               <a href="http://localhost:{}/external.html">External</a>"#,
            port
        ),
    )
    .await;
    mount_page(&server, "/map/a.html", "<p>leaf</p>").await;
    Mock::given(method("GET"))
        .and(path("/external.html"))
        .respond_with(html("<p>never</p>"))
        .expect(0)
        .mount(&server)
        .await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.failures, 0);

    let html_dir = dir.path().join("html");
    assert!(html_dir.join("map").join("index.html").is_file());
    assert!(html_dir.join("map").join("a.html").is_file());
    assert!(!html_dir.join("external.html").exists());

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    assert_eq!(storage.count_resources(Some(ContentKind::Html)).unwrap(), 2);
}

#[tokio::test]
async fn test_each_locator_fetched_once() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(
        &server,
        "/map/index.html",
        r#"<a href="a.html">A</a><a href="b.html">B</a><a href="index.html#top">Self</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/map/a.html",
        r#"<a href="b.html">B</a><a href="/map/index.html">Home</a><a href="a.html?utm_source=x">A</a>"#,
    )
    .await;
    mount_page(
        &server,
        "/map/b.html",
        r#"<a href="./a.html">A</a><a href="../map/b.html">B</a>"#,
    )
    .await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.rejected, 0);
}

#[tokio::test]
async fn test_partial_failures_do_not_stop_the_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(
        &server,
        "/map/index.html",
        r#"<a href="ok1.html">1</a><a href="ok2.html">2</a>
           <a href="missing.html">3</a><a href="broken.html">4</a>"#,
    )
    .await;
    mount_page(&server, "/map/ok1.html", "one").await;
    mount_page(&server, "/map/ok2.html", "two").await;
    Mock::given(method("GET"))
        .and(path("/map/missing.html"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/map/broken.html"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    // 5 discoverable locators, 2 failing
    assert!(summary.completed);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.failures, 2);

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    let run = storage.get_latest_run().unwrap().unwrap();
    assert_eq!(run.pages, 3);
    assert_eq!(run.failures, 2);
    assert_eq!(run.config_hash, "test");
}

#[tokio::test]
async fn test_documents_without_tools_have_no_text() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(
        &server,
        "/map/index.html",
        r#"<a href="/forms/apply.pdf" download>Form</a><a href="/img/letter.png">Scan</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/forms/apply.pdf"))
        .respond_with(pdf(b"%PDF-1.4 not really"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/img/letter.png"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(vec![0x89, b'P', b'N', b'G'], "application/octet-stream"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.documents, 2);
    assert_eq!(summary.no_text, 2);
    assert_eq!(summary.extracted, 0);
    assert_eq!(summary.failures, 0);

    assert!(dir.path().join("pdfs").join("forms_apply.pdf").is_file());
    assert!(dir.path().join("pdfs").join("img_letter.png").is_file());

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    let documents = storage.list_documents().unwrap();
    assert_eq!(documents.len(), 2);
    for doc in &documents {
        assert_eq!(doc.strategy, Some(Strategy::None));
        let text_path = doc.text_path.clone().expect("text file recorded");
        assert_eq!(std::fs::read_to_string(text_path).unwrap(), "");
    }
    assert!(documents.iter().any(|d| d.kind == ContentKind::Image));
}

#[tokio::test]
async fn test_pdf_text_layer_is_primary() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(
        &server,
        "/map/index.html",
        r#"<a href="/letters/approved.pdf">Letter</a>"#,
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/letters/approved.pdf"))
        .respond_with(pdf(b"%PDF-1.4 stub"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = Arc::new(TextLayer(APPROVED));
    let pipeline = ExtractionPipeline::new(engine.as_ref(), engine.clone());
    let summary = crawl(&config, pipeline).await;

    assert!(summary.completed);
    assert_eq!(summary.documents, 1);
    assert_eq!(summary.extracted, 1);

    let text = std::fs::read_to_string(dir.path().join("pdf_text").join("letters_approved.txt"))
        .unwrap();
    assert_eq!(text, APPROVED);

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    let documents = storage.list_documents().unwrap();
    assert_eq!(documents.len(), 1);
    assert_eq!(documents[0].strategy, Some(Strategy::Primary));
}

#[tokio::test]
async fn test_allowed_paths_restrict_the_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let mut config = create_test_config(&server, dir.path());
    config.crawl.allowed_paths = vec!["/map/".to_string()];

    mount_page(
        &server,
        "/map/index.html",
        r#"<a href="/map/inside.html">In</a><a href="/news/outside.html">Out</a>"#,
    )
    .await;
    mount_page(&server, "/map/inside.html", "inside").await;
    Mock::given(method("GET"))
        .and(path("/news/outside.html"))
        .respond_with(html("outside"))
        .expect(0)
        .mount(&server)
        .await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.rejected, 1);
}

#[tokio::test]
async fn test_redirect_inside_boundary_is_crawled_from_its_target() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(&server, "/map/index.html", r#"<a href="dir">Directory</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/map/dir"))
        .respond_with(redirect("/map/dir/"))
        .expect(1)
        .mount(&server)
        .await;
    mount_page(&server, "/map/dir/", r#"<a href="child.html">Child</a>"#).await;
    mount_page(&server, "/map/dir/child.html", "<p>child</p>").await;
    Mock::given(method("GET"))
        .and(path("/map/child.html"))
        .respond_with(html("wrong base"))
        .expect(0)
        .mount(&server)
        .await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.pages, 3);
    assert_eq!(summary.failures, 0);
    assert_eq!(summary.rejected, 0);
    assert!(dir
        .path()
        .join("html/map/dir/child.html")
        .is_file());
}

#[tokio::test]
async fn test_redirect_out_of_boundary_is_not_followed() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    let port = url::Url::parse(&server.uri()).unwrap().port().unwrap();
    mount_page(&server, "/map/index.html", r#"<a href="/go.pdf">Form</a>"#).await;
    Mock::given(method("GET"))
        .and(path("/go.pdf"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("http://localhost:{}/secret.pdf", port).as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/secret.pdf"))
        .respond_with(pdf(b"%PDF-1.4 off site"))
        .expect(0)
        .mount(&server)
        .await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.pages, 1);
    assert_eq!(summary.documents, 0);
    assert_eq!(summary.rejected, 1);
    assert_eq!(files_in(&dir.path().join("pdfs")), 0);

    let storage = SqliteStorage::new(&config.output.database_path()).unwrap();
    assert_eq!(storage.count_resources(Some(ContentKind::Pdf)).unwrap(), 0);
}

#[tokio::test]
async fn test_page_and_its_subpage_are_both_mirrored() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(&server, "/map/index.html", r#"<a href="/benefits">Benefits</a>"#).await;
    mount_page(
        &server,
        "/benefits",
        r#"<a href="/benefits/overview">Overview</a>"#,
    )
    .await;
    mount_page(&server, "/benefits/overview", "<p>overview</p>").await;

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.pages, 3);
    let html_dir = dir.path().join("html");
    assert!(html_dir.join("benefits").join("index.html").is_file());
    assert!(html_dir
        .join("benefits")
        .join("overview")
        .join("index.html")
        .is_file());
}

#[tokio::test]
async fn test_documents_with_similar_locators_keep_separate_files() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(
        &server,
        "/map/index.html",
        r#"<a href="/forms/a.pdf">Nested</a><a href="/forms_a.pdf">Flat</a>
           <a href="/download/123">Served</a><a href="/download/123.pdf">Named</a>"#,
    )
    .await;
    for (at, body) in [
        ("/forms/a.pdf", b"%PDF-1.4 nested".as_slice()),
        ("/forms_a.pdf", b"%PDF-1.4 flat".as_slice()),
        ("/download/123", b"%PDF-1.4 served".as_slice()),
        ("/download/123.pdf", b"%PDF-1.4 named".as_slice()),
    ] {
        Mock::given(method("GET"))
            .and(path(at))
            .respond_with(pdf(body))
            .expect(1)
            .mount(&server)
            .await;
    }

    let summary = crawl(&config, ExtractionPipeline::without_tools()).await;

    assert!(summary.completed);
    assert_eq!(summary.documents, 4);
    assert_eq!(summary.no_text, 4);
    assert_eq!(files_in(&dir.path().join("pdfs")), 4);
    assert_eq!(files_in(&dir.path().join("pdf_text")), 4);
    assert_eq!(
        std::fs::read(dir.path().join("pdfs").join("forms_a.pdf")).unwrap(),
        b"%PDF-1.4 nested"
    );
}

#[tokio::test]
async fn test_scheduler_records_completed_crawl() {
    let server = MockServer::start().await;
    let dir = TempDir::new().unwrap();
    let config = create_test_config(&server, dir.path());

    mount_page(&server, "/map/index.html", "<p>only page</p>").await;

    let store = SqliteStorage::new(&config.output.database_path()).unwrap();
    let mut scheduler = Scheduler::from_config(store, &config.schedule);
    let mut job = HarvestJob::new(config.clone(), "hash");
    let cancel = CancellationToken::new();

    let summary = scheduler
        .run_once(&mut job, false, &cancel)
        .await
        .unwrap()
        .expect("first run is always due");
    assert!(summary.completed);
    assert_eq!(summary.pages, 1);

    // Fresh now, so a second unforced check does nothing (the page mock
    // expects exactly one request).
    assert!(scheduler
        .run_once(&mut job, false, &cancel)
        .await
        .unwrap()
        .is_none());

    let state = SqliteStorage::new(&config.output.database_path()).unwrap();
    assert!(state.load_last_crawl().unwrap().is_some());
}
