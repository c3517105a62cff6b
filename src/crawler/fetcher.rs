//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with the configured user agent and timeouts
//! - Classifying responses by content kind
//! - Reporting redirects instead of following them
//! - Turning transport failures into values instead of errors

use crate::config::CrawlConfig;
use crate::url::Locator;
use reqwest::{
    header::{CONTENT_TYPE, LOCATION},
    redirect::Policy,
    Client,
};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// What a fetched resource is, as far as the pipeline cares
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentKind {
    Html,
    Pdf,
    Image,
    Other,
}

impl ContentKind {
    /// True for the kinds that go through text extraction
    pub fn is_document(&self) -> bool {
        matches!(self, Self::Pdf | Self::Image)
    }

    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Pdf => "pdf",
            Self::Image => "image",
            Self::Other => "other",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "html" => Some(Self::Html),
            "pdf" => Some(Self::Pdf),
            "image" => Some(Self::Image),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    /// Classifies by file extension alone
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "png" | "jpg" | "jpeg" | "gif" | "bmp" | "tif" | "tiff" => Self::Image,
            "html" | "htm" | "xhtml" | "shtml" | "php" | "asp" | "aspx" | "jsp" => Self::Html,
            _ => Self::Other,
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Content types that say nothing about the payload
const GENERIC_CONTENT_TYPES: &[&str] = &[
    "application/octet-stream",
    "binary/octet-stream",
    "application/download",
    "application/force-download",
    "application/x-download",
];

/// Classifies a resource from its `Content-Type`, falling back to the
/// locator's suffix when the header is absent or generic
///
/// A locator with no file extension (`/map/`, `/benefits/overview`) is
/// treated as HTML, which is what such paths serve on the sites we archive.
pub fn classify_content(content_type: Option<&str>, locator: &Locator) -> ContentKind {
    let mime = content_type
        .and_then(|ct| ct.split(';').next())
        .map(|m| m.trim().to_ascii_lowercase())
        .filter(|m| !m.is_empty());

    match mime.as_deref() {
        Some(m) if !GENERIC_CONTENT_TYPES.contains(&m) => {
            if m == "text/html" || m == "application/xhtml+xml" {
                ContentKind::Html
            } else if m == "application/pdf" || m == "application/x-pdf" {
                ContentKind::Pdf
            } else if m.starts_with("image/") {
                ContentKind::Image
            } else {
                ContentKind::Other
            }
        }
        _ => classify_by_suffix(locator),
    }
}

fn classify_by_suffix(locator: &Locator) -> ContentKind {
    let last = locator.path().rsplit('/').next().unwrap_or_default();
    match last.rsplit_once('.') {
        Some((_, ext)) => ContentKind::from_extension(ext),
        None => ContentKind::Html,
    }
}

/// Why a fetch produced no usable body
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchFailure {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("failed to read body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Request(String),
}

/// What came back for one locator
#[derive(Debug)]
pub enum FetchOutcome {
    /// A 2xx response and its body
    Body(Vec<u8>),
    /// A 3xx response; the raw `Location` value, still unresolved
    Redirect(String),
    /// No usable response
    Failed(FetchFailure),
}

/// Outcome of fetching one locator
///
/// Transport problems are carried in `outcome` rather than raised; a single
/// broken link must never abort a crawl. Redirects are never followed here:
/// the target has to pass the crawl boundary like any other link.
#[derive(Debug)]
pub struct FetchResult {
    pub locator: Locator,
    pub kind: ContentKind,
    /// `None` when no response was received
    pub status: Option<u16>,
    pub outcome: FetchOutcome,
}

impl FetchResult {
    fn failed(locator: Locator, status: Option<u16>, failure: FetchFailure) -> Self {
        let kind = classify_content(None, &locator);
        Self {
            locator,
            kind,
            status,
            outcome: FetchOutcome::Failed(failure),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, FetchOutcome::Body(_))
    }
}

/// Builds an HTTP client with proper configuration
pub fn build_http_client(config: &CrawlConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.clone())
        .timeout(config.request_timeout())
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .redirect(Policy::none())
        .build()
}

/// Retrieves locators one request at a time; cheap to clone per worker
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    delay: Duration,
}

impl Fetcher {
    pub fn new(client: Client, delay: Duration) -> Self {
        Self { client, delay }
    }

    pub fn from_config(config: &CrawlConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::new(build_http_client(config)?, config.request_delay()))
    }

    /// Fetches one locator, then waits out the politeness delay
    pub async fn fetch(&self, locator: Locator) -> FetchResult {
        let result = self.fetch_once(locator).await;
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        result
    }

    async fn fetch_once(&self, locator: Locator) -> FetchResult {
        let response = match self.client.get(locator.as_str()).send().await {
            Ok(response) => response,
            Err(e) => {
                let failure = if e.is_timeout() {
                    FetchFailure::Timeout
                } else if e.is_connect() {
                    FetchFailure::Connect(e.to_string())
                } else {
                    FetchFailure::Request(e.to_string())
                };
                return FetchResult::failed(locator, None, failure);
            }
        };

        let status = response.status();
        if status.is_redirection() {
            let target = response
                .headers()
                .get(LOCATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            return match target {
                Some(target) => FetchResult {
                    kind: classify_content(None, &locator),
                    locator,
                    status: Some(status.as_u16()),
                    outcome: FetchOutcome::Redirect(target),
                },
                None => FetchResult::failed(
                    locator,
                    Some(status.as_u16()),
                    FetchFailure::Status(status.as_u16()),
                ),
            };
        }

        if !status.is_success() {
            return FetchResult::failed(
                locator,
                Some(status.as_u16()),
                FetchFailure::Status(status.as_u16()),
            );
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let kind = classify_content(content_type.as_deref(), &locator);

        let outcome = match response.bytes().await {
            Ok(bytes) => FetchOutcome::Body(bytes.to_vec()),
            Err(e) if e.is_timeout() => FetchOutcome::Failed(FetchFailure::Timeout),
            Err(e) => FetchOutcome::Failed(FetchFailure::Body(e.to_string())),
        };

        FetchResult {
            locator,
            kind,
            status: Some(status.as_u16()),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize;

    fn loc(raw: &str) -> Locator {
        normalize(raw, None).unwrap()
    }

    fn create_test_config() -> CrawlConfig {
        CrawlConfig {
            seed: "https://example.test/".to_string(),
            boundary_host: "example.test".to_string(),
            allowed_paths: vec![],
            request_timeout_secs: 5,
            connect_timeout_secs: 2,
            request_delay_ms: 0,
            max_concurrent_fetches: 2,
            user_agent: "TestHarvester/1.0".to_string(),
        }
    }

    #[test]
    fn test_build_http_client() {
        assert!(build_http_client(&create_test_config()).is_ok());
        assert!(Fetcher::from_config(&create_test_config()).is_ok());
    }

    #[test]
    fn test_classify_from_header() {
        let page = loc("https://example.test/a.pdf");
        assert_eq!(
            classify_content(Some("text/html; charset=utf-8"), &page),
            ContentKind::Html
        );
        assert_eq!(
            classify_content(Some("application/pdf"), &loc("https://example.test/x")),
            ContentKind::Pdf
        );
        assert_eq!(
            classify_content(Some("IMAGE/PNG"), &loc("https://example.test/x")),
            ContentKind::Image
        );
        assert_eq!(
            classify_content(Some("text/css"), &loc("https://example.test/site.css")),
            ContentKind::Other
        );
    }

    #[test]
    fn test_classify_falls_back_to_suffix() {
        assert_eq!(
            classify_content(None, &loc("https://example.test/forms/apply.PDF")),
            ContentKind::Pdf
        );
        assert_eq!(
            classify_content(
                Some("application/octet-stream"),
                &loc("https://example.test/forms/apply.pdf")
            ),
            ContentKind::Pdf
        );
        assert_eq!(
            classify_content(Some(""), &loc("https://example.test/scan.jpeg")),
            ContentKind::Image
        );
        assert_eq!(
            classify_content(None, &loc("https://example.test/map/index.html")),
            ContentKind::Html
        );
        assert_eq!(
            classify_content(None, &loc("https://example.test/map/")),
            ContentKind::Html
        );
        assert_eq!(
            classify_content(None, &loc("https://example.test/archive.zip")),
            ContentKind::Other
        );
    }

    #[test]
    fn test_content_kind_roundtrip() {
        for kind in [
            ContentKind::Html,
            ContentKind::Pdf,
            ContentKind::Image,
            ContentKind::Other,
        ] {
            assert_eq!(ContentKind::from_db_string(kind.to_db_string()), Some(kind));
        }
        assert_eq!(ContentKind::from_db_string("video"), None);
    }

    #[test]
    fn test_is_document() {
        assert!(ContentKind::Pdf.is_document());
        assert!(ContentKind::Image.is_document());
        assert!(!ContentKind::Html.is_document());
        assert!(!ContentKind::Other.is_document());
    }

    #[test]
    fn test_failure_display() {
        assert_eq!(FetchFailure::Status(404).to_string(), "HTTP 404");
        assert_eq!(FetchFailure::Timeout.to_string(), "request timed out");
    }

    #[tokio::test]
    async fn test_connection_refused_is_a_value() {
        // Port 9 (discard) on localhost is essentially never listening.
        let mut config = create_test_config();
        config.connect_timeout_secs = 1;
        config.request_timeout_secs = 2;
        let fetcher = Fetcher::from_config(&config).unwrap();

        let result = fetcher.fetch(loc("http://127.0.0.1:9/")).await;
        assert!(!result.is_success());
        assert_eq!(result.status, None);
    }

    #[tokio::test]
    async fn test_redirect_is_reported_not_followed() {
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old.pdf"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "http://elsewhere.test/new.pdf"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/moved"))
            .respond_with(ResponseTemplate::new(301))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = Fetcher::from_config(&create_test_config()).unwrap();

        let result = fetcher.fetch(loc(&format!("{}/old.pdf", server.uri()))).await;
        assert_eq!(result.status, Some(302));
        assert!(!result.is_success());
        assert!(matches!(
            result.outcome,
            FetchOutcome::Redirect(ref target) if target == "http://elsewhere.test/new.pdf"
        ));

        // A redirect without a target is a plain failure
        let result = fetcher.fetch(loc(&format!("{}/moved", server.uri()))).await;
        assert!(matches!(
            result.outcome,
            FetchOutcome::Failed(FetchFailure::Status(301))
        ));
    }
}
