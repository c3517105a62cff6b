use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Site-Harvest
///
/// Only the seed, the boundary host, the output root and the recrawl
/// interval are required; everything else has a default.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub output: OutputConfig,
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

/// Crawl boundary and fetch behaviour
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlConfig {
    /// Entry locator the frontier is seeded with
    pub seed: String,

    /// Host every fetched locator must belong to
    #[serde(rename = "boundary-host")]
    pub boundary_host: String,

    /// Optional path prefixes further restricting the boundary
    #[serde(rename = "allowed-paths", default)]
    pub allowed_paths: Vec<String>,

    /// Per-request timeout (seconds)
    #[serde(rename = "request-timeout-secs", default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Connection establishment timeout (seconds)
    #[serde(rename = "connect-timeout-secs", default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Pause each fetch worker takes after a request (milliseconds)
    #[serde(rename = "request-delay-ms", default = "default_request_delay")]
    pub request_delay_ms: u64,

    /// Maximum number of fetches in flight
    #[serde(rename = "max-concurrent-fetches", default = "default_concurrent_fetches")]
    pub max_concurrent_fetches: u32,

    /// User-Agent header sent with every request
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,
}

impl CrawlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_delay(&self) -> Duration {
        Duration::from_millis(self.request_delay_ms)
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Directory holding `html/`, `pdfs/`, `pdf_text/` and `uploads/`
    pub root: PathBuf,

    /// SQLite database path, defaults to `<root>/harvest.db`
    #[serde(rename = "database-path", default)]
    pub database_path: Option<PathBuf>,
}

impl OutputConfig {
    pub fn database_path(&self) -> PathBuf {
        self.database_path
            .clone()
            .unwrap_or_else(|| self.root.join("harvest.db"))
    }
}

/// Recrawl scheduling
#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    /// Age (days) after which the archive is considered stale
    #[serde(rename = "interval-days")]
    pub interval_days: u32,

    /// How often run-forever mode wakes up to re-check staleness (seconds)
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

impl ScheduleConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// Text extraction settings
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    /// Maximum number of documents extracted concurrently
    #[serde(rename = "max-workers", default = "default_extraction_workers")]
    pub max_workers: u32,

    /// Timeout for a single external tool invocation (seconds)
    #[serde(rename = "tool-timeout-secs", default = "default_tool_timeout")]
    pub tool_timeout_secs: u64,
}

impl ExtractionConfig {
    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            max_workers: default_extraction_workers(),
            tool_timeout_secs: default_tool_timeout(),
        }
    }
}

fn default_request_timeout() -> u64 {
    30
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_delay() -> u64 {
    300
}

fn default_concurrent_fetches() -> u32 {
    4
}

fn default_user_agent() -> String {
    format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION"))
}

fn default_poll_interval() -> u64 {
    3600
}

fn default_extraction_workers() -> u32 {
    2
}

fn default_tool_timeout() -> u64 {
    120
}
