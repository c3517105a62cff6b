//! Crawler module for fetching and processing a bounded site
//!
//! This module contains the core crawling logic, including:
//! - The frontier (pending queue plus visited set)
//! - HTTP fetching and content classification
//! - HTML parsing and link discovery
//! - Overall crawl coordination
//! - Staleness-driven scheduling of whole runs

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
pub use fetcher::{
    build_http_client, classify_content, ContentKind, FetchFailure, FetchOutcome, FetchResult,
    Fetcher,
};
pub use frontier::{Frontier, Offer};
pub use parser::{parse_html, ParsedPage};
pub use scheduler::{CrawlJob, HarvestJob, Scheduler};
