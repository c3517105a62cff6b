//! State module for deciding when the archive needs a refresh
//!
//! # Components
//!
//! - `CrawlState`: last successful crawl plus the staleness interval
//! - `CrawlStateStore`: where the timestamp lives between processes

mod crawl_state;

pub use crawl_state::{CrawlState, CrawlStateStore, InMemoryStateStore};
