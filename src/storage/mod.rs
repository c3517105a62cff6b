//! Storage module for persisting harvested data
//!
//! This module handles everything that outlives a process:
//! - The on-disk layout (`html/`, `pdfs/`, `pdf_text/`, `uploads/`)
//! - SQLite records of runs, stored resources and extraction outcomes
//! - The last-successful-crawl timestamp

mod layout;
mod schema;
mod sqlite;
mod traits;

pub use layout::{resource_key, OutputLayout};
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::crawler::ContentKind;
use crate::extract::Strategy;
use crate::url::Locator;
use std::fmt;
use std::path::PathBuf;

/// Where a stored resource came from
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ResourceSource {
    /// Fetched by the crawler
    Crawled(Locator),
    /// Supplied by a user for ad-hoc extraction, keyed by file name
    Upload(String),
}

impl ResourceSource {
    pub fn origin(&self) -> &'static str {
        match self {
            Self::Crawled(_) => "crawl",
            Self::Upload(_) => "upload",
        }
    }

    pub fn locator(&self) -> Option<&Locator> {
        match self {
            Self::Crawled(locator) => Some(locator),
            Self::Upload(_) => None,
        }
    }
}

impl fmt::Display for ResourceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Crawled(locator) => write!(f, "{}", locator),
            Self::Upload(name) => write!(f, "upload:{}", name),
        }
    }
}

/// A resource whose raw bytes have been written to disk
///
/// Immutable once created; the extraction pipeline and downstream
/// consumers refer to it by `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredResource {
    pub source: ResourceSource,
    pub path: PathBuf,
    pub kind: ContentKind,
    pub byte_len: u64,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
    pub pages: u64,
    pub documents: u64,
    pub extracted: u64,
    pub no_text: u64,
    pub failures: u64,
    pub rejected: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Interrupted,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Interrupted => "interrupted",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "interrupted" => Some(Self::Interrupted),
            _ => None,
        }
    }
}

/// A stored document as seen by downstream consumers
#[derive(Debug, Clone)]
pub struct DocumentListing {
    pub resource_id: i64,
    pub source: String,
    pub path: PathBuf,
    pub kind: ContentKind,
    pub byte_len: u64,
    /// `None` if extraction was never attempted for this resource
    pub strategy: Option<Strategy>,
    pub text_path: Option<PathBuf>,
}
