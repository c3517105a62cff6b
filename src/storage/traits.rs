//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::crawler::{ContentKind, CrawlSummary};
use crate::extract::ExtractionRecord;
use crate::storage::{DocumentListing, RunRecord, RunStatus, StoredResource};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Resource and extraction rows are append-only: a recrawl or re-extraction
/// adds rows, it never patches existing ones.
pub trait Storage {
    // ===== Run Management =====

    /// Creates a new crawl run in the `running` state and returns its ID
    fn create_run(&mut self, config_hash: &str) -> StorageResult<i64>;

    /// Gets the most recent run
    fn get_latest_run(&self) -> StorageResult<Option<RunRecord>>;

    /// Closes a run with its final status and counters
    fn finish_run(
        &mut self,
        run_id: i64,
        status: RunStatus,
        summary: &CrawlSummary,
    ) -> StorageResult<()>;

    // ===== Resources =====

    /// Records a persisted resource; `run_id` is `None` for uploads
    fn insert_resource(
        &mut self,
        run_id: Option<i64>,
        resource: &StoredResource,
    ) -> StorageResult<i64>;

    /// Records an extraction outcome for a resource
    fn insert_extraction(
        &mut self,
        resource_id: i64,
        record: &ExtractionRecord,
        text_path: Option<&Path>,
    ) -> StorageResult<i64>;

    /// Latest version of every stored document with its latest extraction
    fn list_documents(&self) -> StorageResult<Vec<DocumentListing>>;

    /// Counts stored resources, optionally restricted to one kind
    fn count_resources(&self, kind: Option<ContentKind>) -> StorageResult<u64>;
}
