//! Statistics generation from the harvest database
//!
//! This module provides functionality for extracting and displaying
//! archive statistics from the storage layer.

use crate::crawler::ContentKind;
use crate::extract::Strategy;
use crate::storage::{RunRecord, Storage};
use crate::HarvestError;
use std::collections::HashMap;
use std::fmt::Write;

/// Archive statistics summary
#[derive(Debug, Clone)]
pub struct HarvestStatistics {
    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Stored resources per kind, across all runs and uploads
    pub resources_by_kind: HashMap<ContentKind, u64>,

    /// Current documents per latest extraction strategy
    pub documents_by_strategy: HashMap<Strategy, u64>,

    /// Current documents with no extraction recorded yet
    pub documents_pending: u64,
}

impl HarvestStatistics {
    pub fn total_resources(&self) -> u64 {
        self.resources_by_kind.values().sum()
    }

    pub fn total_documents(&self) -> u64 {
        self.documents_by_strategy.values().sum::<u64>() + self.documents_pending
    }
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(HarvestStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<HarvestStatistics, HarvestError> {
    let latest_run = storage.get_latest_run()?;

    let mut resources_by_kind = HashMap::new();
    for kind in [
        ContentKind::Html,
        ContentKind::Pdf,
        ContentKind::Image,
        ContentKind::Other,
    ] {
        let count = storage.count_resources(Some(kind))?;
        if count > 0 {
            resources_by_kind.insert(kind, count);
        }
    }

    let mut documents_by_strategy = HashMap::new();
    let mut documents_pending = 0;
    for document in storage.list_documents()? {
        match document.strategy {
            Some(strategy) => *documents_by_strategy.entry(strategy).or_insert(0) += 1,
            None => documents_pending += 1,
        }
    }

    Ok(HarvestStatistics {
        latest_run,
        resources_by_kind,
        documents_by_strategy,
        documents_pending,
    })
}

/// Formats statistics for the terminal
pub fn format_statistics(stats: &HarvestStatistics) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== Harvest Statistics ===\n");

    match &stats.latest_run {
        Some(run) => {
            let _ = writeln!(out, "Latest Run:");
            let _ = writeln!(out, "  ID: {}", run.id);
            let _ = writeln!(out, "  Status: {}", run.status.to_db_string());
            let _ = writeln!(out, "  Started: {}", run.started_at);
            if let Some(finished) = &run.finished_at {
                let _ = writeln!(out, "  Finished: {}", finished);
            }
            let _ = writeln!(out, "  Pages fetched: {}", run.pages);
            let _ = writeln!(out, "  Documents: {}", run.documents);
            let _ = writeln!(out, "  Extracted: {}", run.extracted);
            let _ = writeln!(out, "  No text: {}", run.no_text);
            let _ = writeln!(out, "  Failures: {}", run.failures);
            let _ = writeln!(out, "  Rejected links: {}", run.rejected);
        }
        None => {
            let _ = writeln!(out, "No crawl runs recorded");
        }
    }
    let _ = writeln!(out);

    let _ = writeln!(out, "Stored Resources ({}):", stats.total_resources());
    let mut kinds: Vec<_> = stats.resources_by_kind.iter().collect();
    kinds.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.to_db_string().cmp(b.0.to_db_string())));
    for (kind, count) in kinds {
        let _ = writeln!(out, "  {}: {}", kind, count);
    }
    let _ = writeln!(out);

    let total = stats.total_documents();
    let _ = writeln!(out, "Documents by Strategy ({}):", total);
    for strategy in [Strategy::Primary, Strategy::Fallback, Strategy::None] {
        let count = stats.documents_by_strategy.get(&strategy).copied().unwrap_or(0);
        let percentage = if total > 0 {
            (count as f64 / total as f64) * 100.0
        } else {
            0.0
        };
        let _ = writeln!(out, "  {}: {} ({:.1}%)", strategy, count, percentage);
    }
    if stats.documents_pending > 0 {
        let _ = writeln!(out, "  not extracted: {}", stats.documents_pending);
    }

    out
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &HarvestStatistics) {
    print!("{}", format_statistics(stats));
}
