//! Output module for reporting on runs and the archive
//!
//! This module handles:
//! - Printing the summary of a finished crawl run
//! - Statistics over everything stored so far
//! - The markdown index of stored documents

mod markdown;
pub mod stats;

pub use markdown::{
    format_crawl_summary, format_document_index, write_document_index, DOCUMENT_INDEX,
};
pub use stats::{format_statistics, load_statistics, print_statistics, HarvestStatistics};

use crate::crawler::CrawlSummary;

/// Prints a run summary to stdout
pub fn print_summary(summary: &CrawlSummary) {
    print!("{}", format_crawl_summary(summary));
}
