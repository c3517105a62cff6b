//! Markdown reports
//!
//! This module renders the document index that downstream readers browse:
//! every stored document with the strategy that produced its text and
//! where that text lives.

use crate::crawler::CrawlSummary;
use crate::storage::{DocumentListing, OutputLayout};
use std::io;
use std::path::{Path, PathBuf};

/// File name of the index, written under the output root
pub const DOCUMENT_INDEX: &str = "documents.md";

/// Writes the document index under the output root
///
/// # Arguments
///
/// * `layout` - The output layout (paths are shown relative to its root)
/// * `documents` - Listings as returned by `Storage::list_documents`
///
/// # Returns
///
/// * `Ok(PathBuf)` - Where the index was written
/// * `Err(io::Error)` - Failed to write the index
pub fn write_document_index(
    layout: &OutputLayout,
    documents: &[DocumentListing],
) -> io::Result<PathBuf> {
    let path = layout.root().join(DOCUMENT_INDEX);
    let markdown = format_document_index(layout.root(), documents);
    layout.write_atomic(&path, markdown.as_bytes())?;
    Ok(path)
}

/// Formats the document index as markdown
pub fn format_document_index(root: &Path, documents: &[DocumentListing]) -> String {
    let mut md = String::new();

    md.push_str("# Harvested Documents\n\n");

    if documents.is_empty() {
        md.push_str("No documents have been stored yet.\n");
        return md;
    }

    md.push_str(&format!("Total: {}\n\n", documents.len()));
    md.push_str("| Source | Kind | Size | Strategy | File | Text |\n");
    md.push_str("|--------|------|------|----------|------|------|\n");

    for doc in documents {
        let strategy = doc
            .strategy
            .map(|s| s.to_db_string())
            .unwrap_or("pending");
        let text = doc
            .text_path
            .as_deref()
            .map(|p| relative(root, p))
            .unwrap_or_else(|| "-".to_string());

        md.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            escape_cell(&doc.source),
            doc.kind,
            format_size(doc.byte_len),
            strategy,
            escape_cell(&relative(root, &doc.path)),
            escape_cell(&text),
        ));
    }

    md
}

/// Formats a run summary as markdown
pub fn format_crawl_summary(summary: &CrawlSummary) -> String {
    let mut md = String::new();

    md.push_str("## Crawl Summary\n\n");
    md.push_str(&format!(
        "- **Status**: {}\n",
        if summary.completed {
            "completed"
        } else {
            "interrupted"
        }
    ));
    md.push_str(&format!(
        "- **Duration**: {:.1} seconds\n",
        summary.elapsed.as_secs_f64()
    ));
    md.push_str(&format!("- **Pages fetched**: {}\n", summary.pages));
    md.push_str(&format!("- **Documents stored**: {}\n", summary.documents));
    md.push_str(&format!("- **Text extracted**: {}\n", summary.extracted));
    md.push_str(&format!("- **No text available**: {}\n", summary.no_text));
    md.push_str(&format!("- **Failures**: {}\n", summary.failures));
    md.push_str(&format!("- **Rejected links**: {}\n", summary.rejected));

    md
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

fn format_size(bytes: u64) -> String {
    const KIB: f64 = 1024.0;
    let bytes_f = bytes as f64;
    if bytes_f < KIB {
        format!("{} B", bytes)
    } else if bytes_f < KIB * KIB {
        format!("{:.1} KiB", bytes_f / KIB)
    } else {
        format!("{:.1} MiB", bytes_f / (KIB * KIB))
    }
}
