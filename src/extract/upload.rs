//! Ad-hoc extraction of user-supplied files
//!
//! Uploads bypass the frontier and the crawl boundary entirely; they are
//! copied under `uploads/`, run through the same pipeline as crawled
//! documents and recorded without a run id.

use crate::crawler::ContentKind;
use crate::extract::{ExtractError, ExtractionPipeline, ExtractionRecord};
use crate::storage::{OutputLayout, ResourceSource, Storage, StoredResource};
use crate::HarvestError;
use std::path::Path;
use tracing::info;

/// Copies `file` into the upload area and extracts its text
///
/// Every upload keeps its own copy, named after the file and a hash of its
/// content. The kind is taken from the file extension. Anything that is not a PDF
/// or a supported image is stored but yields the "no text" outcome.
///
/// # Returns
///
/// * `Ok(ExtractionRecord)` - The stored outcome
/// * `Err(HarvestError)` - The file could not be read, or persistence failed
pub async fn extract_upload<S: Storage>(
    layout: &OutputLayout,
    storage: &mut S,
    pipeline: &ExtractionPipeline,
    file: &Path,
) -> Result<ExtractionRecord, HarvestError> {
    let missing = |source| ExtractError::SourceMissing {
        path: file.to_path_buf(),
        source,
    };

    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| {
            missing(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "path has no file name",
            ))
        })?;
    let bytes = tokio::fs::read(file).await.map_err(missing)?;

    let kind = match file.extension().map(|ext| ContentKind::from_extension(&ext.to_string_lossy())) {
        Some(kind) if kind.is_document() => kind,
        _ => ContentKind::Other,
    };

    let dest = layout.upload_path(&name, &bytes);
    layout.write_atomic(&dest, &bytes)?;

    let resource = StoredResource {
        source: ResourceSource::Upload(name),
        path: dest,
        kind,
        byte_len: bytes.len() as u64,
    };
    let resource_id = storage.insert_resource(None, &resource)?;

    let record = pipeline.extract(&resource).await?;
    save_outcome(layout, storage, resource_id, &resource, &record)?;

    info!(
        "Extracted {} with strategy {}",
        resource.source, record.strategy
    );
    Ok(record)
}

/// Writes the text file for `record` and records the outcome
///
/// The text file is written even for the "no text" outcome, so every
/// extracted resource has exactly one file under `pdf_text/`.
pub(crate) fn save_outcome<S: Storage + ?Sized>(
    layout: &OutputLayout,
    storage: &mut S,
    resource_id: i64,
    resource: &StoredResource,
    record: &ExtractionRecord,
) -> Result<(), HarvestError> {
    let text_path = layout.text_path(resource);
    layout.write_atomic(&text_path, record.text().unwrap_or_default().as_bytes())?;
    storage.insert_extraction(resource_id, record, Some(&text_path))?;
    Ok(())
}
