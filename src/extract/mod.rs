//! Text extraction for stored documents
//!
//! This module turns persisted PDFs and images into text:
//! - Capability detection for the external tools (`CapabilityProvider`)
//! - Running those tools (`TextEngine`, implemented by `HostToolchain`)
//! - The ordered strategy chain (`ExtractionPipeline`)
//! - Ad-hoc extraction of user-supplied files (`extract_upload`)

mod capability;
mod pipeline;
mod record;
mod toolchain;
mod upload;

pub use capability::{CapabilityProvider, NoTools};
pub use pipeline::ExtractionPipeline;
pub use record::{ExtractionRecord, Strategy};
pub use toolchain::{HostToolchain, TextEngine};
pub use upload::extract_upload;

pub(crate) use upload::save_outcome;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while extracting text
///
/// Only `SourceMissing` escapes [`ExtractionPipeline::extract`]; the other
/// variants come from a [`TextEngine`] and are downgraded to "no text" by
/// the pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("cannot read source {}: {source}", path.display())]
    SourceMissing {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed: {message}")]
    Tool { tool: &'static str, message: String },

    #[error("{tool} timed out")]
    Timeout { tool: &'static str },

    #[error("no extraction tool available")]
    Unavailable,
}
