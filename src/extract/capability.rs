//! Capability detection

use crate::crawler::ContentKind;
use crate::extract::{ExtractError, TextEngine};
use async_trait::async_trait;
use std::path::Path;

/// Reports which extraction strategies the environment can run
///
/// Queried once when an [`crate::extract::ExtractionPipeline`] is built.
pub trait CapabilityProvider {
    /// A native PDF text-layer tool is installed
    fn native_text_available(&self) -> bool;

    /// The rasterize-then-recognize toolchain is installed
    fn ocr_available(&self) -> bool;
}

/// An environment with no extraction tools at all
///
/// Every document extracted with it ends as [`crate::extract::Strategy::None`].
#[derive(Debug, Clone, Copy, Default)]
pub struct NoTools;

impl CapabilityProvider for NoTools {
    fn native_text_available(&self) -> bool {
        false
    }

    fn ocr_available(&self) -> bool {
        false
    }
}

#[async_trait]
impl TextEngine for NoTools {
    async fn native_text(&self, _path: &Path) -> Result<String, ExtractError> {
        Err(ExtractError::Unavailable)
    }

    async fn optical_text(&self, _path: &Path, _kind: ContentKind) -> Result<String, ExtractError> {
        Err(ExtractError::Unavailable)
    }
}
