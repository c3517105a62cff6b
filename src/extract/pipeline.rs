//! The extraction strategy chain

use crate::crawler::ContentKind;
use crate::extract::{
    CapabilityProvider, ExtractError, ExtractionRecord, HostToolchain, NoTools, TextEngine,
};
use crate::storage::StoredResource;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Runs the native-text then OCR chain over stored documents
///
/// Capabilities are fixed at construction; strategy selection afterwards
/// depends only on them and on what the native step returns.
pub struct ExtractionPipeline {
    native_available: bool,
    ocr_available: bool,
    engine: Arc<dyn TextEngine>,
}

impl fmt::Debug for ExtractionPipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionPipeline")
            .field("native_available", &self.native_available)
            .field("ocr_available", &self.ocr_available)
            .finish_non_exhaustive()
    }
}

impl ExtractionPipeline {
    /// Builds a pipeline, querying `capabilities` exactly once
    ///
    /// # Arguments
    ///
    /// * `capabilities` - Which strategies may be attempted
    /// * `engine` - What actually runs them
    pub fn new(capabilities: &dyn CapabilityProvider, engine: Arc<dyn TextEngine>) -> Self {
        let native_available = capabilities.native_text_available();
        let ocr_available = capabilities.ocr_available();

        if !native_available && !ocr_available {
            warn!(
                "No text extraction tools available (need pdftotext, or pdftoppm and tesseract); \
                 documents will be stored without text"
            );
        } else {
            debug!(
                "Extraction capabilities: native={}, ocr={}",
                native_available, ocr_available
            );
        }

        Self {
            native_available,
            ocr_available,
            engine,
        }
    }

    /// A pipeline over whatever tools the host has installed
    pub fn detect(tool_timeout: Duration) -> Self {
        let tools = Arc::new(HostToolchain::detect(tool_timeout));
        Self::new(tools.as_ref(), tools.clone())
    }

    /// A pipeline that never extracts anything
    pub fn without_tools() -> Self {
        Self::new(&NoTools, Arc::new(NoTools))
    }

    pub fn native_available(&self) -> bool {
        self.native_available
    }

    pub fn ocr_available(&self) -> bool {
        self.ocr_available
    }

    /// Extracts text from one stored resource
    ///
    /// # Returns
    ///
    /// * `Ok(ExtractionRecord)` - Always, unless the source cannot be read;
    ///   tool failures degrade to an empty result and then to `none`
    /// * `Err(ExtractError::SourceMissing)` - The stored file is gone
    pub async fn extract(&self, resource: &StoredResource) -> Result<ExtractionRecord, ExtractError> {
        let metadata = tokio::fs::metadata(&resource.path)
            .await
            .map_err(|source| ExtractError::SourceMissing {
                path: resource.path.clone(),
                source,
            })?;
        if !metadata.is_file() {
            return Err(ExtractError::SourceMissing {
                path: resource.path.clone(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a file"),
            });
        }

        if resource.kind == ContentKind::Pdf && self.native_available {
            let text = self
                .attempt("native", resource, self.engine.native_text(&resource.path))
                .await;
            if let Some(text) = text {
                return Ok(ExtractionRecord::primary(resource, text));
            }
        }

        if resource.kind.is_document() && self.ocr_available {
            let text = self
                .attempt(
                    "ocr",
                    resource,
                    self.engine.optical_text(&resource.path, resource.kind),
                )
                .await;
            if let Some(text) = text {
                return Ok(ExtractionRecord::fallback(resource, text));
            }
        }

        debug!("No text extracted from {}", resource.source);
        Ok(ExtractionRecord::no_text(resource))
    }

    /// Awaits one strategy, returning its trimmed text if non-empty
    async fn attempt<F>(&self, step: &str, resource: &StoredResource, run: F) -> Option<String>
    where
        F: std::future::Future<Output = Result<String, ExtractError>>,
    {
        match run.await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    debug!("{} extraction of {} returned no text", step, resource.source);
                    None
                } else {
                    Some(text.to_string())
                }
            }
            Err(e) => {
                warn!("{} extraction of {} failed: {}", step, resource.source, e);
                None
            }
        }
    }
}
