//! External text tools (poppler and tesseract)
//!
//! Native text comes from `pdftotext`. OCR rasterizes PDF pages with
//! `pdftoppm` at 300 dpi and feeds each page to `tesseract`; images go to
//! `tesseract` directly. Every invocation is bounded by `tool_timeout` and
//! killed if the caller stops waiting.

use crate::crawler::ContentKind;
use crate::extract::{CapabilityProvider, ExtractError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

const OCR_DPI: &str = "300";

/// Runs the extraction strategies against a file on disk
#[async_trait]
pub trait TextEngine: Send + Sync {
    /// Text layer of a PDF
    async fn native_text(&self, path: &Path) -> Result<String, ExtractError>;

    /// Optically recognized text of a PDF or image
    async fn optical_text(&self, path: &Path, kind: ContentKind) -> Result<String, ExtractError>;
}

/// Tools found on the host `PATH`
#[derive(Debug, Clone)]
pub struct HostToolchain {
    pdftotext: Option<PathBuf>,
    pdftoppm: Option<PathBuf>,
    tesseract: Option<PathBuf>,
    tool_timeout: Duration,
}

impl HostToolchain {
    /// Probes `PATH` for each tool
    pub fn detect(tool_timeout: Duration) -> Self {
        let probe = |name: &str| match which::which(name) {
            Ok(path) => {
                debug!("Found {} at {}", name, path.display());
                Some(path)
            }
            Err(_) => {
                debug!("{} not found on PATH", name);
                None
            }
        };

        Self {
            pdftotext: probe("pdftotext"),
            pdftoppm: probe("pdftoppm"),
            tesseract: probe("tesseract"),
            tool_timeout,
        }
    }

    async fn run(&self, tool: &'static str, mut command: Command) -> Result<Vec<u8>, ExtractError> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.tool_timeout, command.output())
            .await
            .map_err(|_| ExtractError::Timeout { tool })?
            .map_err(|e| ExtractError::Tool {
                tool,
                message: e.to_string(),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::Tool {
                tool,
                message: format!("{}: {}", output.status, stderr.trim()),
            });
        }

        Ok(output.stdout)
    }

    async fn recognize(&self, tesseract: &Path, image: &Path) -> Result<String, ExtractError> {
        let mut command = Command::new(tesseract);
        command.arg(image).arg("stdout");
        let stdout = self.run("tesseract", command).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn recognize_pdf(
        &self,
        pdftoppm: &Path,
        tesseract: &Path,
        pdf: &Path,
    ) -> Result<String, ExtractError> {
        let scratch = tempfile::tempdir().map_err(|e| ExtractError::Tool {
            tool: "pdftoppm",
            message: e.to_string(),
        })?;

        let mut command = Command::new(pdftoppm);
        command
            .args(["-r", OCR_DPI, "-png"])
            .arg(pdf)
            .arg(scratch.path().join("page"));
        self.run("pdftoppm", command).await?;

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path())
            .await
            .map_err(|e| ExtractError::Tool {
                tool: "pdftoppm",
                message: e.to_string(),
            })?;
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "png") {
                pages.push(path);
            }
        }
        // pdftoppm zero-pads page numbers, so name order is page order.
        pages.sort();

        let mut text = Vec::with_capacity(pages.len());
        for page in &pages {
            text.push(self.recognize(tesseract, page).await?);
        }
        Ok(text.join("\n"))
    }
}

impl CapabilityProvider for HostToolchain {
    fn native_text_available(&self) -> bool {
        self.pdftotext.is_some()
    }

    fn ocr_available(&self) -> bool {
        self.pdftoppm.is_some() && self.tesseract.is_some()
    }
}

#[async_trait]
impl TextEngine for HostToolchain {
    async fn native_text(&self, path: &Path) -> Result<String, ExtractError> {
        let pdftotext = self.pdftotext.as_deref().ok_or(ExtractError::Unavailable)?;

        let mut command = Command::new(pdftotext);
        command
            .args(["-layout", "-enc", "UTF-8", "-nopgbrk"])
            .arg(path)
            .arg("-");
        let stdout = self.run("pdftotext", command).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn optical_text(&self, path: &Path, kind: ContentKind) -> Result<String, ExtractError> {
        let tesseract = self.tesseract.as_deref().ok_or(ExtractError::Unavailable)?;

        match kind {
            ContentKind::Image => self.recognize(tesseract, path).await,
            ContentKind::Pdf => {
                let pdftoppm = self.pdftoppm.as_deref().ok_or(ExtractError::Unavailable)?;
                self.recognize_pdf(pdftoppm, tesseract, path).await
            }
            ContentKind::Html | ContentKind::Other => Err(ExtractError::Unavailable),
        }
    }
}
