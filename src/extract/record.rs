//! Extraction outcomes

use crate::storage::{ResourceSource, StoredResource};
use std::fmt;
use std::path::PathBuf;

/// Which step of the chain produced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Native PDF text layer
    Primary,
    /// Optical character recognition
    Fallback,
    /// Nothing usable was found
    None,
}

impl Strategy {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
            Self::None => "none",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "primary" => Some(Self::Primary),
            "fallback" => Some(Self::Fallback),
            "none" => Some(Self::None),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// The result of running the pipeline once over one stored resource
///
/// Text is present exactly when `strategy` is not [`Strategy::None`]; the
/// constructors are the only way to build one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionRecord {
    pub source: ResourceSource,
    pub path: PathBuf,
    pub strategy: Strategy,
    text: Option<String>,
}

impl ExtractionRecord {
    pub fn primary(resource: &StoredResource, text: String) -> Self {
        Self::with_text(resource, Strategy::Primary, Some(text))
    }

    pub fn fallback(resource: &StoredResource, text: String) -> Self {
        Self::with_text(resource, Strategy::Fallback, Some(text))
    }

    /// The explicit "no text available" outcome
    pub fn no_text(resource: &StoredResource) -> Self {
        Self::with_text(resource, Strategy::None, None)
    }

    fn with_text(resource: &StoredResource, strategy: Strategy, text: Option<String>) -> Self {
        Self {
            source: resource.source.clone(),
            path: resource.path.clone(),
            strategy,
            text,
        }
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn has_text(&self) -> bool {
        self.text.is_some()
    }
}
