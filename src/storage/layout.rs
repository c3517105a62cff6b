//! On-disk layout of the archive
//!
//! Downstream consumers (the document browser, the letter classifier) depend
//! on these directory names, so they are fixed rather than configurable.

use crate::crawler::ContentKind;
use crate::storage::StoredResource;
use crate::url::Locator;
use sha2::{Digest, Sha256};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const HTML_DIR: &str = "html";
const DOCUMENTS_DIR: &str = "pdfs";
const TEXT_DIR: &str = "pdf_text";
const UPLOADS_DIR: &str = "uploads";

/// Paths of the storage areas under one output root
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn html_dir(&self) -> PathBuf {
        self.root.join(HTML_DIR)
    }

    pub fn documents_dir(&self) -> PathBuf {
        self.root.join(DOCUMENTS_DIR)
    }

    pub fn text_dir(&self) -> PathBuf {
        self.root.join(TEXT_DIR)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join(UPLOADS_DIR)
    }

    /// Creates every storage area
    pub fn ensure_dirs(&self) -> io::Result<()> {
        for dir in [
            self.html_dir(),
            self.documents_dir(),
            self.text_dir(),
            self.uploads_dir(),
        ] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    /// Where an HTML page is mirrored: its path under `html/`
    ///
    /// Only a final segment with an extension becomes a file. Directory
    /// locators (`/map/`) and extension-less leaves (`/benefits`) map to
    /// `index.html` inside a directory of that name, and dots in directory
    /// names become `_`. Files therefore always contain a dot and
    /// directories never do, so `/benefits` and `/benefits/overview` can
    /// both be mirrored.
    pub fn html_path(&self, locator: &Locator) -> PathBuf {
        let segments: Vec<&str> = locator
            .path()
            .split('/')
            .filter(|s| !s.is_empty())
            .collect();

        let leaf_is_file = !locator.path().ends_with('/')
            && segments.last().map_or(false, |s| s.contains('.'));
        let (dirs, mut leaf) = match segments.split_last() {
            Some((last, dirs)) if leaf_is_file => (dirs, sanitize_segment(last)),
            _ => (segments.as_slice(), "index.html".to_string()),
        };

        if let Some(query) = locator.query() {
            leaf = insert_before_extension(&leaf, &short_hash("-q", query.as_bytes()));
        }

        let mut path = self.html_dir();
        path.extend(dirs.iter().map(|dir| sanitize_segment(dir).replace('.', "_")));
        path.push(leaf);
        path
    }

    /// Where a document's raw bytes are written: `pdfs/<key>`
    ///
    /// A PDF served from a locator without a `.pdf` suffix gets one, plus a
    /// path hash so it cannot land on the file of the locator that does
    /// carry the suffix.
    pub fn document_path(&self, locator: &Locator, kind: ContentKind) -> PathBuf {
        let mut key = resource_key(locator);
        if kind == ContentKind::Pdf && !key.to_ascii_lowercase().ends_with(".pdf") {
            if is_plain_path(locator.path()) {
                key.push_str(&short_hash("-p", locator.path().as_bytes()));
            }
            key.push_str(".pdf");
        }
        self.documents_dir().join(key)
    }

    /// Where the extracted text of a resource is written: `pdf_text/<key>.txt`
    pub fn text_path(&self, resource: &StoredResource) -> PathBuf {
        let file_name = resource
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "resource".to_string());

        let stem = match resource.kind {
            ContentKind::Pdf => Path::new(&file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or(file_name),
            _ => file_name,
        };

        self.text_dir().join(format!("{}.txt", stem))
    }

    /// Where an uploaded file is kept
    ///
    /// The name carries a hash of the content, so a second upload under the
    /// same name never replaces the bytes an earlier record points at.
    pub fn upload_path(&self, file_name: &str, bytes: &[u8]) -> PathBuf {
        let name = sanitize_segment(file_name);
        self.uploads_dir()
            .join(insert_before_extension(&name, &short_hash("-u", bytes)))
    }

    /// Writes `bytes` to `path` so readers never observe a partial file
    pub fn write_atomic(&self, path: &Path, bytes: &[u8]) -> io::Result<()> {
        let parent = path.parent().unwrap_or(self.root.as_path());
        std::fs::create_dir_all(parent)?;

        let mut tmp = NamedTempFile::new_in(parent)?;
        tmp.write_all(bytes)?;
        tmp.flush()?;
        tmp.persist(path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Filesystem-safe flat key for a locator
///
/// The path's segments are joined with `_`; anything outside
/// `[A-Za-z0-9._-]` becomes `_`. When that loses information (a segment
/// already held `_` or another replaced character, or the path ends in `/`)
/// a short hash of the path is folded in, so `/forms/a.pdf` and
/// `/forms_a.pdf` keep separate files. A query string is folded in the same
/// way, so `form.pdf?v=1` and `form.pdf?v=2` do not overwrite each other.
///
/// # Examples
///
/// ```
/// use site_harvest::storage::resource_key;
/// use site_harvest::url::normalize;
///
/// let locator = normalize("https://example.test/map/forms/apply.pdf", None).unwrap();
/// assert_eq!(resource_key(&locator), "map_forms_apply.pdf");
///
/// let spaced = normalize("https://example.test/map/forms/apply now.pdf", None).unwrap();
/// assert!(resource_key(&spaced).starts_with("map_forms_apply_20now-p"));
/// ```
pub fn resource_key(locator: &Locator) -> String {
    let joined = locator
        .path()
        .split('/')
        .filter(|s| !s.is_empty())
        .map(sanitize_segment)
        .collect::<Vec<_>>()
        .join("_");

    let mut key = if joined.is_empty() {
        "index".to_string()
    } else {
        joined
    };

    if !is_plain_path(locator.path()) {
        key = insert_before_extension(&key, &short_hash("-p", locator.path().as_bytes()));
    }

    match locator.query() {
        Some(query) => insert_before_extension(&key, &short_hash("-q", query.as_bytes())),
        None => key,
    }
}

/// True if joining the segments with `_` loses nothing
fn is_plain_path(path: &str) -> bool {
    !path.ends_with('/')
        && path
            .split('/')
            .filter(|s| !s.is_empty())
            .all(|s| s.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-')))
}

fn sanitize_segment(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}

fn short_hash(tag: &str, input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    format!("{}{}", tag, &hex::encode(digest)[..10])
}

fn insert_before_extension(name: &str, suffix: &str) -> String {
    match name.rfind('.') {
        Some(dot) if dot > 0 => format!("{}{}{}", &name[..dot], suffix, &name[dot..]),
        _ => format!("{}{}", name, suffix),
    }
}
