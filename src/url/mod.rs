//! URL handling module for Site-Harvest
//!
//! This module is the single authority on locator identity and on the crawl
//! boundary: everything the frontier accepts has passed through [`normalize`]
//! and [`in_boundary`].

mod boundary;
mod normalize;

use std::fmt;
use url::Url;

pub use boundary::{in_boundary, Boundary};
pub use normalize::normalize;

/// A normalized, absolute `http`/`https` resource address
///
/// Two locators are equal iff their normalized serializations are equal.
/// The only way to obtain one is through [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator(Url);

impl Locator {
    pub(crate) fn from_normalized(url: Url) -> Self {
        Self(url)
    }

    /// The normalized serialization
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// The lowercase host
    pub fn host(&self) -> &str {
        self.0.host_str().unwrap_or_default()
    }

    /// The path component, always starting with `/`
    pub fn path(&self) -> &str {
        self.0.path()
    }

    /// The query string, if any
    pub fn query(&self) -> Option<&str> {
        self.0.query()
    }

    /// Borrow the underlying URL, e.g. as a base for resolving links
    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

impl AsRef<str> for Locator {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}
