use crate::url::Locator;

/// The domain a crawl run is restricted to
///
/// A locator is inside the boundary when its host equals `host` exactly and,
/// if any `allowed_paths` are configured, its path starts with one of them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Boundary {
    host: String,
    allowed_paths: Vec<String>,
}

impl Boundary {
    /// Creates a boundary covering every path on `host`
    pub fn new(host: &str) -> Self {
        Self {
            host: host.trim().to_lowercase(),
            allowed_paths: Vec::new(),
        }
    }

    /// Restricts the boundary to locators under the given path prefixes
    pub fn with_allowed_paths<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_paths = prefixes.into_iter().map(Into::into).collect();
        self
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn allowed_paths(&self) -> &[String] {
        &self.allowed_paths
    }
}

/// Decides whether a locator lies inside the crawl boundary
///
/// Subdomains are *not* inside the boundary: `news.example.test` is a
/// different site from `example.test`.
///
/// # Examples
///
/// ```
/// use site_harvest::url::{in_boundary, normalize, Boundary};
///
/// let boundary = Boundary::new("example.test");
/// let inside = normalize("https://example.test/map/index.html", None).unwrap();
/// let outside = normalize("https://shop.example.test/", None).unwrap();
/// assert!(in_boundary(&inside, &boundary));
/// assert!(!in_boundary(&outside, &boundary));
/// ```
pub fn in_boundary(locator: &Locator, boundary: &Boundary) -> bool {
    if locator.host() != boundary.host {
        return false;
    }

    boundary.allowed_paths.is_empty()
        || boundary
            .allowed_paths
            .iter()
            .any(|prefix| locator.path().starts_with(prefix.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::url::normalize;

    fn loc(raw: &str) -> Locator {
        normalize(raw, None).unwrap()
    }

    #[test]
    fn test_exact_host_match() {
        let boundary = Boundary::new("example.test");
        assert!(in_boundary(&loc("https://example.test/"), &boundary));
        assert!(in_boundary(&loc("http://example.test/map/a.pdf"), &boundary));
    }

    #[test]
    fn test_other_hosts_rejected() {
        let boundary = Boundary::new("example.test");
        assert!(!in_boundary(&loc("https://other.test/"), &boundary));
        assert!(!in_boundary(&loc("https://sub.example.test/"), &boundary));
        assert!(!in_boundary(&loc("https://example.test.evil/"), &boundary));
        assert!(!in_boundary(&loc("https://myexample.test/"), &boundary));
    }

    #[test]
    fn test_boundary_host_is_case_insensitive() {
        let boundary = Boundary::new("  Example.TEST ");
        assert_eq!(boundary.host(), "example.test");
        assert!(in_boundary(&loc("https://EXAMPLE.test/x"), &boundary));
    }

    #[test]
    fn test_port_does_not_affect_host_match() {
        let boundary = Boundary::new("127.0.0.1");
        assert!(in_boundary(&loc("http://127.0.0.1:4321/map/"), &boundary));
    }

    #[test]
    fn test_allowed_paths() {
        let boundary = Boundary::new("example.test")
            .with_allowed_paths(["/map/card-services/", "/map/deskfile/"]);

        assert!(in_boundary(
            &loc("https://example.test/map/card-services/index.html"),
            &boundary
        ));
        assert!(in_boundary(
            &loc("https://example.test/map/deskfile/a/b.html"),
            &boundary
        ));
        assert!(!in_boundary(
            &loc("https://example.test/map/index.html"),
            &boundary
        ));
        assert!(!in_boundary(
            &loc("https://other.test/map/card-services/index.html"),
            &boundary
        ));
    }
}
