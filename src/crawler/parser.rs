//! HTML parsing for link discovery
//!
//! Only the raw `href` values are collected here. Resolution against the
//! page, boundary checks and counting of rejects belong to the coordinator,
//! which owns the [`crate::url::normalize`] call.

use scraper::{Html, Selector};

/// What the coordinator needs from an HTML page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedPage {
    /// Text of the first non-empty `<title>`
    pub title: Option<String>,

    /// `<base href>`, if the page declares one
    pub base: Option<String>,

    /// Candidate link targets in document order, still unresolved
    pub links: Vec<String>,
}

/// Parses an HTML document and collects candidate links
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">`, including `download` links (documents are wanted)
/// - `<area href="...">` from image maps
/// - `<link rel="canonical" href="...">`
///
/// **Exclude:**
/// - `javascript:`, `mailto:`, `tel:` and `data:` targets
/// - Fragment-only links to the same page
/// - Stylesheets, scripts and inline images
///
/// # Examples
///
/// ```
/// use site_harvest::crawler::parse_html;
///
/// let html = r#"<html><head><title>Map</title></head>
///     <body><a href="/map/a.html">A</a><a href="mailto:x@y.test">mail</a></body></html>"#;
/// let parsed = parse_html(html);
/// assert_eq!(parsed.title.as_deref(), Some("Map"));
/// assert_eq!(parsed.links, vec!["/map/a.html".to_string()]);
/// ```
pub fn parse_html(html: &str) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        base: extract_base(&document),
        links: extract_links(&document),
    }
}

fn extract_title(document: &Html) -> Option<String> {
    let selector = Selector::parse("title").ok()?;

    document
        .select(&selector)
        .map(|element| element.text().collect::<String>().trim().to_string())
        .find(|s| !s.is_empty())
}

fn extract_base(document: &Html) -> Option<String> {
    let selector = Selector::parse("base[href]").ok()?;

    document
        .select(&selector)
        .filter_map(|element| element.value().attr("href"))
        .map(str::trim)
        .find(|href| !href.is_empty())
        .map(str::to_string)
}

fn extract_links(document: &Html) -> Vec<String> {
    let mut links = Vec::new();

    for pattern in ["a[href]", "area[href]", "link[rel='canonical'][href]"] {
        let Ok(selector) = Selector::parse(pattern) else {
            continue;
        };
        links.extend(
            document
                .select(&selector)
                .filter_map(|element| element.value().attr("href"))
                .filter_map(candidate),
        );
    }

    links
}

/// Filters out hrefs that can never name a fetchable resource
fn candidate(href: &str) -> Option<String> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    Some(href.to_string())
}
