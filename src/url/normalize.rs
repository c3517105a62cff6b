use crate::url::Locator;
use crate::UrlError;
use url::Url;

/// Tracking query parameters removed during normalization
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Normalizes a raw locator according to Site-Harvest's identity rules
///
/// # Normalization Steps
///
/// 1. Resolve `raw` against `base` when given (relative hrefs), otherwise
///    parse it as an absolute URL; reject if malformed
/// 2. Reject anything that is not `http` or `https`, or has no host
/// 3. Lowercase scheme and host, drop the default port (done by the parser)
/// 4. Remove dot segments from the path (done by the parser)
/// 5. Remove the fragment
/// 6. Remove tracking query parameters and sort what remains
/// 7. Remove an empty query string (trailing `?`)
///
/// Unlike a link-graph mapper, the path is otherwise kept verbatim: a
/// trailing slash or a `www.` prefix addresses a different resource on the
/// sites we archive.
///
/// # Examples
///
/// ```
/// use site_harvest::url::normalize;
///
/// let locator = normalize("HTTP://Example.TEST:80/map/index.html#top", None).unwrap();
/// assert_eq!(locator.as_str(), "http://example.test/map/index.html");
/// ```
pub fn normalize(raw: &str, base: Option<&Url>) -> Result<Locator, UrlError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Malformed("empty locator".to_string()));
    }

    let mut url = match base {
        Some(base) => base.join(raw),
        None => Url::parse(raw),
    }
    .map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(format!(
            "Only HTTP and HTTPS schemes are supported, got: {}",
            url.scheme()
        )));
    }

    match url.host_str() {
        Some(host) if !host.is_empty() => {
            // The parser already lowercases domains; IP literals pass through.
            let lowered = host.to_lowercase();
            if lowered != host {
                url.set_host(Some(&lowered))
                    .map_err(|e| UrlError::Malformed(format!("Failed to set host: {}", e)))?;
            }
        }
        _ => return Err(UrlError::MissingHost),
    }

    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(params);
        }
    }

    Ok(Locator::from_normalized(url))
}

/// Filters out tracking parameters and sorts remaining query parameters
fn filter_and_sort_query_params(url: &Url) -> Vec<(String, String)> {
    let mut params: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !is_tracking_param(key))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    params.sort();
    params
}

fn is_tracking_param(key: &str) -> bool {
    TRACKING_PARAMS.contains(&key) || key.starts_with("utm_")
}
