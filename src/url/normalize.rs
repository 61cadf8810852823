use crate::{UrlError, UrlResult};
use url::Url;

/// Tracking query parameters dropped from canonical keys
const TRACKING_PARAMS: &[&str] = &["fbclid", "gclid", "mc_eid"];

/// Produces the canonical form of a URL, used as the frontier's uniqueness key
///
/// # Canonicalization Steps
///
/// 1. Parse the URL; reject if malformed or not http(s)
/// 2. Lowercase scheme and host; path and query keep their case
/// 3. Drop the default port
/// 4. Collapse duplicate slashes and dot segments in the path
/// 5. Remove the trailing slash (except for root /)
/// 6. Remove the fragment
/// 7. Remove tracking query parameters, sort the rest and re-encode them
///
/// # Examples
///
/// ```
/// use regcrawl::url::canonicalize;
///
/// let url = canonicalize("HTTP://Example.COM:80/circulars/#latest").unwrap();
/// assert_eq!(url.as_str(), "http://example.com/circulars");
/// ```
pub fn canonicalize(url_str: &str) -> UrlResult<Url> {
    let mut url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = url.host_str().ok_or(UrlError::MissingHost)?.to_lowercase();
    url.set_host(Some(&host))
        .map_err(|e| UrlError::Parse(format!("invalid host '{}': {}", host, e)))?;

    // `Url` already strips the port when it equals the scheme default
    let path = normalize_path(url.path());
    url.set_path(&path);
    url.set_fragment(None);

    if url.query().is_some() {
        let params = filter_and_sort_query_params(&url);
        if params.is_empty() {
            url.set_query(None);
        } else {
            // Decoded `&` and `=` inside values must be re-encoded
            url.query_pairs_mut().clear().extend_pairs(&params);
        }
    }

    Ok(url)
}

/// Canonical key string for a URL
pub fn canonical_key(url_str: &str) -> UrlResult<String> {
    canonicalize(url_str).map(String::from)
}

/// Strips the fragment from a URL while leaving everything else as discovered
///
/// This is the form that is actually fetched; the canonical form is only a key.
pub fn strip_fragment(url: &Url) -> Url {
    let mut fetchable = url.clone();
    fetchable.set_fragment(None);
    fetchable
}

fn normalize_path(path: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();

    for segment in path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                segments.pop();
            }
            _ => segments.push(segment),
        }
    }

    if segments.is_empty() {
        return "/".to_string();
    }

    format!("/{}", segments.join("/"))
}

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
