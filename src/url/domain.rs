use url::Url;

/// Extracts the lowercase host from a URL
///
/// # Examples
///
/// ```
/// use url::Url;
/// use regcrawl::url::extract_host;
///
/// let url = Url::parse("https://SEC.example.gov/path").unwrap();
/// assert_eq!(extract_host(&url), Some("sec.example.gov".to_string()));
/// ```
pub fn extract_host(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns the origin (`scheme://host[:port]`) of a URL
///
/// The port is only present when it differs from the scheme default. This is
/// the key for robots.txt caching and per-origin request spacing.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use regcrawl::url::origin_of;
///
/// let url = Url::parse("https://example.gov:8443/a/b?c=d").unwrap();
/// assert_eq!(origin_of(&url), Some("https://example.gov:8443".to_string()));
/// ```
pub fn origin_of(url: &Url) -> Option<String> {
    let origin = url.origin();
    if origin.is_tuple() {
        Some(origin.ascii_serialization())
    } else {
        None
    }
}

/// Builds the robots.txt URL for the origin of `url`
pub fn robots_url(url: &Url) -> Option<Url> {
    let origin = origin_of(url)?;
    Url::parse(&format!("{}/robots.txt", origin)).ok()
}
