/// Checks if a host matches a wildcard domain pattern
///
/// Supported patterns:
/// 1. Exact match: "example.gov" matches only "example.gov"
/// 2. Wildcard match: "*.example.gov" matches "example.gov" and any subdomain
///
/// Matching is case-insensitive.
///
/// # Examples
///
/// ```
/// use regcrawl::url::matches_wildcard;
///
/// assert!(matches_wildcard("*.example.gov", "press.example.gov"));
/// assert!(matches_wildcard("*.example.gov", "example.gov"));
/// assert!(!matches_wildcard("*.example.gov", "example.org"));
/// ```
pub fn matches_wildcard(pattern: &str, candidate: &str) -> bool {
    let pattern = pattern.to_ascii_lowercase();
    let candidate = candidate.to_ascii_lowercase();

    if let Some(base) = pattern.strip_prefix("*.") {
        candidate == base || candidate.ends_with(&format!(".{}", base))
    } else {
        candidate == pattern
    }
}
