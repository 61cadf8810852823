//! URL handling
//!
//! Canonicalization (the frontier's uniqueness key), origin extraction for
//! robots.txt and politeness, and link scope checks for discovered links.

mod domain;
mod matcher;
mod normalize;

pub use domain::{extract_host, origin_of, robots_url};
pub use matcher::matches_wildcard;
pub use normalize::{canonical_key, canonicalize, strip_fragment};

use serde::Deserialize;
use url::Url;

/// Which discovered links are eligible for the frontier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LinkScope {
    /// Only links on the seed's host (plus any allowed domains)
    #[default]
    SameHost,
    /// Any http(s) link
    Any,
}

/// Decides whether a discovered link stays within a job's crawl scope
#[derive(Debug, Clone)]
pub struct ScopeFilter {
    scope: LinkScope,
    seed_host: String,
    allowed_domains: Vec<String>,
}

impl ScopeFilter {
    pub fn new(scope: LinkScope, seed: &Url, allowed_domains: &[String]) -> Self {
        Self {
            scope,
            seed_host: extract_host(seed).unwrap_or_default(),
            allowed_domains: allowed_domains.to_vec(),
        }
    }

    /// Returns true if `link` may be offered to the frontier
    pub fn allows(&self, link: &Url) -> bool {
        if link.scheme() != "http" && link.scheme() != "https" {
            return false;
        }

        let host = match extract_host(link) {
            Some(h) => h,
            None => return false,
        };

        match self.scope {
            LinkScope::Any => true,
            LinkScope::SameHost => {
                host == self.seed_host
                    || self
                        .allowed_domains
                        .iter()
                        .any(|pattern| matches_wildcard(pattern, &host))
            }
        }
    }
}
