//! Robots.txt handling module
//!
//! Fetches, parses and caches robots.txt per origin and answers allow/deny
//! queries. Unavailable robots files (timeout, network error, non-2xx) are
//! treated as "no rules", so crawling proceeds.

mod cache;
mod parser;

pub use cache::RobotsCache;
pub use parser::RobotsRuleSet;

use crate::url::{origin_of, robots_url};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Allow/deny decisions backed by a shared per-origin cache
///
/// One policy is shared by every job of a `Crawler`; jobs crawling the same
/// origin reuse the same rule set.
#[derive(Debug)]
pub struct RobotsPolicy {
    client: Client,
    timeout: Duration,
    cache: RobotsCache,
}

impl RobotsPolicy {
    pub fn new(client: Client, timeout: Duration) -> Self {
        Self {
            client,
            timeout,
            cache: RobotsCache::new(),
        }
    }

    /// Returns true if `url` may be fetched
    pub async fn is_allowed(&self, url: &Url) -> bool {
        match self.rules_for(url).await {
            Some(rules) => rules.is_allowed(url.path()),
            None => true,
        }
    }

    /// Rule set for the origin of `url`, fetching it on first use
    pub async fn rules_for(&self, url: &Url) -> Option<Arc<RobotsRuleSet>> {
        let origin = origin_of(url)?;
        let robots = robots_url(url)?;

        Some(
            self.cache
                .get_or_fetch(&origin, || self.fetch_rules(robots))
                .await,
        )
    }

    /// Drops the cached rules for `origin` (`scheme://host[:port]`)
    pub fn invalidate(&self, origin: &str) -> bool {
        self.cache.invalidate(origin)
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    pub fn cached_origins(&self) -> usize {
        self.cache.len()
    }

    async fn fetch_rules(&self, robots: Url) -> RobotsRuleSet {
        debug!("Fetching {}", robots);

        let response = match self.client.get(robots.clone()).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!("robots.txt unavailable at {} ({}), allowing all", robots, e);
                return RobotsRuleSet::allow_all();
            }
        };

        if !response.status().is_success() {
            debug!(
                "robots.txt at {} returned {}, allowing all",
                robots,
                response.status()
            );
            return RobotsRuleSet::allow_all();
        }

        match response.text().await {
            Ok(body) => {
                let rules = RobotsRuleSet::parse(&body);
                debug!(
                    "Loaded {} disallow rules from {}",
                    rules.disallow_rules().len(),
                    robots
                );
                rules
            }
            Err(e) => {
                warn!("Failed to read robots.txt body at {}: {}", robots, e);
                RobotsRuleSet::allow_all()
            }
        }
    }
}
