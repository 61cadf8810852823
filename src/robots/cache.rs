//! Per-origin robots.txt cache with single-flight population
//!
//! Entries live until process restart or explicit invalidation. Concurrent
//! first lookups for one origin share a single in-flight fetch.

use crate::robots::RobotsRuleSet;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::OnceCell;

type Slot = Arc<OnceCell<Arc<RobotsRuleSet>>>;

#[derive(Debug, Default)]
pub struct RobotsCache {
    slots: Mutex<HashMap<String, Slot>>,
}

impl RobotsCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached rules for `origin`, running `fetch` at most once
    /// across all concurrent callers when the entry is missing
    pub async fn get_or_fetch<F, Fut>(&self, origin: &str, fetch: F) -> Arc<RobotsRuleSet>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RobotsRuleSet>,
    {
        // The map lock only guards slot lookup; the fetch runs outside it
        let slot = {
            let mut slots = self.lock();
            slots.entry(origin.to_string()).or_default().clone()
        };

        slot.get_or_init(|| async { Arc::new(fetch().await) })
            .await
            .clone()
    }

    /// Cached rules for `origin`, if populated
    pub fn get(&self, origin: &str) -> Option<Arc<RobotsRuleSet>> {
        self.lock().get(origin).and_then(|slot| slot.get().cloned())
    }

    /// Drops the entry for `origin`; the next lookup refetches
    pub fn invalidate(&self, origin: &str) -> bool {
        self.lock().remove(origin).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Slot>> {
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}
