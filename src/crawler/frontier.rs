//! Breadth-first traversal queue of one job
//!
//! The frontier owns the job's canonical-URL uniqueness set and its page
//! and depth budgets:
//! - `offer` is a no-op for a URL whose canonical form is already queued
//!   or visited, and rejects entries deeper than `max_depth`
//! - `next` returns nothing once `max_pages` entries have been dequeued,
//!   whatever is left in the queue

use crate::url::{canonical_key, strip_fragment};
use crate::{CrawlError, UrlResult};
use std::collections::{HashSet, VecDeque};
use url::Url;

/// A URL awaiting traversal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrontierEntry {
    /// URL to fetch (as discovered, fragment removed)
    pub url: Url,

    /// Canonical form, the uniqueness key
    pub canonical: String,

    /// Link distance from the seed (seed = 0)
    pub depth: u32,

    /// Enqueue order within the job
    pub order: u64,
}

#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,

    /// Canonical keys ever enqueued (queued or visited)
    seen: HashSet<String>,

    /// Canonical keys dequeued so far
    visited: HashSet<String>,

    max_pages: u32,
    max_depth: u32,
    dequeued: u32,
    next_order: u64,
}

impl Frontier {
    pub fn new(max_pages: u32, max_depth: u32) -> Self {
        Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            visited: HashSet::new(),
            max_pages,
            max_depth,
            dequeued: 0,
            next_order: 0,
        }
    }

    /// Enqueues the seed at depth 0
    pub fn seed(&mut self, url: &Url) -> UrlResult<bool> {
        let canonical = canonical_key(url.as_str())?;
        Ok(self.push(url, canonical, 0))
    }

    /// Offers a discovered URL at `depth`
    ///
    /// Returns true if the URL was enqueued. URLs that cannot be
    /// canonicalized are dropped.
    pub fn offer(&mut self, url: &Url, depth: u32) -> bool {
        if depth > self.max_depth {
            return false;
        }

        match canonical_key(url.as_str()) {
            Ok(canonical) => self.push(url, canonical, depth),
            Err(_) => false,
        }
    }

    /// Dequeues the next entry in FIFO order
    ///
    /// Returns `Ok(None)` when the queue is empty or the page budget is
    /// spent. An entry whose canonical form was already dequeued means the
    /// uniqueness set is corrupt and is reported as an error.
    pub fn next(&mut self) -> Result<Option<FrontierEntry>, CrawlError> {
        if self.budget_reached() {
            return Ok(None);
        }

        let Some(entry) = self.queue.pop_front() else {
            return Ok(None);
        };

        if !self.visited.insert(entry.canonical.clone()) {
            return Err(CrawlError::Frontier(format!(
                "{} dequeued twice",
                entry.canonical
            )));
        }

        self.dequeued += 1;
        Ok(Some(entry))
    }

    /// True when `next` can no longer return an entry
    pub fn is_exhausted(&self) -> bool {
        self.budget_reached() || self.queue.is_empty()
    }

    pub fn budget_reached(&self) -> bool {
        self.dequeued >= self.max_pages
    }

    /// Number of entries dequeued so far
    pub fn dequeued(&self) -> u32 {
        self.dequeued
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    fn push(&mut self, url: &Url, canonical: String, depth: u32) -> bool {
        if !self.seen.insert(canonical.clone()) {
            return false;
        }

        self.queue.push_back(FrontierEntry {
            url: strip_fragment(url),
            canonical,
            depth,
            order: self.next_order,
        });
        self.next_order += 1;
        true
    }
}
