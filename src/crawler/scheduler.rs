//! Per-origin politeness scheduling
//!
//! Requests to one origin are spaced at least `delay` apart, across every
//! job sharing the scheduler. The global worker limit is enforced by the
//! job's worker pool, not here.

use crate::state::DomainState;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

#[derive(Debug)]
pub struct Scheduler {
    delay: Duration,
    domain_states: Mutex<HashMap<String, DomainState>>,
}

impl Scheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            domain_states: Mutex::new(HashMap::new()),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Reserves the next request slot for `origin`
    ///
    /// The slot is claimed under the lock; the caller waits for it outside.
    pub fn reserve(&self, origin: &str) -> Instant {
        let now = Instant::now();
        let mut states = self.lock();
        let slot = states
            .entry(origin.to_string())
            .or_default()
            .reserve(now.into_std(), self.delay);
        Instant::from_std(slot)
    }

    /// Waits until `origin` may receive the next request
    ///
    /// Returns false if `cancel` fired first.
    pub async fn wait_turn(&self, origin: &str, cancel: &CancellationToken) -> bool {
        let slot = self.reserve(origin);
        if slot <= Instant::now() {
            return !cancel.is_cancelled();
        }

        tracing::trace!("Waiting {:?} for {}", slot - Instant::now(), origin);

        tokio::select! {
            _ = cancel.cancelled() => false,
            _ = tokio::time::sleep_until(slot) => true,
        }
    }

    /// Time until `origin` could receive a request right now
    pub fn time_until_ready(&self, origin: &str) -> Option<Duration> {
        let now = Instant::now().into_std();
        self.lock()
            .get(origin)
            .and_then(|state| state.time_until_next_request(now, self.delay))
    }

    /// Number of requests scheduled for `origin` so far
    pub fn request_count(&self, origin: &str) -> u32 {
        self.lock()
            .get(origin)
            .map(|state| state.request_count)
            .unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, DomainState>> {
        self.domain_states.lock().unwrap_or_else(|e| e.into_inner())
    }
}
