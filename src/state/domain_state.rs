use std::time::{Duration, Instant};

/// Per-origin request spacing state
///
/// Requests to one origin are spaced at least `delay` apart. Callers reserve
/// a slot under a short lock and then sleep until the slot outside of it.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of requests scheduled for this origin
    pub request_count: u32,

    /// Instant of the most recently reserved request slot
    pub last_slot: Option<Instant>,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves the next request slot at or after `now`
    ///
    /// Returns the instant at which the caller may issue its request.
    pub fn reserve(&mut self, now: Instant, delay: Duration) -> Instant {
        let slot = match self.last_slot {
            Some(last) => (last + delay).max(now),
            None => now,
        };
        self.last_slot = Some(slot);
        self.request_count += 1;
        slot
    }

    /// Time until a request could be issued, or None if one can go now
    pub fn time_until_next_request(&self, now: Instant, delay: Duration) -> Option<Duration> {
        let last = self.last_slot?;
        let ready = last + delay;
        if ready > now {
            Some(ready - now)
        } else {
            None
        }
    }
}
