//! Per-domain rate limiting state.

use std::time::{Duration, Instant};

/// State for a single domain.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Current interval between requests.
    pub current_delay: Duration,
    /// Start time of the most recently reserved request slot. May lie in the
    /// future when several tasks are queued on the same domain.
    pub last_request: Option<Instant>,
    /// Consecutive successes since the last rate limit.
    pub consecutive_successes: u32,
    pub in_backoff: bool,
    pub total_requests: u64,
    pub rate_limit_hits: u64,
}

impl DomainState {
    pub fn new(base_delay: Duration) -> Self {
        Self {
            current_delay: base_delay,
            last_request: None,
            consecutive_successes: 0,
            in_backoff: false,
            total_requests: 0,
            rate_limit_hits: 0,
        }
    }

    /// Reserve the next request slot at or after `now` and return how long
    /// the caller has to wait for it.
    pub fn reserve(&mut self, now: Instant) -> Duration {
        let slot = match self.last_request {
            Some(last) => (last + self.current_delay).max(now),
            None => now,
        };
        self.last_request = Some(slot);
        self.total_requests += 1;
        slot - now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reservations_are_spaced_by_delay() {
        let mut state = DomainState::new(Duration::from_millis(200));
        let now = Instant::now();

        assert_eq!(state.reserve(now), Duration::ZERO);
        assert_eq!(state.reserve(now), Duration::from_millis(200));
        assert_eq!(state.reserve(now), Duration::from_millis(400));
        assert_eq!(state.total_requests, 3);
    }

    #[test]
    fn test_idle_domain_is_ready() {
        let mut state = DomainState::new(Duration::from_millis(200));
        let start = Instant::now();
        state.reserve(start);

        let later = start + Duration::from_secs(1);
        assert_eq!(state.reserve(later), Duration::ZERO);
    }
}
