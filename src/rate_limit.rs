use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use tokio::time::interval;

use crate::metrics::TRACKED_CLIENTS;

// Bucket key used when the client address cannot be determined.
// All such clients share a single bucket instead of failing the request.
pub const UNKNOWN_CLIENT: &str = "unknown";

// Outcome of a rate limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Admit,
    // retry_after = time until the oldest recorded request ages out
    Reject { retry_after: Duration },
}

impl Decision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Decision::Admit)
    }
}

// Policy knobs, validated by the config layer before the limiter is built
#[derive(Debug, Clone)]
pub struct RateLimitPolicy {
    pub max_requests: usize,
    pub window: Duration,
}

// Sliding-window log limiter: one timestamp log per client key, pruned
// lazily on every access for that key.
pub struct RateLimiter {
    max_requests: usize,
    window: Duration,
    log: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            max_requests: policy.max_requests,
            window: policy.window,
            log: DashMap::new(),
        }
    }

    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    // Admit or reject a request from `key` arriving at `now`.
    //
    // The whole prune-count-decide-append sequence runs under the shard
    // guard returned by entry(), so two requests for the same key can never
    // both observe count == max_requests - 1 and both get admitted.
    pub fn check_and_record(&self, key: &str, now: Instant) -> Decision {
        // checked_sub: early in process life `now` may be closer to the
        // Instant origin than the window; nothing is old enough to prune then
        let cutoff = now.checked_sub(self.window);

        let mut entries = self.log.entry(key.to_string()).or_default();

        if let Some(cutoff) = cutoff {
            while entries.front().is_some_and(|&t| t < cutoff) {
                entries.pop_front();
            }
        }

        if entries.len() >= self.max_requests {
            let retry_after = entries
                .front()
                .map(|&oldest| (oldest + self.window).saturating_duration_since(now))
                .unwrap_or(self.window);
            return Decision::Reject { retry_after };
        }

        entries.push_back(now);
        Decision::Admit
    }

    // Raw number of recorded entries for a key (no pruning)
    pub fn recorded(&self, key: &str) -> usize {
        self.log.get(key).map_or(0, |entries| entries.value().len())
    }

    // Number of client keys currently held in the store
    pub fn tracked_keys(&self) -> usize {
        self.log.len()
    }

    // Drop keys whose every entry has aged out of the window. Only keys
    // with no live entries are removed, so a purge can never change the
    // outcome of a later check.
    pub fn purge_idle(&self, now: Instant) {
        let Some(cutoff) = now.checked_sub(self.window) else {
            return;
        };
        self.log.retain(|_, entries| entries.iter().any(|&t| t >= cutoff));
    }
}

// Periodic idle-key purge - keeps the store from growing with every client
// address ever seen. Runs for the lifetime of the process.
pub async fn purge_task(limiter: Arc<RateLimiter>, every: Duration) {
    let mut tick = interval(every);
    tracing::info!(every_secs = every.as_secs(), "idle-key purge started");

    loop {
        tick.tick().await;
        limiter.purge_idle(Instant::now());
        TRACKED_CLIENTS.set(limiter.tracked_keys() as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const WINDOW: Duration = Duration::from_secs(60);

    fn limiter(max_requests: usize) -> RateLimiter {
        RateLimiter::new(RateLimitPolicy {
            max_requests,
            window: WINDOW,
        })
    }

    fn at(base: Instant, secs: u64) -> Instant {
        base + Duration::from_secs(secs)
    }

    #[test]
    fn admits_up_to_limit_then_rejects() {
        let l = limiter(5);
        let base = Instant::now();

        for s in 0..5 {
            assert_eq!(l.check_and_record("k", at(base, s)), Decision::Admit);
        }
        assert!(matches!(
            l.check_and_record("k", at(base, 5)),
            Decision::Reject { .. }
        ));
    }

    #[test]
    fn admits_again_once_oldest_entry_ages_out() {
        let l = limiter(5);
        let base = Instant::now();

        for s in 0..5 {
            assert_eq!(l.check_and_record("k", at(base, s)), Decision::Admit);
        }
        // the entry from t=0 is outside the window by t=61
        assert_eq!(l.check_and_record("k", at(base, 61)), Decision::Admit);
    }

    #[test]
    fn keys_do_not_interfere() {
        let l = limiter(5);
        let base = Instant::now();

        for s in 0..5 {
            assert_eq!(l.check_and_record("k1", at(base, s)), Decision::Admit);
            assert_eq!(l.check_and_record("k2", at(base, s)), Decision::Admit);
        }
        assert_eq!(l.recorded("k1"), 5);
        assert_eq!(l.recorded("k2"), 5);
    }

    #[test]
    fn rejection_does_not_touch_the_log() {
        let l = limiter(1);
        let base = Instant::now();

        assert_eq!(l.check_and_record("k", at(base, 0)), Decision::Admit);
        assert_eq!(l.recorded("k"), 1);

        assert!(matches!(
            l.check_and_record("k", at(base, 10)),
            Decision::Reject { .. }
        ));
        assert_eq!(l.recorded("k"), 1);

        // the rejected request did not extend the window
        assert_eq!(l.check_and_record("k", at(base, 61)), Decision::Admit);
    }

    #[test]
    fn retry_after_counts_down_to_oldest_expiry() {
        let l = limiter(1);
        let base = Instant::now();

        assert_eq!(l.check_and_record("k", at(base, 0)), Decision::Admit);

        let Decision::Reject { retry_after } = l.check_and_record("k", at(base, 20)) else {
            panic!("expected rejection");
        };
        assert_eq!(retry_after, Duration::from_secs(40));
    }

    #[test]
    fn pruning_keeps_only_entries_inside_the_window() {
        let l = limiter(5);
        let base = Instant::now();

        for s in 0..5 {
            l.check_and_record("k", at(base, s));
        }
        // all five entries are stale by t=100; only the new one survives
        assert_eq!(l.check_and_record("k", at(base, 100)), Decision::Admit);
        assert_eq!(l.recorded("k"), 1);
    }

    #[test]
    fn cap_holds_across_every_sliding_window() {
        let l = limiter(3);
        let base = Instant::now();

        let mut admitted = Vec::new();
        for s in 0..180 {
            if l.check_and_record("k", at(base, s)).is_admit() {
                admitted.push(s);
            }
        }

        for start in 0..=120u64 {
            let inside = admitted
                .iter()
                .filter(|&&s| s >= start && s < start + 60)
                .count();
            assert!(inside <= 3, "window starting at {start} admitted {inside}");
        }
    }

    #[test]
    fn same_instant_requests_admit_exactly_once() {
        let l = Arc::new(limiter(1));
        let now = Instant::now();

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let l = Arc::clone(&l);
                thread::spawn(move || l.check_and_record("k", now).is_admit())
            })
            .collect();

        let admits = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&admitted| admitted)
            .count();
        assert_eq!(admits, 1);
    }

    #[test]
    fn concurrent_burst_never_exceeds_the_cap() {
        let l = Arc::new(limiter(5));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let l = Arc::clone(&l);
                thread::spawn(move || {
                    (0..50)
                        .filter(|_| l.check_and_record("k", now).is_admit())
                        .count()
                })
            })
            .collect();

        let admits: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admits, 5);
    }

    #[test]
    fn purge_drops_idle_keys_only() {
        let l = limiter(5);
        let base = Instant::now();

        l.check_and_record("old", at(base, 0));
        l.check_and_record("fresh", at(base, 70));
        assert_eq!(l.tracked_keys(), 2);

        l.purge_idle(at(base, 70));
        assert_eq!(l.tracked_keys(), 1);
        assert_eq!(l.recorded("fresh"), 1);
        assert_eq!(l.recorded("old"), 0);
    }

    #[test]
    fn backwards_now_never_evicts_newer_entries() {
        let l = limiter(2);
        let base = Instant::now();

        assert_eq!(l.check_and_record("k", at(base, 120)), Decision::Admit);
        // clock stepped back: the t=120 entry must survive the prune
        assert_eq!(l.check_and_record("k", at(base, 90)), Decision::Admit);
        assert_eq!(l.recorded("k"), 2);
    }
}
