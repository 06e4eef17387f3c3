//! Per-user token bucket gating model calls.
//!
//! State lives in process memory only. Behind several instances each one
//! keeps its own buckets, so the limit is advisory until the buckets are
//! moved to a shared store.

use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: u32 },
    Denied { retry_after_secs: u64 },
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

pub struct RateLimiter {
    capacity: u32,
    refill_every: Duration,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    pub fn new(capacity: u32, refill_every: Duration) -> Self {
        Self {
            capacity,
            refill_every: refill_every.max(Duration::from_secs(1)),
            buckets: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, user_id: &str) -> Decision {
        self.check_at(user_id, Instant::now())
    }

    /// Refills, then consumes one token if available. Explicit `now` for tests.
    pub fn check_at(&self, user_id: &str, now: Instant) -> Decision {
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = buckets.entry(user_id.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        self.refill(bucket, now);

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            Decision::Allowed {
                remaining: bucket.tokens,
            }
        } else {
            Decision::Denied {
                retry_after_secs: self.retry_after(bucket, now),
            }
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let intervals = elapsed.as_secs() / self.refill_every.as_secs();
        if intervals == 0 {
            return;
        }
        let granted = u32::try_from(intervals).unwrap_or(u32::MAX);
        bucket.tokens = bucket.tokens.saturating_add(granted).min(self.capacity);
        if bucket.tokens == self.capacity {
            bucket.last_refill = now;
        } else {
            // Keep partial progress toward the next token.
            bucket.last_refill += self.refill_every * granted;
        }
    }

    fn retry_after(&self, bucket: &Bucket, now: Instant) -> u64 {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let remaining = self.refill_every.saturating_sub(elapsed);
        // Round up to whole seconds, never below one.
        let secs = remaining.as_secs() + u64::from(remaining.subsec_nanos() > 0);
        secs.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(5, Duration::from_secs(60))
    }

    #[test]
    fn sixth_call_in_a_burst_is_denied() {
        let limiter = limiter();
        let start = Instant::now();
        for i in 0..5 {
            let at = start + Duration::from_millis(i * 100);
            assert!(limiter.check_at("alice", at).is_allowed(), "call {}", i + 1);
        }
        match limiter.check_at("alice", start + Duration::from_millis(900)) {
            Decision::Denied { retry_after_secs } => {
                assert!(retry_after_secs > 0);
                assert!(retry_after_secs <= 60);
            }
            other => panic!("expected denial, got {:?}", other),
        }
    }

    #[test]
    fn users_have_independent_buckets() {
        let limiter = limiter();
        let now = Instant::now();
        for _ in 0..5 {
            limiter.check_at("alice", now);
        }
        assert!(!limiter.check_at("alice", now).is_allowed());
        assert!(limiter.check_at("bob", now).is_allowed());
    }

    #[test]
    fn one_token_per_interval_and_capped() {
        let limiter = limiter();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.check_at("alice", start);
        }

        let later = start + Duration::from_secs(61);
        assert_eq!(
            limiter.check_at("alice", later),
            Decision::Allowed { remaining: 0 }
        );
        assert!(!limiter.check_at("alice", later).is_allowed());

        // An hour idle refills to the cap, not beyond it.
        let much_later = later + Duration::from_secs(3600);
        assert_eq!(
            limiter.check_at("alice", much_later),
            Decision::Allowed { remaining: 4 }
        );
    }

    #[test]
    fn retry_after_counts_down_to_next_token() {
        let limiter = limiter();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.check_at("alice", start);
        }
        assert_eq!(
            limiter.check_at("alice", start + Duration::from_secs(45)),
            Decision::Denied { retry_after_secs: 15 }
        );
        assert_eq!(
            limiter.check_at("alice", start + Duration::from_millis(59_500)),
            Decision::Denied { retry_after_secs: 1 }
        );
    }

    #[test]
    fn partial_progress_survives_a_refill() {
        let limiter = limiter();
        let start = Instant::now();
        for _ in 0..5 {
            limiter.check_at("alice", start);
        }
        // 90s: one token granted, 30s of progress kept toward the next.
        assert!(limiter.check_at("alice", start + Duration::from_secs(90)).is_allowed());
        assert!(limiter.check_at("alice", start + Duration::from_secs(120)).is_allowed());
    }
}
