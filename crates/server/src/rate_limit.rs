//! Per-student request quotas.

use std::collections::HashMap;
use std::fmt::{self, Display};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Stale records are pruned once the table grows beyond this.
const PRUNE_THRESHOLD: usize = 1024;

/// How many requests a student may make per window.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RateLimitPolicy {
    /// Requests allowed in one window.
    pub max_requests: u32,
    /// The length of a window.
    pub window: Duration,
}

/// One student's usage within the current window.
#[derive(Clone, Copy, Debug)]
struct RateLimitRecord {
    window_start: Instant,
    count: u32,
}

/// A rejected request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuotaExceeded {
    /// The policy that was applied.
    pub policy: RateLimitPolicy,
    /// Time until the current window ends.
    pub retry_after: Duration,
}

impl Display for QuotaExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rate limit exceeded: at most {} assessment requests per {} minutes. Try again in {} minutes.",
            self.policy.max_requests,
            self.policy.window.as_secs().div_ceil(60),
            self.retry_after.as_secs().div_ceil(60).max(1),
        )
    }
}

/// Fixed-window request counters keyed by student.
///
/// Checking and incrementing happen under one lock, so two concurrent
/// requests can never both take the last slot. Rejected requests don't
/// count.
#[derive(Debug)]
pub struct RateLimiter {
    policy: RateLimitPolicy,
    records: Mutex<HashMap<String, RateLimitRecord>>,
}

impl RateLimiter {
    /// Creates a limiter with no recorded usage.
    pub fn new(policy: RateLimitPolicy) -> Self {
        Self {
            policy,
            records: Mutex::new(HashMap::new()),
        }
    }

    /// Takes one request from `student`'s quota, returning how many are
    /// left in the window.
    #[inline]
    pub fn try_acquire(&self, student: &str) -> Result<u32, QuotaExceeded> {
        self.try_acquire_at(student, Instant::now())
    }

    fn try_acquire_at(
        &self,
        student: &str,
        now: Instant,
    ) -> Result<u32, QuotaExceeded> {
        let key = student.trim().to_lowercase();
        let window = self.policy.window;
        // The map is never left half-updated, so a poisoned lock is still
        // usable.
        let mut records =
            self.records.lock().unwrap_or_else(PoisonError::into_inner);

        if records.len() > PRUNE_THRESHOLD {
            records
                .retain(|_, r| now.duration_since(r.window_start) < window);
        }

        let record = records.entry(key).or_insert(RateLimitRecord {
            window_start: now,
            count: 0,
        });
        if now.duration_since(record.window_start) >= window {
            record.window_start = now;
            record.count = 0;
        }
        if record.count >= self.policy.max_requests {
            let elapsed = now.duration_since(record.window_start);
            return Err(QuotaExceeded {
                policy: self.policy,
                retry_after: window.saturating_sub(elapsed),
            });
        }
        record.count += 1;
        Ok(self.policy.max_requests - record.count)
    }
}
