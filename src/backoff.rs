//! Jittered exponential backoff for redelivering an envelope.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Default base delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(100);
/// Default maximum delay for exponential backoff retries.
pub const DEFAULT_BACKOFF_CAP: Duration = Duration::from_secs(10);
/// Default duration of healthy deliveries that resets backoff state.
pub const DEFAULT_BACKOFF_RESET: Duration = Duration::from_secs(30);
/// Default absolute deadline for redelivery of one envelope.
pub const DEFAULT_BACKOFF_DEADLINE: Duration = Duration::from_secs(120);

const MIN_SLEEP_MS: u64 = 10;

/// Exponential backoff policy for redelivery attempts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    pub reset_after: Duration,
    pub deadline: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: DEFAULT_BACKOFF_BASE,
            cap: DEFAULT_BACKOFF_CAP,
            reset_after: DEFAULT_BACKOFF_RESET,
            deadline: DEFAULT_BACKOFF_DEADLINE,
        }
    }
}

/// Tracks consecutive delivery failures and produces jittered delays.
pub struct BackoffState {
    policy: BackoffPolicy,
    current: Duration,
    failure_since: Option<Instant>,
    last_success: Option<Instant>,
    rng: StdRng,
}

impl BackoffState {
    /// Create a new state machine from the supplied policy.
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.base,
            failure_since: None,
            last_success: None,
            rng: StdRng::from_entropy(),
            policy,
        }
    }

    /// Record a delivered envelope.
    ///
    /// The failure window closes immediately; the delay only drops back to
    /// the base once deliveries have been healthy for `reset_after`.
    pub fn record_success(&mut self, now: Instant) {
        self.failure_since = None;
        match self.last_success {
            Some(since) if now.duration_since(since) >= self.policy.reset_after => {
                self.current = self.policy.base;
            }
            None => self.last_success = Some(now),
            Some(_) => {}
        }
    }

    /// Calculate the next sleep after a retryable failure.
    ///
    /// Returns `None` once failures have persisted past the policy
    /// deadline; the caller should then give up on the envelope.
    pub fn next_sleep(&mut self, now: Instant) -> Option<Duration> {
        self.last_success = None;
        let start = *self.failure_since.get_or_insert(now);
        if now.duration_since(start) >= self.policy.deadline {
            self.failure_since = None;
            return None;
        }
        if now != start {
            self.current = self.current.saturating_mul(2).min(self.policy.cap);
        }

        let max_ms = self.current.as_millis().min(u128::from(u64::MAX)) as u64;
        let sleep_ms = match max_ms {
            0 => MIN_SLEEP_MS,
            1..=MIN_SLEEP_MS => max_ms,
            _ => self.rng.gen_range(MIN_SLEEP_MS..=max_ms),
        };
        Some(Duration::from_millis(sleep_ms))
    }

    /// Upper bound for the next jittered delay.
    pub fn current_ceiling(&self) -> Duration {
        self.current
    }
}
