use rand::Rng;
use std::time::Duration;

/// Bounded exponential backoff for transient backend failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Zero is treated as one.
    pub attempts: u32,
    /// Delay before the second attempt; doubles for each attempt after that.
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            attempts: 1,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts.max(1)
    }

    /// Base delay after failed attempt `n` (1-based), before jitter.
    pub fn backoff(&self, n: u32) -> Duration {
        let shift = n.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }

    /// Worst-case wall time for every attempt at `per_attempt` each, plus the
    /// longest possible wait between them.
    pub fn budget(&self, per_attempt: Duration) -> Duration {
        let attempts = self.attempts();
        let waits = (1..attempts).fold(Duration::ZERO, |acc, n| {
            let b = self.backoff(n);
            acc.saturating_add(b).saturating_add(b / 4)
        });
        per_attempt.saturating_mul(attempts).saturating_add(waits)
    }

    /// `backoff(n)` plus 0-25% jitter so concurrent callers don't retry in lockstep.
    pub fn delay(&self, n: u32) -> Duration {
        let base = self.backoff(n);
        let jitter_max = (base.as_millis() / 4).max(1) as u64;
        let jitter = rand::rng().random_range(0..jitter_max);
        base + Duration::from_millis(jitter)
    }
}
