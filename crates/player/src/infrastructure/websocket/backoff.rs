//! Reconnection policy and backoff math for the live channel.
//!
//! Runtime-agnostic: the connection manager asks for the next delay and owns the
//! actual timer.

use std::time::Duration;

use rand::Rng;

// Reconnection defaults
pub const DEFAULT_MAX_RECONNECT_ATTEMPTS: u32 = 5;
pub const DEFAULT_BASE_DELAY_MS: u64 = 3_000;
pub const DEFAULT_MAX_DELAY_MS: u64 = 30_000;

/// How automatic reconnection behaves after an unexpected closure.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconnectPolicy {
    /// Automatic attempts before settling in `Disconnected`
    pub max_attempts: u32,
    /// Delay before the first attempt; doubles with every further attempt
    pub base_delay_ms: u64,
    /// Upper bound for a single delay
    pub max_delay_ms: u64,
    /// Jitter factor (0.0-1.0) applied around each delay
    pub jitter_factor: f64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_RECONNECT_ATTEMPTS,
            base_delay_ms: DEFAULT_BASE_DELAY_MS,
            max_delay_ms: DEFAULT_MAX_DELAY_MS,
            jitter_factor: 0.0,
        }
    }
}

impl ReconnectPolicy {
    /// Delay before attempt `attempt` (1-based), before jitter.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exponential = self
            .base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1)));
        Duration::from_millis(exponential.min(self.max_delay_ms))
    }
}

/// Exponential backoff state shared by reconnect logic.
#[derive(Debug, Clone)]
pub struct BackoffState {
    policy: ReconnectPolicy,
    attempts: u32,
}

impl BackoffState {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            attempts: 0,
        }
    }

    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    pub fn is_exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Advance to the next attempt.
    ///
    /// Returns the delay to wait *before* performing this attempt, or `None` once
    /// the attempt ceiling is reached.
    pub fn next_delay_and_advance(&mut self) -> Option<Duration> {
        if self.is_exhausted() {
            return None;
        }

        self.attempts += 1;
        let delay = self.policy.delay_for_attempt(self.attempts);
        Some(self.with_jitter(delay))
    }

    fn with_jitter(&self, delay: Duration) -> Duration {
        let millis = delay.as_millis() as i64;
        let jitter_range = (millis as f64 * self.policy.jitter_factor.clamp(0.0, 1.0)) as i64;
        if jitter_range > 0 {
            let jitter = rand::thread_rng().gen_range(-jitter_range..=jitter_range);
            Duration::from_millis((millis + jitter).max(0) as u64)
        } else {
            delay
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delays_double_until_capped() {
        let mut backoff = BackoffState::new(ReconnectPolicy::default());

        let delays: Vec<u64> = std::iter::from_fn(|| backoff.next_delay_and_advance())
            .map(|d| d.as_millis() as u64)
            .collect();

        assert_eq!(delays, vec![3_000, 6_000, 12_000, 24_000, 30_000]);
        assert!(backoff.is_exhausted());
        assert_eq!(backoff.attempts(), 5);
    }

    #[test]
    fn test_reset_starts_over() {
        let mut backoff = BackoffState::new(ReconnectPolicy::default());
        backoff.next_delay_and_advance();
        backoff.next_delay_and_advance();

        backoff.reset();

        assert_eq!(backoff.attempts(), 0);
        assert_eq!(
            backoff.next_delay_and_advance(),
            Some(Duration::from_millis(3_000))
        );
    }

    #[test]
    fn test_zero_attempts_never_retries() {
        let mut backoff = BackoffState::new(ReconnectPolicy {
            max_attempts: 0,
            ..ReconnectPolicy::default()
        });
        assert_eq!(backoff.next_delay_and_advance(), None);
    }

    #[test]
    fn test_jitter_stays_within_range() {
        let policy = ReconnectPolicy {
            jitter_factor: 0.2,
            ..ReconnectPolicy::default()
        };
        for _ in 0..50 {
            let mut backoff = BackoffState::new(policy.clone());
            let delay = backoff.next_delay_and_advance().unwrap().as_millis() as u64;
            assert!((2_400..=3_600).contains(&delay), "delay {delay} out of range");
        }
    }

    #[test]
    fn test_huge_attempt_numbers_saturate() {
        let policy = ReconnectPolicy::default();
        assert_eq!(
            policy.delay_for_attempt(200),
            Duration::from_millis(DEFAULT_MAX_DELAY_MS)
        );
    }
}
