use rand::Rng;
use std::time::Duration;

/// Retry schedule for transient fetch failures.
///
/// After failed attempt `n` (1-based) the fetcher sleeps `base_delay * 2^n`,
/// so the default waits 2s and then 4s before giving up on the third attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    /// Fractional jitter applied to each delay, e.g. `0.3` for ±30%.
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    /// No waiting between attempts. Used by tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            jitter: 0.0,
        }
    }

    pub fn delay_after(&self, attempt: u32) -> Duration {
        // Cap the exponent to prevent overflow
        let capped_attempt = attempt.min(10);
        let delay = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(capped_attempt));

        if self.jitter <= 0.0 || delay.is_zero() {
            return delay;
        }
        let factor = rand::thread_rng().gen_range((1.0 - self.jitter)..(1.0 + self.jitter));
        delay.mul_f64(factor.max(0.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_progression_is_two_then_four_seconds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
    }

    #[test]
    fn exponent_is_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(20), policy.delay_after(10));
    }

    #[test]
    fn jitter_stays_within_bounds() {
        let policy = RetryPolicy {
            jitter: 0.3,
            ..RetryPolicy::default()
        };
        for _ in 0..50 {
            let delay = policy.delay_after(1).as_millis();
            assert!((1400..=2600).contains(&delay), "delay {delay}ms out of range");
        }
    }

    #[test]
    fn immediate_policy_never_sleeps() {
        assert!(RetryPolicy::immediate(3).delay_after(2).is_zero());
    }
}
