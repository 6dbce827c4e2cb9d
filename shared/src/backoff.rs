//! Linear retry backoff with an upper bound

use std::time::Duration;

/// `delay(n) = min(step * n, cap)` for `n` consecutive failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    step: Duration,
    cap: Duration,
}

impl Backoff {
    pub const fn new(step: Duration, cap: Duration) -> Self {
        Self { step, cap }
    }

    pub fn delay(&self, failures: u32) -> Duration {
        self.step.saturating_mul(failures).min(self.cap)
    }
}

impl Default for Backoff {
    /// One minute per failure, at most one hour.
    fn default() -> Self {
        Self::new(Duration::from_secs(60), Duration::from_secs(3600))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_linearly_then_caps() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(0), Duration::ZERO);
        assert_eq!(backoff.delay(1), Duration::from_secs(60));
        assert_eq!(backoff.delay(4), Duration::from_secs(240));
        assert_eq!(backoff.delay(60), Duration::from_secs(3600));
        assert_eq!(backoff.delay(61), Duration::from_secs(3600));
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(3600));
    }

    #[test]
    fn test_delay_is_monotonic() {
        let backoff = Backoff::default();
        let delays: Vec<_> = (0..100).map(|n| backoff.delay(n)).collect();
        assert!(delays.windows(2).all(|w| w[0] <= w[1]));
    }
}
