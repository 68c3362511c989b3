use super::*;

/// Backoff between connection attempts: `base * 2^(failures - 1)` capped at `max`, plus up to
/// `jitter` of uniform noise.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    base: Duration,
    max: Duration,
    jitter: Duration,
    failures: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(
            Duration::from_secs(5),
            Duration::from_secs(120),
            Duration::from_secs(5),
        )
    }
}

impl ReconnectPolicy {
    pub fn new(base: Duration, max: Duration, jitter: Duration) -> Self {
        Self {
            base,
            max: max.max(base),
            jitter,
            failures: 0,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings.reconnect_base(),
            settings.reconnect_max(),
            settings.reconnect_jitter(),
        )
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn max(&self) -> Duration {
        self.max
    }

    pub fn record_failure(&mut self) {
        self.failures = self.failures.saturating_add(1);
    }

    /// Called on every transition to Ready.
    pub fn reset(&mut self) {
        self.failures = 0;
    }

    /// Deterministic part of the delay for a given number of consecutive failures.
    pub fn base_delay(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(31);
        self.base
            .checked_mul(1 << exponent)
            .map_or(self.max, |delay| delay.min(self.max))
    }

    pub fn delay(&self) -> Duration {
        self.delay_with(&mut rand::rng())
    }

    pub fn delay_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        self.base_delay(self.failures) + self.jitter.mul_f64(rng.random::<f64>())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rand::{SeedableRng, rngs::StdRng}};

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn doubles_up_to_cap() {
        let policy = ReconnectPolicy::new(secs(5), secs(120), Duration::ZERO);

        let delays = (0..10).map(|n| policy.base_delay(n)).collect::<Vec<_>>();

        assert_eq!(
            delays,
            [5, 5, 10, 20, 40, 80, 120, 120, 120, 120].map(secs).to_vec()
        );
    }

    #[test]
    fn non_decreasing_in_failures() {
        let policy = ReconnectPolicy::new(Duration::from_millis(250), secs(60), Duration::ZERO);

        let mut previous = Duration::ZERO;
        for failures in 0..200 {
            let delay = policy.base_delay(failures);
            assert!(delay >= previous, "failures={failures}");
            assert!(delay <= secs(60));
            previous = delay;
        }
    }

    #[test]
    fn huge_failure_counts_saturate() {
        let policy = ReconnectPolicy::new(secs(5), secs(120), Duration::ZERO);
        assert_eq!(policy.base_delay(u32::MAX), secs(120));
    }

    #[test]
    fn jitter_is_bounded() {
        let mut policy = ReconnectPolicy::new(secs(5), secs(120), secs(5));
        policy.record_failure();
        policy.record_failure();

        let mut rng = StdRng::seed_from_u64(7);
        let delays = (0..1000)
            .map(|_| policy.delay_with(&mut rng))
            .collect::<Vec<_>>();

        assert!(delays.iter().all(|d| *d >= secs(10) && *d < secs(15)));
        assert!(delays.iter().any(|d| *d != delays[0]));
    }

    #[test]
    fn reset_returns_to_base() {
        let mut policy = ReconnectPolicy::new(secs(1), secs(30), Duration::ZERO);

        for _ in 0..8 {
            policy.record_failure();
        }
        assert_eq!(policy.failures(), 8);
        assert_eq!(policy.delay(), secs(30));

        policy.reset();
        assert_eq!(policy.failures(), 0);
        assert_eq!(policy.delay(), secs(1));
    }

    #[test]
    fn cap_never_below_base() {
        let policy = ReconnectPolicy::new(secs(10), secs(1), Duration::ZERO);
        assert_eq!(policy.max(), secs(10));
        assert_eq!(policy.base_delay(5), secs(10));
    }
}
