use super::*;

/// Computes `1 - e^(-x)` with numerical stability.
/// Returns 0.0 at x=0, saturates to 1.0 as x increases.
fn exponential_saturation(x: f64) -> f64 {
    // Beyond 36, `e^(-x) < f64::EPSILON` and the subtraction rounds to exactly 1.0.
    -(-x.min(36.0)).exp_m1()
}

/// Exponentially decaying per-second rate of a sampled quantity, corrected for the warm-up
/// bias of starting from zero.
#[derive(Debug, Clone)]
pub(crate) struct DecayingRate {
    value: f64,
    window: Duration,
    start: Instant,
    last_update: Instant,
}

impl DecayingRate {
    pub(crate) fn new(window: Duration, start: Instant) -> Self {
        Self {
            value: 0.0,
            window,
            start,
            last_update: start,
        }
    }

    /// Adds `sample` units observed since the previous call.
    pub(crate) fn record(&mut self, sample: f64, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        if elapsed <= 0.0 {
            return;
        }

        let decay_factor = exponential_saturation(elapsed / self.window.as_secs_f64());

        self.value = (self.value + (sample / elapsed) * decay_factor) / (1.0 + decay_factor);
        self.last_update = now;
    }

    pub(crate) fn rate(&self) -> f64 {
        let history = self.last_update.saturating_duration_since(self.start);
        let bias = exponential_saturation(history.as_secs_f64() / self.window.as_secs_f64());

        if bias <= 0.0 { 0.0 } else { self.value / bias }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn starts_at_zero() {
        let rate = DecayingRate::new(secs(30), Instant::now());
        assert_eq!(rate.rate(), 0.0);
    }

    #[test]
    fn converges_on_constant_input() {
        let start = Instant::now();
        let mut rate = DecayingRate::new(secs(30), start);

        for i in 1..=10 {
            rate.record(5_000.0, start + secs(i));
        }

        let value = rate.rate();
        assert!((4_000.0..6_000.0).contains(&value), "expected ~5000, got {value}");
    }

    #[test]
    fn decays_when_input_stops() {
        let start = Instant::now();
        let mut rate = DecayingRate::new(secs(30), start);

        for i in 1..=30 {
            rate.record(100.0, start + secs(i));
        }
        let busy = rate.rate();

        rate.record(0.0, start + secs(90));
        assert!(rate.rate() < busy / 2.0);
    }

    #[test]
    fn ignores_zero_elapsed_time() {
        let start = Instant::now();
        let mut rate = DecayingRate::new(secs(30), start);

        rate.record(100.0, start);
        assert_eq!(rate.rate(), 0.0);
    }
}
