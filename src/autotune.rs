use super::*;

pub const MIN_DIFFICULTY: f64 = 0.001;
pub const MAX_DIFFICULTY: f64 = 1_000_000.0;

/// Don't lower the suggestion unless the new value falls below this fraction of the last one.
const HYSTERESIS_LOW: f64 = 0.5;

/// Don't raise the suggestion unless the new value exceeds this multiple of the last one.
const HYSTERESIS_HIGH: f64 = 1.33;

const SIGNIFICANT_DIGITS: i32 = 4;

/// Share difficulty at which `hashrate` produces one share per `interval`, clamped and
/// rounded for the wire.
pub fn suggested_difficulty(hashrate: HashRate, interval: Duration) -> f64 {
    let optimal = hashrate.difficulty_for_interval(interval);

    let clamped = if optimal.is_finite() {
        optimal.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY)
    } else {
        MIN_DIFFICULTY
    };

    round_significant(clamped, SIGNIFICANT_DIGITS)
}

/// Measures hashrate over consecutive windows and proposes a share difficulty that
/// approaches the target share cadence.
#[derive(Debug, Clone)]
pub struct DifficultyTuner {
    window: Duration,
    target_interval: Duration,
    window_start: Option<Instant>,
    window_hashes: u64,
    last_suggestion: Option<f64>,
}

impl DifficultyTuner {
    pub fn new(window: Duration, target_interval: Duration) -> Self {
        Self {
            window,
            target_interval,
            window_start: None,
            window_hashes: 0,
            last_suggestion: None,
        }
    }

    /// Starts the measurement window if it is not already running.
    pub fn begin(&mut self, now: Instant) {
        self.window_start.get_or_insert(now);
    }

    /// Discards the running window, e.g. while mining is paused.
    pub fn reset(&mut self) {
        self.window_start = None;
        self.window_hashes = 0;
    }

    /// Drops the last suggestion after it failed to reach the pool, so the next window
    /// proposes again instead of holding back inside the band.
    pub fn forget_suggestion(&mut self) {
        self.last_suggestion = None;
    }

    /// Accounts `hashes` completed by `now`. Returns a new difficulty to request once a window
    /// has elapsed and the optimum moved outside the hysteresis band.
    pub fn observe(&mut self, hashes: u64, now: Instant) -> Option<Difficulty> {
        let start = *self.window_start.get_or_insert(now);
        self.window_hashes = self.window_hashes.saturating_add(hashes);

        let elapsed = now.saturating_duration_since(start);

        if elapsed.is_zero() || elapsed < self.window {
            return None;
        }

        let hashrate = HashRate::from_hashes(self.window_hashes, elapsed);

        self.window_start = Some(now);
        self.window_hashes = 0;

        let suggestion = suggested_difficulty(hashrate, self.target_interval);

        if let Some(last) = self.last_suggestion {
            let ratio = suggestion / last;
            if (HYSTERESIS_LOW..=HYSTERESIS_HIGH).contains(&ratio) {
                debug!(
                    "Auto-tune: {hashrate} suggests {suggestion}, within band of {last}"
                );
                return None;
            }
        }

        info!(
            "Auto-tune: measured {hashrate}, requesting difficulty {suggestion} \
             (~1 share per {:.0}s)",
            self.target_interval.as_secs_f64()
        );

        self.last_suggestion = Some(suggestion);

        Some(Difficulty::from(suggestion))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    #[test]
    fn rounding() {
        assert_eq!(round_significant(0.004656612873, 4), 0.004657);
        assert_eq!(round_significant(123_456.0, 4), 123_500.0);
        assert_eq!(round_significant(1.0, 4), 1.0);
    }

    #[test]
    fn suggestion_is_clamped() {
        assert_eq!(suggested_difficulty(HashRate::ZERO, secs(20)), MIN_DIFFICULTY);
        assert_eq!(suggested_difficulty(HashRate(1e20), secs(20)), MAX_DIFFICULTY);
        assert_eq!(suggested_difficulty(HashRate(f64::NAN), secs(20)), MIN_DIFFICULTY);
    }

    #[test]
    fn nothing_before_warmup() {
        let start = Instant::now();
        let mut tuner = DifficultyTuner::new(secs(15), secs(20));
        tuner.begin(start);

        for i in 1..15 {
            assert_eq!(tuner.observe(1_000_000, start + secs(i)), None);
        }
    }

    #[test]
    fn warmup_at_fixed_hashrate_hits_cadence() {
        let hashrate = 250e6;
        let start = Instant::now();
        let mut tuner = DifficultyTuner::new(secs(15), secs(20));
        tuner.begin(start);

        let mut suggestion = None;
        for i in 1..=15 {
            suggestion = tuner.observe(hashrate as u64, start + secs(i));
        }

        let difficulty = suggestion.expect("suggestion after warm-up");
        let interval = HashRate(hashrate)
            .expected_share_interval(difficulty.as_f64())
            .unwrap();

        assert!(
            (interval.as_secs_f64() - 20.0).abs() < 0.2,
            "expected ~20s, got {interval:?}"
        );
    }

    #[test]
    fn hysteresis_suppresses_small_drift() {
        let start = Instant::now();
        let mut tuner = DifficultyTuner::new(secs(15), secs(20));
        tuner.begin(start);

        assert!(tuner.observe(15 * 100_000_000, start + secs(15)).is_some());

        // 20% faster stays inside the band.
        assert_eq!(tuner.observe(15 * 120_000_000, start + secs(30)), None);

        // Twice as fast leaves it.
        let raised = tuner.observe(15 * 200_000_000, start + secs(45)).unwrap();
        assert!(raised.as_f64() > 0.9, "{}", raised.as_f64());

        // Throttled to a tenth.
        assert!(tuner.observe(15 * 20_000_000, start + secs(60)).is_some());
    }

    #[test]
    fn forgotten_suggestion_is_proposed_again() {
        let start = Instant::now();
        let mut tuner = DifficultyTuner::new(secs(15), secs(20));
        tuner.begin(start);

        let first = tuner.observe(15 * 100_000_000, start + secs(15)).unwrap();
        assert_eq!(tuner.observe(15 * 100_000_000, start + secs(30)), None);

        tuner.forget_suggestion();

        assert_eq!(tuner.observe(15 * 100_000_000, start + secs(45)), Some(first));
    }

    #[test]
    fn reset_discards_partial_window() {
        let start = Instant::now();
        let mut tuner = DifficultyTuner::new(secs(15), secs(20));
        tuner.begin(start);

        tuner.observe(1_000_000_000, start + secs(10));
        tuner.reset();

        tuner.begin(start + secs(100));
        assert_eq!(tuner.observe(1_000, start + secs(110)), None);
        assert!(tuner.observe(1_000, start + secs(115)).is_some());
    }
}
