use super::*;

/// Expected hashes per difficulty-1 share: 2^32 =~ 4.29 billion.
/// The precise value is 2^256/target_1 =~ 4,295,032,833 (~0.0015% higher),
/// but 2^32 is the standard approximation used across the mining ecosystem.
pub const HASHES_PER_DIFF_1: f64 = 4_294_967_296.0;

#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
pub struct HashRate(pub f64);

impl HashRate {
    pub const ZERO: Self = Self(0.0);

    pub fn from_hashes(hashes: u64, elapsed: Duration) -> Self {
        if elapsed.is_zero() {
            return Self::ZERO;
        }

        Self(hashes as f64 / elapsed.as_secs_f64())
    }

    /// Mean time between shares at `difficulty`.
    pub fn expected_share_interval(self, difficulty: f64) -> Option<Duration> {
        if self.0 <= 0.0 {
            return None;
        }

        Duration::try_from_secs_f64(difficulty * HASHES_PER_DIFF_1 / self.0).ok()
    }

    /// Difficulty at which shares arrive on average every `interval`.
    pub fn difficulty_for_interval(self, interval: Duration) -> f64 {
        self.0 * interval.as_secs_f64() / HASHES_PER_DIFF_1
    }

    pub fn max(self, other: Self) -> Self {
        if other.0 > self.0 { other } else { self }
    }
}

impl fmt::Display for HashRate {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        format_si(self.0, "H/s", f)
    }
}

impl FromStr for HashRate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(parse_si(s, &["H/s", "H"])?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_hashes() {
        assert_eq!(
            HashRate::from_hashes(15_000_000, Duration::from_secs(15)),
            HashRate(1e6)
        );
        assert_eq!(HashRate::from_hashes(100, Duration::ZERO), HashRate::ZERO);
    }

    #[test]
    fn difficulty_and_interval_are_inverse() {
        let rate = HashRate(500e6);
        let difficulty = rate.difficulty_for_interval(Duration::from_secs(20));

        assert!((difficulty - 2.3283).abs() < 1e-3, "{difficulty}");

        let interval = rate.expected_share_interval(difficulty).unwrap();
        assert!((interval.as_secs_f64() - 20.0).abs() < 1e-9);
    }

    #[test]
    fn no_interval_without_hashrate() {
        assert_eq!(HashRate::ZERO.expected_share_interval(1.0), None);
    }

    #[test]
    fn display() {
        let cases = [
            (0.0, "0 H/s"),
            (1e3, "1 KH/s"),
            (1.5e6, "1.5 MH/s"),
            (123.456e9, "123.46 GH/s"),
        ];

        for (value, expected) in cases {
            assert_eq!(HashRate(value).to_string(), expected, "for value {value}");
        }
    }

    #[test]
    fn parse() {
        assert_eq!("1.5 MH/s".parse::<HashRate>().unwrap(), HashRate(1.5e6));
        assert_eq!("100G".parse::<HashRate>().unwrap(), HashRate(1e11));
        assert!("fast".parse::<HashRate>().is_err());
    }

    #[test]
    fn max_keeps_larger() {
        assert_eq!(HashRate(1.0).max(HashRate(2.0)), HashRate(2.0));
        assert_eq!(HashRate(3.0).max(HashRate(2.0)), HashRate(3.0));
    }
}
