use {super::*, core::cmp::Ordering, primitive_types::U256};

/// The difficulty 1 target, `0x00000000ffff0000...`, as a 256-bit integer.
pub static DIFFICULTY_1_TARGET: LazyLock<U256> =
    LazyLock::new(|| U256::from_big_endian(&Target::MAX.to_be_bytes()));

/// Share difficulty as a compact target. A difficulty of 1 is the genesis target, higher is
/// harder. Every conversion goes through nbits precision and is therefore lossy in the last
/// few significant digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Difficulty(CompactTarget);

impl Difficulty {
    pub fn to_target(self) -> Target {
        self.0.into()
    }

    pub fn as_f64(self) -> f64 {
        Target::from_compact(self.0).difficulty_float()
    }

    /// The value sent on the wire. The compact mantissa is good for a little over four
    /// significant digits, so anything finer is quantization noise.
    pub fn to_wire(self) -> f64 {
        round_significant(self.as_f64(), WIRE_DIGITS)
    }
}

const WIRE_DIGITS: i32 = 4;

/// Rounds `value` to `digits` significant decimal digits.
pub fn round_significant(value: f64, digits: i32) -> f64 {
    if value <= 0.0 || !value.is_finite() {
        return value;
    }

    let exponent = digits - 1 - value.log10().floor() as i32;

    if exponent >= 0 {
        let scale = 10f64.powi(exponent);
        (value * scale).round() / scale
    } else {
        let scale = 10f64.powi(-exponent);
        (value / scale).round() * scale
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty(Target::MAX.to_compact_lossy())
    }
}

impl Ord for Difficulty {
    fn cmp(&self, other: &Self) -> Ordering {
        let target_self = self.to_target();
        let target_other = other.to_target();

        // Reverse the target order: lower target = higher difficulty
        target_other.cmp(&target_self)
    }
}

impl PartialOrd for Difficulty {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl From<Difficulty> for f64 {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.as_f64()
    }
}

impl From<Nbits> for Difficulty {
    fn from(nbits: Nbits) -> Self {
        Difficulty(nbits.into())
    }
}

impl From<CompactTarget> for Difficulty {
    fn from(compact_target: CompactTarget) -> Self {
        Difficulty(compact_target)
    }
}

impl From<Difficulty> for CompactTarget {
    fn from(difficulty: Difficulty) -> Self {
        difficulty.0
    }
}

impl From<Target> for Difficulty {
    fn from(target: Target) -> Self {
        Difficulty(target.to_compact_lossy())
    }
}

impl From<u64> for Difficulty {
    fn from(difficulty: u64) -> Self {
        assert!(difficulty > 0, "difficulty must be > 0");

        let target = *DIFFICULTY_1_TARGET / U256::from(difficulty);

        Self::from(Target::from_be_bytes(target.to_big_endian()))
    }
}

impl From<f64> for Difficulty {
    fn from(difficulty: f64) -> Self {
        assert!(
            difficulty.is_finite() && difficulty > 0.0,
            "difficulty must be finite and > 0"
        );

        // 2^32 - 1 is safe: DIFFICULTY_1_TARGET (2^224) * scale fits in 256 bits.
        const MAX_SCALE_NUM: u64 = 0xFFFF_FFFF;

        let max_by_den = (u64::MAX as f64 / difficulty).floor();
        let scale = max_by_den.min(MAX_SCALE_NUM as f64).max(1.0) as u64;

        let numerator = (*DIFFICULTY_1_TARGET).saturating_mul(U256::from(scale));
        let denominator = (difficulty * scale as f64).round() as u64;

        let target = if denominator == 0 {
            U256::MAX
        } else {
            numerator / U256::from(denominator)
        };

        Difficulty(Target::from_be_bytes(target.to_big_endian()).to_compact_lossy())
    }
}

impl Serialize for Difficulty {
    fn serialize<S: Serializer>(&self, ser: S) -> Result<S::Ok, S::Error> {
        let d = self.to_wire();
        if d >= 1.0 && d.fract() == 0.0 && d < u64::MAX as f64 {
            ser.serialize_u64(d as u64)
        } else {
            ser.serialize_f64(d)
        }
    }
}

impl<'de> Deserialize<'de> for Difficulty {
    fn deserialize<D: Deserializer<'de>>(de: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Wire {
            Int(u64),
            Float(f64),
        }

        match Wire::deserialize(de)? {
            Wire::Int(u) => {
                if u == 0 {
                    return Err(de::Error::custom("difficulty must be > 0"));
                }
                Ok(Difficulty::from(u))
            }
            Wire::Float(x) => {
                if !x.is_finite() || x <= 0.0 {
                    return Err(de::Error::custom("difficulty must be finite and > 0"));
                }
                Ok(Difficulty::from(x))
            }
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = self.as_f64();

        if let Some(p) = f.precision() {
            write!(f, "{:.*}", p, d)
        } else if d >= 1.0 {
            write!(f, "{}", self.to_wire())
        } else {
            let s = format!("{:.8}", d);
            let s = s.trim_end_matches('0').trim_end_matches('.');
            f.write_str(s)
        }
    }
}
