use super::*;

/// Network target in compact form, hex encoded big-endian on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct Nbits(CompactTarget);

impl Nbits {
    pub fn to_compact(&self) -> CompactTarget {
        self.0
    }

    pub fn to_target(&self) -> Target {
        Target::from_compact(self.0)
    }
}

impl FromStr for Nbits {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact = CompactTarget::from_unprefixed_hex(s).map_err(|e| InternalError::Parse {
            message: format!("nbits '{s}': {e}"),
        })?;
        Ok(Nbits(compact))
    }
}

impl fmt::Display for Nbits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}", self.0.to_consensus())
    }
}

impl From<Nbits> for CompactTarget {
    fn from(n: Nbits) -> CompactTarget {
        n.0
    }
}

impl From<CompactTarget> for Nbits {
    fn from(n: CompactTarget) -> Nbits {
        Nbits(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_bits_expand_to_max_target() {
        let nbits = "1d00ffff".parse::<Nbits>().unwrap();
        assert_eq!(nbits.to_target(), Target::MAX);
        assert_eq!(nbits.to_string(), "1d00ffff");
        assert_eq!(
            serde_json::to_string(&nbits).unwrap(),
            r#""1d00ffff""#.to_string()
        );
    }

    #[test]
    fn mainnet_bits() {
        let nbits = "17034219".parse::<Nbits>().unwrap();
        let target = nbits.to_target().to_be_bytes();
        assert!(target[..9].iter().all(|b| *b == 0));
        assert_eq!(target[9..12], [0x03, 0x42, 0x19]);
        assert!(target[12..].iter().all(|b| *b == 0));
    }

    #[test]
    fn rejects_garbage() {
        assert!("xyz".parse::<Nbits>().is_err());
        assert!("0x1d00ffff".parse::<Nbits>().is_err());
    }
}
