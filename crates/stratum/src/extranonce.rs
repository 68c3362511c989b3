use super::*;

/// Raw extranonce bytes, hex on the wire.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct Extranonce(Vec<u8>);

impl Extranonce {
    pub fn generate(size: usize) -> Self {
        let mut v = vec![0u8; size];
        rand::rng().fill_bytes(&mut v);
        Self(v)
    }

    pub fn zeroed(size: usize) -> Self {
        Self(vec![0u8; size])
    }

    /// Big-endian increment. Returns true when the value wrapped back to all zeroes.
    pub fn increment_wrapping(&mut self) -> bool {
        for b in self.0.iter_mut().rev() {
            let (next, carry) = b.overflowing_add(1);
            *b = next;
            if !carry {
                return false;
            }
        }
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(s: &str) -> Result<Self> {
        Ok(Self(hex::decode(s).context(error::HexSnafu)?))
    }
}

impl fmt::Display for Extranonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Extranonce {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
