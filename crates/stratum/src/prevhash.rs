use super::*;

/// Previous block hash as stratum sends it: the internal byte order with each 4-byte word
/// reversed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, DeserializeFromStr, SerializeDisplay)]
pub struct PrevHash(BlockHash);

fn swap_words(bytes: &[u8; 32]) -> [u8; 32] {
    let mut swapped = [0u8; 32];
    for (src, dst) in bytes.chunks_exact(4).zip(swapped.chunks_exact_mut(4)) {
        LittleEndian::write_u32(dst, BigEndian::read_u32(src));
    }
    swapped
}

impl FromStr for PrevHash {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = <[u8; 32]>::from_hex(s).context(error::HexSnafu)?;
        Ok(PrevHash(BlockHash::from_byte_array(swap_words(&bytes))))
    }
}

impl fmt::Display for PrevHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(swap_words(self.0.as_byte_array())))
    }
}

impl From<BlockHash> for PrevHash {
    fn from(blockhash: BlockHash) -> Self {
        PrevHash(blockhash)
    }
}

impl From<PrevHash> for BlockHash {
    fn from(prevhash: PrevHash) -> Self {
        prevhash.0
    }
}
