use super::*;

/// A merkle branch as sent in `mining.notify`: 32 bytes hex encoded in internal byte order,
/// unlike the reversed display order bitcoin uses for txids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, DeserializeFromStr, SerializeDisplay)]
pub struct MerkleNode([u8; 32]);

impl MerkleNode {
    pub fn as_byte_array(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<[u8; 32]> for MerkleNode {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl FromStr for MerkleNode {
    type Err = InternalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(<[u8; 32]>::from_hex(s).context(error::HexSnafu)?))
    }
}

impl fmt::Display for MerkleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Hashes the assembled coinbase and folds in each branch, left to right.
pub fn merkle_root(
    coinb1: &[u8],
    extranonce1: &Extranonce,
    extranonce2: &Extranonce,
    coinb2: &[u8],
    merkle_branches: &[MerkleNode],
) -> TxMerkleNode {
    let mut coinbase =
        Vec::with_capacity(coinb1.len() + extranonce1.len() + extranonce2.len() + coinb2.len());
    coinbase.extend_from_slice(coinb1);
    coinbase.extend_from_slice(extranonce1.as_bytes());
    coinbase.extend_from_slice(extranonce2.as_bytes());
    coinbase.extend_from_slice(coinb2);

    let mut root = sha256d::Hash::hash(&coinbase);
    for branch in merkle_branches {
        let mut concat = [0u8; 64];
        concat[..32].copy_from_slice(root.as_byte_array());
        concat[32..].copy_from_slice(branch.as_byte_array());
        root = sha256d::Hash::hash(&concat);
    }

    TxMerkleNode::from_raw_hash(root)
}
