use super::*;

/// Work as notified by the pool, decoded once and frozen together with the extranonce1 in
/// force when it arrived. Superseded by the next notification, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub job_id: JobId,
    pub prevhash: PrevHash,
    pub coinb1: Vec<u8>,
    pub coinb2: Vec<u8>,
    pub merkle_branches: Vec<MerkleNode>,
    pub version: Version,
    pub nbits: Nbits,
    pub ntime: Ntime,
    pub clean: bool,
    pub extranonce1: Extranonce,
    pub extranonce2_size: usize,
    /// Position in the order jobs were received, across reconnects.
    pub sequence: u64,
}

impl Job {
    pub fn new(
        notify: Notify,
        extranonce1: Extranonce,
        extranonce2_size: usize,
        sequence: u64,
    ) -> Result<Self, hex::FromHexError> {
        Ok(Self {
            coinb1: hex::decode(&notify.coinb1)?,
            coinb2: hex::decode(&notify.coinb2)?,
            job_id: notify.job_id,
            prevhash: notify.prevhash,
            merkle_branches: notify.merkle_branches,
            version: notify.version,
            nbits: notify.nbits,
            ntime: notify.ntime,
            clean: notify.clean_jobs,
            extranonce1,
            extranonce2_size,
            sequence,
        })
    }

    pub fn network_target(&self) -> Target {
        nbits_to_target(self.nbits)
    }
}
