use super::*;

/// What a hash is worth against the share and network targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Block,
    Share,
    Invalid,
}

/// The pool-assigned share target and the network block target for one job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Targets {
    pub share: Target,
    pub network: Target,
}

impl Targets {
    pub fn new(share: Difficulty, nbits: Nbits) -> Self {
        Self {
            share: difficulty_to_target(share),
            network: nbits_to_target(nbits),
        }
    }

    /// The easier of the two. Anything a backend finds below it needs classifying.
    pub fn search_target(&self) -> Target {
        self.share.max(self.network)
    }

    /// A hash meeting the network target is a block even when the share target is harder.
    pub fn classify(&self, hash: BlockHash) -> Verdict {
        if self.network.is_met_by(hash) {
            Verdict::Block
        } else if self.share.is_met_by(hash) {
            Verdict::Share
        } else {
            Verdict::Invalid
        }
    }
}

pub fn difficulty_to_target(difficulty: Difficulty) -> Target {
    difficulty.to_target()
}

pub fn target_to_difficulty(target: Target) -> f64 {
    target.difficulty_float()
}

pub fn nbits_to_target(nbits: Nbits) -> Target {
    nbits.to_target()
}

/// Difficulty a hash would satisfy, used to track the best share.
pub fn hash_difficulty(hash: BlockHash) -> f64 {
    let target = Target::from_le_bytes(hash.to_byte_array());
    if target == Target::ZERO {
        return f64::INFINITY;
    }
    target.difficulty_float()
}
