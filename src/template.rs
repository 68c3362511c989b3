use super::*;

/// An 80-byte block header with every field but the nonce fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderTemplate {
    header: Header,
}

impl HeaderTemplate {
    pub fn new(job: &Job, extranonce2: &Extranonce) -> Self {
        let merkle_root = merkle_root(
            &job.coinb1,
            &job.extranonce1,
            extranonce2,
            &job.coinb2,
            &job.merkle_branches,
        );

        Self {
            header: Header {
                version: job.version.into(),
                prev_blockhash: job.prevhash.into(),
                merkle_root,
                time: job.ntime.into(),
                bits: job.nbits.into(),
                nonce: 0,
            },
        }
    }

    pub fn header(&self, nonce: u32) -> Header {
        Header {
            nonce,
            ..self.header
        }
    }

    /// Consensus serialization with a zero nonce. The nonce lives in the last four bytes,
    /// little endian.
    pub fn to_bytes(&self) -> [u8; 80] {
        let mut bytes = [0u8; 80];
        bytes.copy_from_slice(&consensus::serialize(&self.header));
        bytes
    }
}

#[cfg(test)]
mod tests {
    use {super::*, bitcoin::TxMerkleNode, crate::job::tests::job};

    #[test]
    fn nonce_is_the_only_varying_field() {
        let template = HeaderTemplate::new(&job("1f", true, 0), &Extranonce::zeroed(4));

        let a = template.header(1);
        let b = template.header(2);

        assert_eq!(a.merkle_root, b.merkle_root);
        assert_eq!(a.prev_blockhash, b.prev_blockhash);
        assert_ne!(a.block_hash(), b.block_hash());
        assert_eq!(b.nonce, 2);
    }

    #[test]
    fn bytes_match_consensus_encoding() {
        let template = HeaderTemplate::new(&job("1f", true, 0), &Extranonce::zeroed(4));

        let mut bytes = template.to_bytes();
        bytes[76..].copy_from_slice(&0xdeadbeef_u32.to_le_bytes());

        assert_eq!(bytes.to_vec(), consensus::serialize(&template.header(0xdeadbeef)));
        assert_eq!(
            BlockHash::from_raw_hash(sha256d::Hash::hash(&bytes)),
            template.header(0xdeadbeef).block_hash()
        );
    }

    #[test]
    fn same_inputs_same_template() {
        let job = job("1f", true, 0);
        let extranonce2 = "00000007".parse::<Extranonce>().unwrap();

        assert_eq!(
            HeaderTemplate::new(&job, &extranonce2),
            HeaderTemplate::new(&job.clone(), &extranonce2.clone())
        );
        assert_ne!(
            HeaderTemplate::new(&job, &extranonce2),
            HeaderTemplate::new(&job, &Extranonce::zeroed(4))
        );
    }

    #[test]
    fn merkle_root_covers_both_extranonces() {
        let job = job("1f", true, 0);
        let extranonce2 = Extranonce::zeroed(4);

        let mut coinbase = job.coinb1.clone();
        coinbase.extend_from_slice(job.extranonce1.as_bytes());
        coinbase.extend_from_slice(extranonce2.as_bytes());
        coinbase.extend_from_slice(&job.coinb2);

        assert_eq!(
            HeaderTemplate::new(&job, &extranonce2).header(0).merkle_root,
            TxMerkleNode::from_raw_hash(sha256d::Hash::hash(&coinbase))
        );
    }
}
