use super::*;

/// Reference backend: one header hash per nonce, in order, on the calling thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuBackend;

impl HashBackend for CpuBackend {
    fn name(&self) -> &str {
        "cpu"
    }

    fn search(
        &self,
        template: HeaderTemplate,
        nonces: RangeInclusive<u32>,
        target: Target,
    ) -> Result<Vec<Found>, BackendError> {
        Ok(nonces
            .filter_map(|nonce| {
                let hash = template.header(nonce).block_hash();
                target.is_met_by(hash).then_some(Found { nonce, hash })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{backend::tests::shift, job::tests::job},
        primitive_types::U256,
    };

    #[test]
    fn qualifies_iff_hash_at_or_below_target() {
        let template = HeaderTemplate::new(&job("1f", false, 0), &Extranonce::zeroed(4));
        let target = shift(4);

        let found = CpuBackend.search(template, 0..=2_047, target).unwrap();

        for nonce in 0..=2_047u32 {
            let hash = template.header(nonce).block_hash();
            let expected = U256::from_little_endian(hash.as_byte_array())
                <= U256::from_big_endian(&target.to_be_bytes());
            assert_eq!(
                found.iter().any(|f| f.nonce == nonce),
                expected,
                "nonce {nonce}"
            );
        }

        assert!(found.windows(2).all(|w| w[0].nonce < w[1].nonce));
        assert!(found.iter().all(|f| template.header(f.nonce).block_hash() == f.hash));
    }

    #[test]
    fn impossible_target_finds_nothing() {
        let template = HeaderTemplate::new(&job("1f", false, 0), &Extranonce::zeroed(4));
        assert!(
            CpuBackend
                .search(template, 0..=4_095, Target::ZERO)
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn single_nonce_range_at_top_of_space() {
        let template = HeaderTemplate::new(&job("1f", false, 0), &Extranonce::zeroed(4));
        let found = CpuBackend
            .search(template, u32::MAX..=u32::MAX, shift(0))
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].nonce, u32::MAX);
    }
}
