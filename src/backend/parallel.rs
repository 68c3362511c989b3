use {
    super::*,
    rayon::prelude::*,
    std::panic::{self, AssertUnwindSafe},
};

const CHUNK_SIZE: u64 = 1 << 14;

/// Splits the range into fixed chunks hashed across a dedicated rayon pool. Each chunk
/// serializes the header once and patches the nonce bytes in place.
pub struct ParallelBackend {
    pool: rayon::ThreadPool,
    threads: usize,
}

impl ParallelBackend {
    pub fn new(threads: usize) -> Result<Self, BackendError> {
        let threads = threads.max(1);

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|index| format!("solominer-hash-{index}"))
            .build()
            .context(ThreadPoolSnafu { threads })?;

        Ok(Self { pool, threads })
    }

    pub fn threads(&self) -> usize {
        self.threads
    }

    fn scan(prefix: &[u8; 80], start: u32, end: u32, target: Target) -> Vec<Found> {
        let mut header = *prefix;
        let mut found = Vec::new();

        for nonce in start..=end {
            header[76..].copy_from_slice(&nonce.to_le_bytes());
            let hash = BlockHash::from_raw_hash(sha256d::Hash::hash(&header));
            if target.is_met_by(hash) {
                found.push(Found { nonce, hash });
            }
        }

        found
    }
}

impl HashBackend for ParallelBackend {
    fn name(&self) -> &str {
        "parallel"
    }

    fn search(
        &self,
        template: HeaderTemplate,
        nonces: RangeInclusive<u32>,
        target: Target,
    ) -> Result<Vec<Found>, BackendError> {
        if nonces.is_empty() {
            return Ok(Vec::new());
        }

        let prefix = template.to_bytes();
        let first = u64::from(*nonces.start());
        let last = u64::from(*nonces.end());
        let chunks = (last - first) / CHUNK_SIZE + 1;

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            self.pool.install(|| {
                (0..chunks)
                    .into_par_iter()
                    .map(|chunk| {
                        let start = first + chunk * CHUNK_SIZE;
                        let end = (start + CHUNK_SIZE - 1).min(last);
                        Self::scan(&prefix, start as u32, end as u32, target)
                    })
                    .collect::<Vec<Vec<Found>>>()
            })
        }));

        match result {
            Ok(chunks) => Ok(chunks.into_iter().flatten().collect()),
            Err(payload) => Err(BackendError::Panicked {
                backend: self.name().into(),
                message: panic_message(payload.as_ref()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::{backend::tests::shift, job::tests::job},
    };

    #[test]
    fn chunk_boundaries_are_covered() {
        let backend = ParallelBackend::new(3).unwrap();
        let template = HeaderTemplate::new(&job("1f", false, 0), &Extranonce::zeroed(4));

        let start = CHUNK_SIZE as u32 - 3;
        let end = CHUNK_SIZE as u32 * 2 + 5;

        let found = backend.search(template, start..=end, shift(0)).unwrap();

        assert_eq!(found.len() as u32, end - start + 1);
        assert_eq!(found.first().unwrap().nonce, start);
        assert_eq!(found.last().unwrap().nonce, end);
    }

    #[test]
    fn empty_range() {
        let backend = ParallelBackend::new(1).unwrap();
        let template = HeaderTemplate::new(&job("1f", false, 0), &Extranonce::zeroed(4));
        #[allow(clippy::reversed_empty_ranges)]
        let found = backend.search(template, 10..=9, shift(0)).unwrap();
        assert!(found.is_empty());
        assert_eq!(backend.threads(), 1);
    }
}
