use super::*;

pub use {cpu::CpuBackend, parallel::ParallelBackend};

mod cpu;
mod parallel;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("Failed to build {threads}-thread pool: {source}"))]
    ThreadPool {
        threads: usize,
        source: rayon::ThreadPoolBuildError,
    },

    #[snafu(display("Backend {backend} panicked: {message}"))]
    Panicked { backend: String, message: String },

    #[snafu(display("Backend {backend} unavailable: {reason}"))]
    Unavailable { backend: String, reason: String },
}

/// A nonce whose header hash met the search target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Found {
    pub nonce: u32,
    pub hash: BlockHash,
}

/// Batched double-SHA256 search over the nonce field of a header.
///
/// Implementations hash every nonce in `nonces` and return those whose hash is at or below
/// `target`, ordered by nonce. Identical inputs give identical results on every backend.
pub trait HashBackend: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn search(
        &self,
        template: HeaderTemplate,
        nonces: RangeInclusive<u32>,
        target: Target,
    ) -> Result<Vec<Found>, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum, Display)]
#[serde(rename_all = "kebab-case")]
pub enum BackendKind {
    #[display("cpu")]
    Cpu,
    #[default]
    #[display("parallel")]
    Parallel,
}

/// Builds the configured backend, falling back to the reference one when it cannot start.
pub fn create(kind: BackendKind, threads: usize) -> Arc<dyn HashBackend> {
    match kind {
        BackendKind::Cpu => Arc::new(CpuBackend),
        BackendKind::Parallel => match ParallelBackend::new(threads) {
            Ok(backend) => Arc::new(backend),
            Err(err) => {
                warn!("{err}; falling back to {}", CpuBackend.name());
                Arc::new(CpuBackend)
            }
        },
    }
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".into())
}
