use super::*;

const HASHRATE_WINDOW: Duration = Duration::from_secs(30);

/// Point-in-time copy of the miner's counters. Counters only ever grow.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Stats {
    pub hashes: u64,
    pub submitted: u64,
    pub accepted: u64,
    pub rejected: u64,
    /// Backend results that failed local re-verification.
    pub invalid: u64,
    /// Batches whose results were dropped because their job was superseded.
    pub discarded: u64,
    pub jobs: u64,
    pub blocks: u64,
    pub best_share: f64,
    pub hashrate: HashRate,
    pub peak_hashrate: HashRate,
    pub difficulty: f64,
    pub backend: String,
    pub uptime: Duration,
}

impl Stats {
    pub fn summary(&self) -> String {
        format!(
            "{} hashes in {:.0}s, {} submitted, {} accepted, {} rejected, {} blocks, \
             best share {:.3}, peak {}",
            self.hashes,
            self.uptime.as_secs_f64(),
            self.submitted,
            self.accepted,
            self.rejected,
            self.blocks,
            self.best_share,
            self.peak_hashrate,
        )
    }
}

struct State {
    stats: Stats,
    rate: DecayingRate,
}

/// Counters written by the engine and read by anyone holding a clone.
pub struct Metrics {
    started: Instant,
    state: Mutex<State>,
}

impl Metrics {
    pub fn new(backend: &str) -> Self {
        let started = Instant::now();

        Self {
            started,
            state: Mutex::new(State {
                stats: Stats {
                    backend: backend.into(),
                    ..Stats::default()
                },
                rate: DecayingRate::new(HASHRATE_WINDOW, started),
            }),
        }
    }

    pub fn snapshot(&self) -> Stats {
        let state = self.state.lock();

        Stats {
            uptime: self.started.elapsed(),
            ..state.stats.clone()
        }
    }

    pub(crate) fn record_hashes(&self, hashes: u64, now: Instant) {
        let mut state = self.state.lock();

        state.stats.hashes = state.stats.hashes.saturating_add(hashes);
        state.rate.record(hashes as f64, now);

        let hashrate = HashRate(state.rate.rate());
        state.stats.hashrate = hashrate;
        state.stats.peak_hashrate = state.stats.peak_hashrate.max(hashrate);
    }

    pub(crate) fn record_share(&self, difficulty: f64) {
        let mut state = self.state.lock();

        state.stats.submitted += 1;

        if difficulty > state.stats.best_share {
            state.stats.best_share = difficulty;
        }
    }

    pub(crate) fn record_block(&self) {
        self.state.lock().stats.blocks += 1;
    }

    pub(crate) fn record_ack(&self, accepted: bool) {
        let mut state = self.state.lock();

        if accepted {
            state.stats.accepted += 1;
        } else {
            state.stats.rejected += 1;
        }
    }

    pub(crate) fn record_invalid(&self) {
        self.state.lock().stats.invalid += 1;
    }

    pub(crate) fn record_discarded(&self) {
        self.state.lock().stats.discarded += 1;
    }

    pub(crate) fn record_job(&self) {
        self.state.lock().stats.jobs += 1;
    }

    pub(crate) fn set_difficulty(&self, difficulty: f64) {
        self.state.lock().stats.difficulty = difficulty;
    }

    pub(crate) fn set_backend(&self, backend: &str) {
        self.state.lock().stats.backend = backend.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate() {
        let metrics = Metrics::new("cpu");

        metrics.record_job();
        metrics.record_share(0.5);
        metrics.record_share(3.0);
        metrics.record_share(1.0);
        metrics.record_block();
        metrics.record_ack(true);
        metrics.record_ack(false);
        metrics.record_invalid();
        metrics.record_discarded();
        metrics.set_difficulty(0.25);

        let stats = metrics.snapshot();

        assert_eq!(stats.jobs, 1);
        assert_eq!(stats.submitted, 3);
        assert_eq!(stats.best_share, 3.0);
        assert_eq!(stats.blocks, 1);
        assert_eq!(stats.accepted, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.invalid, 1);
        assert_eq!(stats.discarded, 1);
        assert_eq!(stats.difficulty, 0.25);
        assert_eq!(stats.backend, "cpu");
    }

    #[test]
    fn hashrate_tracks_peak() {
        let metrics = Metrics::new("parallel");
        let start = metrics.started;

        for i in 1..=10 {
            metrics.record_hashes(1_000_000, start + Duration::from_secs(i));
        }

        let busy = metrics.snapshot();
        assert_eq!(busy.hashes, 10_000_000);
        assert!(busy.hashrate.0 > 500_000.0, "{}", busy.hashrate);

        metrics.record_hashes(0, start + Duration::from_secs(120));

        let idle = metrics.snapshot();
        assert!(idle.hashrate < busy.hashrate);
        assert_eq!(idle.peak_hashrate, busy.peak_hashrate);
    }

    #[test]
    fn backend_switch_is_visible() {
        let metrics = Metrics::new("parallel");
        metrics.set_backend("cpu");
        assert_eq!(metrics.snapshot().backend, "cpu");
    }
}
