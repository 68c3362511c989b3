use super::*;

const REPORT_INTERVAL: Duration = Duration::from_secs(5);

/// Batch size after falling back to the single-threaded reference backend.
const FALLBACK_BATCH_SIZE: u32 = 1 << 16;

/// Notifications for presentation layers. Fire and forget.
#[derive(Debug, Clone, PartialEq)]
pub enum MinerEvent {
    StateChanged(ConnectionState),
    JobReceived {
        job_id: JobId,
        clean: bool,
    },
    DifficultyChanged(f64),
    DifficultySuggested(f64),
    ShareSubmitted {
        job_id: JobId,
        nonce: u32,
        difficulty: f64,
    },
    ShareAccepted {
        job_id: JobId,
    },
    ShareRejected {
        job_id: JobId,
        reason: String,
    },
    BlockFound {
        job_id: JobId,
        hash: BlockHash,
    },
    BackendFallback {
        from: String,
        to: String,
        reason: String,
    },
}

/// Position in the search space of one job: a random extranonce2 and the next nonce. Moves to
/// the next extranonce2 once every nonce has been handed out.
#[derive(Debug)]
struct WorkCursor {
    sequence: u64,
    extranonce2: Extranonce,
    next_nonce: u64,
}

impl WorkCursor {
    fn new(job: &Job) -> Self {
        Self {
            sequence: job.sequence,
            extranonce2: Extranonce::generate(job.extranonce2_size),
            next_nonce: 0,
        }
    }

    fn next(&mut self, batch_size: u32) -> (Extranonce, RangeInclusive<u32>) {
        if self.next_nonce > u64::from(u32::MAX) {
            self.extranonce2.increment_wrapping();
            self.next_nonce = 0;
        }

        let start = self.next_nonce;
        let end = (start + u64::from(batch_size.max(1)) - 1).min(u64::from(u32::MAX));

        self.next_nonce = end + 1;

        (self.extranonce2.clone(), start as u32..=end as u32)
    }
}

type SearchResult = Result<Vec<Found>, BackendError>;

struct Batch {
    job: Arc<Job>,
    session: u64,
    extranonce2: Extranonce,
    nonces: RangeInclusive<u32>,
    template: HeaderTemplate,
    targets: Targets,
    handle: JoinHandle<SearchResult>,
}

impl Batch {
    fn hashes(&self) -> u64 {
        u64::from(*self.nonces.end()) - u64::from(*self.nonces.start()) + 1
    }
}

async fn finished(batch: &mut Option<Batch>) -> Result<SearchResult, task::JoinError> {
    match batch {
        Some(batch) => (&mut batch.handle).await,
        None => std::future::pending().await,
    }
}

/// Drives the hash backend against the current job and turns results into shares.
pub struct Engine {
    upstream: UpstreamHandle,
    events: mpsc::Receiver<UpstreamEvent>,
    jobs: watch::Receiver<Option<Arc<Job>>>,
    backend: Arc<dyn HashBackend>,
    metrics: Arc<Metrics>,
    notifications: broadcast::Sender<MinerEvent>,
    tuner: DifficultyTuner,
    rejects: RejectTracker,
    batch_size: u32,
    difficulty: Difficulty,
    ready: bool,
    /// Bumped whenever the session stops being Ready; batches from older sessions are dropped.
    session: u64,
    /// Highest sequence of a clean job seen; batches on older jobs are dropped.
    clean_floor: u64,
    cursor: Option<WorkCursor>,
    in_flight: Option<Batch>,
}

impl Engine {
    pub fn new(
        settings: &Settings,
        upstream: UpstreamHandle,
        events: mpsc::Receiver<UpstreamEvent>,
        backend: Arc<dyn HashBackend>,
        metrics: Arc<Metrics>,
        notifications: broadcast::Sender<MinerEvent>,
    ) -> Self {
        let difficulty = Difficulty::default();
        metrics.set_difficulty(difficulty.as_f64());

        Self {
            jobs: upstream.jobs(),
            upstream,
            events,
            backend,
            metrics,
            notifications,
            tuner: DifficultyTuner::new(settings.warmup(), settings.target_share_interval()),
            rejects: RejectTracker::new(settings.resync_after_rejects),
            batch_size: settings.batch_size(),
            difficulty,
            ready: false,
            session: 0,
            clean_floor: 0,
            cursor: None,
            in_flight: None,
        }
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        let mut report = interval(REPORT_INTERVAL);
        report.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.in_flight.is_none() {
                self.dispatch();
            }

            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,

                Some(event) = self.events.recv() => self.handle_event(event),

                result = finished(&mut self.in_flight) => self.complete(result),

                _ = report.tick() => self.report(),
            }
        }

        if self.in_flight.take().is_some() {
            debug!("Abandoning in-flight batch");
        }
    }

    fn handle_event(&mut self, event: UpstreamEvent) {
        match event {
            UpstreamEvent::ConnectionStateChanged(state) => {
                if state.is_ready() {
                    info!("Mining with {} backend", self.backend.name());
                    self.ready = true;
                } else if self.ready {
                    info!("Mining paused: connection {state}");
                    self.ready = false;
                    self.session += 1;
                    self.tuner.reset();
                }

                self.emit(MinerEvent::StateChanged(state));
            }
            UpstreamEvent::JobReceived(job) => {
                self.metrics.record_job();

                if job.clean {
                    self.clean_floor = self.clean_floor.max(job.sequence);
                }

                self.emit(MinerEvent::JobReceived {
                    job_id: job.job_id.clone(),
                    clean: job.clean,
                });
            }
            UpstreamEvent::DifficultyChanged(difficulty) => {
                self.difficulty = difficulty;
                self.metrics.set_difficulty(difficulty.as_f64());
                self.emit(MinerEvent::DifficultyChanged(difficulty.as_f64()));
            }
            UpstreamEvent::ShareAck {
                id,
                job_id,
                accepted,
                reason,
            } => {
                self.metrics.record_ack(accepted);

                if accepted {
                    info!("Share {id} for job {job_id} accepted");
                    self.rejects.record_accept();
                    self.emit(MinerEvent::ShareAccepted { job_id });
                    return;
                }

                let reason = reason.unwrap_or_else(|| "unknown".into());

                warn!("Share {id} for job {job_id} rejected: {reason}");

                if self.rejects.record_reject() {
                    warn!("Too many consecutive rejects, resynchronizing with pool");
                    if let Err(err) = self.upstream.resync() {
                        warn!("Failed to request resync: {err}");
                    }
                }

                self.emit(MinerEvent::ShareRejected { job_id, reason });
            }
        }
    }

    fn dispatch(&mut self) {
        if !self.ready {
            return;
        }

        let Some(job) = self.jobs.borrow().clone() else {
            return;
        };

        self.raise_clean_floor();

        if self
            .cursor
            .as_ref()
            .is_none_or(|cursor| cursor.sequence != job.sequence)
        {
            self.cursor = Some(WorkCursor::new(&job));
        }

        let Some(cursor) = self.cursor.as_mut() else {
            return;
        };

        let (extranonce2, nonces) = cursor.next(self.batch_size);

        let template = HeaderTemplate::new(&job, &extranonce2);
        let targets = Targets::new(self.difficulty, job.nbits);

        let backend = self.backend.clone();
        let target = targets.search_target();
        let range = nonces.clone();
        let handle = task::spawn_blocking(move || backend.search(template, range, target));

        self.tuner.begin(Instant::now());

        self.in_flight = Some(Batch {
            job,
            session: self.session,
            extranonce2,
            nonces,
            template,
            targets,
            handle,
        });
    }

    /// The jobs slot is updated before `JobReceived` is queued, so it is the earliest place a
    /// clean job becomes visible.
    fn raise_clean_floor(&mut self) {
        if let Some(job) = self.jobs.borrow().as_deref()
            && job.clean
        {
            self.clean_floor = self.clean_floor.max(job.sequence);
        }
    }

    fn complete(&mut self, result: Result<SearchResult, task::JoinError>) {
        let Some(batch) = self.in_flight.take() else {
            return;
        };

        let found = match result {
            Ok(Ok(found)) => found,
            Ok(Err(err)) => return self.fall_back(err.to_string()),
            Err(err) => return self.fall_back(format!("batch task failed: {err}")),
        };

        let now = Instant::now();
        let hashes = batch.hashes();

        self.metrics.record_hashes(hashes, now);

        if self.ready
            && let Some(difficulty) = self.tuner.observe(hashes, now)
        {
            match self.upstream.suggest_difficulty(difficulty) {
                Ok(()) => self.emit(MinerEvent::DifficultySuggested(difficulty.as_f64())),
                Err(err) => {
                    warn!("Failed to suggest difficulty: {err}");
                    self.tuner.forget_suggestion();
                }
            }
        }

        self.raise_clean_floor();

        if batch.session != self.session || batch.job.sequence < self.clean_floor {
            debug!(
                "Discarding {} results from superseded job {}",
                found.len(),
                batch.job.job_id
            );
            self.metrics.record_discarded();
            return;
        }

        for found in found {
            self.verify(&batch, found);
        }
    }

    /// Recomputes the hash with the reference header path before anything reaches the pool.
    fn verify(&mut self, batch: &Batch, found: Found) {
        let hash = batch.template.header(found.nonce).block_hash();

        let verdict = batch.targets.classify(hash);

        if verdict == Verdict::Invalid || hash != found.hash {
            warn!(
                "Backend {} returned nonce {:08x} for job {} that fails verification",
                self.backend.name(),
                found.nonce,
                batch.job.job_id
            );
            self.metrics.record_invalid();
            return;
        }

        let block = verdict == Verdict::Block;

        if !block && !self.difficulty.to_target().is_met_by(hash) {
            debug!(
                "Nonce {:08x} no longer meets the current share target",
                found.nonce
            );
            return;
        }

        let difficulty = hash_difficulty(hash);

        if block {
            info!("Block found! job {} hash {hash}", batch.job.job_id);
            self.metrics.record_block();
            self.emit(MinerEvent::BlockFound {
                job_id: batch.job.job_id.clone(),
                hash,
            });
        }

        let share = Share {
            job_id: batch.job.job_id.clone(),
            sequence: batch.job.sequence,
            extranonce2: batch.extranonce2.clone(),
            ntime: batch.job.ntime,
            nonce: found.nonce.into(),
        };

        if let Err(err) = self.upstream.submit(share) {
            warn!("Failed to queue share for job {}: {err}", batch.job.job_id);
            return;
        }

        info!(
            "Submitting share for job {} nonce {:08x} difficulty {difficulty:.4}",
            batch.job.job_id, found.nonce
        );

        self.metrics.record_share(difficulty);

        self.emit(MinerEvent::ShareSubmitted {
            job_id: batch.job.job_id.clone(),
            nonce: found.nonce,
            difficulty,
        });
    }

    fn fall_back(&mut self, reason: String) {
        let from = self.backend.name().to_string();
        let to = CpuBackend.name().to_string();

        if from == to {
            error!("Reference backend failed: {reason}");
            return;
        }

        warn!("Backend {from} failed, falling back to {to}: {reason}");

        self.backend = Arc::new(CpuBackend);
        self.batch_size = self.batch_size.min(FALLBACK_BATCH_SIZE);
        self.metrics.set_backend(&to);

        self.emit(MinerEvent::BackendFallback { from, to, reason });
    }

    fn report(&self) {
        if !self.ready {
            return;
        }

        let stats = self.metrics.snapshot();

        if stats.hashes == 0 {
            return;
        }

        info!(
            "{} | difficulty {:.4} | shares {}/{} accepted | best {:.4}",
            stats.hashrate, stats.difficulty, stats.accepted, stats.submitted, stats.best_share
        );
    }

    fn emit(&self, event: MinerEvent) {
        if self.notifications.send(event).is_err() {
            debug!("Miner event dropped: no subscribers");
        }
    }
}
