use super::*;

const EVENT_CAPACITY: usize = 1024;

/// A running miner: the upstream session and the engine, each on its own task.
pub struct Miner {
    cancel: CancellationToken,
    tasks: JoinSet<()>,
    upstream: UpstreamHandle,
    metrics: Arc<Metrics>,
    events: broadcast::Sender<MinerEvent>,
}

impl Miner {
    /// Starts mining. Cancelling `cancel` stops the miner just like [`Miner::stop`].
    pub fn start(
        settings: Settings,
        backend: Arc<dyn HashBackend>,
        cancel: CancellationToken,
    ) -> Self {
        let settings = Arc::new(settings);
        let cancel = cancel.child_token();

        let (upstream, handle, upstream_events) = Upstream::new(settings.clone());
        let metrics = Arc::new(Metrics::new(backend.name()));
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let engine = Engine::new(
            &settings,
            handle.clone(),
            upstream_events,
            backend,
            metrics.clone(),
            events.clone(),
        );

        let mut tasks = JoinSet::new();
        tasks.spawn(upstream.run(cancel.clone()));
        tasks.spawn(engine.run(cancel.clone()));

        Self {
            cancel,
            tasks,
            upstream: handle,
            metrics,
            events,
        }
    }

    pub fn stats(&self) -> Stats {
        self.metrics.snapshot()
    }

    pub fn state(&self) -> ConnectionState {
        self.upstream.state()
    }

    pub fn states(&self) -> watch::Receiver<ConnectionState> {
        self.upstream.states()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<MinerEvent> {
        self.events.subscribe()
    }

    /// Stops dispatching, drops any in-flight batch, closes the pool connection and returns
    /// the final counters.
    pub async fn stop(mut self) -> Stats {
        self.cancel.cancel();

        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                error!("Miner task failed: {err}");
            }
        }

        let stats = self.stats();

        info!("Session summary: {}", stats.summary());

        stats
    }
}
