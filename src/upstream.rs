use {
    super::*,
    stratum::{Client, ClientConfig, ClientError, Event, EventReceiver, Reconnect, SubmitOutcome},
    tokio::sync::broadcast::error::RecvError,
};

pub use error::UpstreamError;

mod error;

const COMMAND_CAPACITY: usize = 1024;
const EVENT_CAPACITY: usize = 1024;

/// A share ready to be sent, tagged with the sequence of the job it was found on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub job_id: JobId,
    pub sequence: u64,
    pub extranonce2: Extranonce,
    pub ntime: Ntime,
    pub nonce: Nonce,
}

#[derive(Debug, Clone, PartialEq)]
pub enum UpstreamEvent {
    JobReceived(Arc<Job>),
    DifficultyChanged(Difficulty),
    ShareAck {
        id: Id,
        job_id: JobId,
        accepted: bool,
        reason: Option<String>,
    },
    ConnectionStateChanged(ConnectionState),
}

#[derive(Debug)]
pub(crate) enum Command {
    Submit(Share),
    SuggestDifficulty(Difficulty),
    Resync,
}

enum SessionEnd {
    Cancelled,
    Resync,
    Redirected(Duration),
}

/// Cloneable handle used by the engine to talk to the upstream task.
#[derive(Debug, Clone)]
pub struct UpstreamHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<ConnectionState>,
    jobs: watch::Receiver<Option<Arc<Job>>>,
}

impl UpstreamHandle {
    /// Queues a share for submission. Its acknowledgement arrives later as
    /// [`UpstreamEvent::ShareAck`].
    pub fn submit(&self, share: Share) -> Result<(), UpstreamError> {
        Ok(self.commands.try_send(Command::Submit(share))?)
    }

    /// Best effort; the pool may ignore it.
    pub fn suggest_difficulty(&self, difficulty: Difficulty) -> Result<(), UpstreamError> {
        Ok(self
            .commands
            .try_send(Command::SuggestDifficulty(difficulty))?)
    }

    /// Drops the session and resubscribes immediately for fresh extranonce and work.
    pub fn resync(&self) -> Result<(), UpstreamError> {
        Ok(self.commands.try_send(Command::Resync)?)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn states(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// The current job slot. `None` whenever there is no usable session.
    pub fn jobs(&self) -> watch::Receiver<Option<Arc<Job>>> {
        self.jobs.clone()
    }
}

/// Owns the pool session: handshake, job delivery, share submission, keepalive, and
/// reconnection with backoff.
pub struct Upstream {
    settings: Arc<Settings>,
    client: Client,
    policy: ReconnectPolicy,
    commands: mpsc::Receiver<Command>,
    events: mpsc::Sender<UpstreamEvent>,
    state: watch::Sender<ConnectionState>,
    jobs: watch::Sender<Option<Arc<Job>>>,
    sequence: u64,
    session_floor: u64,
    /// Sequence of the latest clean job; shares on earlier jobs are dropped.
    clean_floor: u64,
    suggested: Option<Difficulty>,
    pool_difficulty: Option<Difficulty>,
}

impl Upstream {
    pub fn new(
        settings: Arc<Settings>,
    ) -> (Self, UpstreamHandle, mpsc::Receiver<UpstreamEvent>) {
        let client = Client::new(ClientConfig {
            address: settings.endpoint(),
            username: settings.username(),
            user_agent: USER_AGENT.into(),
            password: settings.password.clone(),
            timeout: settings.timeout(),
        });

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (jobs_tx, jobs_rx) = watch::channel(None);

        let upstream = Self {
            policy: ReconnectPolicy::from_settings(&settings),
            settings,
            client,
            commands: command_rx,
            events: event_tx,
            state: state_tx,
            jobs: jobs_tx,
            sequence: 0,
            session_floor: 0,
            clean_floor: 0,
            suggested: None,
            pool_difficulty: None,
        };

        let handle = UpstreamHandle {
            commands: command_tx,
            state: state_rx,
            jobs: jobs_rx,
        };

        (upstream, handle, event_rx)
    }

    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            self.set_state(ConnectionState::Connecting).await;

            let outcome = self.session(&cancel).await;

            self.jobs.send_replace(None);

            if let Err(err) = self.client.disconnect().await {
                debug!("Failed to disconnect cleanly: {err}");
            }

            let delay = match outcome {
                Ok(SessionEnd::Cancelled) => break,
                Ok(SessionEnd::Resync) => {
                    info!("Resynchronizing with {}", self.settings.endpoint());
                    Duration::ZERO
                }
                Ok(SessionEnd::Redirected(wait)) => {
                    info!("Pool asked us to reconnect in {wait:?}");
                    wait
                }
                Err(UpstreamError::Unauthorized { reason }) => {
                    error!(
                        "Pool {} refused worker {}: {reason}",
                        self.settings.endpoint(),
                        self.settings.username()
                    );
                    self.set_state(ConnectionState::Unauthorized).await;
                    cancel.cancelled().await;
                    break;
                }
                Err(err) => {
                    self.policy.record_failure();
                    let delay = self.policy.delay();
                    warn!(
                        "{err}; reconnecting in {:.1}s (attempt {})",
                        delay.as_secs_f64(),
                        self.policy.failures()
                    );
                    delay
                }
            };

            self.set_state(ConnectionState::Reconnecting).await;

            if cancel.run_until_cancelled(sleep(delay)).await.is_none() {
                break;
            }
        }

        self.jobs.send_replace(None);
        self.set_state(ConnectionState::Disconnected).await;
    }

    async fn session(&mut self, cancel: &CancellationToken) -> Result<SessionEnd, UpstreamError> {
        let Some(events) = cancel.run_until_cancelled(self.client.connect()).await else {
            return Ok(SessionEnd::Cancelled);
        };
        let mut events = events.context(error::ClientSnafu { stage: "connect" })?;

        info!("Connected to {}", self.settings.endpoint());

        self.session_floor = self.sequence;
        self.drain_stale_commands();

        let Some(subscription) = cancel.run_until_cancelled(self.client.subscribe()).await else {
            return Ok(SessionEnd::Cancelled);
        };
        let subscription = subscription.context(error::ClientSnafu { stage: "subscribe" })?;

        snafu::ensure!(
            !subscription.extranonce1.is_empty(),
            error::ProtocolSnafu {
                message: "empty extranonce1 in subscribe result",
            }
        );

        info!(
            "Subscribed: extranonce1={}, extranonce2_size={}",
            subscription.extranonce1, subscription.extranonce2_size
        );

        let mut extranonce1 = subscription.extranonce1;
        let mut extranonce2_size = subscription.extranonce2_size;

        self.set_state(ConnectionState::Subscribed).await;

        let Some(authorization) = cancel.run_until_cancelled(self.client.authorize()).await
        else {
            return Ok(SessionEnd::Cancelled);
        };

        match authorization {
            Ok(()) => {}
            Err(ClientError::Unauthorized { reason }) => {
                return Err(UpstreamError::Unauthorized { reason });
            }
            Err(source) => {
                return Err(UpstreamError::Client {
                    stage: "authorize",
                    source,
                });
            }
        }

        info!("Authorized as {}", self.settings.username());

        self.set_state(ConnectionState::Authorized).await;

        if let Some(difficulty) = self.suggested.or(self.settings.initial_difficulty()) {
            self.suggest(difficulty).await?;
        }

        let mut tick = interval(self.tick_period());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => return Ok(SessionEnd::Cancelled),

                event = events.recv() => match event {
                    Ok(Event::Notify(notify)) => {
                        self.handle_notify(notify, &extranonce1, extranonce2_size).await;
                    }
                    Ok(Event::SetDifficulty(difficulty)) => {
                        info!("Pool difficulty set to {difficulty}");
                        self.pool_difficulty = Some(difficulty);
                        self.emit(UpstreamEvent::DifficultyChanged(difficulty)).await;
                    }
                    Ok(Event::SetExtranonce(set)) => {
                        info!(
                            "Extranonce changed: extranonce1={}, extranonce2_size={}",
                            set.extranonce1, set.extranonce2_size
                        );
                        extranonce1 = set.extranonce1;
                        extranonce2_size = set.extranonce2_size;
                    }
                    Ok(Event::Reconnect(reconnect)) => {
                        if let Some(wait) = self.redirect(&reconnect) {
                            return Ok(SessionEnd::Redirected(wait));
                        }
                    }
                    Ok(Event::ShowMessage(message)) => info!("Pool message: {message}"),
                    Ok(Event::GetVersion(id)) => {
                        self.client
                            .respond(id, json!(USER_AGENT))
                            .await
                            .context(error::ClientSnafu { stage: "get_version reply" })?;
                    }
                    Ok(Event::Disconnected) | Err(RecvError::Closed) => {
                        return Err(UpstreamError::Disconnected);
                    }
                    Err(RecvError::Lagged(count)) => warn!("Dropped {count} pool events"),
                },

                Some(command) = self.commands.recv() => match command {
                    Command::Submit(share) => self.submit(share).await?,
                    Command::SuggestDifficulty(difficulty) => self.suggest(difficulty).await?,
                    Command::Resync => return Ok(SessionEnd::Resync),
                },

                _ = tick.tick() => self.check_liveness().await?,
            }
        }
    }

    async fn handle_notify(
        &mut self,
        notify: Notify,
        extranonce1: &Extranonce,
        extranonce2_size: usize,
    ) {
        let job_id = notify.job_id.clone();

        let job = match Job::new(
            notify,
            extranonce1.clone(),
            extranonce2_size,
            self.sequence + 1,
        ) {
            Ok(job) => Arc::new(job),
            Err(err) => {
                warn!("Ignoring job {job_id}: {err}");
                return;
            }
        };

        self.sequence += 1;

        if job.clean {
            self.clean_floor = job.sequence;
        }

        info!(
            "New job {}: clean={}, network difficulty={:.0}",
            job.job_id,
            job.clean,
            target_to_difficulty(job.network_target())
        );

        self.jobs.send_replace(Some(job.clone()));

        if *self.state.borrow() == ConnectionState::Authorized {
            self.policy.reset();
            self.set_state(ConnectionState::Ready).await;
        }

        self.emit(UpstreamEvent::JobReceived(job)).await;
    }

    async fn submit(&mut self, share: Share) -> Result<(), UpstreamError> {
        if !self.state.borrow().is_ready() || share.sequence <= self.session_floor {
            debug!(
                "Dropping share for job {} from a previous session",
                share.job_id
            );
            return Ok(());
        }

        if share.sequence < self.clean_floor {
            debug!(
                "Dropping share for job {} superseded by a clean job",
                share.job_id
            );
            return Ok(());
        }

        let handle = self
            .client
            .submit(
                share.job_id.clone(),
                share.extranonce2,
                share.ntime,
                share.nonce,
            )
            .await
            .context(error::ClientSnafu { stage: "submit" })?;

        let id = handle.id().clone();
        let job_id = share.job_id;
        let events = self.events.clone();

        debug!("Submitted share {id} for job {job_id}");

        tokio::spawn(async move {
            let (accepted, reason) = match handle.wait().await {
                Ok(SubmitOutcome::Accepted) => (true, None),
                Ok(SubmitOutcome::Rejected { reason }) => (false, Some(reason)),
                Err(err) => {
                    warn!("No answer for share {id}: {err}");
                    return;
                }
            };

            let ack = UpstreamEvent::ShareAck {
                id,
                job_id,
                accepted,
                reason,
            };

            if events.send(ack).await.is_err() {
                debug!("Share ack dropped: engine stopped");
            }
        });

        Ok(())
    }

    async fn suggest(&mut self, difficulty: Difficulty) -> Result<(), UpstreamError> {
        debug!("Suggesting difficulty {difficulty}");
        self.suggested = Some(difficulty);
        self.client
            .suggest_difficulty(difficulty)
            .await
            .context(error::ClientSnafu {
                stage: "suggest_difficulty",
            })?;
        Ok(())
    }

    async fn check_liveness(&mut self) -> Result<(), UpstreamError> {
        let inactivity = self.settings.inactivity_timeout();
        let elapsed = self.client.since_last_received();

        if !inactivity.is_zero() && elapsed >= inactivity {
            return Err(UpstreamError::Inactive { elapsed });
        }

        let keepalive = self.settings.keepalive_interval();

        if !keepalive.is_zero() && self.client.since_last_sent() >= keepalive {
            let difficulty = self
                .suggested
                .or(self.pool_difficulty)
                .unwrap_or_default();
            debug!("Sending keepalive");
            self.suggest(difficulty).await?;
        }

        Ok(())
    }

    /// Honours `client.reconnect` only towards the pool we were configured with.
    fn redirect(&self, reconnect: &Reconnect) -> Option<Duration> {
        let host = reconnect.host.as_deref().unwrap_or(&self.settings.host);
        let port = reconnect.port.unwrap_or(self.settings.port);

        if host != self.settings.host || port != self.settings.port {
            warn!("Ignoring client.reconnect to {host}:{port}");
            return None;
        }

        Some(Duration::from_secs(reconnect.wait.unwrap_or(0)).min(self.policy.max()))
    }

    /// Keeps the latest difficulty suggestion and discards shares from the previous session.
    fn drain_stale_commands(&mut self) {
        let mut dropped = 0;

        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Submit(_) => dropped += 1,
                Command::SuggestDifficulty(difficulty) => self.suggested = Some(difficulty),
                Command::Resync => {}
            }
        }

        if dropped > 0 {
            debug!("Discarded {dropped} shares queued while disconnected");
        }
    }

    fn tick_period(&self) -> Duration {
        [
            self.settings.inactivity_timeout(),
            self.settings.keepalive_interval(),
        ]
        .into_iter()
        .filter(|period| !period.is_zero())
        .min()
        .map_or(Duration::from_secs(5), |period| period / 4)
        .clamp(Duration::from_millis(10), Duration::from_secs(5))
    }

    async fn set_state(&mut self, state: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });

        if changed {
            debug!("Connection state: {state}");
            self.emit(UpstreamEvent::ConnectionStateChanged(state)).await;
        }
    }

    async fn emit(&self, event: UpstreamEvent) {
        if self.events.send(event).await.is_err() {
            debug!("Upstream event dropped: no receiver");
        }
    }
}

#[cfg(test)]
pub(crate) struct TestUpstream {
    pub(crate) commands: mpsc::Receiver<Command>,
    pub(crate) state: watch::Sender<ConnectionState>,
    pub(crate) jobs: watch::Sender<Option<Arc<Job>>>,
    pub(crate) events: mpsc::Sender<UpstreamEvent>,
}

#[cfg(test)]
impl TestUpstream {
    pub(crate) fn new() -> (Self, UpstreamHandle, mpsc::Receiver<UpstreamEvent>) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (jobs_tx, jobs_rx) = watch::channel(None);

        (
            Self {
                commands: command_rx,
                state: state_tx,
                jobs: jobs_tx,
                events: event_tx,
            },
            UpstreamHandle {
                commands: command_tx,
                state: state_rx,
                jobs: jobs_rx,
            },
            event_rx,
        )
    }

    pub(crate) async fn set_state(&self, state: ConnectionState) {
        self.state.send_replace(state);
        self.events
            .send(UpstreamEvent::ConnectionStateChanged(state))
            .await
            .unwrap();
    }

    pub(crate) async fn publish(&self, job: Job) -> Arc<Job> {
        let job = Arc::new(job);
        self.jobs.send_replace(Some(job.clone()));
        self.events
            .send(UpstreamEvent::JobReceived(job.clone()))
            .await
            .unwrap();
        job
    }

    pub(crate) async fn send(&self, event: UpstreamEvent) {
        self.events.send(event).await.unwrap();
    }

    /// Drains queued commands, returning submitted shares and whether a resync was requested.
    pub(crate) fn drain(&mut self) -> (Vec<Share>, Vec<Difficulty>, bool) {
        let mut shares = Vec::new();
        let mut suggestions = Vec::new();
        let mut resync = false;

        while let Ok(command) = self.commands.try_recv() {
            match command {
                Command::Submit(share) => shares.push(share),
                Command::SuggestDifficulty(difficulty) => suggestions.push(difficulty),
                Command::Resync => resync = true,
            }
        }

        (shares, suggestions, resync)
    }
}
