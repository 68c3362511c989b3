use {
    super::*,
    actor::{ClientActor, ClientMessage},
    futures::StreamExt,
    std::{
        collections::HashMap,
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::{Duration, Instant},
    },
    tokio::{
        io::{AsyncWriteExt, BufWriter},
        net::TcpStream,
        sync::{broadcast, mpsc, oneshot},
    },
    tokio_util::codec::{FramedRead, LinesCodec},
    tracing::{debug, error, warn},
};

pub use error::ClientError;

mod actor;
mod error;

pub type Result<T = (), E = ClientError> = std::result::Result<T, E>;

pub type EventReceiver = broadcast::Receiver<Event>;

const CHANNEL_BUFFER_SIZE: usize = 256;

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub address: String,
    pub username: String,
    pub user_agent: String,
    pub password: Option<String>,
    pub timeout: Duration,
}

/// Last read and write on the wire, shared between the handle and the actor.
#[derive(Debug)]
pub(crate) struct Activity {
    origin: Instant,
    received: AtomicU64,
    sent: AtomicU64,
}

impl Activity {
    fn new() -> Self {
        Self {
            origin: Instant::now(),
            received: AtomicU64::new(0),
            sent: AtomicU64::new(0),
        }
    }

    fn now(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    pub(crate) fn touch_received(&self) {
        self.received.store(self.now(), Ordering::Relaxed);
    }

    pub(crate) fn touch_sent(&self) {
        self.sent.store(self.now(), Ordering::Relaxed);
    }

    fn since(&self, stamp: &AtomicU64) -> Duration {
        Duration::from_millis(self.now().saturating_sub(stamp.load(Ordering::Relaxed)))
    }
}

/// Handle to a connection actor. Cheap to clone; the actor stops once every handle is dropped.
#[derive(Clone)]
pub struct Client {
    pub config: Arc<ClientConfig>,
    tx: mpsc::Sender<ClientMessage>,
    events: broadcast::Sender<Event>,
    next_id: Arc<AtomicU64>,
    activity: Arc<Activity>,
}

/// A request that has been written to the wire and awaits its response.
#[derive(Debug)]
pub struct PendingResponse {
    id: Id,
    rx: oneshot::Receiver<Result<Message>>,
    timeout: Duration,
}

impl PendingResponse {
    pub fn id(&self) -> &Id {
        &self.id
    }

    pub async fn wait(self) -> Result<Message> {
        tokio::time::timeout(self.timeout, self.rx)
            .await
            .context(error::TimeoutSnafu)?
            .context(error::ChannelRecvSnafu)?
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected { reason: String },
}

impl SubmitOutcome {
    /// A share counts as accepted only for `result: true` with no error.
    pub fn from_response(message: &Message) -> Result<Self> {
        let Message::Response {
            result,
            error,
            reject_reason,
            ..
        } = message
        else {
            return Err(ClientError::Protocol {
                message: format!("unexpected reply to mining.submit: {message:?}"),
            });
        };

        if error.is_none() && matches!(result, Some(Value::Bool(true))) {
            return Ok(SubmitOutcome::Accepted);
        }

        let reason = error
            .as_ref()
            .map(|error| error.message.clone())
            .or_else(|| reject_reason.clone())
            .unwrap_or_else(|| "unknown".into());

        Ok(SubmitOutcome::Rejected { reason })
    }
}

#[derive(Debug)]
pub struct SubmitHandle(PendingResponse);

impl SubmitHandle {
    pub fn id(&self) -> &Id {
        self.0.id()
    }

    pub async fn wait(self) -> Result<SubmitOutcome> {
        SubmitOutcome::from_response(&self.0.wait().await?)
    }
}

impl Client {
    pub fn new(config: ClientConfig) -> Self {
        let config = Arc::new(config);
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let (events, _) = broadcast::channel(CHANNEL_BUFFER_SIZE);
        let activity = Arc::new(Activity::new());

        tokio::spawn(ClientActor::new(config.clone(), rx, events.clone(), activity.clone()).run());

        Self {
            config,
            tx,
            events,
            next_id: Arc::new(AtomicU64::new(0)),
            activity,
        }
    }

    /// Opens the TCP connection, dropping any previous one. Events received from here on are
    /// delivered to the returned receiver.
    pub async fn connect(&self) -> Result<EventReceiver> {
        let events = self.events.subscribe();
        let (respond_to, rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::Connect { respond_to })
            .await
            .map_err(|_| ClientError::ChannelSend)?;

        rx.await.context(error::ChannelRecvSnafu)??;

        Ok(events)
    }

    pub async fn disconnect(&self) -> Result {
        let (respond_to, rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::Disconnect { respond_to })
            .await
            .map_err(|_| ClientError::ChannelSend)?;

        rx.await.context(error::ChannelRecvSnafu)
    }

    pub fn since_last_received(&self) -> Duration {
        self.activity.since(&self.activity.received)
    }

    pub fn since_last_sent(&self) -> Duration {
        self.activity.since(&self.activity.sent)
    }

    pub async fn request(&self, method: &'static str, params: Value) -> Result<PendingResponse> {
        let id = Id::Number(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (respond_to, rx) = oneshot::channel();
        let (written, written_rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::Request {
                id: id.clone(),
                method,
                params,
                respond_to,
                written,
            })
            .await
            .map_err(|_| ClientError::ChannelSend)?;

        written_rx.await.context(error::ChannelRecvSnafu)??;

        Ok(PendingResponse {
            id,
            rx,
            timeout: self.config.timeout,
        })
    }

    pub async fn subscribe(&self) -> Result<SubscribeResult> {
        let params = serde_json::to_value(Subscribe {
            user_agent: self.config.user_agent.clone(),
            extranonce1: None,
        })
        .context(error::SerializationSnafu)?;

        match self.request("mining.subscribe", params).await?.wait().await? {
            Message::Response {
                result: Some(result),
                error: None,
                ..
            } => serde_json::from_value(result).map_err(|err| ClientError::Protocol {
                message: format!("malformed subscribe result: {err}"),
            }),
            Message::Response {
                error: Some(err), ..
            } => Err(ClientError::Protocol {
                message: format!("mining.subscribe failed: {err}"),
            }),
            other => Err(ClientError::Protocol {
                message: format!("unexpected reply to mining.subscribe: {other:?}"),
            }),
        }
    }

    pub async fn authorize(&self) -> Result {
        let params = serde_json::to_value(Authorize {
            username: self.config.username.clone(),
            password: self.config.password.clone(),
        })
        .context(error::SerializationSnafu)?;

        match self.request("mining.authorize", params).await?.wait().await? {
            Message::Response {
                result: Some(Value::Bool(true)),
                error: None,
                ..
            } => Ok(()),
            Message::Response {
                error: Some(err), ..
            } => Err(ClientError::Unauthorized {
                reason: err.message,
            }),
            Message::Response {
                reject_reason: Some(reason),
                ..
            } => Err(ClientError::Unauthorized { reason }),
            Message::Response { .. } => Err(ClientError::Unauthorized {
                reason: "authorization refused".into(),
            }),
            other => Err(ClientError::Protocol {
                message: format!("unexpected reply to mining.authorize: {other:?}"),
            }),
        }
    }

    /// Sends `mining.suggest_difficulty`. Pools commonly never answer, so the reply is not
    /// awaited.
    pub async fn suggest_difficulty(&self, difficulty: Difficulty) -> Result<Id> {
        let params = serde_json::to_value(SuggestDifficulty(difficulty))
            .context(error::SerializationSnafu)?;

        Ok(self
            .request("mining.suggest_difficulty", params)
            .await?
            .id()
            .clone())
    }

    pub async fn submit(
        &self,
        job_id: JobId,
        extranonce2: Extranonce,
        ntime: Ntime,
        nonce: Nonce,
    ) -> Result<SubmitHandle> {
        let params = serde_json::to_value(Submit {
            username: self.config.username.clone(),
            job_id,
            extranonce2,
            ntime,
            nonce,
            version_bits: None,
        })
        .context(error::SerializationSnafu)?;

        Ok(SubmitHandle(self.request("mining.submit", params).await?))
    }

    /// Answers a request the pool sent us.
    pub async fn respond(&self, id: Id, result: Value) -> Result {
        let (written, written_rx) = oneshot::channel();

        self.tx
            .send(ClientMessage::Respond {
                message: Message::Response {
                    id,
                    result: Some(result),
                    error: None,
                    reject_reason: None,
                },
                written,
            })
            .await
            .map_err(|_| ClientError::ChannelSend)?;

        written_rx.await.context(error::ChannelRecvSnafu)?
    }
}
