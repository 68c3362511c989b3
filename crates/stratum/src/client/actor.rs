use super::*;

struct Connection {
    writer: BufWriter<tokio::net::tcp::OwnedWriteHalf>,
    reader_handle: tokio::task::JoinHandle<()>,
    generation: u64,
}

enum Incoming {
    Response(Id, Message),
    Request {
        id: Id,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    Disconnected,
    Error(ClientError),
}

const MAX_PENDING_REQUESTS: usize = 1024;

type PendingRequest = (oneshot::Sender<Result<Message>>, Instant);

pub(super) enum ClientMessage {
    Connect {
        respond_to: oneshot::Sender<Result>,
    },
    Request {
        id: Id,
        method: &'static str,
        params: Value,
        respond_to: oneshot::Sender<Result<Message>>,
        written: oneshot::Sender<Result>,
    },
    Respond {
        message: Message,
        written: oneshot::Sender<Result>,
    },
    Disconnect {
        respond_to: oneshot::Sender<()>,
    },
}

pub(super) struct ClientActor {
    config: Arc<ClientConfig>,
    rx: mpsc::Receiver<ClientMessage>,
    events: broadcast::Sender<Event>,
    activity: Arc<Activity>,
    pending: HashMap<Id, PendingRequest>,
    connection: Option<Connection>,
    generation: u64,
}

impl ClientActor {
    pub(super) fn new(
        config: Arc<ClientConfig>,
        rx: mpsc::Receiver<ClientMessage>,
        events: broadcast::Sender<Event>,
        activity: Arc<Activity>,
    ) -> Self {
        Self {
            config,
            rx,
            events,
            activity,
            pending: HashMap::new(),
            connection: None,
            generation: 0,
        }
    }

    pub(super) async fn run(mut self) {
        let (incoming_tx, mut incoming_rx) = mpsc::channel::<(u64, Incoming)>(CHANNEL_BUFFER_SIZE);
        let mut sweep = tokio::time::interval(self.config.timeout.max(Duration::from_millis(100)));

        loop {
            tokio::select! {
                biased;

                Some((generation, msg)) = incoming_rx.recv() => {
                    if self.connection.as_ref().map(|c| c.generation) == Some(generation) {
                        self.handle_incoming(msg).await;
                    }
                }
                msg = self.rx.recv() => {
                    let Some(msg) = msg else {
                        debug!("Client actor shutting down");
                        self.handle_disconnect();
                        break;
                    };

                    match msg {
                        ClientMessage::Connect { respond_to } => {
                            let result = self.handle_connect(incoming_tx.clone()).await;
                            if respond_to.send(result).is_err() {
                                debug!("Connect response dropped: caller gave up");
                            }
                        }
                        ClientMessage::Request { id, method, params, respond_to, written } => {
                            let result = self.handle_request(id, method, params, respond_to).await;
                            if written.send(result).is_err() {
                                debug!("Request result dropped: caller gave up");
                            }
                        }
                        ClientMessage::Respond { message, written } => {
                            let result = self.send_message(&message).await;
                            if result.is_err() {
                                self.handle_disconnect();
                            }
                            if written.send(result).is_err() {
                                debug!("Respond result dropped: caller gave up");
                            }
                        }
                        ClientMessage::Disconnect { respond_to } => {
                            self.handle_disconnect();
                            if respond_to.send(()).is_err() {
                                debug!("Disconnect response dropped: caller gave up");
                            }
                        }
                    }
                }
                _ = sweep.tick() => self.evict_expired_pending(),
            }
        }
    }

    fn evict_expired_pending(&mut self) {
        let now = Instant::now();

        let expired_ids = self
            .pending
            .iter()
            .filter(|(_, (_, deadline))| now > *deadline)
            .map(|(id, _)| id.clone())
            .collect::<Vec<_>>();

        for id in expired_ids {
            if let Some((tx, _)) = self.pending.remove(&id)
                && tx.send(Err(ClientError::RequestExpired)).is_err()
            {
                debug!("RequestExpired response dropped: caller gave up");
            }
        }
    }

    async fn handle_connect(&mut self, incoming_tx: mpsc::Sender<(u64, Incoming)>) -> Result {
        if self.connection.is_some() {
            self.handle_disconnect();
        }

        let stream =
            tokio::time::timeout(self.config.timeout, TcpStream::connect(&self.config.address))
                .await
                .context(error::TimeoutSnafu)?
                .context(error::IoSnafu)?;

        stream.set_nodelay(true).context(error::IoSnafu)?;

        let (reader, writer) = stream.into_split();
        let framed_reader =
            FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_MESSAGE_SIZE));

        self.generation += 1;
        let generation = self.generation;
        let activity = self.activity.clone();

        let reader_handle = tokio::spawn(async move {
            Self::reader_task(framed_reader, generation, activity, incoming_tx).await;
        });

        self.activity.touch_received();
        self.activity.touch_sent();

        self.connection = Some(Connection {
            writer: BufWriter::new(writer),
            reader_handle,
            generation,
        });

        debug!("Connected to {}", self.config.address);
        Ok(())
    }

    async fn send_message(&mut self, msg: &Message) -> Result {
        let connection = self.connection.as_mut().ok_or(ClientError::NotConnected)?;

        let frame = serde_json::to_string(msg).context(error::SerializationSnafu)? + "\n";

        connection
            .writer
            .write_all(frame.as_bytes())
            .await
            .context(error::IoSnafu)?;

        connection.writer.flush().await.context(error::IoSnafu)?;

        self.activity.touch_sent();

        Ok(())
    }

    async fn handle_request(
        &mut self,
        id: Id,
        method: &'static str,
        params: Value,
        respond_to: oneshot::Sender<Result<Message>>,
    ) -> Result {
        self.evict_expired_pending();

        if self.pending.len() >= MAX_PENDING_REQUESTS {
            return Err(ClientError::TooManyPendingRequests);
        }

        let msg = Message::Request {
            id: id.clone(),
            method: method.to_owned(),
            params,
        };

        match self.send_message(&msg).await {
            Ok(()) => {
                let deadline = Instant::now() + self.config.timeout;
                self.pending.insert(id, (respond_to, deadline));
                Ok(())
            }
            Err(err @ ClientError::NotConnected) => Err(err),
            Err(err) => {
                warn!("Failed to send {method}: {err}");
                self.handle_disconnect();
                Err(err)
            }
        }
    }

    fn handle_disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        connection.reader_handle.abort();
        debug!("Disconnected from {}", self.config.address);

        for (_, (tx, _)) in std::mem::take(&mut self.pending) {
            if tx.send(Err(ClientError::NotConnected)).is_err() {
                debug!("NotConnected response dropped: caller gave up");
            }
        }

        self.emit(Event::Disconnected);
    }

    fn emit(&self, event: Event) {
        if self.events.send(event).is_err() {
            debug!("Event dropped: no subscribers");
        }
    }

    async fn handle_incoming(&mut self, msg: Incoming) {
        match msg {
            Incoming::Response(id, message) => {
                if let Some((tx, _)) = self.pending.remove(&id) {
                    if tx.send(Ok(message)).is_err() {
                        debug!("Response dropped: caller gave up");
                    }
                } else {
                    warn!("Unmatched response ID={id}");
                }
            }
            Incoming::Request { id, method, params } => {
                if method == "client.get_version" {
                    self.emit(Event::GetVersion(id));
                } else {
                    self.handle_notification(&method, params);
                }
            }
            Incoming::Notification { method, params } => self.handle_notification(&method, params),
            Incoming::Disconnected => {
                warn!("Connection to {} closed by peer", self.config.address);
                self.handle_disconnect();
            }
            Incoming::Error(err) => {
                error!("Reader error: {err}");
                self.handle_disconnect();
            }
        }
    }

    fn handle_notification(&mut self, method: &str, params: Value) {
        match method {
            "mining.notify" => match serde_json::from_value::<Notify>(params) {
                Ok(notify) => self.emit(Event::Notify(notify)),
                Err(e) => warn!("Failed to parse mining.notify: {e}"),
            },
            "mining.set_difficulty" => match serde_json::from_value::<SetDifficulty>(params)
                .map(|set| set.difficulty())
            {
                Ok(Some(difficulty)) => self.emit(Event::SetDifficulty(difficulty)),
                Ok(None) => warn!("Ignoring mining.set_difficulty without params"),
                Err(e) => warn!("Failed to parse mining.set_difficulty: {e}"),
            },
            "mining.set_extranonce" => match serde_json::from_value::<SetExtranonce>(params) {
                Ok(set) => self.emit(Event::SetExtranonce(set)),
                Err(e) => warn!("Failed to parse mining.set_extranonce: {e}"),
            },
            "client.reconnect" => match serde_json::from_value::<Reconnect>(params) {
                Ok(reconnect) => self.emit(Event::Reconnect(reconnect)),
                Err(e) => warn!("Failed to parse client.reconnect: {e}"),
            },
            "client.show_message" => {
                let message = match params {
                    Value::Array(mut items) if !items.is_empty() => match items.swap_remove(0) {
                        Value::String(text) => text,
                        other => other.to_string(),
                    },
                    other => other.to_string(),
                };
                self.emit(Event::ShowMessage(message));
            }
            _ => warn!("Unhandled notification: {method}"),
        }
    }

    async fn reader_task(
        mut reader: FramedRead<tokio::net::tcp::OwnedReadHalf, LinesCodec>,
        generation: u64,
        activity: Arc<Activity>,
        incoming_tx: mpsc::Sender<(u64, Incoming)>,
    ) {
        while let Some(result) = reader.next().await {
            let line = match result {
                Ok(line) => line,
                Err(e) => {
                    if incoming_tx
                        .send((
                            generation,
                            Incoming::Error(ClientError::Io {
                                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
                            }),
                        ))
                        .await
                        .is_err()
                    {
                        debug!("Error notification dropped: actor shutting down");
                    }
                    return;
                }
            };

            activity.touch_received();

            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let incoming = match serde_json::from_str::<Message>(line) {
                Ok(Message::Response {
                    id,
                    result,
                    error,
                    reject_reason,
                }) => {
                    if id == Id::Null {
                        warn!("Ignoring response without id: {line}");
                        continue;
                    }

                    Incoming::Response(
                        id.clone(),
                        Message::Response {
                            id,
                            result,
                            error,
                            reject_reason,
                        },
                    )
                }
                Ok(Message::Request { id, method, params }) => {
                    Incoming::Request { id, method, params }
                }
                Ok(Message::Notification { method, params }) => {
                    Incoming::Notification { method, params }
                }
                Err(e) => {
                    warn!("Invalid JSON message: {line:?} - {e}");
                    continue;
                }
            };

            if incoming_tx.send((generation, incoming)).await.is_err() {
                debug!("Incoming message dropped: actor shutting down");
                return;
            }
        }

        if incoming_tx
            .send((generation, Incoming::Disconnected))
            .await
            .is_err()
        {
            debug!("Disconnected notification dropped: actor already shut down");
        }
    }
}
