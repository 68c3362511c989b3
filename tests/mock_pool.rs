use {
    super::*,
    tokio::{
        io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
        net::{
            TcpListener,
            tcp::{OwnedReadHalf, OwnedWriteHalf},
        },
    },
};

/// A scripted Stratum pool listening on loopback.
pub(crate) struct MockPool {
    listener: TcpListener,
    pub(crate) port: u16,
}

impl MockPool {
    pub(crate) async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        Self { listener, port }
    }

    pub(crate) async fn accept(&self) -> PoolConnection {
        let (stream, _) = timeout(WAIT, self.listener.accept())
            .await
            .expect("miner never connected")
            .unwrap();

        let (reader, writer) = stream.into_split();

        PoolConnection {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    /// Returns true if the miner opened a connection within `within`.
    pub(crate) async fn connects_within(&self, within: Duration) -> bool {
        timeout(within, self.listener.accept()).await.is_ok()
    }
}

pub(crate) struct PoolConnection {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl PoolConnection {
    pub(crate) async fn recv(&mut self) -> Option<Value> {
        let line = timeout(WAIT, self.lines.next_line())
            .await
            .expect("miner went quiet")
            .ok()??;

        Some(serde_json::from_str(&line).unwrap())
    }

    /// Reads until a request for `method` arrives, skipping anything else.
    pub(crate) async fn request(&mut self, method: &str) -> Value {
        loop {
            let message = self.recv().await.expect("connection closed");
            if message["method"] == method {
                return message;
            }
        }
    }

    /// Reads until a response to `id` arrives.
    pub(crate) async fn response(&mut self, id: u64) -> Value {
        loop {
            let message = self.recv().await.expect("connection closed");
            if message.get("method").is_none() && message["id"] == id {
                return message;
            }
        }
    }

    pub(crate) async fn send_line(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .unwrap();
    }

    pub(crate) async fn send(&mut self, message: Value) {
        self.send_line(&message.to_string()).await;
    }

    pub(crate) async fn reply(&mut self, request: &Value, result: Value) {
        self.send(json!({"id": request["id"], "result": result, "error": null}))
            .await;
    }

    pub(crate) async fn reject(&mut self, request: &Value, code: i32, message: &str) {
        self.send(json!({"id": request["id"], "result": null, "error": [code, message, null]}))
            .await;
    }

    /// Answers subscribe and authorize, returning the authorize params.
    pub(crate) async fn handshake(&mut self) -> Value {
        let subscribe = self.request("mining.subscribe").await;
        self.reply(
            &subscribe,
            json!([[["mining.notify", "1"]], EXTRANONCE1, 4]),
        )
        .await;

        let authorize = self.request("mining.authorize").await;
        self.reply(&authorize, json!(true)).await;

        authorize["params"].clone()
    }

    pub(crate) async fn set_difficulty(&mut self, difficulty: f64) {
        self.send(json!({"id": null, "method": "mining.set_difficulty", "params": [difficulty]}))
            .await;
    }

    pub(crate) async fn notify(&mut self, notify: &Notify) {
        self.send(json!({"id": null, "method": "mining.notify", "params": notify}))
            .await;
    }

    /// Waits for the peer to close the connection, discarding anything it still sends.
    pub(crate) async fn closed(&mut self) {
        while self.recv().await.is_some() {}
    }
}
