use super::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum UpstreamError {
    #[snafu(display("Pool {stage} failed: {source}"))]
    Client {
        stage: &'static str,
        source: ClientError,
    },

    #[snafu(display("Malformed handshake: {message}"))]
    Protocol { message: String },

    #[snafu(display("Pool refused authorization: {reason}"))]
    Unauthorized { reason: String },

    #[snafu(display("Nothing received from pool for {elapsed:?}"))]
    Inactive { elapsed: Duration },

    #[snafu(display("Connection closed by pool"))]
    Disconnected,

    #[snafu(display("Upstream command queue full"))]
    QueueFull,

    #[snafu(display("Upstream stopped"))]
    Closed,
}

impl<T> From<mpsc::error::TrySendError<T>> for UpstreamError {
    fn from(err: mpsc::error::TrySendError<T>) -> Self {
        match err {
            mpsc::error::TrySendError::Full(_) => Self::QueueFull,
            mpsc::error::TrySendError::Closed(_) => Self::Closed,
        }
    }
}
