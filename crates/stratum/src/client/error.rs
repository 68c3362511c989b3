use super::*;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ClientError {
    #[snafu(display("Timed out: {source}"))]
    Timeout { source: tokio::time::error::Elapsed },

    #[snafu(display("IO error: {source}"))]
    Io { source: std::io::Error },

    #[snafu(display("Channel receive error: {source}"))]
    ChannelRecv {
        source: tokio::sync::oneshot::error::RecvError,
    },

    #[snafu(display("Channel send error"))]
    ChannelSend,

    #[snafu(display("Serialization error: {source}"))]
    Serialization { source: serde_json::Error },

    #[snafu(display("{message}"))]
    Protocol { message: String },

    #[snafu(display("Unauthorized: {reason}"))]
    Unauthorized { reason: String },

    #[snafu(display("Not connected"))]
    NotConnected,

    #[snafu(display("Request expired without a response"))]
    RequestExpired,

    #[snafu(display("Too many pending requests"))]
    TooManyPendingRequests,
}

impl ClientError {
    /// Errors after which the connection cannot be trusted and must be re-established.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::Io { .. }
                | Self::ChannelRecv { .. }
                | Self::ChannelSend
                | Self::NotConnected
                | Self::RequestExpired
        )
    }
}
