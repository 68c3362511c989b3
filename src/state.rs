use super::*;

/// Lifecycle of the pool session. Written only by the upstream task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "kebab-case")]
pub enum ConnectionState {
    #[default]
    #[display("disconnected")]
    Disconnected,
    #[display("connecting")]
    Connecting,
    #[display("subscribed")]
    Subscribed,
    #[display("authorized")]
    Authorized,
    #[display("ready")]
    Ready,
    #[display("reconnecting")]
    Reconnecting,
    /// The pool refused our credentials. Terminal until the settings change.
    #[display("unauthorized")]
    Unauthorized,
}

impl ConnectionState {
    pub fn is_ready(self) -> bool {
        self == Self::Ready
    }

    pub fn is_terminal(self) -> bool {
        self == Self::Unauthorized
    }
}
