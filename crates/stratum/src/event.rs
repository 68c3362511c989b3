use super::*;

/// Unsolicited traffic from the pool, plus connection loss.
#[derive(Debug, Clone)]
pub enum Event {
    Notify(Notify),
    SetDifficulty(Difficulty),
    SetExtranonce(SetExtranonce),
    Reconnect(Reconnect),
    ShowMessage(String),
    /// `client.get_version`, to be answered with the given id.
    GetVersion(Id),
    Disconnected,
}
