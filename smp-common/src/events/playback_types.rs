//! Player and connection state types

use serde::{Deserialize, Serialize};
use std::fmt;

/// Published media player state
///
/// Union view of connection and playback: while the link is down or coming
/// up the state is forced to `Disconnected`/`Connecting`; once connected it
/// reflects the transport intent (`Stop`, `Playing`, `Pause`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaplayerState {
    Disconnected,
    Connecting,
    Stop,
    Playing,
    Pause,
}

impl MediaplayerState {
    /// True for the states only reachable with an established link
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Stop | Self::Playing | Self::Pause)
    }
}

impl fmt::Display for MediaplayerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaplayerState::Disconnected => write!(f, "disconnected"),
            MediaplayerState::Connecting => write!(f, "connecting"),
            MediaplayerState::Stop => write!(f, "stop"),
            MediaplayerState::Playing => write!(f, "playing"),
            MediaplayerState::Pause => write!(f, "pause"),
        }
    }
}

/// Connection status as seen by observers
///
/// `is_connected` and `connecting` are never both true.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub last_connect_failed: bool,
    pub connecting: bool,
}

impl ConnectionStatus {
    /// An attempt is no longer in flight
    pub fn is_settled(&self) -> bool {
        !self.connecting
    }
}
