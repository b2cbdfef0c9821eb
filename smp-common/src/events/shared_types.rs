//! Snapshot type shared by tick events and the engine facade

use serde::{Deserialize, Serialize};

use super::{ConnectionStatus, MediaplayerState};
use crate::MediaItem;

/// Live view of the engine, republished on every tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub state: MediaplayerState,
    pub connection: ConnectionStatus,
    pub current_item: Option<MediaItem>,
    pub previous_item: Option<MediaItem>,
    pub next_item: Option<MediaItem>,
    /// Position within the current item (None when nothing is open)
    pub position_ms: Option<u64>,
    /// Duration of the current item (None when unknown or nothing is open)
    pub duration_ms: Option<u64>,
    /// Volume 0-100
    pub volume: u8,
    pub playlist_len: usize,
}

impl EngineSnapshot {
    /// Snapshot of a freshly constructed engine
    pub fn disconnected(volume: u8) -> Self {
        Self {
            state: MediaplayerState::Disconnected,
            connection: ConnectionStatus::default(),
            current_item: None,
            previous_item: None,
            next_item: None,
            position_ms: None,
            duration_ms: None,
            volume,
            playlist_len: 0,
        }
    }

    /// Playback progress as a fraction in [0, 1], if both values are known
    pub fn progress(&self) -> Option<f64> {
        match (self.position_ms, self.duration_ms) {
            (Some(position), Some(duration)) if duration > 0 => {
                Some((position.min(duration) as f64) / duration as f64)
            }
            _ => None,
        }
    }
}
