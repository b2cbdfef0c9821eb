//! Event types for the SMP event system
//!
//! Every notification the engine publishes is a variant of [`PlayerEvent`].
//! Subscribers register per [`EventKind`], so each variant maps to exactly
//! one kind.

mod playback_types;
mod shared_types;

pub use playback_types::{ConnectionStatus, MediaplayerState};
pub use shared_types::EngineSnapshot;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::MediaItem;

/// Player events
///
/// Events can be serialized for display or forwarding (the console prints
/// them as JSON with `--json`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlayerEvent {
    /// Link to the media server established
    ServerConnect {
        endpoint: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Link to the media server lost, closed, or never established
    ServerDisconnect {
        endpoint: String,
        /// False when a connect attempt failed before the link came up
        was_connected: bool,
        /// Failure description for failed attempts
        reason: Option<String>,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Published media player state changed
    StateChangeMediaplayer {
        old_state: MediaplayerState,
        new_state: MediaplayerState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Playlist cursor moved
    CurrentMediaItemChanged {
        old: Option<MediaItem>,
        new: Option<MediaItem>,
    },

    /// Derived previous item changed
    PreviousMediaItemChanged {
        old: Option<MediaItem>,
        new: Option<MediaItem>,
    },

    /// Derived next item changed
    NextMediaItemChanged {
        old: Option<MediaItem>,
        new: Option<MediaItem>,
    },

    /// An empty playlist received its first item
    PlaylistStart { playlist: String },

    /// The cursor ran off the playlist or the last current item was removed
    PlaylistEnd { playlist: String },

    /// A stream handle was opened for the item and playback began
    MediaItemStartPlay { item: MediaItem },

    /// The stream handle for the item was released
    MediaItemEndPlay {
        item: MediaItem,
        /// Last sampled position
        position_ms: u64,
        /// True on natural end-of-stream (or transport failure), false on stop/skip
        reached_end: bool,
    },

    /// A reposition was requested
    MediaItemSeekStart {
        item: MediaItem,
        from_ms: u64,
        target_ms: u64,
    },

    /// The transport finished repositioning
    MediaItemSeekEnd { item: MediaItem, position_ms: u64 },

    /// Periodic snapshot for UI refresh
    Tick {
        snapshot: EngineSnapshot,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlayerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            PlayerEvent::ServerConnect { .. } => EventKind::ServerConnect,
            PlayerEvent::ServerDisconnect { .. } => EventKind::ServerDisconnect,
            PlayerEvent::StateChangeMediaplayer { .. } => EventKind::StateChangeMediaplayer,
            PlayerEvent::CurrentMediaItemChanged { .. } => EventKind::CurrentMediaItemChanged,
            PlayerEvent::PreviousMediaItemChanged { .. } => EventKind::PreviousMediaItemChanged,
            PlayerEvent::NextMediaItemChanged { .. } => EventKind::NextMediaItemChanged,
            PlayerEvent::PlaylistStart { .. } => EventKind::PlaylistStart,
            PlayerEvent::PlaylistEnd { .. } => EventKind::PlaylistEnd,
            PlayerEvent::MediaItemStartPlay { .. } => EventKind::MediaItemStartPlay,
            PlayerEvent::MediaItemEndPlay { .. } => EventKind::MediaItemEndPlay,
            PlayerEvent::MediaItemSeekStart { .. } => EventKind::MediaItemSeekStart,
            PlayerEvent::MediaItemSeekEnd { .. } => EventKind::MediaItemSeekEnd,
            PlayerEvent::Tick { .. } => EventKind::Tick,
        }
    }

    /// Shorthand for a state change stamped now
    pub fn state_change(old_state: MediaplayerState, new_state: MediaplayerState) -> Self {
        PlayerEvent::StateChangeMediaplayer {
            old_state,
            new_state,
            timestamp: chrono::Utc::now(),
        }
    }
}

/// Subscription key, one per [`PlayerEvent`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    ServerConnect,
    ServerDisconnect,
    StateChangeMediaplayer,
    CurrentMediaItemChanged,
    PreviousMediaItemChanged,
    NextMediaItemChanged,
    PlaylistStart,
    PlaylistEnd,
    MediaItemStartPlay,
    MediaItemEndPlay,
    MediaItemSeekStart,
    MediaItemSeekEnd,
    Tick,
}

impl EventKind {
    pub const ALL: [EventKind; 13] = [
        EventKind::ServerConnect,
        EventKind::ServerDisconnect,
        EventKind::StateChangeMediaplayer,
        EventKind::CurrentMediaItemChanged,
        EventKind::PreviousMediaItemChanged,
        EventKind::NextMediaItemChanged,
        EventKind::PlaylistStart,
        EventKind::PlaylistEnd,
        EventKind::MediaItemStartPlay,
        EventKind::MediaItemEndPlay,
        EventKind::MediaItemSeekStart,
        EventKind::MediaItemSeekEnd,
        EventKind::Tick,
    ];

    /// Callback-style name used in logs (`OnServerConnect`, ...)
    pub fn handler_name(self) -> &'static str {
        match self {
            EventKind::ServerConnect => "OnServerConnect",
            EventKind::ServerDisconnect => "OnServerDisconnect",
            EventKind::StateChangeMediaplayer => "OnStateChangeMediaplayer",
            EventKind::CurrentMediaItemChanged => "OnCurrentMediaItemChanged",
            EventKind::PreviousMediaItemChanged => "OnPreviousMediaItemChanged",
            EventKind::NextMediaItemChanged => "OnNextMediaItemChanged",
            EventKind::PlaylistStart => "OnPlaylistStart",
            EventKind::PlaylistEnd => "OnPlaylistEnd",
            EventKind::MediaItemStartPlay => "OnMediaItemStartPlay",
            EventKind::MediaItemEndPlay => "OnMediaItemEndPlay",
            EventKind::MediaItemSeekStart => "OnMediaItemSeekStart",
            EventKind::MediaItemSeekEnd => "OnMediaItemSeekEnd",
            EventKind::Tick => "OnTick",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.handler_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_event_kind_names_are_unique() {
        let names: HashSet<&str> = EventKind::ALL.iter().map(|k| k.handler_name()).collect();
        assert_eq!(names.len(), EventKind::ALL.len());
        assert_eq!(EventKind::Tick.to_string(), "OnTick");
    }

    #[test]
    fn test_event_kind_mapping() {
        let item = MediaItem::new("sim://media/a.flv");
        let event = PlayerEvent::MediaItemStartPlay { item: item.clone() };
        assert_eq!(event.kind(), EventKind::MediaItemStartPlay);

        let event = PlayerEvent::state_change(MediaplayerState::Stop, MediaplayerState::Playing);
        assert_eq!(event.kind(), EventKind::StateChangeMediaplayer);

        let event = PlayerEvent::PlaylistEnd {
            playlist: "default".to_string(),
        };
        assert_eq!(event.kind(), EventKind::PlaylistEnd);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PlayerEvent::state_change(MediaplayerState::Stop, MediaplayerState::Playing);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "StateChangeMediaplayer");
        assert_eq!(json["old_state"], "stop");
        assert_eq!(json["new_state"], "playing");
    }

    #[test]
    fn test_state_connected_flag() {
        assert!(!MediaplayerState::Disconnected.is_connected());
        assert!(!MediaplayerState::Connecting.is_connected());
        assert!(MediaplayerState::Stop.is_connected());
        assert!(MediaplayerState::Playing.is_connected());
        assert!(MediaplayerState::Pause.is_connected());
    }

    #[test]
    fn test_snapshot_progress() {
        let mut snapshot = EngineSnapshot::disconnected(75);
        assert_eq!(snapshot.progress(), None);

        snapshot.position_ms = Some(500);
        snapshot.duration_ms = Some(0);
        assert_eq!(snapshot.progress(), None);

        snapshot.duration_ms = Some(1000);
        assert_eq!(snapshot.progress(), Some(0.5));

        snapshot.position_ms = Some(2000);
        assert_eq!(snapshot.progress(), Some(1.0));
    }
}
