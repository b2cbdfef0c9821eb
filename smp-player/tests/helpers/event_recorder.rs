//! Records every event an engine publishes

use smp_common::events::{EventKind, MediaplayerState, PlayerEvent};
use smp_player::MediaPlayerEngine;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Clone, Default)]
pub struct EventRecorder {
    events: Arc<Mutex<Vec<PlayerEvent>>>,
}

impl EventRecorder {
    /// Subscribe a new recorder to every event kind
    pub fn attach(engine: &MediaPlayerEngine) -> Self {
        let recorder = Self::default();
        let events = Arc::clone(&recorder.events);
        engine.subscribe_all(move |event| {
            events.lock().unwrap().push(event.clone());
            Ok(())
        });
        recorder
    }

    /// Everything recorded except ticks
    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() != EventKind::Tick)
            .cloned()
            .collect()
    }

    pub fn kinds(&self) -> Vec<EventKind> {
        self.events().iter().map(PlayerEvent::kind).collect()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.kind() == kind)
            .count()
    }

    /// (old, new) pairs of every state change
    pub fn state_changes(&self) -> Vec<(MediaplayerState, MediaplayerState)> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                PlayerEvent::StateChangeMediaplayer {
                    old_state,
                    new_state,
                    ..
                } => Some((old_state, new_state)),
                _ => None,
            })
            .collect()
    }

    pub fn last_tick(&self) -> Option<PlayerEvent> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e.kind() == EventKind::Tick)
            .cloned()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    /// Poll until an event of `kind` has been recorded
    pub async fn wait_for(&self, kind: EventKind) -> bool {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while tokio::time::Instant::now() < deadline {
            if self.count(kind) > 0 {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}
