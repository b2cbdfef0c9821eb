//! Playlist operations
//!
//! Mutations that move the cursor off the item being played release its
//! stream; when the engine was Playing the new current item starts.

use smp_common::MediaItem;
use tracing::info;

use super::core::{EngineCore, MediaPlayerEngine};
use crate::error::Result;
use crate::playback::{InsertPosition, ItemRef};

impl MediaPlayerEngine {
    /// Remove every item and unset the cursor
    ///
    /// Raises no playlist events. An open stream is stopped first.
    pub async fn clear_playlist(&self) {
        info!("Clearing playlist");
        let mut events = Vec::new();
        {
            let mut core = self.inner.core.lock().await;
            if core.machine.has_stream() {
                // Playing or Pause, so stop is legal
                let _ = core.machine.stop(self.transport(), &mut events).await;
            }
            core.playlist.clear();
        }
        self.publish(events);
    }

    /// Insert `item`; returns the index it landed at
    pub async fn insert_media_item(&self, position: InsertPosition, item: MediaItem) -> Result<usize> {
        info!("Inserting {} at {:?}", item, position);
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            core.playlist.insert(position, item, &mut events)
        };
        self.publish(events);
        result
    }

    /// Convenience for appending a locator
    pub async fn enqueue(&self, locator: impl Into<String>) -> Result<MediaItem> {
        let item = MediaItem::new(locator);
        self.insert_media_item(InsertPosition::Last, item.clone()).await?;
        Ok(item)
    }

    /// Remove an item by identity or index; returns the removed item
    pub async fn remove_media_item(&self, target: ItemRef) -> Result<MediaItem> {
        info!("Removing {:?}", target);
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            let EngineCore { playlist, machine } = &mut *core;
            let result = machine
                .retarget(self.transport(), playlist, &mut events, |p, ev| {
                    let removal = p.remove(target, ev)?;
                    let was_current = removal.was_current;
                    Ok((removal.item, was_current))
                })
                .await;
            self.settle_link_loss(&mut core, &mut events).await;
            result
        };
        self.publish(events);
        result
    }

    /// Point the cursor at index `n`; playback follows when Playing
    pub async fn change_current_media_item_index(&self, n: usize) -> Result<()> {
        info!("Changing current item to index {}", n);
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            let EngineCore { playlist, machine } = &mut *core;
            let result = machine
                .retarget(self.transport(), playlist, &mut events, |p, ev| {
                    p.change_current_index(n, ev)?;
                    Ok(((), true))
                })
                .await;
            self.settle_link_loss(&mut core, &mut events).await;
            result
        };
        self.publish(events);
        result
    }

    /// Switch the wrap policy; neighbour events fire if they change
    pub async fn set_wrap_playlist(&self, wrap: bool) {
        let mut events = Vec::new();
        self.inner.core.lock().await.playlist.set_wrap(wrap, &mut events);
        self.publish(events);
    }

    pub async fn playlist_items(&self) -> Vec<MediaItem> {
        self.inner.core.lock().await.playlist.items().to_vec()
    }

    pub async fn playlist_name(&self) -> String {
        self.inner.core.lock().await.playlist.name().to_string()
    }

    pub async fn current_item(&self) -> Option<MediaItem> {
        self.inner.core.lock().await.playlist.current_item().cloned()
    }

    pub async fn current_index(&self) -> Option<usize> {
        self.inner.core.lock().await.playlist.current_index()
    }
}
