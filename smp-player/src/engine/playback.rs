//! Transport intent operations
//!
//! Play, pause, stop, seek, next, previous and volume. Illegal requests
//! return [`Error::InvalidTransition`](crate::error::Error::InvalidTransition)
//! and leave the engine unchanged.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::core::{EngineCore, MediaPlayerEngine};
use crate::error::Result;
use crate::playback::{CursorMove, SeekRequest};

impl MediaPlayerEngine {
    /// Start the current item, or resume it when paused
    pub async fn play(&self) -> Result<()> {
        info!("Play command received");
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            let EngineCore { playlist, machine } = &mut *core;
            let result = machine.play(self.transport(), playlist, &mut events).await;
            self.settle_link_loss(&mut core, &mut events).await;
            result
        };
        self.publish(events);
        result
    }

    pub async fn pause(&self) -> Result<()> {
        info!("Pause command received");
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            let EngineCore { playlist, machine } = &mut *core;
            let result = machine.pause(self.transport(), playlist, &mut events).await;
            self.settle_link_loss(&mut core, &mut events).await;
            result
        };
        self.publish(events);
        result
    }

    pub async fn stop(&self) -> Result<()> {
        info!("Stop command received");
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            core.machine.stop(self.transport(), &mut events).await
        };
        self.publish(events);
        result
    }

    /// Request a reposition to `offset_ms` within the current item
    ///
    /// Returns once the seek is scheduled; `MediaItemSeekEnd` signals
    /// completion. Offsets are clamped to [0, duration]. No-op when the
    /// duration is unknown.
    pub async fn seek(&self, offset_ms: i64) -> Result<()> {
        info!("Seek command received: {}ms", offset_ms);
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            core.machine.begin_seek(offset_ms, &mut events)
        };
        self.publish(events);

        if let Some(request) = result? {
            let token = self.seek_token();
            let engine = self.clone();
            tokio::spawn(async move { engine.run_seek(request, token).await });
        }
        Ok(())
    }

    async fn run_seek(&self, request: SeekRequest, token: CancellationToken) {
        let mut events = Vec::new();
        {
            let mut core = self.inner.core.lock().await;
            if token.is_cancelled() {
                debug!("Seek on {} cancelled", request.item);
                return;
            }
            let EngineCore { playlist, machine } = &mut *core;
            machine
                .complete_seek(self.transport(), playlist, request, &mut events)
                .await;
            self.settle_link_loss(&mut core, &mut events).await;
        }
        self.publish(events);
    }

    /// Move to the next item; playback follows when Playing
    pub async fn next(&self) -> Result<CursorMove> {
        info!("Next command received");
        self.step(true).await
    }

    /// Move to the previous item; playback follows when Playing
    pub async fn previous(&self) -> Result<CursorMove> {
        info!("Previous command received");
        self.step(false).await
    }

    async fn step(&self, forward: bool) -> Result<CursorMove> {
        let mut events = Vec::new();
        let result = {
            let mut core = self.inner.core.lock().await;
            let EngineCore { playlist, machine } = &mut *core;
            let result = machine
                .retarget(self.transport(), playlist, &mut events, |p, ev| {
                    let moved = if forward { p.next(ev) } else { p.previous(ev) };
                    Ok((moved, moved != CursorMove::Empty))
                })
                .await;
            self.settle_link_loss(&mut core, &mut events).await;
            result
        };
        self.publish(events);
        result
    }

    /// Set volume 0-100; other values are rejected and the prior value kept
    pub async fn set_volume(&self, volume: i32) -> Result<()> {
        let mut core = self.inner.core.lock().await;
        core.machine.set_volume(self.transport(), volume).await?;
        info!("Volume set to {}", volume);
        Ok(())
    }

    pub async fn volume(&self) -> u8 {
        self.inner.core.lock().await.machine.volume()
    }
}
