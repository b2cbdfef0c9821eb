//! Playback state machine
//!
//! Owns the published [`MediaplayerState`] and the single open stream
//! handle. Every state change goes through [`transition`], one explicit
//! table covering both link and transport intent.
//!
//! Event ordering rules:
//! - releasing a handle emits `MediaItemEndPlay` before the state change it causes
//! - opening a handle emits the state change before `MediaItemStartPlay`
//! - a state change precedes the cursor events it causes

use crate::error::{Error, Result};
use crate::playback::playlist::{CursorMove, PlaylistManager};
use crate::transport::{StreamHandle, StreamSample, StreamTransport, TransportError};
use smp_common::events::{MediaplayerState, PlayerEvent};
use smp_common::logging::log_error;
use smp_common::MediaItem;
use tracing::{debug, info, warn};

/// Inputs to the transition table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    LinkUp,
    LinkFailed,
    LinkLost,
    Close,
    Play,
    Pause,
    Stop,
    Seek,
}

impl Command {
    pub fn name(self) -> &'static str {
        match self {
            Command::Connect => "connect",
            Command::LinkUp => "complete connect",
            Command::LinkFailed => "fail connect",
            Command::LinkLost => "lose link",
            Command::Close => "close",
            Command::Play => "play",
            Command::Pause => "pause",
            Command::Stop => "stop",
            Command::Seek => "seek",
        }
    }
}

/// Target state for `command` issued in `from`, or None if illegal
pub fn transition(from: MediaplayerState, command: Command) -> Option<MediaplayerState> {
    use MediaplayerState::*;
    match (from, command) {
        (Disconnected, Command::Connect) => Some(Connecting),
        (Connecting, Command::LinkUp) => Some(Stop),
        (Connecting, Command::LinkFailed) => Some(Disconnected),
        (Stop | Playing | Pause, Command::LinkLost) => Some(Disconnected),
        (_, Command::Close) => Some(Disconnected),
        (Stop | Pause, Command::Play) => Some(Playing),
        (Playing, Command::Pause) => Some(Pause),
        (Playing | Pause, Command::Stop) => Some(Stop),
        (Playing, Command::Seek) => Some(Playing),
        _ => None,
    }
}

/// The open stream and what was last sampled from it
#[derive(Debug, Clone)]
struct ActiveStream {
    handle: StreamHandle,
    item: MediaItem,
    position_ms: u64,
    duration_ms: Option<u64>,
}

/// Seek scheduled by `begin_seek`, completed by `complete_seek`
#[derive(Debug, Clone)]
pub struct SeekRequest {
    pub handle: StreamHandle,
    pub item: MediaItem,
    pub target_ms: u64,
}

/// Playback state plus the exclusively owned stream handle
#[derive(Debug)]
pub struct PlaybackStateMachine {
    state: MediaplayerState,
    active: Option<ActiveStream>,
    volume: u8,
    /// Why the server link went down, until the engine takes it
    lost_link: Option<String>,
}

impl PlaybackStateMachine {
    pub fn new(volume: u8) -> Self {
        Self {
            state: MediaplayerState::Disconnected,
            active: None,
            volume: volume.min(100),
            lost_link: None,
        }
    }

    pub fn state(&self) -> MediaplayerState {
        self.state
    }

    pub fn volume(&self) -> u8 {
        self.volume
    }

    pub fn has_stream(&self) -> bool {
        self.active.is_some()
    }

    pub fn position_ms(&self) -> Option<u64> {
        self.active.as_ref().map(|a| a.position_ms)
    }

    pub fn duration_ms(&self) -> Option<u64> {
        self.active.as_ref().and_then(|a| a.duration_ms)
    }

    /// Apply `command` through the transition table
    fn apply(&mut self, command: Command, events: &mut Vec<PlayerEvent>) -> Result<()> {
        let target = self.check(command)?;
        self.enter(target, events);
        Ok(())
    }

    fn check(&self, command: Command) -> Result<MediaplayerState> {
        transition(self.state, command).ok_or_else(|| {
            debug!("Rejected {} in state {}", command.name(), self.state);
            Error::InvalidTransition {
                operation: command.name(),
                state: self.state,
            }
        })
    }

    fn enter(&mut self, target: MediaplayerState, events: &mut Vec<PlayerEvent>) {
        if target != self.state {
            info!("Mediaplayer state: {} -> {}", self.state, target);
            events.push(PlayerEvent::state_change(self.state, target));
            self.state = target;
        }
    }

    // ------------------------------------------------------------------
    // Link
    // ------------------------------------------------------------------

    pub fn begin_connect(&mut self, events: &mut Vec<PlayerEvent>) -> Result<()> {
        self.apply(Command::Connect, events)
    }

    pub fn link_up(&mut self, events: &mut Vec<PlayerEvent>) -> Result<()> {
        self.apply(Command::LinkUp, events)
    }

    pub fn link_failed(&mut self, events: &mut Vec<PlayerEvent>) -> Result<()> {
        self.apply(Command::LinkFailed, events)
    }

    /// The server link is gone: drop the stream and fall back to Disconnected
    ///
    /// The reason is kept for [`take_lost_link`](Self::take_lost_link) so the
    /// engine can finish the teardown. Ignored unless connected.
    pub async fn link_lost(
        &mut self,
        transport: &dyn StreamTransport,
        reason: String,
        events: &mut Vec<PlayerEvent>,
    ) {
        let target = match transition(self.state, Command::LinkLost) {
            Some(target) => target,
            None => return,
        };
        warn!("Server link lost: {}", reason);
        self.release(transport, false, events).await;
        self.enter(target, events);
        self.lost_link = Some(reason);
    }

    /// Reason of a link loss detected since the last call
    pub fn take_lost_link(&mut self) -> Option<String> {
        self.lost_link.take()
    }

    /// Release any stream and force Disconnected. Never fails.
    pub async fn shutdown(&mut self, transport: &dyn StreamTransport, events: &mut Vec<PlayerEvent>) {
        self.release(transport, false, events).await;
        self.enter(MediaplayerState::Disconnected, events);
    }

    // ------------------------------------------------------------------
    // Transport intent
    // ------------------------------------------------------------------

    /// Start the current item (from Stop) or resume the paused handle
    pub async fn play(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        events: &mut Vec<PlayerEvent>,
    ) -> Result<()> {
        self.check(Command::Play)?;

        if self.state == MediaplayerState::Pause {
            if let Some(handle) = self.active.as_ref().map(|a| a.handle) {
                if let Err(e) = transport.resume(handle).await {
                    warn!("Resume failed on {}: {}", handle, e);
                    let error = Error::from(e);
                    self.stream_failed(transport, playlist, &error, events).await;
                    return Err(error);
                }
                self.enter(MediaplayerState::Playing, events);
                return Ok(());
            }
        }

        if playlist.is_empty() {
            return Err(Error::InvalidTransition {
                operation: "play an empty playlist",
                state: self.state,
            });
        }
        let item = match playlist.ensure_cursor(events) {
            Some(item) => item,
            None => {
                return Err(Error::InvalidTransition {
                    operation: "play without a current item",
                    state: self.state,
                })
            }
        };
        let result = self.open(transport, item, events).await;
        if let Err(e) = &result {
            if link_down(transport, e) {
                self.link_lost(transport, e.to_string(), events).await;
            }
        }
        result
    }

    /// Suspend the open handle
    ///
    /// A transport failure ends the item as if it had finished.
    pub async fn pause(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        events: &mut Vec<PlayerEvent>,
    ) -> Result<()> {
        let target = self.check(Command::Pause)?;
        if let Some(handle) = self.active.as_ref().map(|a| a.handle) {
            if let Err(e) = transport.pause(handle).await {
                warn!("Pause failed on {}: {}", handle, e);
                let error = Error::from(e);
                self.stream_failed(transport, playlist, &error, events).await;
                return Err(error);
            }
        }
        self.enter(target, events);
        Ok(())
    }

    pub async fn stop(
        &mut self,
        transport: &dyn StreamTransport,
        events: &mut Vec<PlayerEvent>,
    ) -> Result<()> {
        let target = self.check(Command::Stop)?;
        self.release(transport, false, events).await;
        self.enter(target, events);
        Ok(())
    }

    /// Validate and clamp a seek; emits `MediaItemSeekStart`
    ///
    /// Returns None (no-op) when the item's duration is unknown or zero.
    pub fn begin_seek(
        &mut self,
        offset_ms: i64,
        events: &mut Vec<PlayerEvent>,
    ) -> Result<Option<SeekRequest>> {
        self.check(Command::Seek)?;
        let active = match &self.active {
            Some(active) => active,
            None => return Ok(None),
        };
        let duration = match active.duration_ms {
            Some(duration) if duration > 0 => duration,
            _ => {
                debug!("Ignoring seek on {}: duration unknown", active.item);
                return Ok(None);
            }
        };

        let target_ms = offset_ms.clamp(0, duration as i64) as u64;
        events.push(PlayerEvent::MediaItemSeekStart {
            item: active.item.clone(),
            from_ms: active.position_ms,
            target_ms,
        });
        Ok(Some(SeekRequest {
            handle: active.handle,
            item: active.item.clone(),
            target_ms,
        }))
    }

    /// Perform a scheduled seek; emits `MediaItemSeekEnd` on completion
    ///
    /// A seek whose handle was released in the meantime is dropped. A
    /// transport failure ends the item like end-of-stream.
    pub async fn complete_seek(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        request: SeekRequest,
        events: &mut Vec<PlayerEvent>,
    ) {
        let still_open = self
            .active
            .as_ref()
            .map(|a| a.handle == request.handle)
            .unwrap_or(false);
        if !still_open {
            debug!("Dropping seek on {}: stream no longer open", request.item);
            return;
        }

        match transport.seek(request.handle, request.target_ms).await {
            Ok(()) => {
                if let Some(active) = self.active.as_mut() {
                    active.position_ms = request.target_ms;
                }
                events.push(PlayerEvent::MediaItemSeekEnd {
                    item: request.item,
                    position_ms: request.target_ms,
                });
            }
            Err(e) => {
                warn!("Seek failed on {}: {}", request.item, e);
                self.stream_failed(transport, playlist, &Error::from(e), events)
                    .await;
            }
        }
    }

    /// Set volume in [0, 100]; out-of-range values are rejected
    pub async fn set_volume(&mut self, transport: &dyn StreamTransport, volume: i32) -> Result<()> {
        if !(0..=100).contains(&volume) {
            return Err(Error::InvalidArgument(format!(
                "volume must be 0-100, got {}",
                volume
            )));
        }
        self.volume = volume as u8;
        if let Some(active) = &self.active {
            if let Err(e) = transport.set_volume(active.handle, self.volume).await {
                warn!("Failed to apply volume to {}: {}", active.item, e);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Cursor changes and end of item
    // ------------------------------------------------------------------

    /// Run a playlist mutation and keep playback consistent with the cursor
    ///
    /// `mutate` returns its value plus whether it re-targeted the cursor.
    /// When it did and a stream is open, the old stream is released; if the
    /// engine was Playing and a new current item exists it is opened.
    pub async fn retarget<R>(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        events: &mut Vec<PlayerEvent>,
        mutate: impl FnOnce(&mut PlaylistManager, &mut Vec<PlayerEvent>) -> Result<(R, bool)>,
    ) -> Result<R> {
        self.retarget_inner(transport, playlist, events, false, mutate).await
    }

    async fn retarget_inner<R>(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        events: &mut Vec<PlayerEvent>,
        reached_end: bool,
        mutate: impl FnOnce(&mut PlaylistManager, &mut Vec<PlayerEvent>) -> Result<(R, bool)>,
    ) -> Result<R> {
        let mut cursor_events = Vec::new();
        let (value, retargeted) = mutate(playlist, &mut cursor_events)?;

        if !(retargeted || reached_end) || self.active.is_none() {
            events.append(&mut cursor_events);
            return Ok(value);
        }

        let keep_playing = self.state == MediaplayerState::Playing;
        self.release(transport, reached_end, events).await;

        match playlist.current_item().cloned() {
            Some(item) if keep_playing => {
                events.append(&mut cursor_events);
                // State stays Playing across the switch
                if let Err(e) = self.open_stream(transport, item, events).await {
                    if link_down(transport, &e) {
                        self.link_lost(transport, e.to_string(), events).await;
                    } else {
                        self.enter(MediaplayerState::Stop, events);
                    }
                    return Err(e);
                }
            }
            _ => {
                self.enter(MediaplayerState::Stop, events);
                events.append(&mut cursor_events);
            }
        }
        Ok(value)
    }

    /// Natural end-of-stream or transport failure: end the item and advance
    pub async fn end_of_item(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        events: &mut Vec<PlayerEvent>,
    ) {
        let result = self
            .retarget_inner(transport, playlist, events, true, |p, ev| {
                let moved = p.next(ev);
                Ok(((), moved != CursorMove::Empty))
            })
            .await;
        if let Err(e) = result {
            warn!("Auto-advance stopped playback");
            log_error(&e);
        }
    }

    /// Refresh position from the transport and react to end-of-stream
    pub async fn sample(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        events: &mut Vec<PlayerEvent>,
    ) {
        if !self.state.is_connected() {
            return;
        }
        if !transport.is_connected() {
            self.link_lost(transport, "server closed the link".to_string(), events)
                .await;
            return;
        }
        let handle = match &self.active {
            Some(active) => active.handle,
            None => return,
        };

        match transport.sample(handle).await {
            Ok(sample) => {
                self.record(sample);
                if sample.end_of_stream && self.state == MediaplayerState::Playing {
                    debug!("End of stream on {}", handle);
                    self.end_of_item(transport, playlist, events).await;
                }
            }
            Err(e) => {
                warn!("Transport error on {}: {}", handle, e);
                self.stream_failed(transport, playlist, &Error::from(e), events)
                    .await;
            }
        }
    }

    /// A stream operation failed: lose the link if it is down, otherwise
    /// end the item and advance
    async fn stream_failed(
        &mut self,
        transport: &dyn StreamTransport,
        playlist: &mut PlaylistManager,
        error: &Error,
        events: &mut Vec<PlayerEvent>,
    ) {
        if link_down(transport, error) {
            self.link_lost(transport, error.to_string(), events).await;
        } else {
            self.end_of_item(transport, playlist, events).await;
        }
    }

    fn record(&mut self, sample: StreamSample) {
        if let Some(active) = self.active.as_mut() {
            active.position_ms = sample.position_ms;
            active.duration_ms = sample.duration_ms;
        }
    }

    // ------------------------------------------------------------------
    // Handle ownership
    // ------------------------------------------------------------------

    /// Open `item` from Stop: state change, then StartPlay
    async fn open(
        &mut self,
        transport: &dyn StreamTransport,
        item: MediaItem,
        events: &mut Vec<PlayerEvent>,
    ) -> Result<()> {
        let handle = transport.open(item.locator()).await?;
        self.enter(MediaplayerState::Playing, events);
        self.adopt(transport, handle, item, events).await;
        Ok(())
    }

    /// Open `item` while already Playing
    async fn open_stream(
        &mut self,
        transport: &dyn StreamTransport,
        item: MediaItem,
        events: &mut Vec<PlayerEvent>,
    ) -> Result<()> {
        let handle = transport.open(item.locator()).await.map_err(|e: TransportError| {
            warn!("Cannot open {}: {}", item, e);
            Error::from(e)
        })?;
        self.adopt(transport, handle, item, events).await;
        Ok(())
    }

    async fn adopt(
        &mut self,
        transport: &dyn StreamTransport,
        handle: StreamHandle,
        item: MediaItem,
        events: &mut Vec<PlayerEvent>,
    ) {
        if let Err(e) = transport.set_volume(handle, self.volume).await {
            warn!("Failed to apply volume to {}: {}", item, e);
        }
        self.active = Some(ActiveStream {
            handle,
            item: item.clone(),
            position_ms: 0,
            duration_ms: None,
        });
        // Learn the duration up front so an early seek can clamp
        if let Ok(sample) = transport.sample(handle).await {
            self.record(sample);
        }
        info!("Started {} on {}", item, handle);
        events.push(PlayerEvent::MediaItemStartPlay { item });
    }

    /// Close the open handle, if any, and emit EndPlay
    async fn release(
        &mut self,
        transport: &dyn StreamTransport,
        reached_end: bool,
        events: &mut Vec<PlayerEvent>,
    ) {
        if let Some(active) = self.active.take() {
            transport.close(active.handle).await;
            info!("Ended {} at {}ms", active.item, active.position_ms);
            events.push(PlayerEvent::MediaItemEndPlay {
                item: active.item,
                position_ms: active.position_ms,
                reached_end,
            });
        }
    }
}

/// The error came from, or coincides with, the server link being down
fn link_down(transport: &dyn StreamTransport, error: &Error) -> bool {
    matches!(error, Error::Transport(TransportError::NotConnected)) || !transport.is_connected()
}
