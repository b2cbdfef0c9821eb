//! Core engine - struct definition and lifecycle
//!
//! **Responsibilities:**
//! - MediaPlayerEngine construction
//! - Connection lifecycle (connect, close, wait_for_connection, link loss)
//! - Tick production and on-demand snapshots
//! - Event subscription passthrough
//!
//! All engine state lives behind one async mutation lock. Operations
//! collect the events they cause while holding it and publish them, in
//! order, after it is released, so subscribers may call back into the
//! engine.

use chrono::Utc;
use smp_common::events::{ConnectionStatus, EngineSnapshot, EventKind, MediaplayerState, PlayerEvent};
use smp_common::logging::log_error;
use std::sync::{Arc, Mutex as StdMutex, Weak};
use tokio::sync::{broadcast, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::dispatcher::{EventDispatcher, SubscriberResult, SubscriptionId};
use crate::playback::{
    ConnectionSupervisor, LinkOutcome, PlaybackStateMachine, PlaylistManager, TickRelay,
    TickScheduler,
};
use crate::transport::StreamTransport;

/// State guarded by the mutation lock
pub(super) struct EngineCore {
    pub(super) playlist: PlaylistManager,
    pub(super) machine: PlaybackStateMachine,
}

pub(super) struct EngineInner {
    pub(super) config: EngineConfig,
    pub(super) transport: Arc<dyn StreamTransport>,
    pub(super) dispatcher: Arc<EventDispatcher>,
    pub(super) core: Mutex<EngineCore>,
    pub(super) connection: ConnectionSupervisor,
    pub(super) ticker: TickScheduler,
    pub(super) ticks: TickRelay,
    /// Parent of every pending seek; replaced on close
    pub(super) seeks: StdMutex<CancellationToken>,
}

/// Streaming media playback engine
///
/// Cheap to clone; clones share one session. Operations may be called from
/// any task and are serialized internally.
#[derive(Clone)]
pub struct MediaPlayerEngine {
    pub(super) inner: Arc<EngineInner>,
}

impl MediaPlayerEngine {
    pub fn new(config: EngineConfig, transport: Arc<dyn StreamTransport>) -> Self {
        let config = config.normalized();
        info!(
            "Creating engine for {} (tick {}ms, wrap {})",
            config.endpoint, config.tick_interval_ms, config.wrap_playlist
        );

        let core = EngineCore {
            playlist: PlaylistManager::new(config.playlist_name.clone(), config.wrap_playlist),
            machine: PlaybackStateMachine::new(config.initial_volume),
        };

        Self {
            inner: Arc::new(EngineInner {
                dispatcher: Arc::new(EventDispatcher::new(config.event_capacity)),
                connection: ConnectionSupervisor::new(config.endpoint.clone(), config.connect_timeout),
                ticker: TickScheduler::new(config.tick_interval_ms),
                ticks: TickRelay::new(),
                core: Mutex::new(core),
                seeks: StdMutex::new(CancellationToken::new()),
                transport,
                config,
            }),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub(super) fn transport(&self) -> &dyn StreamTransport {
        self.inner.transport.as_ref()
    }

    pub(super) fn publish(&self, events: Vec<PlayerEvent>) {
        self.inner.dispatcher.publish_all(events);
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    pub fn subscribe<F>(&self, kind: EventKind, callback: F) -> SubscriptionId
    where
        F: Fn(&PlayerEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(kind, callback)
    }

    pub fn subscribe_all<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&PlayerEvent) -> SubscriberResult + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe_all(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.dispatcher.unsubscribe(id)
    }

    /// Receiver for every future event, for async consumers
    pub fn subscribe_channel(&self) -> broadcast::Receiver<PlayerEvent> {
        self.inner.dispatcher.subscribe_channel()
    }

    // ------------------------------------------------------------------
    // Connection lifecycle
    // ------------------------------------------------------------------

    /// Start connecting in the background
    ///
    /// Returns immediately. Ignored while connecting or connected. Await
    /// [`wait_for_connection`](Self::wait_for_connection) for the outcome.
    pub async fn connect(&self) {
        let mut events = Vec::new();
        {
            let mut core = self.inner.core.lock().await;
            if core.machine.state() != MediaplayerState::Disconnected {
                debug!("Connect ignored: already {}", core.machine.state());
                return;
            }
            if let Err(e) = core.machine.begin_connect(&mut events) {
                warn!("Cannot start connect: {}", e);
                return;
            }
            self.inner.connection.mark_connecting();

            let token = self.inner.connection.begin_attempt();
            let engine = self.clone();
            let handle = tokio::spawn(async move { engine.run_connect(token).await });
            self.inner.connection.attach(handle);
        }
        self.publish(events);
    }

    /// Connect worker body
    async fn run_connect(&self, token: CancellationToken) {
        let outcome = self.inner.connection.establish(self.transport(), &token).await;
        if matches!(outcome, LinkOutcome::Cancelled) {
            return;
        }

        let mut events = Vec::new();
        let endpoint = self.inner.connection.endpoint().to_string();
        {
            let mut core = self.inner.core.lock().await;
            if token.is_cancelled() || core.machine.state() != MediaplayerState::Connecting {
                debug!("Connect outcome discarded: engine closed meanwhile");
                return;
            }

            match outcome {
                LinkOutcome::Up => {
                    if let Err(e) = core.machine.link_up(&mut events) {
                        warn!("Link up rejected: {}", e);
                        return;
                    }
                    // Status settles before the event goes out
                    self.inner.connection.mark_connected();
                    events.push(PlayerEvent::ServerConnect {
                        endpoint,
                        timestamp: Utc::now(),
                    });
                    self.start_ticks();
                }
                LinkOutcome::Failed(error) => {
                    if let Err(e) = core.machine.link_failed(&mut events) {
                        warn!("Link failure rejected: {}", e);
                        return;
                    }
                    log_error(&error);
                    self.inner.connection.mark_failed();
                    events.push(PlayerEvent::ServerDisconnect {
                        endpoint,
                        was_connected: false,
                        reason: Some(error.to_string()),
                        timestamp: Utc::now(),
                    });
                }
                LinkOutcome::Cancelled => return,
            }
        }
        self.publish(events);
    }

    /// Finish the teardown after the state machine found the link down
    ///
    /// Must run under the mutation lock, after any machine call that talks
    /// to the transport. Emits `ServerDisconnect` once per lost link.
    pub(super) async fn settle_link_loss(
        &self,
        core: &mut EngineCore,
        events: &mut Vec<PlayerEvent>,
    ) {
        let reason = match core.machine.take_lost_link() {
            Some(reason) => reason,
            None => return,
        };
        // May run inside a tick, so the timer is cancelled, not awaited
        self.inner.ticker.cancel();
        self.inner.transport.disconnect().await;
        self.inner.connection.mark_closed();
        events.push(PlayerEvent::ServerDisconnect {
            endpoint: self.inner.connection.endpoint().to_string(),
            was_connected: true,
            reason: Some(reason),
            timestamp: Utc::now(),
        });
    }

    /// Wait for an in-flight connect attempt to settle
    pub async fn wait_for_connection(&self) -> ConnectionStatus {
        self.inner.connection.wait_settled().await
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        self.inner.connection.status()
    }

    /// Tear the session down from any state. Never fails.
    ///
    /// Cancels an in-flight connect and pending seeks, stops the tick timer,
    /// releases the open stream and closes the link.
    pub async fn close(&self) {
        info!("Closing engine");
        self.cancel_seeks();
        self.inner.connection.cancel_attempt().await;
        self.inner.ticker.stop().await;

        let mut events = Vec::new();
        {
            let mut core = self.inner.core.lock().await;
            let prior = core.machine.state();
            core.machine.shutdown(self.transport(), &mut events).await;

            if prior != MediaplayerState::Disconnected {
                self.inner.transport.disconnect().await;
            }
            self.inner.connection.mark_closed();

            if prior.is_connected() {
                events.push(PlayerEvent::ServerDisconnect {
                    endpoint: self.inner.connection.endpoint().to_string(),
                    was_connected: true,
                    reason: None,
                    timestamp: Utc::now(),
                });
            }
        }
        self.publish(events);
    }

    // ------------------------------------------------------------------
    // Seeks
    // ------------------------------------------------------------------

    pub(super) fn seek_token(&self) -> CancellationToken {
        self.inner
            .seeks
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .child_token()
    }

    fn cancel_seeks(&self) {
        let mut seeks = self.inner.seeks.lock().unwrap_or_else(|e| e.into_inner());
        seeks.cancel();
        *seeks = CancellationToken::new();
    }

    // ------------------------------------------------------------------
    // Ticks and snapshots
    // ------------------------------------------------------------------

    fn start_ticks(&self) {
        let weak: Weak<EngineInner> = Arc::downgrade(&self.inner);
        self.inner.ticker.start(move || {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => {
                        MediaPlayerEngine { inner }.tick_once().await;
                        true
                    }
                    None => false,
                }
            }
        });
    }

    /// Run one tick: check the link, sample the open stream, react to its
    /// end, publish `Tick`
    ///
    /// The `Tick` event is delivered on a blocking task so a slow handler
    /// never holds up the timer or other operations.
    pub async fn tick_once(&self) {
        let mut events = Vec::new();
        let snapshot = {
            let mut core = self.inner.core.lock().await;
            let EngineCore { playlist, machine } = &mut *core;
            machine.sample(self.transport(), playlist, &mut events).await;
            self.settle_link_loss(&mut core, &mut events).await;
            self.snapshot_of(&core)
        };
        self.publish(events);

        let tick = PlayerEvent::Tick {
            snapshot,
            timestamp: Utc::now(),
        };
        self.inner.ticks.send(&self.inner.dispatcher, tick);
    }

    pub(super) fn snapshot_of(&self, core: &EngineCore) -> EngineSnapshot {
        EngineSnapshot {
            state: core.machine.state(),
            connection: self.inner.connection.status(),
            current_item: core.playlist.current_item().cloned(),
            previous_item: core.playlist.previous_item().cloned(),
            next_item: core.playlist.next_item().cloned(),
            position_ms: core.machine.position_ms(),
            duration_ms: core.machine.duration_ms(),
            volume: core.machine.volume(),
            playlist_len: core.playlist.len(),
        }
    }

    /// Current live view of the engine
    pub async fn snapshot(&self) -> EngineSnapshot {
        let core = self.inner.core.lock().await;
        self.snapshot_of(&core)
    }

    pub async fn state(&self) -> MediaplayerState {
        self.inner.core.lock().await.machine.state()
    }

    pub fn is_ticking(&self) -> bool {
        self.inner.ticker.is_running()
    }
}
