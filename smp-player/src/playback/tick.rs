//! Periodic tick producer
//!
//! One timer per engine, started when the link comes up and stopped on
//! close or link loss. The tick body is supplied by the engine; the
//! scheduler only owns the timing and the task lifecycle.
//!
//! Tick events reach subscribers through a [`TickRelay`]: one delivery
//! task, fed the newest tick through a watch channel.

use smp_common::events::PlayerEvent;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::dispatcher::EventDispatcher;

pub const MIN_TICK_INTERVAL_MS: u64 = 100;
pub const MAX_TICK_INTERVAL_MS: u64 = 1000;

/// Clamp a configured interval to the supported range
pub fn clamp_interval(interval_ms: u64) -> Duration {
    Duration::from_millis(interval_ms.clamp(MIN_TICK_INTERVAL_MS, MAX_TICK_INTERVAL_MS))
}

struct Running {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Single fixed-interval timer
pub struct TickScheduler {
    period: Duration,
    running: Mutex<Option<Running>>,
}

impl TickScheduler {
    pub fn new(interval_ms: u64) -> Self {
        let period = clamp_interval(interval_ms);
        if period.as_millis() as u64 != interval_ms {
            warn!(
                "Tick interval {}ms out of range, using {}ms",
                interval_ms,
                period.as_millis()
            );
        }
        Self {
            period,
            running: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .map(|r| !r.handle.is_finished())
            .unwrap_or(false)
    }

    /// Start ticking; a running timer is left untouched
    ///
    /// `tick` is awaited once per period. Returning false ends the timer.
    /// Cancellation is only observed between ticks, so a tick in progress
    /// always runs to completion.
    pub fn start<F, Fut>(&self, mut tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send,
    {
        let mut running = self.running.lock().unwrap_or_else(|e| e.into_inner());
        if running.as_ref().map(|r| !r.handle.is_finished()).unwrap_or(false) {
            debug!("Tick scheduler already running");
            return;
        }

        let token = CancellationToken::new();
        let cancelled = token.clone();
        let period = self.period;
        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            // Stay on the original grid if a tick overruns
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!("Tick scheduler started ({}ms)", period.as_millis());

            loop {
                tokio::select! {
                    biased;
                    _ = cancelled.cancelled() => break,
                    _ = interval.tick() => {
                        if !tick().await {
                            break;
                        }
                    }
                }
            }
            debug!("Tick scheduler stopped");
        });

        *running = Some(Running { token, handle });
    }

    /// Stop the timer without waiting for it
    ///
    /// Safe to call from inside a tick: the current tick finishes and no
    /// further tick starts.
    pub fn cancel(&self) {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(running) = running {
            debug!("Tick scheduler cancelled");
            running.token.cancel();
        }
    }

    /// Stop the timer and wait for an in-progress tick to finish
    pub async fn stop(&self) {
        let running = self.running.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(running) = running {
            running.token.cancel();
            if let Err(e) = running.handle.await {
                warn!("Tick task ended abnormally: {}", e);
            }
        }
    }
}

/// Delivers tick events one at a time on a blocking thread
///
/// A tick published while an earlier one is still with subscribers
/// replaces any tick already waiting, so slow handlers drop frames but
/// never see them out of order.
pub struct TickRelay {
    tx: watch::Sender<Option<PlayerEvent>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TickRelay {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self {
            tx,
            task: Mutex::new(None),
        }
    }

    /// Queue `tick` for delivery, replacing any undelivered one
    pub fn send(&self, dispatcher: &Arc<EventDispatcher>, tick: PlayerEvent) {
        self.ensure_running(dispatcher);
        self.tx.send_replace(Some(tick));
    }

    fn ensure_running(&self, dispatcher: &Arc<EventDispatcher>) {
        let mut task = self.task.lock().unwrap_or_else(|e| e.into_inner());
        if task.as_ref().map(|t| !t.is_finished()).unwrap_or(false) {
            return;
        }

        let mut rx = self.tx.subscribe();
        let dispatcher = Arc::clone(dispatcher);
        *task = Some(tokio::spawn(async move {
            // Ends when the relay is dropped with its engine
            while rx.changed().await.is_ok() {
                let tick = rx.borrow_and_update().clone();
                if let Some(tick) = tick {
                    let dispatcher = Arc::clone(&dispatcher);
                    if let Err(e) = tokio::task::spawn_blocking(move || dispatcher.publish(tick)).await {
                        warn!("Tick delivery ended abnormally: {}", e);
                    }
                }
            }
        }));
    }
}

impl Default for TickRelay {
    fn default() -> Self {
        Self::new()
    }
}
