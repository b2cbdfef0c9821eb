//! Server link supervision
//!
//! Owns the link-level connection status and the background connect
//! worker. State transitions and events are driven by the engine; this
//! module runs the attempt itself and tracks its lifecycle.

use smp_common::events::ConnectionStatus;
use std::sync::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::Error;
use crate::transport::StreamTransport;

/// How a connect attempt finished
#[derive(Debug)]
pub enum LinkOutcome {
    Up,
    Failed(Error),
    Cancelled,
}

struct Worker {
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

/// Link status and connect worker for one endpoint
pub struct ConnectionSupervisor {
    endpoint: String,
    connect_timeout: Duration,
    status_tx: watch::Sender<ConnectionStatus>,
    worker: Mutex<Option<Worker>>,
}

impl ConnectionSupervisor {
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        let (status_tx, _) = watch::channel(ConnectionStatus::default());
        Self {
            endpoint: endpoint.into(),
            connect_timeout,
            status_tx,
            worker: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn status(&self) -> ConnectionStatus {
        *self.status_tx.borrow()
    }

    pub fn mark_connecting(&self) {
        self.status_tx.send_modify(|s| {
            s.connecting = true;
            s.is_connected = false;
        });
    }

    pub fn mark_connected(&self) {
        self.status_tx.send_replace(ConnectionStatus {
            is_connected: true,
            last_connect_failed: false,
            connecting: false,
        });
    }

    pub fn mark_failed(&self) {
        self.status_tx.send_replace(ConnectionStatus {
            is_connected: false,
            last_connect_failed: true,
            connecting: false,
        });
    }

    /// Link torn down by close or lost; the last failure flag is kept
    pub fn mark_closed(&self) {
        self.status_tx.send_modify(|s| {
            s.is_connected = false;
            s.connecting = false;
        });
    }

    /// Wait until no attempt is in flight and return the settled status
    pub async fn wait_settled(&self) -> ConnectionStatus {
        let mut rx = self.status_tx.subscribe();
        let settled = match rx.wait_for(ConnectionStatus::is_settled).await {
            Ok(status) => *status,
            Err(_) => self.status(),
        };
        settled
    }

    /// Token for a new attempt; replaces any finished worker
    pub fn begin_attempt(&self) -> CancellationToken {
        let token = CancellationToken::new();
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        *worker = Some(Worker {
            token: token.clone(),
            handle: None,
        });
        token
    }

    /// Remember the spawned worker so `cancel_attempt` can wait for it
    pub fn attach(&self, handle: JoinHandle<()>) {
        let mut worker = self.worker.lock().unwrap_or_else(|e| e.into_inner());
        match worker.as_mut() {
            Some(w) if w.handle.is_none() => w.handle = Some(handle),
            _ => debug!("Connect attempt already cancelled; worker left detached"),
        }
    }

    /// Cancel an in-flight attempt and wait for its worker to exit
    pub async fn cancel_attempt(&self) {
        let worker = self.worker.lock().unwrap_or_else(|e| e.into_inner()).take();
        if let Some(worker) = worker {
            worker.token.cancel();
            if let Some(handle) = worker.handle {
                if let Err(e) = handle.await {
                    warn!("Connect worker ended abnormally: {}", e);
                }
            }
        }
    }

    /// Run one bounded connect attempt
    pub async fn establish(
        &self,
        transport: &dyn StreamTransport,
        token: &CancellationToken,
    ) -> LinkOutcome {
        info!("Connecting to {}", self.endpoint);
        tokio::select! {
            _ = token.cancelled() => {
                debug!("Connect to {} cancelled", self.endpoint);
                LinkOutcome::Cancelled
            }
            result = tokio::time::timeout(self.connect_timeout, transport.connect(&self.endpoint)) => {
                match result {
                    Ok(Ok(())) => {
                        info!("Connected to {}", self.endpoint);
                        LinkOutcome::Up
                    }
                    Ok(Err(e)) => LinkOutcome::Failed(Error::ConnectionFailed(e.to_string())),
                    Err(_) => LinkOutcome::Failed(Error::ConnectionFailed(format!(
                        "{} timed out after {}ms",
                        self.endpoint,
                        self.connect_timeout.as_millis()
                    ))),
                }
            }
        }
    }
}
