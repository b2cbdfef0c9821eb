//! Clock-driven in-process transport
//!
//! Stands in for a real media server: positions advance with the tokio
//! clock while a stream is not paused, and streams end when their duration
//! elapses. Behaviour is steered through the endpoint and locators:
//!
//! - endpoints must use the `sim://` scheme; host `unreachable` refuses links
//! - `?duration=<ms>` sets the item length (default 180 000 ms),
//!   `?duration=live` reports no duration and never ends
//! - `?fail_after=<ms>` makes sampling fail once that position is reached
//! - locators containing `missing` cannot be opened

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tokio::time::{Duration, Instant};
use tracing::{debug, trace};

use super::{StreamHandle, StreamSample, StreamTransport, TransportError, TransportResult};

const DEFAULT_DURATION_MS: u64 = 180_000;
const DEFAULT_CONNECT_LATENCY: Duration = Duration::from_millis(50);

#[derive(Debug)]
struct SimStream {
    locator: String,
    duration_ms: Option<u64>,
    fail_after_ms: Option<u64>,
    /// Position accumulated before the current run
    base_position_ms: u64,
    /// Set while running, None while paused
    running_since: Option<Instant>,
}

impl SimStream {
    fn position_ms(&self, now: Instant) -> u64 {
        let running = self
            .running_since
            .map(|since| now.saturating_duration_since(since).as_millis() as u64)
            .unwrap_or(0);
        let position = self.base_position_ms + running;
        match self.duration_ms {
            Some(duration) => position.min(duration),
            None => position,
        }
    }
}

#[derive(Debug, Default)]
struct SimState {
    endpoint: Option<String>,
    next_handle: u64,
    streams: HashMap<StreamHandle, SimStream>,
}

/// In-process transport used by the console and tests
#[derive(Debug)]
pub struct SimulatedTransport {
    state: Mutex<SimState>,
    connect_latency: Duration,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::with_connect_latency(DEFAULT_CONNECT_LATENCY)
    }

    pub fn with_connect_latency(connect_latency: Duration) -> Self {
        Self {
            state: Mutex::new(SimState::default()),
            connect_latency,
        }
    }

    /// Number of currently open stream handles
    pub fn open_streams(&self) -> usize {
        self.lock().streams.len()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Value of `key` in the locator's query string
fn query_param<'a>(locator: &'a str, key: &str) -> Option<&'a str> {
    let (_, query) = locator.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=')?;
        (k == key).then_some(v)
    })
}

fn parse_stream(locator: &str) -> TransportResult<SimStream> {
    if locator.contains("missing") {
        return Err(TransportError::OpenFailed {
            locator: locator.to_string(),
            reason: "no such media".to_string(),
        });
    }

    let duration_ms = match query_param(locator, "duration") {
        None => Some(DEFAULT_DURATION_MS),
        Some("live") => None,
        Some(value) => Some(value.parse().map_err(|_| TransportError::OpenFailed {
            locator: locator.to_string(),
            reason: format!("invalid duration '{}'", value),
        })?),
    };
    let fail_after_ms = query_param(locator, "fail_after").and_then(|v| v.parse().ok());

    Ok(SimStream {
        locator: locator.to_string(),
        duration_ms,
        fail_after_ms,
        base_position_ms: 0,
        running_since: Some(Instant::now()),
    })
}

#[async_trait]
impl StreamTransport for SimulatedTransport {
    async fn connect(&self, endpoint: &str) -> TransportResult<()> {
        let host = endpoint
            .strip_prefix("sim://")
            .ok_or_else(|| TransportError::Unreachable(format!("unsupported endpoint {}", endpoint)))?;
        let host = host.split(':').next().unwrap_or(host);

        tokio::time::sleep(self.connect_latency).await;

        if host.is_empty() || host == "unreachable" {
            return Err(TransportError::Unreachable(endpoint.to_string()));
        }

        self.lock().endpoint = Some(endpoint.to_string());
        debug!("Simulated link up: {}", endpoint);
        Ok(())
    }

    async fn disconnect(&self) {
        let mut state = self.lock();
        state.streams.clear();
        if let Some(endpoint) = state.endpoint.take() {
            debug!("Simulated link down: {}", endpoint);
        }
    }

    fn is_connected(&self) -> bool {
        self.lock().endpoint.is_some()
    }

    async fn open(&self, locator: &str) -> TransportResult<StreamHandle> {
        let mut state = self.lock();
        if state.endpoint.is_none() {
            return Err(TransportError::NotConnected);
        }
        let stream = parse_stream(locator)?;
        state.next_handle += 1;
        let handle = StreamHandle(state.next_handle);
        debug!("Opened {} as {}", locator, handle);
        state.streams.insert(handle, stream);
        Ok(handle)
    }

    async fn close(&self, handle: StreamHandle) {
        if let Some(stream) = self.lock().streams.remove(&handle) {
            debug!("Closed {} ({})", handle, stream.locator);
        }
    }

    async fn pause(&self, handle: StreamHandle) -> TransportResult<()> {
        let now = Instant::now();
        let mut state = self.lock();
        let stream = state
            .streams
            .get_mut(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        stream.base_position_ms = stream.position_ms(now);
        stream.running_since = None;
        Ok(())
    }

    async fn resume(&self, handle: StreamHandle) -> TransportResult<()> {
        let mut state = self.lock();
        let stream = state
            .streams
            .get_mut(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        if stream.running_since.is_none() {
            stream.running_since = Some(Instant::now());
        }
        Ok(())
    }

    async fn sample(&self, handle: StreamHandle) -> TransportResult<StreamSample> {
        let now = Instant::now();
        let state = self.lock();
        let stream = state
            .streams
            .get(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        let position_ms = stream.position_ms(now);

        if let Some(fail_after) = stream.fail_after_ms {
            if position_ms >= fail_after {
                return Err(TransportError::Io(format!(
                    "connection reset while reading {}",
                    stream.locator
                )));
            }
        }

        let end_of_stream = stream
            .duration_ms
            .map(|duration| position_ms >= duration)
            .unwrap_or(false);
        trace!("Sample {}: {}ms eos={}", handle, position_ms, end_of_stream);

        Ok(StreamSample {
            position_ms,
            duration_ms: stream.duration_ms,
            end_of_stream,
        })
    }

    async fn seek(&self, handle: StreamHandle, offset_ms: u64) -> TransportResult<()> {
        let now = Instant::now();
        let mut state = self.lock();
        let stream = state
            .streams
            .get_mut(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        stream.base_position_ms = match stream.duration_ms {
            Some(duration) => offset_ms.min(duration),
            None => offset_ms,
        };
        if stream.running_since.is_some() {
            stream.running_since = Some(now);
        }
        Ok(())
    }
}
