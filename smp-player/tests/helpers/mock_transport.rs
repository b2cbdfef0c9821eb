//! Scriptable transport for engine tests
//!
//! Streams do not advance on their own. Tests set positions, end streams
//! or break them explicitly, then drive the engine with `tick_once`.

use async_trait::async_trait;
use smp_player::transport::{
    StreamHandle, StreamSample, StreamTransport, TransportError, TransportResult,
};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

pub const DEFAULT_DURATION_MS: u64 = 60_000;

#[derive(Debug, Clone)]
pub struct MockStream {
    pub locator: String,
    pub position_ms: u64,
    pub duration_ms: Option<u64>,
    pub paused: bool,
    pub volume: Option<u8>,
    ended: bool,
    broken: bool,
}

#[derive(Debug, Default)]
struct MockState {
    reachable: bool,
    connected: bool,
    next_handle: u64,
    streams: HashMap<StreamHandle, MockStream>,
    unopenable: HashSet<String>,
    stuck_controls: HashSet<String>,
    calls: Vec<String>,
}

pub struct MockTransport {
    state: Mutex<MockState>,
    connect_delay: Duration,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                reachable: true,
                ..MockState::default()
            }),
            connect_delay: Duration::ZERO,
        }
    }

    /// Every connect attempt fails
    pub fn unreachable() -> Self {
        let transport = Self::new();
        transport.lock().reachable = false;
        transport
    }

    /// Connect attempts take `delay` before succeeding
    pub fn with_connect_delay(delay: Duration) -> Self {
        Self {
            connect_delay: delay,
            ..Self::new()
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    fn stream_for<'a>(state: &'a mut MockState, locator: &str) -> &'a mut MockStream {
        state
            .streams
            .values_mut()
            .find(|s| s.locator == locator)
            .unwrap_or_else(|| panic!("no open stream for {}", locator))
    }

    /// Make `open` fail for this locator
    pub fn refuse_open(&self, locator: &str) {
        self.lock().unopenable.insert(locator.to_string());
    }

    /// Report natural end-of-stream on the next sample
    pub fn end_stream(&self, locator: &str) {
        let mut state = self.lock();
        let stream = Self::stream_for(&mut state, locator);
        stream.ended = true;
        if let Some(duration) = stream.duration_ms {
            stream.position_ms = duration;
        }
    }

    /// Fail the next sample with an I/O error
    pub fn break_stream(&self, locator: &str) {
        Self::stream_for(&mut self.lock(), locator).broken = true;
    }

    pub fn set_position(&self, locator: &str, position_ms: u64) {
        Self::stream_for(&mut self.lock(), locator).position_ms = position_ms;
    }

    /// Make pause and resume fail for this locator's stream
    pub fn refuse_controls(&self, locator: &str) {
        self.lock().stuck_controls.insert(locator.to_string());
    }

    /// Server drops the link; open streams become unusable
    pub fn drop_link(&self) {
        self.record("link dropped".to_string());
        self.lock().connected = false;
    }

    /// Locators of currently open streams
    pub fn open_locators(&self) -> Vec<String> {
        self.lock().streams.values().map(|s| s.locator.clone()).collect()
    }

    pub fn stream(&self, locator: &str) -> Option<MockStream> {
        self.lock()
            .streams
            .values()
            .find(|s| s.locator == locator)
            .cloned()
    }

    /// Transport calls in order, e.g. `open sim://a`
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn record(&self, call: String) {
        self.lock().calls.push(call);
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StreamTransport for MockTransport {
    async fn connect(&self, endpoint: &str) -> TransportResult<()> {
        self.record(format!("connect {}", endpoint));
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        let mut state = self.lock();
        if !state.reachable {
            return Err(TransportError::Unreachable(endpoint.to_string()));
        }
        state.connected = true;
        Ok(())
    }

    async fn disconnect(&self) {
        self.record("disconnect".to_string());
        let mut state = self.lock();
        state.connected = false;
        state.streams.clear();
    }

    fn is_connected(&self) -> bool {
        self.lock().connected
    }

    async fn open(&self, locator: &str) -> TransportResult<StreamHandle> {
        self.record(format!("open {}", locator));
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        if state.unopenable.contains(locator) {
            return Err(TransportError::OpenFailed {
                locator: locator.to_string(),
                reason: "refused".to_string(),
            });
        }
        state.next_handle += 1;
        let handle = StreamHandle(state.next_handle);
        let duration_ms = if locator.contains("live") {
            None
        } else {
            Some(DEFAULT_DURATION_MS)
        };
        state.streams.insert(
            handle,
            MockStream {
                locator: locator.to_string(),
                position_ms: 0,
                duration_ms,
                paused: false,
                volume: None,
                ended: false,
                broken: false,
            },
        );
        Ok(handle)
    }

    async fn close(&self, handle: StreamHandle) {
        self.record(format!("close {}", handle));
        self.lock().streams.remove(&handle);
    }

    async fn pause(&self, handle: StreamHandle) -> TransportResult<()> {
        self.record(format!("pause {}", handle));
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        let stuck = state.stuck_controls.clone();
        let stream = state
            .streams
            .get_mut(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        if stuck.contains(&stream.locator) {
            return Err(TransportError::Io(format!("{} not responding", stream.locator)));
        }
        stream.paused = true;
        Ok(())
    }

    async fn resume(&self, handle: StreamHandle) -> TransportResult<()> {
        self.record(format!("resume {}", handle));
        let mut state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        let stuck = state.stuck_controls.clone();
        let stream = state
            .streams
            .get_mut(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        if stuck.contains(&stream.locator) {
            return Err(TransportError::Io(format!("{} not responding", stream.locator)));
        }
        stream.paused = false;
        Ok(())
    }

    async fn sample(&self, handle: StreamHandle) -> TransportResult<StreamSample> {
        let state = self.lock();
        if !state.connected {
            return Err(TransportError::NotConnected);
        }
        let stream = state
            .streams
            .get(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        if stream.broken {
            return Err(TransportError::Io(format!("{} reset", stream.locator)));
        }
        Ok(StreamSample {
            position_ms: stream.position_ms,
            duration_ms: stream.duration_ms,
            end_of_stream: stream.ended,
        })
    }

    async fn seek(&self, handle: StreamHandle, offset_ms: u64) -> TransportResult<()> {
        self.record(format!("seek {} {}", handle, offset_ms));
        let mut state = self.lock();
        let stream = state
            .streams
            .get_mut(&handle)
            .ok_or(TransportError::UnknownHandle(handle))?;
        if stream.broken {
            return Err(TransportError::Io(format!("{} reset", stream.locator)));
        }
        stream.position_ms = offset_ms;
        Ok(())
    }

    async fn set_volume(&self, handle: StreamHandle, volume: u8) -> TransportResult<()> {
        let mut state = self.lock();
        if let Some(stream) = state.streams.get_mut(&handle) {
            stream.volume = Some(volume);
        }
        Ok(())
    }
}
