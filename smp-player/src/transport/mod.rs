//! Stream transport abstraction
//!
//! The wire protocol (handshake, chunking, demuxing) lives behind
//! [`StreamTransport`]. The engine only needs to bring the server link up
//! and down, open one stream handle per media item, and query or steer
//! that handle.

pub mod simulated;

pub use simulated::SimulatedTransport;

use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Transport-level failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Server link could not be established
    #[error("endpoint unreachable: {0}")]
    Unreachable(String),

    /// Operation requires an established link
    #[error("not connected")]
    NotConnected,

    /// Locator could not be opened
    #[error("cannot open '{locator}': {reason}")]
    OpenFailed { locator: String, reason: String },

    /// Handle is unknown or already closed
    #[error("unknown stream handle {0}")]
    UnknownHandle(StreamHandle),

    /// Mid-stream I/O failure
    #[error("stream I/O failure: {0}")]
    Io(String),
}

/// Convenience Result type for transport operations
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Opaque identifier of one open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StreamHandle(pub u64);

impl fmt::Display for StreamHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One position sample of an open stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSample {
    pub position_ms: u64,
    /// None when the server does not report a duration (live streams)
    pub duration_ms: Option<u64>,
    /// Natural end of stream reached
    pub end_of_stream: bool,
}

/// Link and stream operations the engine relies on
#[async_trait]
pub trait StreamTransport: Send + Sync {
    /// Establish the server link
    async fn connect(&self, endpoint: &str) -> TransportResult<()>;

    /// Tear down the server link. Never fails.
    async fn disconnect(&self);

    /// Whether the server link is currently up
    ///
    /// Polled on every tick and after stream failures to tell a lost link
    /// apart from a failure of one stream.
    fn is_connected(&self) -> bool;

    /// Open a stream for `locator`; requires a link
    async fn open(&self, locator: &str) -> TransportResult<StreamHandle>;

    /// Release a stream handle. Never fails.
    async fn close(&self, handle: StreamHandle);

    /// Suspend consumption without releasing the handle
    async fn pause(&self, handle: StreamHandle) -> TransportResult<()>;

    /// Resume a paused handle
    async fn resume(&self, handle: StreamHandle) -> TransportResult<()>;

    /// Read live position/duration and end-of-stream flag
    async fn sample(&self, handle: StreamHandle) -> TransportResult<StreamSample>;

    /// Reposition to `offset_ms` from the start of the stream
    async fn seek(&self, handle: StreamHandle, offset_ms: u64) -> TransportResult<()>;

    /// Apply a 0-100 volume to the stream
    async fn set_volume(&self, _handle: StreamHandle, _volume: u8) -> TransportResult<()> {
        Ok(())
    }
}
